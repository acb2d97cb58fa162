use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::document::{Document, SiteColor, SiteMarkers, WifiEntry};
use crate::error::MutationError;

/// Single source of truth for the board document.
///
/// All reads and writes go through one lock. A mutation holds it across
/// read, modify and persist, so no two mutations ever see the same stale state.
pub struct Store {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl Store {
    /// Load the document at `path`.
    ///
    /// A missing file is created with the default document. An unreadable or
    /// unparseable file is left on disk untouched and this run starts from the
    /// default in memory.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let doc = match fs::read(&path) {
            Ok(bytes) => match decode(&bytes) {
                Ok(doc) => {
                    tracing::info!(path = %path.display(), "loaded board document");
                    doc
                }
                Err(err) => {
                    tracing::error!(
                        path = %path.display(),
                        "failed to parse board document, starting from defaults: {err:#}"
                    );
                    Document::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let doc = Document::default();
                if let Err(err) = create_parent(&path).and_then(|_| persist(&path, &doc)) {
                    tracing::error!(path = %path.display(), "failed to create board document: {err}");
                } else {
                    tracing::info!(path = %path.display(), "created default board document");
                }
                doc
            }
            Err(err) => {
                tracing::error!(
                    path = %path.display(),
                    "failed to read board document, starting from defaults: {err}"
                );
                Document::default()
            }
        };

        Self {
            path,
            doc: Mutex::new(doc),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Independent copy of the current document
    pub fn snapshot(&self) -> Document {
        self.doc.lock().clone()
    }

    pub fn set_key(&self, index: usize, value: impl Into<String>) -> Result<Document, MutationError> {
        let value = value.into();
        self.mutate(|doc| doc.set_key(index, value))
    }

    pub fn toggle_key_marker(
        &self,
        key_index: usize,
        marker_index: usize,
    ) -> Result<Document, MutationError> {
        self.mutate(|doc| doc.toggle_key_marker(key_index, marker_index))
    }

    pub fn set_notes(&self, text: impl Into<String>) -> Result<Document, MutationError> {
        let text = text.into();
        self.mutate(|doc| {
            doc.notes = text;
            Ok(())
        })
    }

    pub fn toggle_site_marker(
        &self,
        site: &str,
        color: SiteColor,
    ) -> Result<Document, MutationError> {
        self.mutate(|doc| {
            doc.toggle_site_marker(site, color);
            Ok(())
        })
    }

    pub fn set_mode_1337(&self, enabled: bool) -> Result<Document, MutationError> {
        self.mutate(|doc| {
            doc.mode_1337 = enabled;
            Ok(())
        })
    }

    /// Append credentials. Emptiness checks belong to the caller.
    pub fn add_wifi(
        &self,
        ssid: impl Into<String>,
        password: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Document, MutationError> {
        let entry = WifiEntry {
            ssid: ssid.into(),
            password: password.into(),
            location: location.into(),
        };
        self.mutate(|doc| {
            doc.wifi.push(entry);
            Ok(())
        })
    }

    pub fn delete_wifi(&self, index: usize) -> Result<Document, MutationError> {
        self.mutate(|doc| doc.delete_wifi(index).map(drop))
    }

    pub fn reset(&self) -> Result<Document, MutationError> {
        self.mutate(|doc| {
            *doc = Document::default();
            Ok(())
        })
    }

    fn mutate<F>(&self, change: F) -> Result<Document, MutationError>
    where
        F: FnOnce(&mut Document) -> Result<(), MutationError>,
    {
        self.mutate_with(change, Document::clone)
    }

    /// Apply `change`, persist the whole document, then run `on_commit`, all under the lock.
    ///
    /// `change` must validate before it writes anything: a rejection leaves the
    /// document as it was. A persist failure does not roll the change back and
    /// skips `on_commit`. Commits are observed in exactly the order they were
    /// applied; `on_commit` must not block or call back into the store.
    pub fn mutate_with<F, C, R>(&self, change: F, on_commit: C) -> Result<R, MutationError>
    where
        F: FnOnce(&mut Document) -> Result<(), MutationError>,
        C: FnOnce(&Document) -> R,
    {
        let mut doc = self.doc.lock();
        change(&mut doc)?;

        if let Err(source) = persist(&self.path, &doc) {
            tracing::error!(
                path = %self.path.display(),
                "failed to persist board document, memory is ahead of disk: {source}"
            );
            return Err(MutationError::Persist {
                path: self.path.clone(),
                source,
            });
        }

        Ok(on_commit(&doc))
    }
}

/// Read and decode the document at `path` without creating or rewriting it
pub fn read_document(path: &Path) -> Result<Document> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    decode(&bytes)
}

/// Decode a stored document field by field.
///
/// The top level must be a JSON object. A field with the wrong shape falls back
/// to its default alone; a bad site entry resets only that site.
fn decode(bytes: &[u8]) -> Result<Document> {
    let value: Value = serde_json::from_slice(bytes).context("board document is not valid JSON")?;
    let Value::Object(fields) = value else {
        bail!("board document is not a JSON object");
    };

    let mut doc = Document::default();
    read_field(&fields, "keys", &mut doc.keys);
    read_field(&fields, "notes", &mut doc.notes);
    read_field(&fields, "wifi", &mut doc.wifi);
    read_field(&fields, "mode1337", &mut doc.mode_1337);
    read_field(&fields, "key_markers", &mut doc.key_markers);

    let mut sites: Map<String, Value> = Map::new();
    read_field(&fields, "sites", &mut sites);
    for (name, markers) in sites {
        let markers = SiteMarkers::deserialize(&markers).unwrap_or_else(|err| {
            tracing::warn!(site = %name, "resetting malformed site markers: {err}");
            SiteMarkers::default()
        });
        doc.sites.insert(name, markers);
    }

    doc.normalize();
    Ok(doc)
}

fn read_field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str, slot: &mut T) {
    let Some(value) = fields.get(name) else {
        return;
    };
    match T::deserialize(value) {
        Ok(parsed) => *slot = parsed,
        Err(err) => tracing::warn!(field = name, "replacing malformed field with its default: {err}"),
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Sibling temp path used for the atomic replace, e.g. `data.json.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write compact JSON to a sibling temp file, then rename it over `path`.
fn persist(path: &Path, doc: &Document) -> io::Result<()> {
    let bytes = serde_json::to_vec(doc)?;
    let tmp = temp_path(path);

    let mut file = File::create(&tmp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)
}
