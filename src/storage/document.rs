use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MutationError, ProtocolError};

/// Number of key slots on the board
pub const KEY_SLOTS: usize = 8;

/// Number of wiki markers attached to each key slot
pub const MARKERS_PER_KEY: usize = 3;

/// The single shared board state synchronized across all clients.
///
/// Every field carries `#[serde(default)]` through the container attribute, so a
/// persisted file written by an older build is backfilled field by field on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub keys: Vec<String>,
    pub sites: BTreeMap<String, SiteMarkers>,
    pub notes: String,
    pub wifi: Vec<WifiEntry>,
    #[serde(rename = "mode1337")]
    pub mode_1337: bool,
    pub key_markers: Vec<[u8; MARKERS_PER_KEY]>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            keys: vec![String::new(); KEY_SLOTS],
            sites: BTreeMap::new(),
            notes: String::new(),
            wifi: Vec::new(),
            mode_1337: false,
            key_markers: vec![[0; MARKERS_PER_KEY]; KEY_SLOTS],
        }
    }
}

impl Document {
    /// Force the fixed-shape fields back into their invariants.
    ///
    /// Slot lists are padded or truncated to [`KEY_SLOTS`] and marker flags are
    /// clamped to 0/1. Present values are otherwise left untouched.
    pub fn normalize(&mut self) {
        self.keys.resize(KEY_SLOTS, String::new());
        self.key_markers.resize(KEY_SLOTS, [0; MARKERS_PER_KEY]);
        for triple in &mut self.key_markers {
            for flag in triple.iter_mut() {
                *flag = (*flag != 0) as u8;
            }
        }
    }

    pub fn set_key(&mut self, index: usize, value: String) -> Result<(), MutationError> {
        let slot = self
            .keys
            .get_mut(index)
            .ok_or(MutationError::KeyIndexOutOfRange(index))?;
        *slot = value;
        Ok(())
    }

    pub fn toggle_key_marker(
        &mut self,
        key_index: usize,
        marker_index: usize,
    ) -> Result<(), MutationError> {
        if marker_index >= MARKERS_PER_KEY {
            return Err(MutationError::MarkerIndexOutOfRange(marker_index));
        }
        let triple = self
            .key_markers
            .get_mut(key_index)
            .ok_or(MutationError::KeyIndexOutOfRange(key_index))?;
        triple[marker_index] ^= 1;
        Ok(())
    }

    /// Flip one color on `site`, creating the site with every flag off if needed.
    pub fn toggle_site_marker(&mut self, site: &str, color: SiteColor) {
        self.sites.entry(site.to_string()).or_default().toggle(color);
    }

    /// Remove the entry at `index`; later entries shift down by one.
    pub fn delete_wifi(&mut self, index: usize) -> Result<WifiEntry, MutationError> {
        let len = self.wifi.len();
        if index >= len {
            return Err(MutationError::WifiIndexOutOfRange { index, len });
        }
        Ok(self.wifi.remove(index))
    }
}

/// Green/red/yellow flags attached to a named site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMarkers {
    pub green: bool,
    pub red: bool,
    pub yellow: bool,
}

impl SiteMarkers {
    pub fn toggle(&mut self, color: SiteColor) {
        let flag = match color {
            SiteColor::Green => &mut self.green,
            SiteColor::Red => &mut self.red,
            SiteColor::Yellow => &mut self.yellow,
        };
        *flag = !*flag;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteColor {
    Green,
    Red,
    Yellow,
}

impl FromStr for SiteColor {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Self::Green),
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            other => Err(ProtocolError::UnknownColor(other.to_string())),
        }
    }
}

/// Saved wifi credentials, addressed by position in [`Document::wifi`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiEntry {
    pub ssid: String,
    #[serde(rename = "pass")]
    pub password: String,
    #[serde(rename = "loc")]
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let doc = Document::default();
        assert_eq!(doc.keys.len(), KEY_SLOTS);
        assert!(doc.keys.iter().all(String::is_empty));
        assert_eq!(doc.key_markers, vec![[0, 0, 0]; KEY_SLOTS]);
        assert!(doc.sites.is_empty());
        assert!(doc.wifi.is_empty());
        assert!(!doc.mode_1337);
    }

    #[test]
    fn test_wire_field_names() {
        let mut doc = Document::default();
        doc.mode_1337 = true;
        doc.wifi.push(WifiEntry {
            ssid: "cafe".into(),
            password: "hunter2".into(),
            location: "lobby".into(),
        });

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["mode1337"], serde_json::json!(true));
        assert_eq!(
            value["wifi"][0],
            serde_json::json!({"ssid": "cafe", "pass": "hunter2", "loc": "lobby"})
        );
        assert_eq!(value["key_markers"][7], serde_json::json!([0, 0, 0]));
    }

    #[test]
    fn test_partial_document_backfills() {
        let doc: Document =
            serde_json::from_str(r#"{"notes": "remember the cat", "sites": {"A": {"red": true}}}"#)
                .unwrap();

        assert_eq!(doc.notes, "remember the cat");
        assert_eq!(
            doc.sites["A"],
            SiteMarkers {
                green: false,
                red: true,
                yellow: false
            }
        );
        assert!(doc.wifi.is_empty());
        assert_eq!(doc.keys.len(), KEY_SLOTS);
    }

    #[test]
    fn test_normalize_pads_and_clamps() {
        let mut doc: Document =
            serde_json::from_str(r#"{"keys": ["a", "b"], "key_markers": [[0, 5, 1]]}"#).unwrap();
        doc.normalize();

        assert_eq!(doc.keys.len(), KEY_SLOTS);
        assert_eq!(doc.keys[0], "a");
        assert_eq!(doc.keys[1], "b");
        assert_eq!(doc.key_markers.len(), KEY_SLOTS);
        assert_eq!(doc.key_markers[0], [0, 1, 1]);
    }

    #[test]
    fn test_site_color_parse() {
        assert_eq!("green".parse::<SiteColor>().unwrap(), SiteColor::Green);
        assert_eq!("yellow".parse::<SiteColor>().unwrap(), SiteColor::Yellow);
        assert!("purple".parse::<SiteColor>().is_err());
        assert!("Green".parse::<SiteColor>().is_err());
    }

    #[test]
    fn test_key_marker_checks_marker_before_key() {
        let mut doc = Document::default();
        assert!(matches!(
            doc.toggle_key_marker(9, 3),
            Err(MutationError::MarkerIndexOutOfRange(3))
        ));
        assert!(matches!(
            doc.toggle_key_marker(9, 0),
            Err(MutationError::KeyIndexOutOfRange(9))
        ));
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn test_toggle_site_marker_flag() {
        let mut markers = SiteMarkers::default();
        markers.toggle(SiteColor::Yellow);
        assert!(markers.yellow);
        markers.toggle(SiteColor::Yellow);
        assert!(!markers.yellow);
    }
}
