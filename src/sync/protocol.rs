//! Wire format of the board socket.
//!
//! Every frame is a JSON text message shaped as `{"event": <name>, "data": <payload>}`.

use std::net::IpAddr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::storage::{Document, SiteColor};

/// Mutation requested by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    UpdateKey(UpdateKey),
    UpdateKeyMarker(UpdateKeyMarker),
    UpdateNotes(UpdateNotes),
    UpdateSiteMarker(UpdateSiteMarker),
    #[serde(rename = "toggle_1337")]
    Toggle1337(Toggle1337),
    AddWifi(AddWifi),
    DeleteWifi(DeleteWifi),
    ResetData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateKey {
    pub index: usize,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateKeyMarker {
    pub key_index: usize,
    pub marker_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNotes {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateSiteMarker {
    pub site_name: String,
    pub color: SiteColor,
}

/// `update_site_marker` as it arrives, before the color is checked
#[derive(Deserialize)]
struct RawSiteMarker {
    site_name: String,
    color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle1337 {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddWifi {
    pub ssid: String,
    #[serde(rename = "pass")]
    pub password: String,
    #[serde(rename = "loc", default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteWifi {
    pub index: usize,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ClientEvent {
    /// Parse and validate one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let Envelope { event, data } =
            serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

        let parsed = match event.as_str() {
            "update_key" => Self::UpdateKey(payload(&event, data)?),
            "update_key_marker" => Self::UpdateKeyMarker(payload(&event, data)?),
            "update_notes" => Self::UpdateNotes(payload(&event, data)?),
            "update_site_marker" => {
                let RawSiteMarker { site_name, color } = payload(&event, data)?;
                Self::UpdateSiteMarker(UpdateSiteMarker {
                    site_name,
                    color: color.parse()?,
                })
            }
            "toggle_1337" => Self::Toggle1337(payload(&event, data)?),
            "add_wifi" => {
                let wifi: AddWifi = payload(&event, data)?;
                if wifi.ssid.is_empty() {
                    return Err(ProtocolError::EmptyField {
                        event: "add_wifi",
                        field: "ssid",
                    });
                }
                if wifi.password.is_empty() {
                    return Err(ProtocolError::EmptyField {
                        event: "add_wifi",
                        field: "pass",
                    });
                }
                Self::AddWifi(wifi)
            }
            "delete_wifi" => Self::DeleteWifi(payload(&event, data)?),
            "reset_data" => Self::ResetData,
            _ => return Err(ProtocolError::UnknownEvent(event)),
        };

        Ok(parsed)
    }

    /// Wire name of the event, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateKey(_) => "update_key",
            Self::UpdateKeyMarker(_) => "update_key_marker",
            Self::UpdateNotes(_) => "update_notes",
            Self::UpdateSiteMarker(_) => "update_site_marker",
            Self::Toggle1337(_) => "toggle_1337",
            Self::AddWifi(_) => "add_wifi",
            Self::DeleteWifi(_) => "delete_wifi",
            Self::ResetData => "reset_data",
        }
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// State pushed from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full state plus the address peers can reach this server on.
    /// Sent on connect and after a reset.
    InitData(InitData),
    /// Full state after any other successful mutation
    DataUpdate(Document),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitData {
    #[serde(flatten)]
    pub document: Document,
    pub server_ip: IpAddr,
}

impl ServerEvent {
    pub fn document(&self) -> &Document {
        match self {
            Self::InitData(init) => &init.document,
            Self::DataUpdate(doc) => doc,
        }
    }
}
