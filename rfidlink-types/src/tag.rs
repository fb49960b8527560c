//! Tag observations

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One tag as seen during an inventory round
///
/// The tag id is the EPC rendered as upper-case hex. A single observation
/// may stand for several reads of the same tag (`seen_count`).
///
/// [`TagReadEvent::new`] and deserialization validate their input; fields
/// assigned directly are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTagRead")]
pub struct TagReadEvent {
    /// EPC as hex
    pub tag_id: String,

    /// Peak RSSI in dBm
    pub rssi: i16,

    /// Antenna the tag was read on (1-based)
    pub antenna_id: u16,

    /// Number of reads folded into this observation
    #[serde(rename = "count")]
    pub seen_count: u32,
}

/// Wire form, checked through [`TagReadEvent::new`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTagRead {
    tag_id: String,
    rssi: i16,
    antenna_id: u16,
    #[serde(rename = "count")]
    seen_count: u32,
}

impl TryFrom<RawTagRead> for TagReadEvent {
    type Error = Error;

    fn try_from(raw: RawTagRead) -> Result<Self> {
        Self::new(raw.tag_id, raw.rssi, raw.antenna_id, raw.seen_count)
    }
}

impl TagReadEvent {
    /// Create a validated tag observation
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the id is empty or not hex, or if
    /// the antenna id or seen count is zero.
    pub fn new(tag_id: impl AsRef<str>, rssi: i16, antenna_id: u16, seen_count: u32) -> Result<Self> {
        let tag_id = tag_id.as_ref().trim();

        if tag_id.is_empty() {
            return Err(Error::Validation("tag id is empty".into()));
        }
        if !tag_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Validation(format!("tag id is not hex: {}", tag_id)));
        }
        if antenna_id == 0 {
            return Err(Error::Validation("antenna id must be at least 1".into()));
        }
        if seen_count == 0 {
            return Err(Error::Validation("seen count must be at least 1".into()));
        }

        Ok(Self {
            tag_id: tag_id.to_ascii_uppercase(),
            rssi,
            antenna_id,
            seen_count,
        })
    }

    /// Decode the EPC bytes
    ///
    /// Odd-length ids (some readers strip a leading zero) are left-padded.
    pub fn epc_bytes(&self) -> Result<Vec<u8>> {
        let padded;
        let id = if self.tag_id.len() % 2 == 1 {
            padded = format!("0{}", self.tag_id);
            padded.as_str()
        } else {
            self.tag_id.as_str()
        };

        hex::decode(id).map_err(|e| Error::Parse(e.to_string()))
    }
}
