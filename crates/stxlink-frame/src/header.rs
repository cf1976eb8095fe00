//! Message header model.
//!
//! The header travels as a JSON object between the start and divider
//! sentinels. Key names are fixed by the remote service:
//!
//! | JSON key   | Field        |
//! |------------|--------------|
//! | `UID`      | `uid`        |
//! | `name`     | `name`       |
//! | `dataType` | `data_type`  |
//! | `receiver` | `receiver`   |
//! | `type`     | `msg_type`   |
//! | `dataLen`  | `data_len`   |
//! | `interval` | `interval`   |

use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Metadata describing one message.
///
/// Fields are read-only once built; use the `with_*` methods while
/// constructing. Keys missing from an incoming header decode to their
/// defaults (empty string, `0`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageHeader {
    #[serde(rename = "UID")]
    uid: String,
    name: String,
    #[serde(rename = "dataType")]
    data_type: String,
    receiver: String,
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(rename = "dataLen")]
    data_len: i64,
    interval: i64,
}

impl MessageHeader {
    /// Create a header with a caller-assigned unique id and a topic name.
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the payload encoding label (e.g. `"JSON"`).
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    /// Set the target service name.
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = receiver.into();
        self
    }

    /// Set the message type (e.g. `"subscribe"`).
    pub fn with_type(mut self, msg_type: impl Into<String>) -> Self {
        self.msg_type = msg_type.into();
        self
    }

    /// Set the payload length hint.
    pub fn with_data_len(mut self, data_len: i64) -> Self {
        self.data_len = data_len;
        self
    }

    /// Set the interval hint.
    pub fn with_interval(mut self, interval: i64) -> Self {
        self.interval = interval;
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    pub fn data_len(&self) -> i64 {
        self.data_len
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Serialize to the JSON header text.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(FrameError::Encode)
    }

    /// Parse header text taken from between the start and divider sentinels.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(FrameError::Decode)
    }
}
