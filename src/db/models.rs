// Data models
use serde::{Deserialize, Serialize};

/// One persisted audio blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioEntry {
    pub id: i64,
    /// Raw file bytes, never parsed
    pub data: Vec<u8>,
    /// Unix timestamp (seconds) of the insert
    pub date_added: i64,
}
