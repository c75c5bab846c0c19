use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportLineError {
    /// 1-based line in the uploaded file, header included.
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: u32,
    pub updated: u32,
    pub skipped: u32,
    pub currency: String,
    pub errors: Vec<ImportLineError>,
}
