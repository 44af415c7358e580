use serde::{Serialize, Serializer};

/// Raw upload handed to the pipeline by the caller.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl VideoUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Summary text, or the diagnostic that replaced it. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryResult {
    Generated(String),
    Degraded(String),
}

impl SummaryResult {
    pub fn as_str(&self) -> &str {
        match self {
            SummaryResult::Generated(text) | SummaryResult::Degraded(text) => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SummaryResult::Degraded(_))
    }

    pub fn into_string(self) -> String {
        match self {
            SummaryResult::Generated(text) | SummaryResult::Degraded(text) => text,
        }
    }
}

impl Serialize for SummaryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub transcription: String,
    pub summary: SummaryResult,
}
