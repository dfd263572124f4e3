use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State label the backend reports once a job has gathered everything.
pub const STATE_DONE: &str = "DONE GATHERING RESULTS";
pub const STATE_CANCELLED: &str = "CANCELLED";

/// Body of `POST /api/v1/search/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSearchJob {
    pub query: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedJob {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub state: String,
    #[serde(rename = "messageCount", default)]
    pub message_count: u64,
    #[serde(rename = "recordCount", default)]
    pub record_count: u64,
    #[serde(rename = "pendingErrors", default)]
    pub pending_errors: Vec<Value>,
    #[serde(rename = "pendingWarnings", default)]
    pub pending_warnings: Vec<Value>,
}

impl JobStatus {
    pub fn is_done(&self) -> bool {
        self.state == STATE_DONE
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == STATE_CANCELLED
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessagesPage {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// One log line as returned by the messages endpoint. Only `map.json` is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub map: Map<String, Value>,
}

impl RawMessage {
    /// The extracted `json` field, if present and non-empty.
    pub fn json_field(&self) -> Option<&str> {
        self.map
            .get("json")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}
