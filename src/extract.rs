use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiError, SumoClient};
use crate::poll::SearchJob;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("could not decode payload: {raw}")]
    Unparseable { raw: String },
}

/// Decodes a `json` field. A JSON string that itself holds JSON is unwrapped
/// once. If that fails, escaped quotes and doubled backslashes are undone and
/// the result parsed once more. `Ok(None)` means the payload was `null`.
pub fn decode_payload(raw: &str) -> Result<Option<Value>, ExtractError> {
    let decoded = serde_json::from_str::<Value>(raw).and_then(|value| match value {
        Value::String(inner) => serde_json::from_str::<Value>(&inner),
        other => Ok(other),
    });

    let value = match decoded {
        Ok(value) => value,
        Err(_) => {
            let unescaped = raw.replace("\\\"", "\"").replace("\\\\", "\\");
            serde_json::from_str::<Value>(&unescaped).map_err(|_| ExtractError::Unparseable {
                raw: raw.to_string(),
            })?
        }
    };

    Ok(match value {
        Value::Null => None,
        value => Some(value),
    })
}

/// Walks the job's messages page by page and returns the first payload that
/// decodes. Nothing after it is read.
pub async fn first_payload(
    client: &SumoClient,
    job: &SearchJob,
    page_size: u32,
) -> Result<Option<Value>, ApiError> {
    let mut offset: u64 = 0;

    while offset < job.message_count {
        let messages = client.fetch_page(&job.id, offset, page_size).await?;
        if messages.is_empty() {
            break;
        }

        for message in &messages {
            let Some(raw) = message.json_field() else {
                continue;
            };
            match decode_payload(raw) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping message in job {}: {}", job.id, e);
                    continue;
                }
            }
        }

        offset += messages.len() as u64;
        debug!("Job {}: read {} of {} messages", job.id, offset, job.message_count);
    }

    Ok(None)
}
