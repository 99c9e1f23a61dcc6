//! Types for transfer operations.

use serde::Serialize;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A multipart form with a single file field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub field_name: String,
    /// File name reported in the part's content disposition.
    pub file_name: String,
    /// Raw bytes. Empty for the finalize call.
    pub bytes: Vec<u8>,
}

/// States of one file's upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Idle,
    HeartbeatCheck,
    ChunkLoop,
    Finalize,
    /// Every chunk and the finalize call succeeded.
    Success,
    /// The liveness pre-check failed; nothing was uploaded.
    Aborted,
    /// At least one chunk or the finalize call failed, or the run was cut short.
    Failed,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Idle => "idle",
            TransferState::HeartbeatCheck => "heartbeat_check",
            TransferState::ChunkLoop => "chunk_loop",
            TransferState::Finalize => "finalize",
            TransferState::Success => "success",
            TransferState::Aborted => "aborted",
            TransferState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Success | TransferState::Aborted | TransferState::Failed
        )
    }
}

/// Verdict of one file's upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    /// Terminal state the run ended in.
    pub state: TransferState,
    /// Chunks the source was split into.
    pub chunks_planned: u64,
    /// Chunk requests actually sent.
    pub chunks_attempted: u64,
    /// Segment indices whose request failed.
    pub failed_segments: Vec<u64>,
    /// Whether the finalize call was sent and succeeded.
    pub finalized: bool,
    /// Delivery identifier returned by the server, if any.
    pub delivery_id: Option<String>,
}

impl TransferOutcome {
    pub(crate) fn new() -> Self {
        Self {
            state: TransferState::Idle,
            chunks_planned: 0,
            chunks_attempted: 0,
            failed_segments: Vec::new(),
            finalized: false,
            delivery_id: None,
        }
    }

    /// Whether the file may be archived.
    pub fn is_success(&self) -> bool {
        self.state == TransferState::Success
    }
}

/// Extracts a `deliveryId` from a JSON response body, ignoring key case.
pub fn parse_delivery_id(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("deliveryid"))
        .and_then(|(_, value)| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(199, "").is_success());
        assert!(!TransportResponse::new(302, "").is_success());
        assert!(!TransportResponse::new(500, "").is_success());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Success.is_terminal());
        assert!(TransferState::Aborted.is_terminal());
        assert!(TransferState::Failed.is_terminal());
        assert!(!TransferState::ChunkLoop.is_terminal());
        assert_eq!(TransferState::HeartbeatCheck.as_str(), "heartbeat_check");
    }

    #[test]
    fn test_parse_delivery_id_ignores_case() {
        assert_eq!(
            parse_delivery_id(r#"{"deliveryId":"d-42"}"#).as_deref(),
            Some("d-42")
        );
        assert_eq!(
            parse_delivery_id(r#"{"DELIVERYID":"d-43","other":1}"#).as_deref(),
            Some("d-43")
        );
        assert_eq!(parse_delivery_id(r#"{"deliveryid":17}"#).as_deref(), Some("17"));
    }

    #[test]
    fn test_parse_delivery_id_tolerates_other_bodies() {
        assert_eq!(parse_delivery_id(""), None);
        assert_eq!(parse_delivery_id("OK"), None);
        assert_eq!(parse_delivery_id(r#"["deliveryId"]"#), None);
        assert_eq!(parse_delivery_id(r#"{"deliveryId":null}"#), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let mut outcome = TransferOutcome::new();
        outcome.state = TransferState::Aborted;
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""state":"aborted""#));
        assert!(!outcome.is_success());
    }
}
