//! Message envelopes exchanged with the privileged helper process.
//!
//! The helper owns the action vocabulary; the bridge only fixes the envelope
//! shape. Outbound commands carry a transaction id when the caller expects a
//! correlated response and omit it for fire-and-forget commands.

use crate::id::TransactionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outbound command envelope sent to the helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Command name, drawn from the helper-defined vocabulary
    pub action: String,
    /// Command-specific arguments (opaque to the bridge)
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Present only when a correlated response is expected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
}

impl ActionMessage {
    /// Build a fire-and-forget command (no correlated response expected).
    pub fn fire_and_forget(action: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            args,
            transaction_id: None,
        }
    }

    /// Build a correlated command carrying a transaction id.
    pub fn correlated(
        action: impl Into<String>,
        args: Map<String, Value>,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            action: action.into(),
            args,
            transaction_id: Some(transaction_id),
        }
    }
}

/// Success/error discriminator on inbound helper messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Ok,
    Error,
}

/// Inbound message from the helper.
///
/// A message with a `transaction_id` is the response to a previously sent
/// command; one without is an unsolicited event notification (incoming call,
/// typing status, etc.) routed outside the correlation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperMessage {
    /// Correlation id echoed from the originating command, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// Success/error discriminator
    pub status: MessageStatus,
    /// Result payload on success (shape is command-specific)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Error detail when `status` is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HelperMessage {
    /// True when this message correlates to a pending command.
    pub fn is_response(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// Extract the helper-reported error detail, defaulting when absent.
    pub fn error_data(&self) -> HelperErrorData {
        HelperErrorData {
            message: self
                .error
                .clone()
                .unwrap_or_else(|| "helper reported an unspecified error".to_string()),
            detail: self.payload.clone(),
        }
    }
}

/// Structured detail of a helper-reported failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperErrorData {
    /// Human-readable error message from the helper
    pub message: String,
    /// Optional additional detail the helper attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fire_and_forget_omits_transaction_id() {
        let msg = ActionMessage::fire_and_forget(
            "send-typing",
            args(&[("chatGuid", json!("iMessage;-;+15551234567"))]),
        );
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded["action"], "send-typing");
        assert!(encoded.get("transaction_id").is_none());
    }

    #[test]
    fn test_correlated_round_trip() {
        let id = TransactionId::new();
        let msg = ActionMessage::correlated("answer-call", args(&[("callUuid", json!("abc"))]), id);
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: ActionMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.transaction_id, Some(id));
        assert_eq!(decoded.args["callUuid"], json!("abc"));
    }

    #[test]
    fn test_inbound_status_discriminator() {
        let raw = json!({
            "transaction_id": TransactionId::new(),
            "status": "error",
            "error": "no such call"
        });
        let msg: HelperMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.status, MessageStatus::Error);
        assert!(msg.is_response());
        assert_eq!(msg.error_data().message, "no such call");
    }

    #[test]
    fn test_inbound_event_has_no_transaction_id() {
        let raw = json!({ "status": "ok", "payload": { "event": "incoming-call" } });
        let msg: HelperMessage = serde_json::from_value(raw).unwrap();
        assert!(!msg.is_response());
    }

    #[test]
    fn test_error_data_defaults_when_detail_absent() {
        let msg = HelperMessage {
            transaction_id: Some(TransactionId::new()),
            status: MessageStatus::Error,
            payload: None,
            error: None,
        };
        assert!(msg.error_data().message.contains("unspecified"));
    }
}
