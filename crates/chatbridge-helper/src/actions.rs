//! Domain actions - thin, stateless translations from privileged operations
//! to helper commands.
//!
//! Each method builds an action name and argument map and delegates to the
//! dispatcher, requesting a transaction iff the caller needs a typed result.
//! Argument validation (empty addresses and the like) belongs to callers.

use crate::dispatch::{Dispatcher, TransactionRequest};
use crate::error::HelperError;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Client surface over the dispatcher, one method per privileged operation.
pub struct HelperClient {
    dispatcher: Arc<Dispatcher>,
    /// Per-call timeout override; None uses the dispatcher default
    timeout: Option<Duration>,
}

impl HelperClient {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            timeout: None,
        }
    }

    /// Override the transaction timeout for calls made through this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    // ── Calls ──────────────────────────────────────────────────────────

    /// Answer an incoming call.
    pub async fn answer_call(&self, call_uuid: &str) -> Result<Value, HelperError> {
        let mut args = Map::new();
        args.insert("callUuid".into(), Value::String(call_uuid.into()));
        self.generic("answer-call", args).await
    }

    /// Leave the active call.
    pub async fn leave_call(&self, call_uuid: &str) -> Result<(), HelperError> {
        let mut args = Map::new();
        args.insert("callUuid".into(), Value::String(call_uuid.into()));
        self.ack("leave-call", args).await
    }

    /// Admit a waiting participant into a call.
    pub async fn admit_participant(
        &self,
        conversation_uuid: &str,
        handle_uuid: &str,
    ) -> Result<Value, HelperError> {
        let mut args = Map::new();
        args.insert(
            "conversationUuid".into(),
            Value::String(conversation_uuid.into()),
        );
        args.insert("handleUuid".into(), Value::String(handle_uuid.into()));
        self.generic("admit-participant", args).await
    }

    /// Create a shareable call link; the payload carries the link.
    pub async fn create_call_link(&self) -> Result<Value, HelperError> {
        self.generic("create-call-link", Map::new()).await
    }

    // ── Conversations ──────────────────────────────────────────────────

    /// Add an address to a group conversation.
    pub async fn add_participant(
        &self,
        chat_guid: &str,
        address: &str,
    ) -> Result<Value, HelperError> {
        self.participant_action("add-participant", chat_guid, address)
            .await
    }

    /// Remove an address from a group conversation.
    pub async fn remove_participant(
        &self,
        chat_guid: &str,
        address: &str,
    ) -> Result<Value, HelperError> {
        self.participant_action("remove-participant", chat_guid, address)
            .await
    }

    /// Leave a group conversation.
    pub async fn leave_chat(&self, chat_guid: &str) -> Result<(), HelperError> {
        let mut args = Map::new();
        args.insert("chatGuid".into(), Value::String(chat_guid.into()));
        self.ack("leave-chat", args).await
    }

    /// Rename a group conversation.
    pub async fn rename_chat(&self, chat_guid: &str, name: &str) -> Result<(), HelperError> {
        let mut args = Map::new();
        args.insert("chatGuid".into(), Value::String(chat_guid.into()));
        args.insert("newName".into(), Value::String(name.into()));
        self.ack("rename-chat", args).await
    }

    /// Mark a conversation read.
    pub async fn mark_chat_read(&self, chat_guid: &str) -> Result<(), HelperError> {
        let mut args = Map::new();
        args.insert("chatGuid".into(), Value::String(chat_guid.into()));
        self.ack("mark-chat-read", args).await
    }

    // ── Messages ───────────────────────────────────────────────────────

    /// Send a message; the payload echoes the created message.
    pub async fn send_message(
        &self,
        chat_guid: &str,
        text: &str,
        temp_guid: &str,
    ) -> Result<Value, HelperError> {
        let mut args = Map::new();
        args.insert("chatGuid".into(), Value::String(chat_guid.into()));
        args.insert("message".into(), Value::String(text.into()));
        args.insert("tempGuid".into(), Value::String(temp_guid.into()));
        self.generic("send-message", args).await
    }

    /// Show the typing indicator in a conversation. Fire-and-forget: the
    /// helper's behavior is unobservable for this command.
    pub async fn send_typing(&self, chat_guid: &str) -> Result<(), HelperError> {
        self.typing("send-typing", chat_guid).await
    }

    /// Clear the typing indicator. Fire-and-forget.
    pub async fn stop_typing(&self, chat_guid: &str) -> Result<(), HelperError> {
        self.typing("stop-typing", chat_guid).await
    }

    // ── Health ─────────────────────────────────────────────────────────

    /// Probe the helper for liveness.
    pub async fn ping(&self) -> Result<(), HelperError> {
        self.ack("ping", Map::new()).await
    }

    /// Number of transactions currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.dispatcher.pending_count()
    }

    // ── Internals ──────────────────────────────────────────────────────

    async fn generic(
        &self,
        action: &str,
        args: Map<String, Value>,
    ) -> Result<Value, HelperError> {
        self.dispatcher
            .dispatch(action, args, TransactionRequest::Generic, self.timeout)
            .await
    }

    async fn ack(&self, action: &str, args: Map<String, Value>) -> Result<(), HelperError> {
        self.dispatcher
            .dispatch(action, args, TransactionRequest::Ack, self.timeout)
            .await
            .map(|_| ())
    }

    async fn participant_action(
        &self,
        action: &str,
        chat_guid: &str,
        address: &str,
    ) -> Result<Value, HelperError> {
        let mut args = Map::new();
        args.insert("chatGuid".into(), Value::String(chat_guid.into()));
        args.insert("address".into(), Value::String(address.into()));
        self.generic(action, args).await
    }

    async fn typing(&self, action: &str, chat_guid: &str) -> Result<(), HelperError> {
        let mut args = Map::new();
        args.insert("chatGuid".into(), Value::String(chat_guid.into()));
        self.dispatcher
            .dispatch(action, args, TransactionRequest::None, None)
            .await
            .map(|_| ())
    }
}
