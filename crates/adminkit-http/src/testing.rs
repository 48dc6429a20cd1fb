//! In-memory doubles for exercising the pipeline without a server.

use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::notify::{Notice, Notifier};
use crate::transport::{OutboundRequest, Transport, TransportError, TransportResponse};

/// Replies with queued responses in order and records what was sent.
///
/// Once the queue is empty every call fails as a connection error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Result<TransportResponse, TransportError>>>>,
    sent: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.replies
            .lock()
            .push_back(Ok(TransportResponse::new(status, body.into())));
        self
    }

    pub fn reply_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.reply(status, body.to_string())
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().clone()
    }

    pub fn last_sent(&self) -> Option<OutboundRequest> {
        self.sent.lock().last().cloned()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        self.sent.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted reply".to_string())))
    }
}

/// Keeps every notice for later assertions.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
