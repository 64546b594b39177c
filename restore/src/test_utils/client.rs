use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::client::RestoreClient;
use crate::error::{ErrorKind, RestoreError, RestoreResult};
use crate::restore_error;
use crate::types::{LogReplicationRequest, LogReplicationResponse, MemberId};

struct ScriptedReply {
    gate: Option<Arc<Notify>>,
    reply: RestoreResult<LogReplicationResponse>,
}

#[derive(Default)]
struct Inner {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<(MemberId, LogReplicationRequest)>,
    request_conditions: Vec<(usize, Arc<Notify>)>,
}

impl Inner {
    fn check_conditions(&mut self) {
        let requests = self.requests.len();
        self.request_conditions.retain(|(expected, notify)| {
            let should_retain = requests < *expected;
            if !should_retain {
                notify.notify_one();
            }
            should_retain
        });
    }
}

/// [`RestoreClient`] answering requests with replies queued in advance.
///
/// Replies are consumed in order; a request arriving when the queue is empty fails
/// with [`ErrorKind::InvalidState`]. Every request is recorded.
#[derive(Clone, Default)]
pub struct ScriptedRestoreClient {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedRestoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_response(&self, response: LogReplicationResponse) {
        self.push(None, Ok(response)).await;
    }

    pub async fn push_error(&self, error: RestoreError) {
        self.push(None, Err(error)).await;
    }

    /// Queues `response`, which is only delivered once the returned [`Notify`] is notified.
    pub async fn push_gated_response(&self, response: LogReplicationResponse) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(Some(gate.clone()), Ok(response)).await;

        gate
    }

    /// Returns a [`Notify`] notified once `count` requests have been received.
    pub async fn notify_on_requests(&self, count: usize) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());

        let mut inner = self.inner.lock().await;
        inner.request_conditions.push((count, notify.clone()));
        inner.check_conditions();

        notify
    }

    pub async fn requests(&self) -> Vec<(MemberId, LogReplicationRequest)> {
        self.inner.lock().await.requests.clone()
    }

    pub async fn remaining_replies(&self) -> usize {
        self.inner.lock().await.replies.len()
    }

    async fn push(&self, gate: Option<Arc<Notify>>, reply: RestoreResult<LogReplicationResponse>) {
        self.inner
            .lock()
            .await
            .replies
            .push_back(ScriptedReply { gate, reply });
    }
}

impl RestoreClient for ScriptedRestoreClient {
    async fn request_log_replication(
        &self,
        member: &MemberId,
        request: LogReplicationRequest,
    ) -> RestoreResult<LogReplicationResponse> {
        let scripted = {
            let mut inner = self.inner.lock().await;
            inner.requests.push((member.clone(), request));
            inner.check_conditions();
            inner.replies.pop_front()
        };

        let Some(scripted) = scripted else {
            return Err(restore_error!(
                ErrorKind::InvalidState,
                "No scripted reply left",
                request
            ));
        };

        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }

        scripted.reply
    }
}
