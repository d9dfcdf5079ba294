//! Maps user-facing actions onto protocol requests.
//!
//! Deliberately thin: the dispatcher resolves an [`Action`] to its
//! [`Command`](crate::command::Command) and invokes the connection
//! manager. It performs no retries and passes failures through
//! unchanged: when to retry is policy, how to talk on the wire is
//! mechanism, and the two stay separate.

use std::time::Duration;

use crate::command::Action;
use crate::error::ClientError;
use crate::measurement::Measurement;
use crate::network::ConnectionManager;

/// Resolves actions and forwards them to the connection manager.
pub struct Dispatcher<'a> {
    manager: &'a ConnectionManager,
    request_timeout: Duration,
}

impl<'a> Dispatcher<'a> {
    pub fn new(manager: &'a ConnectionManager, request_timeout: Duration) -> Self {
        Self {
            manager,
            request_timeout,
        }
    }

    /// Issue the protocol request for `action` and wait for its reply.
    pub async fn dispatch(&self, action: Action) -> Result<Measurement, ClientError> {
        self.manager
            .request(action.command(), self.request_timeout)
            .await
    }
}
