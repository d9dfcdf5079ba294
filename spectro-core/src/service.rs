//! Async boundary between the interactive thread and the network worker.
//!
//! One persistent worker task owns the [`ConnectionManager`] and drains
//! an operation channel; results flow back over an ordered event channel
//! that the interactive side only drains, never blocks on. Because the
//! protocol forbids pipelining there is never more than one in-flight
//! request to reorder, so events arrive strictly in issue order.
//!
//! Shutdown is cooperative via a `CancellationToken`: once triggered, an
//! in-progress exchange is abandoned (the manager faults on next use)
//! and no further event is delivered; the event channel closing is the
//! acknowledgement.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::command::Action;
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, ConnectionError};
use crate::measurement::Measurement;
use crate::network::{ConnectionManager, Endpoint};
use crate::state::ConnectionState;

// ── Ops and events ───────────────────────────────────────────────

/// Operations accepted by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Open (or re-open) the connection to the given endpoint.
    Connect(Endpoint),
    /// Issue one measurement request.
    Request(Action),
    /// Close the connection and return to `Disconnected`.
    Disconnect,
}

/// Notifications delivered back to the interactive side, in issue order.
#[derive(Debug)]
pub enum ServiceEvent {
    /// The connection state changed.
    StatusChanged(ConnectionState),
    /// A `Connect` op finished.
    ConnectFinished(Result<(), ConnectionError>),
    /// A `Request` op finished. Errors arrive here *and* as a
    /// `StatusChanged(Faulted)` so the UI knows the connection is
    /// unusable until an explicit reconnect.
    MeasurementReady {
        action: Action,
        result: Result<Measurement, ClientError>,
    },
}

/// Timeouts applied by the worker.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

// ── Handle ───────────────────────────────────────────────────────

/// Cheap-to-clone handle held by the interactive side.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    op_tx: mpsc::Sender<Op>,
    cancel: CancellationToken,
}

impl ServiceHandle {
    /// Submit an operation without blocking.
    ///
    /// The op channel holds a single buffered entry: one op may be
    /// queued while another executes, and anything beyond that fails
    /// fast with [`ClientError::Busy`] rather than piling up behind a
    /// serialized socket.
    pub fn submit(&self, op: Op) -> Result<(), ClientError> {
        self.op_tx.try_send(op).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ClientError::Busy,
            mpsc::error::TrySendError::Closed(_) => ConnectionError::Closed.into(),
        })
    }

    /// Request worker shutdown. Idempotent; does not wait.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ── Service ──────────────────────────────────────────────────────

/// Spawner for the network worker.
pub struct SpectroService;

impl SpectroService {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// Returns the op handle and the event receiver. Dropping the
    /// receiver does not stop the worker; call
    /// [`ServiceHandle::shutdown`] for that.
    pub fn spawn(config: ServiceConfig) -> (ServiceHandle, mpsc::Receiver<ServiceEvent>) {
        let (op_tx, op_rx) = mpsc::channel(1);
        let (event_tx, event_rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let handle = ServiceHandle {
            op_tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(worker(op_rx, event_tx, cancel, config));
        (handle, event_rx)
    }
}

async fn worker(
    mut op_rx: mpsc::Receiver<Op>,
    event_tx: mpsc::Sender<ServiceEvent>,
    cancel: CancellationToken,
    config: ServiceConfig,
) {
    let manager = ConnectionManager::new();

    loop {
        let op = tokio::select! {
            _ = cancel.cancelled() => break,
            op = op_rx.recv() => match op {
                Some(op) => op,
                None => break,
            },
        };

        match op {
            Op::Connect(endpoint) => {
                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    r = manager.connect(&endpoint, config.connect_timeout) => r,
                };
                let _ = event_tx.send(ServiceEvent::ConnectFinished(result)).await;
                let _ = event_tx
                    .send(ServiceEvent::StatusChanged(manager.state()))
                    .await;
            }
            Op::Request(action) => {
                let dispatcher = Dispatcher::new(&manager, config.request_timeout);
                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    r = dispatcher.dispatch(action) => r,
                };
                let failed = result.is_err();
                let _ = event_tx
                    .send(ServiceEvent::MeasurementReady { action, result })
                    .await;
                if failed {
                    let _ = event_tx
                        .send(ServiceEvent::StatusChanged(manager.state()))
                        .await;
                }
            }
            Op::Disconnect => {
                manager.close().await;
                let _ = event_tx
                    .send(ServiceEvent::StatusChanged(manager.state()))
                    .await;
            }
        }
    }

    tracing::debug!("service worker stopped");
}

// ── Tests ────────────────────────────────────────────────────────
