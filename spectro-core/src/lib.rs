//! # spectro-core
//!
//! Protocol client for spectral-instrument servers.
//!
//! This crate contains:
//! - **Commands**: the closed [`Command`]/[`Action`] sets and their wire tokens
//! - **Codec**: [`SpectroCodec`] for newline-framed I/O via `tokio_util`
//! - **Measurement**: [`Measurement`] — decoded wavelength/intensity spectra
//! - **Network**: [`ConnectionManager`] — socket lifecycle and the
//!   one-in-flight request/response exchange
//! - **Dispatch**: [`Dispatcher`] — action → request, no policy
//! - **Service**: [`SpectroService`] — worker task + ordered event channel
//!   keeping socket I/O off the interactive thread
//! - **Error**: [`ClientError`] — typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod measurement;
pub mod network;
pub mod service;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{MAX_FRAME_SIZE, SpectroCodec};
pub use command::{ALL_ACTIONS, ALL_COMMANDS, Action, Command};
pub use dispatch::Dispatcher;
pub use error::{ClientError, ConnectionError, ProtocolError};
pub use measurement::{Measurement, Reply, Sample};
pub use network::{ConnectionManager, Endpoint};
pub use service::{Op, ServiceConfig, ServiceEvent, ServiceHandle, SpectroService};
pub use state::ConnectionState;
