//! Async QuakeLink client for seismic event queries and live updates.
//!
//! Connect to QuakeLink servers (SeisComP/gempa installations), fetch
//! single events or their revision history, run bounded queries over the
//! event archive, and stream live updates merged with an archive replay.

mod connection;
pub mod error;
mod handle;
#[cfg(test)]
mod mock;
mod stream;
mod transport;

pub use connection::{ClientConfig, Connection};
pub use error::{ClientError, Result};
pub use handle::AbortHandle;
pub use stream::select_stream;
pub use transport::{DEFAULT_PORT, Target};
