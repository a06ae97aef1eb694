use std::sync::Arc;

use tokio::sync::Notify;

/// Wakeup points a streaming call listens on between reads.
#[derive(Debug, Default)]
pub(crate) struct SessionSignals {
    pub(crate) abort: Notify,
    pub(crate) hangup: Notify,
}

/// Cancellation handle for a [`Connection`](crate::Connection) that is busy
/// in a long-running `select`.
///
/// The owning task blocks on transport reads for the whole call; this
/// handle lets another task end the stream. Both signals take effect at the
/// connection's next suspension point.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    signals: Arc<SessionSignals>,
}

impl AbortHandle {
    pub(crate) fn new(signals: Arc<SessionSignals>) -> Self {
        Self { signals }
    }

    /// Politely end the stream: `ABORT` is written on the wire and reading
    /// continues until the server terminates with `EOD/SELECT` or closes.
    pub fn abort(&self) {
        self.signals.abort.notify_one();
    }

    /// Forcibly close the transport. The streaming call returns
    /// [`ClientError::Disconnected`](crate::ClientError::Disconnected).
    pub fn disconnect(&self) {
        self.signals.hangup.notify_one();
    }
}
