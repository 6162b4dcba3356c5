// Render boundary: where finished frames go
use shared::models::RenderFrame;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub trait RenderSink: Send + Sync {
    fn render(&self, frame: &RenderFrame);
}

/// Forwards every frame to a stream consumed by the chart front end.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RenderFrame>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiverStream<RenderFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, UnboundedReceiverStream::new(rx))
    }
}

impl RenderSink for ChannelSink {
    fn render(&self, frame: &RenderFrame) {
        if self.tx.send(frame.clone()).is_err() {
            tracing::debug!(key = %frame.key, "Render stream closed, frame discarded");
        }
    }
}

/// Logs a one-line summary of each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn render(&self, frame: &RenderFrame) {
        let last_signal = frame.signals.last().map(|s| s.label(&frame.key.base));
        tracing::info!(
            key = %frame.key,
            lines = frame.lines.len(),
            signals = frame.signals.len(),
            forming_close = ?frame.forming.map(|c| c.close),
            last_signal = ?last_signal,
            "Frame rendered"
        );
    }
}
