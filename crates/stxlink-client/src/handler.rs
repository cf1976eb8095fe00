use stxlink_frame::Frame;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Receives every frame decoded by the receive loop.
///
/// Called on the receive task, so implementations should hand work off
/// rather than block.
pub trait FrameHandler: Send + Sync + 'static {
    fn on_frame(&self, frame: Frame);
}

impl<F> FrameHandler for F
where
    F: Fn(Frame) + Send + Sync + 'static,
{
    fn on_frame(&self, frame: Frame) {
        self(frame)
    }
}

/// Forwards frames to a channel. Frames are dropped once the receiver is gone.
impl FrameHandler for mpsc::UnboundedSender<Frame> {
    fn on_frame(&self, frame: Frame) {
        if self.send(frame).is_err() {
            debug!("frame receiver dropped; discarding frame");
        }
    }
}

/// Default handler: logs each frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl FrameHandler for LogHandler {
    fn on_frame(&self, frame: Frame) {
        info!(
            uid = frame.header.uid(),
            name = frame.header.name(),
            msg_type = frame.header.msg_type(),
            receiver = frame.header.receiver(),
            body = %String::from_utf8_lossy(&frame.body),
            "frame received"
        );
    }
}
