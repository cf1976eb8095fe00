use std::net::SocketAddr;
use std::sync::Arc;

use stxlink_frame::FrameReader;
use stxlink_transport::LinkReadHalf;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ConnectionState;
use crate::handler::FrameHandler;

/// Drive the frame reader until cancellation, peer close, or a fatal read
/// error, dispatching every decoded frame to `handler`.
///
/// Always leaves the connection `Disconnected` and the shared token
/// cancelled, so the keep-alive loop stops with it.
pub(crate) async fn run(
    mut reader: FrameReader<LinkReadHalf>,
    handler: Arc<dyn FrameHandler>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
    peer: SocketAddr,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%peer, "receive loop cancelled");
                break;
            }
            next = reader.read_frame() => next,
        };

        match next {
            Ok(Some(frame)) => handler.on_frame(frame),
            Ok(None) => {
                info!(%peer, "peer closed connection");
                break;
            }
            Err(err) if !err.is_fatal() => {
                warn!(%peer, error = %err, "dropping undecodable frame");
            }
            Err(err) => {
                warn!(%peer, error = %err, "receive loop stopped");
                break;
            }
        }
    }

    state.send_replace(ConnectionState::Disconnected);
    cancel.cancel();
}
