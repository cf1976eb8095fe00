use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::client::SharedWriter;

/// Send a keep-alive frame every `period` until cancelled.
///
/// Send failures are logged and the loop keeps going. Cancellation also
/// interrupts a probe stuck on a peer that stopped reading.
pub(crate) async fn run(writer: SharedWriter, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let mut guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            guard = writer.lock() => guard,
        };
        let Some(frame_writer) = guard.as_mut() else {
            debug!("writer closed; skipping keep-alive");
            continue;
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = frame_writer.send_keep_alive() => result,
        };
        drop(guard);

        match result {
            Ok(()) => trace!("keep-alive sent"),
            Err(err) => warn!(error = %err, "keep-alive send failed"),
        }
    }

    debug!("keep-alive loop stopped");
}
