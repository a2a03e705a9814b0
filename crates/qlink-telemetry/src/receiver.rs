use qlink_link::{LineReader, ReadOutcome};
use qlink_proto::parse_telemetry;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::{TelemetrySnapshot, TelemetryStore};

/// Long-lived receive loop for the telemetry side of the link.
///
/// Lines with the telemetry prefix are parsed and published to the store;
/// everything else (noise, partial reads) is silently discarded. A read error
/// is logged and the loop keeps going. Pacing comes from the link's read
/// timeout only. Returns when the link closes or shutdown is signalled.
pub async fn run_receiver<R>(
    mut reader: LineReader<R>,
    store: TelemetryStore,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                // A dropped sender means the control loop is gone; stop too.
                if changed.is_err() || *shutdown.borrow() {
                    info!("telemetry receiver: shutdown");
                    return;
                }
            }
            res = reader.read_line() => match res {
                Ok(ReadOutcome::Line(line)) => {
                    if let Some(fields) = parse_telemetry(&line) {
                        store.publish(TelemetrySnapshot::new(fields));
                    }
                }
                Ok(ReadOutcome::TimedOut) => {}
                Ok(ReadOutcome::Closed) => {
                    info!("telemetry receiver: link closed");
                    return;
                }
                Err(e) => warn!("telemetry read failed: {e}"),
            }
        }
    }
}
