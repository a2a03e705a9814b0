use qlink_link::{LinkError, LinkWriter};
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::state::ControlState;

/// Encodes the current setpoint and writes it to the link. Called once per
/// control tick, after `update`. A write failure is returned for the caller
/// to log; the tick proceeds and the next tick sends fresh state (no
/// buffering or retry of a stale command).
pub async fn send_command<W: AsyncWrite + Unpin>(
    state: &ControlState,
    link: &mut LinkWriter<W>,
) -> Result<(), LinkError> {
    let frame = state.frame().encode();
    link.write_frame(frame.as_bytes()).await?;
    debug!(%frame, "sent command");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn writes_encoded_frame_to_link() {
        let (a, mut b) = tokio::io::duplex(64);
        let mut writer = LinkWriter::new(a);

        let mut state = ControlState::default();
        state.armed = true;
        state.throttle = 50;
        state.pitch = -10;
        state.yaw = 100;
        send_command(&state, &mut writer).await.unwrap();
        drop(writer);

        let mut sent = String::new();
        b.read_to_string(&mut sent).await.unwrap();
        assert_eq!(sent, "A:1,T:50,P:-10,R:0,Y:100");
    }

    #[tokio::test]
    async fn write_failure_is_returned_not_panicked() {
        let (a, b) = tokio::io::duplex(8);
        drop(b);
        let mut writer = LinkWriter::new(a);

        let state = ControlState::default();
        let err = send_command(&state, &mut writer).await.unwrap_err();
        assert!(matches!(err, LinkError::Write(_)));

        // The writer stays usable for the next tick's attempt.
        let err = send_command(&state, &mut writer).await.unwrap_err();
        assert!(matches!(err, LinkError::Write(_)));
    }
}
