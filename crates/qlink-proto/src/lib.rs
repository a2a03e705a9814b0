//! Wire formats for the ground-control serial protocol.
//!
//! Outbound, once per control tick:
//! `A:<0|1>,T:<0..98>,P:<-100..100>,R:<-100..100>,Y:<-100..100>`.
//! The peer matches fields by key prefix, but the key set and order here are
//! fixed and must not change.
//!
//! Inbound: any line starting with `T:` is telemetry; the remainder is a
//! comma-separated list of free-form fields owned by the peer firmware.

pub const TELEMETRY_PREFIX: &str = "T:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub armed: bool,
    pub throttle: i32,
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
}

impl CommandFrame {
    /// Plain decimal, leading `-` for negatives, no padding, no trailing newline.
    pub fn encode(&self) -> String {
        format!(
            "A:{},T:{},P:{},R:{},Y:{}",
            self.armed as u8, self.throttle, self.pitch, self.roll, self.yaw
        )
    }
}

/// Returns the raw telemetry fields, or `None` when the line is not telemetry.
/// Garbled or partial lines simply fail the prefix check; they are not errors.
pub fn parse_telemetry(line: &str) -> Option<Vec<String>> {
    let rest = line.strip_prefix(TELEMETRY_PREFIX)?;
    Some(rest.split(',').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fixed_key_order() {
        let frame = CommandFrame {
            armed: true,
            throttle: 50,
            pitch: -10,
            roll: 0,
            yaw: 100,
        };
        assert_eq!(frame.encode(), "A:1,T:50,P:-10,R:0,Y:100");
    }

    #[test]
    fn encodes_disarmed_zero_state() {
        let frame = CommandFrame {
            armed: false,
            throttle: 0,
            pitch: 0,
            roll: 0,
            yaw: 0,
        };
        assert_eq!(frame.encode(), "A:0,T:0,P:0,R:0,Y:0");
    }

    #[test]
    fn parses_telemetry_fields() {
        assert_eq!(
            parse_telemetry("T:12.3,45,OK"),
            Some(vec!["12.3".into(), "45".into(), "OK".into()])
        );
    }

    #[test]
    fn non_telemetry_lines_are_ignored() {
        assert_eq!(parse_telemetry("NOISE"), None);
        assert_eq!(parse_telemetry(""), None);
        assert_eq!(parse_telemetry("t:lowercase"), None);
    }

    #[test]
    fn empty_payload_is_one_empty_field() {
        assert_eq!(parse_telemetry("T:"), Some(vec![String::new()]));
    }
}
