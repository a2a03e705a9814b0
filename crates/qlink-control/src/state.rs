use qlink_proto::CommandFrame;

pub const THROTTLE_MAX: i32 = 98;
pub const THROTTLE_STEP: i32 = 5;
pub const YAW_STEP: i32 = 2;
pub const PITCH_STEP: i32 = 5;
pub const ROLL_STEP: i32 = 5;
pub const AXIS_LIMIT: i32 = 100;

/// Raw held-button state for one control tick. Produced by the input layer,
/// consumed once by [`ControlState::update`] and discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub arm: bool,
    pub throttle_up: bool,
    pub throttle_down: bool,
    pub yaw_left: bool,
    pub yaw_right: bool,
    pub pitch_forward: bool,
    pub pitch_back: bool,
    pub roll_left: bool,
    pub roll_right: bool,
    pub quit: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TickOutcome {
    /// Pass-through from the quit button; the caller decides to stop.
    pub quit: bool,
    /// The arm flag flipped this tick (for operator-facing logging).
    pub arm_toggled: bool,
}

/// The setpoint the peer flies on. Single writer: the control tick loop.
///
/// Invariant: after every `update`, `throttle` is in [0, 98] and the three
/// attitude axes are in [-100, 100].
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    pub armed: bool,
    pub throttle: i32,
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,

    // Edge tracking for the arm button: toggling is per press, not per tick.
    arm_was_held: bool,
}

impl ControlState {
    /// Applies one tick of raw input. Rules per axis are independent.
    ///
    /// Arming flips on the press edge only and zeroes throttle and yaw in the
    /// same tick; pitch and roll are deliberately left alone (the peer
    /// firmware expects them to persist through an arm toggle).
    pub fn update(&mut self, input: &InputSnapshot) -> TickOutcome {
        let mut arm_toggled = false;
        if input.arm {
            if !self.arm_was_held {
                self.armed = !self.armed;
                self.throttle = 0;
                self.yaw = 0;
                arm_toggled = true;
            }
            self.arm_was_held = true;
        } else {
            self.arm_was_held = false;
        }

        // Up and down are independent and may both fire in one tick.
        // Throttle holds its value when neither is pressed.
        if input.throttle_up {
            self.throttle = (self.throttle + THROTTLE_STEP).min(THROTTLE_MAX);
        }
        if input.throttle_down {
            self.throttle = (self.throttle - THROTTLE_STEP).max(0);
        }

        // Attitude axes: positive direction wins when both are held, and the
        // axis snaps back to 0 the moment neither is held.
        if input.yaw_right {
            self.yaw = (self.yaw + YAW_STEP).min(AXIS_LIMIT);
        } else if input.yaw_left {
            self.yaw = (self.yaw - YAW_STEP).max(-AXIS_LIMIT);
        } else {
            self.yaw = 0;
        }

        if input.pitch_forward {
            self.pitch = (self.pitch + PITCH_STEP).min(AXIS_LIMIT);
        } else if input.pitch_back {
            self.pitch = (self.pitch - PITCH_STEP).max(-AXIS_LIMIT);
        } else {
            self.pitch = 0;
        }

        if input.roll_right {
            self.roll = (self.roll + ROLL_STEP).min(AXIS_LIMIT);
        } else if input.roll_left {
            self.roll = (self.roll - ROLL_STEP).max(-AXIS_LIMIT);
        } else {
            self.roll = 0;
        }

        TickOutcome {
            quit: input.quit,
            arm_toggled,
        }
    }

    pub fn frame(&self) -> CommandFrame {
        CommandFrame {
            armed: self.armed,
            throttle: self.throttle,
            pitch: self.pitch,
            roll: self.roll,
            yaw: self.yaw,
        }
    }
}
