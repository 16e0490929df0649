//! Input sampling and the per-frame desired velocity.
//!
//! Each frame the [`MotionController`]:
//!
//! 1. Samples the six logical buttons into an [`InputMask`] and quantizes it
//!    into `required_direction` (B held means dashing).
//! 2. Computes the speed factors. Climbing restricts motion to the four
//!    axes; otherwise the arrows (or a wall slide in progress) pick a row of
//!    the unit-velocity table, with the slide override replacing diagonal rows.
//! 3. Turns the facing one octant toward the motion direction, on gated
//!    frames only.
//! 4. Picks the action and scales the speed factors into the tentative
//!    velocity that the collision resolver will adjust.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::MotionConfig;
use crate::direction::{self, InputMask, Vec2};
use crate::state::{CharacterAction, MotionState};

// ---------------------------------------------------------------------------
// ButtonState
// ---------------------------------------------------------------------------

/// The six logical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    /// Confirm / interact.
    A,
    /// Cancel / dash.
    B,
}

/// Instantaneous pressed state of every logical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ButtonState {
    pub right: bool,
    pub left: bool,
    pub up: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
}

impl ButtonState {
    /// A state with exactly the given buttons held.
    pub fn pressed(buttons: &[Button]) -> Self {
        let mut state = Self::default();
        for &button in buttons {
            state.set(button, true);
        }
        state
    }

    pub fn set(&mut self, button: Button, down: bool) {
        match button {
            Button::Right => self.right = down,
            Button::Left => self.left = down,
            Button::Up => self.up = down,
            Button::Down => self.down = down,
            Button::A => self.a = down,
            Button::B => self.b = down,
        }
    }

    pub fn is_down(&self, button: Button) -> bool {
        match button {
            Button::Right => self.right,
            Button::Left => self.left,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::A => self.a,
            Button::B => self.b,
        }
    }

    /// The arrow buttons packed into a 4-bit mask.
    pub fn arrow_mask(&self) -> InputMask {
        let bits = u8::from(self.right)
            | u8::from(self.left) << 1
            | u8::from(self.up) << 2
            | u8::from(self.down) << 3;
        InputMask::from_bits(bits)
    }
}

// ---------------------------------------------------------------------------
// MotionController
// ---------------------------------------------------------------------------

/// Turns input into speed factors, facing, action and tentative velocity.
#[derive(Debug, Clone)]
pub struct MotionController {
    config: MotionConfig,
}

impl MotionController {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Run the whole controller step for one frame and return the tentative
    /// velocity (also stored in the state).
    ///
    /// While `movement_locked` is set (a tile event is running) the speed
    /// factors from the previous frame are kept as they are.
    pub fn update(
        &self,
        state: &mut MotionState,
        buttons: &ButtonState,
        frame: u64,
        movement_locked: bool,
    ) -> Vec2 {
        self.sample_input(state, buttons);
        if !movement_locked {
            self.update_speed_factors(state, frame);
        }
        self.select_action(state);
        self.apply_speed(state)
    }

    /// Quantize the arrows into `required_direction` and read the dash button.
    pub fn sample_input(&self, state: &mut MotionState, buttons: &ButtonState) {
        state.required_direction = direction::from_input_mask(buttons.arrow_mask());
        state.dashing = buttons.b;
    }

    /// Compute `x_speed`/`y_speed` from the required direction, or from the
    /// wall slide while `force_direction` is set.
    pub fn update_speed_factors(&self, state: &mut MotionState, frame: u64) {
        if state.climbing {
            self.update_climbing(state);
            return;
        }

        let direction = if state.force_direction {
            Some(state.desired_direction)
        } else {
            state.required_direction
        };

        let Some(direction) = direction else {
            state.set_speed_factors(Vec2::ZERO);
            return;
        };

        state.desired_direction = direction;
        if self.is_turn_frame(frame) {
            state.current_direction = state.current_direction.step_toward(direction);
        }

        let speed = if state.force_direction && direction.is_diagonal() {
            state.force_diagonal_speed
        } else {
            direction.unit_velocity()
        };
        trace!(
            character = %state.id,
            ?direction,
            forced = state.force_direction,
            x = speed.x,
            y = speed.y,
            "speed factors"
        );
        state.set_speed_factors(speed);
    }

    fn update_climbing(&self, state: &mut MotionState) {
        match state.required_direction {
            None => {
                state.set_speed_factors(Vec2::ZERO);
                state.idle_climbing = true;
            }
            Some(required) => {
                let direction = required.cardinal_component();
                state.desired_direction = direction;
                state.current_direction = direction;
                state.idle_climbing = false;
                state.set_speed_factors(direction.unit_velocity());
            }
        }
    }

    fn is_turn_frame(&self, frame: u64) -> bool {
        let interval = self.config.turn_frame_interval.max(1);
        (frame + 1) % interval == 0
    }

    /// Choose the action from the climbing flag, speed factors and dash button.
    pub fn select_action(&self, state: &mut MotionState) {
        state.action = if state.climbing {
            CharacterAction::Climb
        } else if state.x_speed == 0.0 && state.y_speed == 0.0 {
            CharacterAction::Idle
        } else if state.dashing {
            CharacterAction::Dash
        } else {
            CharacterAction::Walk
        };
    }

    /// Scale the speed factors by the action speed.
    pub fn apply_speed(&self, state: &mut MotionState) -> Vec2 {
        let speed = match state.action {
            CharacterAction::Idle => 0.0,
            CharacterAction::Walk => self.config.walk_speed,
            CharacterAction::Dash => self.config.dash_speed,
            CharacterAction::Climb => self.config.climb_speed,
        };
        state.velocity = state.speed_factors() * speed;
        state.velocity
    }
}
