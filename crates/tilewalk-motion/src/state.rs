//! Per-character motion state.
//!
//! A [`MotionState`] is created with its character and dropped with it. Its
//! fields are only written by the controller, the collision resolver and the
//! interaction detector; everything outside this crate gets read access
//! through the getters, plus [`MotionState::set_climbing`] for climb events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::direction::{Direction, Vec2};
use crate::scheduler::TimerHandle;

// ---------------------------------------------------------------------------
// CharacterId
// ---------------------------------------------------------------------------

/// Stable identity of a controlled character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u64);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "char#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CharacterAction
// ---------------------------------------------------------------------------

/// What the character is doing this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CharacterAction {
    #[default]
    Idle,
    Walk,
    Dash,
    Climb,
}

impl CharacterAction {
    /// Walking, dashing and climbing are movement actions; only these get
    /// collision response.
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            CharacterAction::Walk | CharacterAction::Dash | CharacterAction::Climb
        )
    }

    /// Only a walking or dashing character can push objects.
    pub fn can_push(self) -> bool {
        matches!(self, CharacterAction::Walk | CharacterAction::Dash)
    }
}

// ---------------------------------------------------------------------------
// MotionState
// ---------------------------------------------------------------------------

/// The mutable motion record of one controlled character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub(crate) id: CharacterId,
    /// Facing. Trails `desired_direction` by at most one octant per gated frame.
    pub(crate) current_direction: Direction,
    /// Direction motion resolved to on the last frame with movement.
    pub(crate) desired_direction: Direction,
    /// Direction requested by the arrows this frame.
    pub(crate) required_direction: Option<Direction>,
    pub(crate) x_speed: f64,
    pub(crate) y_speed: f64,
    pub(crate) action: CharacterAction,
    pub(crate) climbing: bool,
    pub(crate) idle_climbing: bool,
    pub(crate) dashing: bool,
    pub(crate) force_direction: bool,
    pub(crate) stop_by_colliding: bool,
    pub(crate) force_diagonal_speed: Vec2,
    /// Velocity computed this frame; after resolution it is the final one.
    pub(crate) velocity: Vec2,
    pub(crate) trying_to_push: bool,
    pub(crate) trying_to_push_direction: Option<Direction>,
    pub(crate) push_timer: Option<TimerHandle>,
}

impl MotionState {
    /// A character standing still, facing `facing`.
    pub fn new(id: CharacterId, facing: Direction) -> Self {
        Self {
            id,
            current_direction: facing,
            desired_direction: facing,
            required_direction: None,
            x_speed: 0.0,
            y_speed: 0.0,
            action: CharacterAction::Idle,
            climbing: false,
            idle_climbing: false,
            dashing: false,
            force_direction: false,
            stop_by_colliding: false,
            force_diagonal_speed: Vec2::ZERO,
            velocity: Vec2::ZERO,
            trying_to_push: false,
            trying_to_push_direction: None,
            push_timer: None,
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn current_direction(&self) -> Direction {
        self.current_direction
    }

    pub fn desired_direction(&self) -> Direction {
        self.desired_direction
    }

    pub fn required_direction(&self) -> Option<Direction> {
        self.required_direction
    }

    /// Speed factors `(x_speed, y_speed)` before scaling by the action speed.
    pub fn speed_factors(&self) -> Vec2 {
        Vec2::new(self.x_speed, self.y_speed)
    }

    pub fn action(&self) -> CharacterAction {
        self.action
    }

    pub fn is_climbing(&self) -> bool {
        self.climbing
    }

    pub fn is_idle_climbing(&self) -> bool {
        self.idle_climbing
    }

    pub fn is_dashing(&self) -> bool {
        self.dashing
    }

    /// True while a wall slide overrides the arrows.
    pub fn force_direction(&self) -> bool {
        self.force_direction
    }

    pub fn stop_by_colliding(&self) -> bool {
        self.stop_by_colliding
    }

    pub fn force_diagonal_speed(&self) -> Vec2 {
        self.force_diagonal_speed
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn trying_to_push(&self) -> bool {
        self.trying_to_push
    }

    pub fn trying_to_push_direction(&self) -> Option<Direction> {
        self.trying_to_push_direction
    }

    /// Handle of the pending push, if one is scheduled.
    pub fn push_timer(&self) -> Option<TimerHandle> {
        self.push_timer
    }

    /// Enter or leave climbing. Called by climb tile events.
    pub fn set_climbing(&mut self, climbing: bool) {
        self.climbing = climbing;
        if !climbing {
            self.idle_climbing = false;
        }
    }

    pub(crate) fn set_speed_factors(&mut self, speed: Vec2) {
        self.x_speed = speed.x;
        self.y_speed = speed.y;
    }
}
