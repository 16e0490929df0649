//! Collision response: stop, slide, or keep going.
//!
//! The [`CollisionResolver`] reads the contact normals the physics adapter
//! reported for the controlled body and reshapes the motion state:
//!
//! - **At rest against something.** When the body is barely moving on both
//!   axes, any contact lying within the angle tolerance of the movement
//!   direction zeroes the velocity and sets `stop_by_colliding`. This keeps
//!   repeated micro-collisions from making the character jitter in place.
//! - **Pressing diagonally into a wall.** With a single contact, the normal
//!   is quantized into a wall-facing octant. If the arrows point exactly one
//!   octant off that facing, the resolver forces the adjacent direction that
//!   runs along the wall (`wall +- 2`). When that direction is diagonal the
//!   slide velocity comes from the contact normal rotated by 90 degrees, so
//!   the character hugs slanted walls instead of using the table diagonal.
//! - **Climbing** bypasses both.
//!
//! Normals point from the controlled body toward whatever it touched, in
//! screen space (y grows down). A wall on the right therefore reports
//! `(1, 0)`.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{MotionConfig, WorldKind};
use crate::direction::{self, Direction, Vec2};
use crate::state::{CharacterAction, MotionState};

// ---------------------------------------------------------------------------
// ContactNormal
// ---------------------------------------------------------------------------

/// Unit normal of one contact point on the controlled body, pointing away
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactNormal(pub Vec2);

impl ContactNormal {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Vec2::new(x, y))
    }

    /// Snap shallow and steep components onto the axes: magnitudes below
    /// `tolerance` become 0, magnitudes above `1 - tolerance` become +-1.
    pub fn cleaned(self, tolerance: f64) -> Vec2 {
        Vec2::new(snap(self.0.x, tolerance), snap(self.0.y, tolerance))
    }
}

fn snap(component: f64, tolerance: f64) -> f64 {
    if component.abs() < tolerance {
        0.0
    } else if component.abs() > 1.0 - tolerance {
        component.signum()
    } else {
        component
    }
}

// ---------------------------------------------------------------------------
// ResolveOutcome
// ---------------------------------------------------------------------------

/// What the resolver decided this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResolveOutcome {
    /// No contacts, or the action is not a movement action.
    Free,
    /// Climbing; contacts are ignored.
    Climbing,
    /// Barely moving and a contact lies straight ahead: velocity zeroed.
    Stopped,
    /// Barely moving but no contact lies ahead: velocity untouched.
    Grazing,
    /// Pressing one octant off a wall: the slide direction is forced.
    Sliding {
        wall: Direction,
        direction: Direction,
    },
    /// Moving with contacts that do not trigger a slide.
    Unforced,
}

// ---------------------------------------------------------------------------
// CollisionResolver
// ---------------------------------------------------------------------------

/// Stateless collision-response policy; all state lives in [`MotionState`].
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    config: MotionConfig,
}

impl CollisionResolver {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Resolve this frame's contacts against the state's tentative velocity.
    ///
    /// `body_velocity` is the velocity the physics engine left the body with
    /// after its last step. It only decides whether the body counts as
    /// "barely moving"; the movement angle and any zeroing apply to the
    /// tentative velocity in `state`, which becomes the final velocity.
    pub fn resolve(
        &self,
        state: &mut MotionState,
        normals: &[ContactNormal],
        body_velocity: Vec2,
        world: WorldKind,
    ) -> ResolveOutcome {
        if normals.is_empty() || !state.action.is_movement() {
            self.release(state);
            return ResolveOutcome::Free;
        }

        if state.action == CharacterAction::Climb || state.climbing {
            state.stop_by_colliding = false;
            return ResolveOutcome::Climbing;
        }

        let cleaned: Vec<Vec2> = normals
            .iter()
            .map(|n| n.cleaned(self.config.slope_tolerance))
            .collect();

        let limit = self.config.stop_speed_for(world);
        if body_velocity.x.abs() < limit && body_velocity.y.abs() < limit {
            return self.resolve_low_speed(state, &cleaned);
        }

        state.stop_by_colliding = false;
        match cleaned.as_slice() {
            [normal] => self.resolve_single_contact(state, *normal),
            _ => {
                self.clear_force(state);
                ResolveOutcome::Unforced
            }
        }
    }

    fn resolve_low_speed(&self, state: &mut MotionState, cleaned: &[Vec2]) -> ResolveOutcome {
        let movement_angle = direction::screen_angle(state.velocity);
        let blocked = cleaned.iter().any(|normal| {
            direction::angle_delta(direction::screen_angle(*normal), movement_angle)
                <= self.config.contact_angle_tolerance
        });

        self.clear_force(state);
        if blocked {
            trace!(character = %state.id, movement_angle, "stopped by contact");
            state.velocity = Vec2::ZERO;
            state.stop_by_colliding = true;
            ResolveOutcome::Stopped
        } else {
            state.stop_by_colliding = false;
            ResolveOutcome::Grazing
        }
    }

    fn resolve_single_contact(&self, state: &mut MotionState, normal: Vec2) -> ResolveOutcome {
        let wall = direction::from_angle(direction::screen_angle(normal));
        let Some(required) = state.required_direction else {
            self.clear_force(state);
            return ResolveOutcome::Unforced;
        };

        let signed = match required.offset_from(wall) {
            1 => 1,
            7 => -1,
            _ => {
                self.clear_force(state);
                return ResolveOutcome::Unforced;
            }
        };

        let slide = wall.rotate(2 * signed);
        if slide.is_diagonal() {
            state.force_diagonal_speed = slide_velocity(normal, slide);
        }
        if !state.force_direction {
            debug!(character = %state.id, ?wall, ?slide, "wall slide started");
        }
        state.force_direction = true;
        state.desired_direction = slide;
        ResolveOutcome::Sliding {
            wall,
            direction: slide,
        }
    }

    fn clear_force(&self, state: &mut MotionState) {
        if state.force_direction {
            debug!(character = %state.id, "wall slide ended");
        }
        state.force_direction = false;
    }

    fn release(&self, state: &mut MotionState) {
        self.clear_force(state);
        state.stop_by_colliding = false;
    }
}

/// Rotate the wall normal by 90 degrees so it runs along the surface toward
/// the half of the screen (upper or lower) that `slide` points into.
pub fn slide_velocity(normal: Vec2, slide: Direction) -> Vec2 {
    let counter_clockwise = if slide.is_upward() {
        normal.x <= 0.0
    } else {
        normal.x > 0.0
    };
    if counter_clockwise {
        Vec2::new(-normal.y, normal.x)
    } else {
        Vec2::new(normal.y, -normal.x)
    }
}
