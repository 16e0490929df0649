//! Tilewalk Motion -- movement and collision response for tile-based characters.
//!
//! This crate turns held directional buttons into an eight-way direction and a
//! velocity, reacts to contacts reported by a physics engine (stopping against
//! walls at low speed, sliding along a wall when pressing diagonally into it),
//! and schedules delayed pushes against interactable objects. It knows nothing
//! about the physics engine itself; the `tilewalk-engine` crate supplies one.
//!
//! # Quick Start
//!
//! ```
//! use tilewalk_motion::prelude::*;
//!
//! let config = MotionConfig::default();
//! let controller = MotionController::new(config.clone());
//! let resolver = CollisionResolver::new(&config);
//!
//! let mut hero = MotionState::new(CharacterId(1), Direction::Down);
//! let held = ButtonState::pressed(&[Button::Right, Button::Up]);
//! controller.update(&mut hero, &held, 0, false);
//!
//! // Pressing up-right into a wall on the right slides the hero upward.
//! let wall = [ContactNormal::new(1.0, 0.0)];
//! let body_velocity = hero.velocity();
//! let outcome = resolver.resolve(&mut hero, &wall, body_velocity, WorldKind::Ordinary);
//! assert_eq!(
//!     outcome,
//!     ResolveOutcome::Sliding { wall: Direction::Right, direction: Direction::Up }
//! );
//! assert!(hero.force_direction());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod direction;
pub mod interaction;
pub mod resolver;
pub mod scheduler;
pub mod state;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by motion operations.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    /// A configuration value is out of range.
    #[error("invalid motion config: '{field}' {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// Configuration text could not be parsed.
    #[error("failed to parse motion config: {details}")]
    ConfigParse {
        details: String,
    },

    /// An interactable id that the registry does not know.
    #[error("interactable {id} does not exist on this map")]
    UnknownInteractable {
        id: interaction::InteractableId,
    },

    /// The object cannot move onto the next tile in that direction.
    #[error("interactable {id} cannot be pushed {direction:?}")]
    PushBlocked {
        id: interaction::InteractableId,
        direction: direction::Direction,
    },

    /// A character id with no motion state.
    #[error("character {id} has no motion state")]
    UnknownCharacter {
        id: state::CharacterId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{MotionConfig, WorldKind};
    pub use crate::controller::{Button, ButtonState, MotionController};
    pub use crate::direction::{Direction, InputMask, Vec2};
    pub use crate::interaction::{
        normals_for, BodyId, ClimbFeature, Contact, InteractableId, InteractableInfo,
        InteractableRegistry, InteractionContext, InteractionDetector, PushAction, PushCheck,
        TileEventLookup, TilePos,
    };
    pub use crate::resolver::{CollisionResolver, ContactNormal, ResolveOutcome};
    pub use crate::scheduler::{CancellationToken, DelayedActionQueue, FiredAction, TimerHandle};
    pub use crate::state::{CharacterAction, CharacterId, MotionState};
    pub use crate::MotionError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn frame(
        controller: &MotionController,
        resolver: &CollisionResolver,
        state: &mut MotionState,
        buttons: &ButtonState,
        normals: &[ContactNormal],
        frame: u64,
    ) -> ResolveOutcome {
        controller.update(state, buttons, frame, false);
        let body_velocity = state.velocity();
        resolver.resolve(state, normals, body_velocity, WorldKind::Ordinary)
    }

    #[test]
    fn slide_persists_until_contact_is_lost() {
        let config = MotionConfig::default();
        let controller = MotionController::new(config.clone());
        let resolver = CollisionResolver::new(&config);
        let mut hero = MotionState::new(CharacterId(1), Direction::Right);
        let held = ButtonState::pressed(&[Button::Right, Button::Up]);
        let wall = [ContactNormal::new(1.0, 0.0)];

        frame(&controller, &resolver, &mut hero, &held, &wall, 0);
        assert!(hero.force_direction());

        // Next frame the forced direction drives the speed factors.
        frame(&controller, &resolver, &mut hero, &held, &wall, 1);
        assert_eq!(hero.speed_factors(), Vec2::new(0.0, -1.0));
        assert_eq!(hero.velocity(), Vec2::new(0.0, -60.0));

        // Contact gone: the override is released and the arrows win again.
        let outcome = frame(&controller, &resolver, &mut hero, &held, &[], 2);
        assert_eq!(outcome, ResolveOutcome::Free);
        assert!(!hero.force_direction());
        frame(&controller, &resolver, &mut hero, &held, &[], 3);
        assert_eq!(hero.desired_direction(), Direction::UpRight);
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = MotionError::UnknownInteractable {
            id: InteractableId(3),
        };
        assert_eq!(err.to_string(), "interactable interactable#3 does not exist on this map");

        let err = MotionError::UnknownCharacter { id: CharacterId(2) };
        assert!(err.to_string().contains("char#2"));
    }
}
