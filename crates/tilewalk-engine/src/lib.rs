//! Tilewalk Engine -- fixed-timestep frame driver for tile-based characters.
//!
//! This crate builds on [`tilewalk_motion`] and runs it against a rapier2d
//! physics world and an in-memory tile map. Each frame the [`FrameLoop`]
//! samples the input frame, runs the motion controller, resolves the contacts
//! from the previous physics step, looks for pushes, hands the final velocity
//! to physics and steps it, then executes any push whose delay has elapsed.
//!
//! # Quick Start
//!
//! ```
//! use tilewalk_engine::prelude::*;
//!
//! let map = TileMap::from_ascii(
//!     "#####\n\
//!      #@..#\n\
//!      #####",
//! )
//! .unwrap();
//! let mut frames = FrameLoop::new(map, FrameConfig::default(), MotionConfig::default()).unwrap();
//!
//! frames.set_input(InputFrame::pressed(&[Button::Right]));
//! frames.run_ticks(30).unwrap();
//!
//! assert_eq!(frames.tick_count(), 30);
//! assert!(frames.hero_position().x > 24.0);
//! ```
//!
//! [`FrameLoop`]: tick::FrameLoop

#![deny(unsafe_code)]

pub mod map;
pub mod physics;
pub mod replay;
pub mod snapshot;
pub mod tick;

/// Re-export the motion crate for convenience.
pub use tilewalk_motion;

use tilewalk_motion::interaction::{BodyId, TilePos};
use tilewalk_motion::MotionError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A body id that the physics world does not know.
    #[error("{id} is not registered with the physics world")]
    UnknownBody {
        id: BodyId,
    },

    /// The frame loop was configured with an unusable time step.
    #[error("fixed_dt must be positive and finite, got {dt}")]
    InvalidFixedDt {
        dt: f64,
    },

    /// Collision layers map onto 32 interaction groups.
    #[error("collision layer {layer} is out of range (0..32)")]
    InvalidLayer {
        layer: u32,
    },

    /// A map description could not be parsed.
    #[error("bad map tile '{found}' at line {line}, column {column}")]
    MapParse {
        line: usize,
        column: usize,
        found: char,
    },

    /// The map has no hero spawn tile.
    #[error("map has no spawn tile ('@')")]
    MissingSpawn,

    /// A tile outside the map bounds.
    #[error("tile ({}, {}) is outside the map", tile.x, tile.y)]
    OutOfBounds {
        tile: TilePos,
    },

    /// An error from the motion core.
    #[error(transparent)]
    Motion(#[from] MotionError),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `warn`.
///
/// Meant for binaries and demos. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Everything from the motion prelude.
    pub use tilewalk_motion::prelude::*;

    pub use crate::map::{tile_at, tile_center, Pushable, TileMap};
    pub use crate::physics::{PhysicsWorld, DEFAULT_COLLISION_LAYER};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::snapshot::FrameSnapshot;
    pub use crate::tick::{FrameConfig, FrameDiagnostics, FrameLoop, InputFrame};
    pub use crate::{init_tracing, EngineError};
}
