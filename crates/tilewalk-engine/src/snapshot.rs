//! Frame snapshots with BLAKE3 hashing.
//!
//! A [`FrameSnapshot`] captures everything that decides how the next frames
//! play out: the tick counter and dt, the hero's motion state, its body's
//! position and velocity, every pushable object's tile, and the input frame.
//! The BLAKE3 digest of that data is the frame loop's state hash, used by
//! the replay checker to compare runs.
//!
//! ```
//! use tilewalk_engine::prelude::*;
//!
//! let map = TileMap::from_ascii("#####\n#@.B#\n#####").unwrap();
//! let mut frames = FrameLoop::new(map, FrameConfig::default(), MotionConfig::default()).unwrap();
//! frames.run_ticks(10).unwrap();
//!
//! let snapshot = frames.capture_snapshot();
//! assert_eq!(snapshot.tick_counter, 10);
//! assert_eq!(snapshot.hash.len(), 64); // BLAKE3 hex digest
//! assert!(snapshot.verify().is_ok());
//! ```
//!
//! # What Is NOT Captured
//!
//! - **Physics internals** (rapier contact caches, solver warm-start data).
//!   Snapshots are for comparing runs, not for restoring one; replay always
//!   starts from a freshly built frame loop.
//! - **Pending pushes** are reflected only through the hero's `push_timer`.
//! - **Diagnostics** (per-frame timing is transient).

use serde::{Deserialize, Serialize};
use tilewalk_motion::prelude::*;

use crate::tick::{FrameLoop, InputFrame};

// ---------------------------------------------------------------------------
// FrameSnapshot
// ---------------------------------------------------------------------------

/// Serializable capture of the frame loop's deterministic state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Frames executed at the time of capture.
    pub tick_counter: u64,
    pub fixed_dt: f64,
    pub hero: MotionState,
    pub hero_position: Vec2,
    pub hero_velocity: Vec2,
    /// Tile of every pushable object, in id order.
    pub objects: Vec<(InteractableId, TilePos)>,
    pub collision_layer: u32,
    pub current_input: InputFrame,
    /// BLAKE3 hex digest (64 lowercase hex chars) of everything above.
    pub hash: String,
}

#[derive(Serialize)]
struct HashableState<'a> {
    tick_counter: u64,
    fixed_dt: f64,
    hero: &'a MotionState,
    hero_position: Vec2,
    hero_velocity: Vec2,
    objects: &'a [(InteractableId, TilePos)],
    collision_layer: u32,
    current_input: &'a InputFrame,
}

impl HashableState<'_> {
    fn hash(&self) -> String {
        let json_bytes =
            serde_json::to_vec(self).expect("frame state should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}

impl FrameSnapshot {
    fn hashable(&self) -> HashableState<'_> {
        HashableState {
            tick_counter: self.tick_counter,
            fixed_dt: self.fixed_dt,
            hero: &self.hero,
            hero_position: self.hero_position,
            hero_velocity: self.hero_velocity,
            objects: &self.objects,
            collision_layer: self.collision_layer,
            current_input: &self.current_input,
        }
    }

    /// Check that `hash` matches the captured data.
    pub fn verify(&self) -> Result<(), anyhow::Error> {
        let recomputed = self.hashable().hash();
        if recomputed != self.hash {
            return Err(anyhow::anyhow!(
                "snapshot hash mismatch: recorded {} but recomputed {}. \
                 The snapshot may be corrupted or tampered with.",
                self.hash,
                recomputed
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FrameLoop snapshot methods
// ---------------------------------------------------------------------------

impl FrameLoop {
    fn objects(&self) -> Vec<(InteractableId, TilePos)> {
        self.map().pushables().map(|p| (p.id, p.tile)).collect()
    }

    /// Capture the current state and its hash.
    pub fn capture_snapshot(&self) -> FrameSnapshot {
        let mut snapshot = FrameSnapshot {
            tick_counter: self.tick_count(),
            fixed_dt: self.fixed_dt(),
            hero: self.hero().clone(),
            hero_position: self.hero_position(),
            hero_velocity: self.hero_velocity(),
            objects: self.objects(),
            collision_layer: self.map().collision_layer(),
            current_input: *self.current_input(),
            hash: String::new(),
        };
        snapshot.hash = snapshot.hashable().hash();
        snapshot
    }

    /// The BLAKE3 state hash, equal to `capture_snapshot().hash`.
    pub fn state_hash(&self) -> String {
        let objects = self.objects();
        HashableState {
            tick_counter: self.tick_count(),
            fixed_dt: self.fixed_dt(),
            hero: self.hero(),
            hero_position: self.hero_position(),
            hero_velocity: self.hero_velocity(),
            objects: &objects,
            collision_layer: self.map().collision_layer(),
            current_input: self.current_input(),
        }
        .hash()
    }
}
