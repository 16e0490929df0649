//! Fixed-timestep frame loop.
//!
//! The [`FrameLoop`] owns the physics world, the tile map and the hero's
//! motion state, and advances them one frame at a time in a fixed order:
//!
//! 1. The motion controller samples the current [`InputFrame`] and computes
//!    the tentative velocity.
//! 2. The collision resolver adjusts it against the contacts left by the
//!    previous physics step, using the body's post-step velocity for the
//!    low-speed test.
//! 3. The interaction detector schedules a push if the hero is walking into
//!    an object.
//! 4. The final velocity goes to the physics body and physics steps by
//!    `fixed_dt`.
//! 5. The tick counter advances, and every push whose delay has elapsed is
//!    executed: the map moves the object and its body is teleported onto the
//!    new tile.
//!
//! Simulation time is `tick_count * fixed_dt`, never an accumulated sum, so
//! delayed pushes fire on the same tick on every run.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tilewalk_motion::prelude::*;
use tracing::{trace, warn};

use crate::map::{tile_at, tile_center, TileMap};
use crate::physics::PhysicsWorld;
use crate::EngineError;

/// Id of the one character a frame loop drives.
pub const HERO: CharacterId = CharacterId(1);

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

/// Configuration for the frame loop and the physical size of things.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Fixed time step in seconds per frame. Must be positive and finite.
    pub fixed_dt: f64,
    /// Headless mode: no rendering, tick as fast as possible.
    pub headless: bool,
    /// Side of one tile in world units.
    pub tile_size: f64,
    /// Radius of the hero's collision circle.
    pub body_radius: f64,
}

impl Default for FrameConfig {
    /// 60 Hz, 16-unit tiles, a 5-unit hero, headless off.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            headless: false,
            tile_size: 16.0,
            body_radius: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// What happened during the last frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDiagnostics {
    /// Tick number the frame ran as.
    pub tick: u64,
    /// Contacts on the hero going into the frame.
    pub contacts: usize,
    pub outcome: ResolveOutcome,
    pub push: PushCheck,
    /// Pushes executed at the end of the frame.
    pub pushes_executed: usize,
    /// Time spent in the physics step.
    pub physics_time: Duration,
    /// Total time for the frame.
    pub total_time: Duration,
}

impl Default for FrameDiagnostics {
    fn default() -> Self {
        Self {
            tick: 0,
            contacts: 0,
            outcome: ResolveOutcome::Free,
            push: PushCheck::NotTouching,
            pushes_executed: 0,
            physics_time: Duration::ZERO,
            total_time: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// InputFrame
// ---------------------------------------------------------------------------

/// The buttons held during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputFrame {
    pub buttons: ButtonState,
}

impl InputFrame {
    pub fn pressed(buttons: &[Button]) -> Self {
        Self {
            buttons: ButtonState::pressed(buttons),
        }
    }

    /// True when no button is held.
    pub fn is_empty(&self) -> bool {
        self.buttons == ButtonState::default()
    }
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// The deterministic frame loop for one controlled hero on one map.
pub struct FrameLoop {
    config: FrameConfig,
    motion_config: MotionConfig,
    physics: PhysicsWorld,
    map: TileMap,
    hero: MotionState,
    hero_body: BodyId,
    controller: MotionController,
    resolver: CollisionResolver,
    detector: InteractionDetector,
    pushes: DelayedActionQueue<PushAction>,
    tick_counter: u64,
    current_input: InputFrame,
    movement_locked: bool,
    last_diagnostics: FrameDiagnostics,
}

impl FrameLoop {
    /// Build the physics world for `map` and place the hero on its spawn tile.
    ///
    /// # Errors
    ///
    /// Fails on an unusable `fixed_dt`, an invalid motion config, a map with
    /// no spawn tile, or a collision layer out of range.
    pub fn new(mut map: TileMap, config: FrameConfig, motion_config: MotionConfig) -> Result<Self, EngineError> {
        if !(config.fixed_dt > 0.0 && config.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidFixedDt { dt: config.fixed_dt });
        }
        motion_config.validate()?;
        let spawn = map.spawn().ok_or(EngineError::MissingSpawn)?;

        let mut physics = PhysicsWorld::new();
        let half = config.tile_size / 2.0;
        let half_extents = Vec2::new(half, half);
        let walls: Vec<TilePos> = map.walls().collect();
        for tile in walls {
            physics.add_wall(tile_center(tile, config.tile_size), half_extents);
        }
        let objects: Vec<(InteractableId, TilePos, u32)> = map
            .pushables()
            .map(|p| (p.id, p.tile, p.collision_layer))
            .collect();
        for (id, tile, layer) in objects {
            let body = physics.add_interactable(tile_center(tile, config.tile_size), half_extents, layer)?;
            map.attach_body(id, body)?;
        }
        let hero_body = physics.add_character(
            tile_center(spawn, config.tile_size),
            config.body_radius,
            map.collision_layer(),
        )?;

        Ok(Self {
            controller: MotionController::new(motion_config.clone()),
            resolver: CollisionResolver::new(&motion_config),
            detector: InteractionDetector::new(&motion_config),
            motion_config,
            physics,
            map,
            hero: MotionState::new(HERO, Direction::Down),
            hero_body,
            pushes: DelayedActionQueue::new(),
            tick_counter: 0,
            current_input: InputFrame::default(),
            movement_locked: false,
            last_diagnostics: FrameDiagnostics::default(),
            config,
        })
    }

    /// Execute one frame and return its diagnostics.
    pub fn tick(&mut self) -> Result<FrameDiagnostics, EngineError> {
        let frame_start = Instant::now();
        let tick = self.tick_counter;
        let now = self.sim_time();
        let body = self.hero_body;

        self.controller
            .update(&mut self.hero, &self.current_input.buttons, tick, self.movement_locked);

        let contacts = self.physics.contacts();
        let normals = normals_for(&contacts, body);
        let body_velocity = self.physics.velocity(body)?;
        let outcome = self
            .resolver
            .resolve(&mut self.hero, &normals, body_velocity, self.map.world());

        let ctx = InteractionContext {
            body,
            tile: tile_at(self.physics.position(body)?, self.config.tile_size),
            collision_layer: self.map.collision_layer(),
            now,
        };
        let push = self
            .detector
            .detect(&mut self.hero, &contacts, &ctx, &self.map, &self.map, &mut self.pushes);

        self.physics.set_velocity(body, self.hero.velocity())?;
        let physics_start = Instant::now();
        self.physics.step(self.config.fixed_dt);
        let physics_time = physics_start.elapsed();

        self.tick_counter += 1;
        let pushes_executed = self.run_due_pushes()?;

        trace!(
            tick,
            contacts = normals.len(),
            ?outcome,
            ?push,
            vx = self.hero.velocity().x,
            vy = self.hero.velocity().y,
            "frame"
        );

        self.last_diagnostics = FrameDiagnostics {
            tick,
            contacts: normals.len(),
            outcome,
            push,
            pushes_executed,
            physics_time,
            total_time: frame_start.elapsed(),
        };
        Ok(self.last_diagnostics.clone())
    }

    fn run_due_pushes(&mut self) -> Result<usize, EngineError> {
        let now = self.sim_time();
        let mut executed = 0;
        for fired in self.pushes.drain_due(now) {
            if fired.owner != self.hero.id() {
                warn!(owner = %fired.owner, "delayed push for unknown character dropped");
                continue;
            }
            let Some(tile) = self
                .detector
                .execute_push(&mut self.hero, fired.handle, &fired.action, &mut self.map)
            else {
                continue;
            };
            if let Some(object_body) = self.map.pushable(fired.action.interactable).and_then(|p| p.body) {
                self.physics
                    .set_translation(object_body, tile_center(tile, self.config.tile_size))?;
            }
            executed += 1;
        }
        Ok(executed)
    }

    /// Run `count` frames. Returns the number of pushes executed.
    pub fn run_ticks(&mut self, count: u64) -> Result<usize, EngineError> {
        let mut pushes = 0;
        for _ in 0..count {
            pushes += self.tick()?.pushes_executed;
        }
        Ok(pushes)
    }

    // -- hero controls -------------------------------------------------------

    /// Freeze speed-factor updates while a tile event runs.
    pub fn set_movement_locked(&mut self, locked: bool) {
        self.movement_locked = locked;
    }

    pub fn is_movement_locked(&self) -> bool {
        self.movement_locked
    }

    /// Enter or leave climbing.
    pub fn set_climbing(&mut self, climbing: bool) {
        self.hero.set_climbing(climbing);
    }

    /// Move the hero (and the map's notion of the current layer) onto another
    /// collision layer.
    pub fn set_collision_layer(&mut self, layer: u32) -> Result<(), EngineError> {
        self.physics.set_layer(self.hero_body, layer)?;
        self.map.set_collision_layer(layer);
        Ok(())
    }

    // -- accessors -----------------------------------------------------------

    /// The number of frames executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulation time in seconds, computed as `tick_count * fixed_dt`.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn motion_config(&self) -> &MotionConfig {
        &self.motion_config
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn hero(&self) -> &MotionState {
        &self.hero
    }

    /// Motion state of `id`. Only the hero has one.
    pub fn state_of(&self, id: CharacterId) -> Result<&MotionState, EngineError> {
        if id == self.hero.id() {
            Ok(&self.hero)
        } else {
            Err(MotionError::UnknownCharacter { id }.into())
        }
    }

    pub fn hero_body(&self) -> BodyId {
        self.hero_body
    }

    pub fn hero_position(&self) -> Vec2 {
        self.physics.position(self.hero_body).unwrap_or_default()
    }

    pub fn hero_velocity(&self) -> Vec2 {
        self.physics.velocity(self.hero_body).unwrap_or_default()
    }

    pub fn hero_tile(&self) -> TilePos {
        tile_at(self.hero_position(), self.config.tile_size)
    }

    /// Pushes scheduled but not yet executed.
    pub fn pending_pushes(&self) -> usize {
        self.pushes.len()
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    /// Set the input for the next frames.
    pub fn set_input(&mut self, input: InputFrame) {
        self.current_input = input;
    }

    pub fn current_input(&self) -> &InputFrame {
        &self.current_input
    }

    pub fn is_headless(&self) -> bool {
        self.config.headless
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
