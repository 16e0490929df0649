//! rapier2d physics adapter.
//!
//! The [`PhysicsWorld`] owns a rapier2d simulation with zero gravity and
//! exposes it in the terms the motion core speaks: [`BodyId`]s, screen-space
//! [`Vec2`]s (x right, y down) and [`Contact`]s. It creates three kinds of
//! bodies:
//!
//! - **Characters**: dynamic balls with locked rotation and no friction, so
//!   their velocity is whatever the motion core last set, minus what the
//!   solver removed against obstacles.
//! - **Walls**: fixed cuboids that collide with every layer.
//! - **Interactables**: fixed cuboids on one collision layer, moved only by
//!   teleporting them after a push.
//!
//! # Collision layers
//!
//! Layer `n` maps onto rapier interaction group bit `n`. A character belongs
//! to its layer and filters nothing; an interactable belongs to and filters
//! its own layer, so a character only touches interactables on its layer.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Bodies are created in a
//! fixed order, and [`PhysicsWorld::contacts`] sorts its output by body id,
//! so the same sequence of calls gives the same contacts on every run.

use std::collections::{BTreeMap, HashMap};

use rapier2d::prelude::*;
use tilewalk_motion::direction::Vec2;
use tilewalk_motion::interaction::{BodyId, Contact};
use tracing::debug;

use crate::EngineError;

/// Layer bodies are created on when a map does not say otherwise.
pub const DEFAULT_COLLISION_LAYER: u32 = 0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn layer_group(layer: u32) -> Result<Group, EngineError> {
    1u32.checked_shl(layer)
        .map(Group::from_bits_truncate)
        .ok_or(EngineError::InvalidLayer { layer })
}

fn to_rapier(v: Vec2) -> Vector<Real> {
    vector![v.x as Real, v.y as Real]
}

fn from_rapier(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x as f64, v.y as f64)
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// rapier2d simulation state plus the id mapping between bodies and handles.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// BodyId -> (rigid body, its single collider).
    bodies: BTreeMap<BodyId, (RigidBodyHandle, ColliderHandle)>,
    /// Collider -> BodyId for contact lookup.
    collider_to_body: HashMap<ColliderHandle, BodyId>,
    next_body: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// An empty world with zero gravity (top-down view).
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: BTreeMap::new(),
            collider_to_body: HashMap::new(),
            next_body: 1,
        }
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;

        let body_handle = self.rigid_body_set.insert(body);
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
        self.bodies.insert(id, (body_handle, collider_handle));
        self.collider_to_body.insert(collider_handle, id);
        id
    }

    /// Add a controlled character: a dynamic ball centred on `position`.
    pub fn add_character(&mut self, position: Vec2, radius: f64, layer: u32) -> Result<BodyId, EngineError> {
        let groups = InteractionGroups::new(layer_group(layer)?, Group::ALL);
        let body = RigidBodyBuilder::dynamic()
            .translation(to_rapier(position))
            .lock_rotations()
            .linear_damping(0.0)
            .can_sleep(false)
            .build();
        let collider = ColliderBuilder::ball(radius as Real)
            .friction(0.0)
            .restitution(0.0)
            .collision_groups(groups)
            .build();
        let id = self.insert(body, collider);
        debug!(body = %id, x = position.x, y = position.y, layer, "character body added");
        Ok(id)
    }

    /// Add an immovable wall that collides with every layer.
    pub fn add_wall(&mut self, center: Vec2, half_extents: Vec2) -> BodyId {
        let body = RigidBodyBuilder::fixed().translation(to_rapier(center)).build();
        let collider = ColliderBuilder::cuboid(half_extents.x as Real, half_extents.y as Real)
            .friction(0.0)
            .collision_groups(InteractionGroups::all())
            .build();
        self.insert(body, collider)
    }

    /// Add an interactable object on `layer`.
    pub fn add_interactable(&mut self, center: Vec2, half_extents: Vec2, layer: u32) -> Result<BodyId, EngineError> {
        let group = layer_group(layer)?;
        let body = RigidBodyBuilder::fixed().translation(to_rapier(center)).build();
        let collider = ColliderBuilder::cuboid(half_extents.x as Real, half_extents.y as Real)
            .friction(0.0)
            .collision_groups(InteractionGroups::new(group, group))
            .build();
        Ok(self.insert(body, collider))
    }

    /// Remove a body and its collider.
    pub fn remove_body(&mut self, id: BodyId) -> Result<(), EngineError> {
        let (body_handle, collider_handle) = self
            .bodies
            .remove(&id)
            .ok_or(EngineError::UnknownBody { id })?;
        self.collider_to_body.remove(&collider_handle);
        self.rigid_body_set.remove(
            body_handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        Ok(())
    }

    fn handles(&self, id: BodyId) -> Result<(RigidBodyHandle, ColliderHandle), EngineError> {
        self.bodies
            .get(&id)
            .copied()
            .ok_or(EngineError::UnknownBody { id })
    }

    fn rigid_body(&self, id: BodyId) -> Result<&RigidBody, EngineError> {
        let (handle, _) = self.handles(id)?;
        self.rigid_body_set
            .get(handle)
            .ok_or(EngineError::UnknownBody { id })
    }

    fn rigid_body_mut(&mut self, id: BodyId) -> Result<&mut RigidBody, EngineError> {
        let (handle, _) = self.handles(id)?;
        self.rigid_body_set
            .get_mut(handle)
            .ok_or(EngineError::UnknownBody { id })
    }

    /// Move a character onto another collision layer.
    pub fn set_layer(&mut self, id: BodyId, layer: u32) -> Result<(), EngineError> {
        let groups = InteractionGroups::new(layer_group(layer)?, Group::ALL);
        let (_, collider_handle) = self.handles(id)?;
        let collider = self
            .collider_set
            .get_mut(collider_handle)
            .ok_or(EngineError::UnknownBody { id })?;
        collider.set_collision_groups(groups);
        Ok(())
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) -> Result<(), EngineError> {
        self.rigid_body_mut(id)?.set_linvel(to_rapier(velocity), true);
        Ok(())
    }

    /// Teleport a body.
    pub fn set_translation(&mut self, id: BodyId, position: Vec2) -> Result<(), EngineError> {
        self.rigid_body_mut(id)?
            .set_translation(to_rapier(position), true);
        Ok(())
    }

    /// Linear velocity after the last step.
    pub fn velocity(&self, id: BodyId) -> Result<Vec2, EngineError> {
        Ok(from_rapier(self.rigid_body(id)?.linvel()))
    }

    pub fn position(&self, id: BodyId) -> Result<Vec2, EngineError> {
        Ok(from_rapier(self.rigid_body(id)?.translation()))
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.integration_params.dt = dt as Real;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None, // query pipeline (unused)
            &(),  // physics hooks
            &(),  // events
        );
    }

    /// Touching contacts from the last step, one per contact manifold.
    ///
    /// Each normal points from `body_a` toward `body_b`. The list is sorted by
    /// `(body_a, body_b)`.
    pub fn contacts(&self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let (Some(&body_a), Some(&body_b)) = (
                self.collider_to_body.get(&pair.collider1),
                self.collider_to_body.get(&pair.collider2),
            ) else {
                continue;
            };
            for manifold in &pair.manifolds {
                if manifold.points.is_empty() {
                    continue;
                }
                contacts.push(Contact {
                    body_a,
                    body_b,
                    normal: from_rapier(&manifold.data.normal),
                });
            }
        }
        contacts.sort_by(|a, b| {
            (a.body_a, a.body_b)
                .cmp(&(b.body_a, b.body_b))
                .then(a.normal.x.total_cmp(&b.normal.x))
                .then(a.normal.y.total_cmp(&b.normal.y))
        });
        contacts
    }

    pub fn has_body(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Number of bodies currently registered.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
