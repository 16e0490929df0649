//! Push detection against interactable objects.
//!
//! The [`InteractionDetector`] scans the frame's contacts for ones between
//! the controlled body and a registered interactable on the same collision
//! layer. A walking or dashing character touching one is "trying to push";
//! the first such contact with no push already pending schedules a single
//! delayed push one tile in the direction of motion, provided no active climb
//! feature at the character's tile is enterable from that direction and the
//! object accepts the destination tile.
//!
//! Per character the detector is a two-state machine: idle, or a push
//! pending (a [`TimerHandle`] is set). Scheduling is blocked while a handle
//! is set; [`InteractionDetector::finish_push`] returns to idle once the
//! frame loop has executed the fired push.
//!
//! The world is reached only through [`TileEventLookup`] and
//! [`InteractableRegistry`]. Missing or malformed data never fails a frame;
//! it just means the push is not allowed.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::MotionConfig;
use crate::direction::{Direction, Vec2};
use crate::resolver::ContactNormal;
use crate::scheduler::{DelayedActionQueue, TimerHandle};
use crate::state::{CharacterId, MotionState};
use crate::MotionError;

// ---------------------------------------------------------------------------
// Ids and tiles
// ---------------------------------------------------------------------------

/// Identity of a physics body as the physics adapter reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Identity of an interactable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractableId(pub u32);

impl fmt::Display for InteractableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interactable#{}", self.0)
    }
}

/// A tile coordinate (y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring tile in a cardinal direction. Diagonals have none.
    pub fn step(self, direction: Direction) -> Option<TilePos> {
        direction
            .tile_offset()
            .map(|(dx, dy)| TilePos::new(self.x + dx, self.y + dy))
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// One contact reported by the physics adapter for the current frame.
///
/// `normal` points from `body_a` toward `body_b`. Contacts are only valid for
/// the frame they were produced in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub normal: Vec2,
}

impl Contact {
    pub fn involves(&self, body: BodyId) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// The body on the other side from `body`, if `body` is part of it.
    pub fn other(&self, body: BodyId) -> Option<BodyId> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }

    /// The normal oriented away from `body`, if `body` is part of it.
    pub fn normal_for(&self, body: BodyId) -> Option<ContactNormal> {
        if self.body_a == body {
            Some(ContactNormal(self.normal))
        } else if self.body_b == body {
            Some(ContactNormal(-self.normal))
        } else {
            None
        }
    }
}

/// Normals of every contact on `body`, oriented away from it.
pub fn normals_for(contacts: &[Contact], body: BodyId) -> Vec<ContactNormal> {
    contacts.iter().filter_map(|c| c.normal_for(body)).collect()
}

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// A climbable feature (ladder, vine, staircase) on a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimbFeature {
    /// Inactive features are ignored.
    pub active: bool,
    /// Directions from which the feature can be entered.
    pub activation_directions: Vec<Direction>,
}

impl ClimbFeature {
    pub fn blocks_push(&self, direction: Direction) -> bool {
        self.active && self.activation_directions.contains(&direction)
    }
}

/// Tile event lookup.
pub trait TileEventLookup {
    /// Climb features on `tile`.
    fn climb_features_at(&self, tile: TilePos) -> Vec<ClimbFeature>;
}

/// What the detector needs to know about an interactable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractableInfo {
    pub id: InteractableId,
    pub body: BodyId,
    /// Current tile, or `None` if the object has no usable position.
    pub tile: Option<TilePos>,
    pub collision_layer: u32,
}

/// The set of interactable objects on the current map.
pub trait InteractableRegistry {
    fn interactables(&self) -> Vec<InteractableInfo>;

    /// Whether the object may move onto `destination`.
    fn position_allowed(&self, id: InteractableId, destination: TilePos) -> bool;

    /// Push the object one tile in `direction`. Returns its new tile.
    fn begin_push(&mut self, id: InteractableId, direction: Direction) -> Result<TilePos, MotionError>;
}

// ---------------------------------------------------------------------------
// PushAction / PushCheck
// ---------------------------------------------------------------------------

/// The push carried by a scheduled delayed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAction {
    pub character: CharacterId,
    pub interactable: InteractableId,
    pub direction: Direction,
    pub destination: TilePos,
}

/// Result of one detector pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushCheck {
    /// No qualifying contact this frame.
    NotTouching,
    /// A push was scheduled.
    Scheduled(TimerHandle),
    /// Touching, but a push is already pending.
    AlreadyPending(TimerHandle),
    /// A climb feature on the character's tile takes precedence.
    BlockedByClimbFeature,
    /// The object cannot move that way (diagonal facing, occupied or
    /// invalid destination, missing position).
    NotAllowed,
}

/// Per-frame context the detector reads.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext {
    /// The controlled character's body.
    pub body: BodyId,
    /// The tile the character stands on.
    pub tile: TilePos,
    /// The map's current collision layer.
    pub collision_layer: u32,
    /// Simulation time in seconds.
    pub now: f64,
}

// ---------------------------------------------------------------------------
// InteractionDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InteractionDetector {
    push_delay: f64,
    cancel_on_release: bool,
}

impl InteractionDetector {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            push_delay: config.push_delay,
            cancel_on_release: config.cancel_push_on_release,
        }
    }

    /// Inspect this frame's contacts and schedule a push if one qualifies.
    pub fn detect<T, R>(
        &self,
        state: &mut MotionState,
        contacts: &[Contact],
        ctx: &InteractionContext,
        tiles: &T,
        registry: &R,
        queue: &mut DelayedActionQueue<PushAction>,
    ) -> PushCheck
    where
        T: TileEventLookup + ?Sized,
        R: InteractableRegistry + ?Sized,
    {
        let interactables = registry.interactables();
        let mut touching = false;
        let mut check = PushCheck::NotTouching;

        for contact in contacts {
            let Some(other) = contact.other(ctx.body) else {
                continue;
            };
            let Some(info) = interactables.iter().find(|i| i.body == other) else {
                continue;
            };
            if !state.action.can_push() || info.collision_layer != ctx.collision_layer {
                continue;
            }

            touching = true;
            if let Some(handle) = state.push_timer {
                if !matches!(check, PushCheck::Scheduled(_)) {
                    check = PushCheck::AlreadyPending(handle);
                }
                continue;
            }
            check = self.try_schedule(state, info, ctx, tiles, registry, queue);
        }

        state.trying_to_push = touching;
        if !touching && self.cancel_on_release {
            if let Some(handle) = state.push_timer.take() {
                queue.cancel(handle);
                debug!(character = %state.id, handle = handle.0, "push cancelled on release");
            }
        }
        check
    }

    fn try_schedule<T, R>(
        &self,
        state: &mut MotionState,
        info: &InteractableInfo,
        ctx: &InteractionContext,
        tiles: &T,
        registry: &R,
        queue: &mut DelayedActionQueue<PushAction>,
    ) -> PushCheck
    where
        T: TileEventLookup + ?Sized,
        R: InteractableRegistry + ?Sized,
    {
        // The motion direction, not the facing: the facing lags a turn.
        let direction = state.desired_direction;
        state.trying_to_push_direction = Some(direction);

        if tiles
            .climb_features_at(ctx.tile)
            .iter()
            .any(|f| f.blocks_push(direction))
        {
            trace!(character = %state.id, ?direction, "push blocked by climb feature");
            return PushCheck::BlockedByClimbFeature;
        }

        let Some(tile) = info.tile else {
            warn!(interactable = %info.id, "interactable has no tile position; push not allowed");
            return PushCheck::NotAllowed;
        };
        let Some(destination) = tile.step(direction) else {
            return PushCheck::NotAllowed;
        };
        if !registry.position_allowed(info.id, destination) {
            return PushCheck::NotAllowed;
        }

        let handle = queue.schedule(
            state.id,
            ctx.now,
            self.push_delay,
            PushAction {
                character: state.id,
                interactable: info.id,
                direction,
                destination,
            },
        );
        state.push_timer = Some(handle);
        debug!(
            character = %state.id,
            interactable = %info.id,
            ?direction,
            handle = handle.0,
            "push scheduled"
        );
        PushCheck::Scheduled(handle)
    }

    /// Return to idle after the push for `handle` has been executed.
    pub fn finish_push(&self, state: &mut MotionState, handle: TimerHandle) {
        if state.push_timer == Some(handle) {
            state.push_timer = None;
        }
    }

    /// Execute a fired push against the registry and return to idle.
    ///
    /// Registry failures are logged and absorbed.
    pub fn execute_push<R>(
        &self,
        state: &mut MotionState,
        handle: TimerHandle,
        push: &PushAction,
        registry: &mut R,
    ) -> Option<TilePos>
    where
        R: InteractableRegistry + ?Sized,
    {
        let moved = match registry.begin_push(push.interactable, push.direction) {
            Ok(tile) => {
                debug!(
                    character = %push.character,
                    interactable = %push.interactable,
                    x = tile.x,
                    y = tile.y,
                    "push executed"
                );
                Some(tile)
            }
            Err(e) => {
                warn!(error = %e, interactable = %push.interactable, "push failed");
                None
            }
        };
        self.finish_push(state, handle);
        moved
    }
}
