//! Cooperative one-shot delayed actions, keyed by character.
//!
//! The [`DelayedActionQueue`] never runs anything by itself. The frame loop
//! calls [`DelayedActionQueue::drain_due`] at a frame boundary and executes
//! whatever is returned, so a delayed action can never preempt a frame.
//!
//! Every scheduled action carries a [`CancellationToken`]. Cancelling the
//! token (directly, or through [`DelayedActionQueue::cancel`]) keeps the
//! action from ever being returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::CharacterId;

/// Slack for comparing a due time against the simulation clock, which is
/// computed as `tick * dt` and may land a hair short of the exact due time.
const DUE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// TimerHandle / CancellationToken
// ---------------------------------------------------------------------------

/// Identifies one scheduled action. Handles are never reused by a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// Shared flag that suppresses a scheduled action once set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// DelayedActionQueue
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingAction<A> {
    handle: TimerHandle,
    owner: CharacterId,
    due: f64,
    token: CancellationToken,
    action: A,
}

/// An action whose due time has been reached.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredAction<A> {
    pub handle: TimerHandle,
    pub owner: CharacterId,
    pub action: A,
}

/// Queue of one-shot actions waiting for their due time.
#[derive(Debug)]
pub struct DelayedActionQueue<A> {
    pending: Vec<PendingAction<A>>,
    next_handle: u64,
}

impl<A> Default for DelayedActionQueue<A> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<A> DelayedActionQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` for `owner` to fire `delay` seconds after `now`.
    pub fn schedule(&mut self, owner: CharacterId, now: f64, delay: f64, action: A) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let due = now + delay.max(0.0);
        debug!(handle = handle.0, %owner, due, "delayed action scheduled");
        self.pending.push(PendingAction {
            handle,
            owner,
            due,
            token: CancellationToken::new(),
            action,
        });
        handle
    }

    /// The cancellation token of a pending action.
    pub fn token(&self, handle: TimerHandle) -> Option<CancellationToken> {
        self.pending
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| p.token.clone())
    }

    /// Cancel a pending action. Returns `false` if the handle is unknown or
    /// already fired.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(index) = self.pending.iter().position(|p| p.handle == handle) else {
            return false;
        };
        let removed = self.pending.remove(index);
        removed.token.cancel();
        debug!(handle = handle.0, owner = %removed.owner, "delayed action cancelled");
        true
    }

    /// Cancel everything pending for `owner`. Returns how many were cancelled.
    pub fn cancel_owner(&mut self, owner: CharacterId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| {
            if p.owner == owner {
                p.token.cancel();
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    /// Whether `owner` has a live (not cancelled) pending action.
    pub fn has_pending(&self, owner: CharacterId) -> bool {
        self.pending
            .iter()
            .any(|p| p.owner == owner && !p.token.is_cancelled())
    }

    /// Number of entries still queued, including ones whose token was
    /// cancelled externally but not yet drained.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every action due at `now`, ordered by due time then
    /// handle. Actions whose token was cancelled are dropped silently.
    pub fn drain_due(&mut self, now: f64) -> Vec<FiredAction<A>> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            let entry = &self.pending[index];
            if entry.token.is_cancelled() {
                self.pending.remove(index);
            } else if entry.due <= now + DUE_EPSILON {
                due.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.cmp(&b.handle)));
        due.into_iter()
            .map(|p| FiredAction {
                handle: p.handle,
                owner: p.owner,
                action: p.action,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERO: CharacterId = CharacterId(1);
    const NPC: CharacterId = CharacterId(2);

    #[test]
    fn action_fires_only_after_delay() {
        let mut queue = DelayedActionQueue::new();
        let handle = queue.schedule(HERO, 1.0, 0.25, "push");

        assert!(queue.drain_due(1.1).is_empty());
        assert!(queue.has_pending(HERO));

        let fired = queue.drain_due(1.25);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].handle, handle);
        assert_eq!(fired[0].owner, HERO);
        assert_eq!(fired[0].action, "push");
        assert!(queue.is_empty());
    }

    #[test]
    fn accumulated_tick_time_reaches_due_time() {
        let mut queue = DelayedActionQueue::new();
        queue.schedule(HERO, 0.0, 0.25, ());
        let dt = 1.0 / 60.0;
        let fired_at = (1..=30u64)
            .find(|tick| !queue.drain_due(*tick as f64 * dt).is_empty())
            .unwrap();
        assert_eq!(fired_at, 15);
    }

    #[test]
    fn handles_are_unique() {
        let mut queue = DelayedActionQueue::new();
        let a = queue.schedule(HERO, 0.0, 1.0, ());
        let b = queue.schedule(NPC, 0.0, 1.0, ());
        assert_ne!(a, b);
    }

    #[test]
    fn cancel_removes_action_and_trips_token() {
        let mut queue = DelayedActionQueue::new();
        let handle = queue.schedule(HERO, 0.0, 0.1, ());
        let token = queue.token(handle).unwrap();

        assert!(queue.cancel(handle));
        assert!(token.is_cancelled());
        assert!(!queue.cancel(handle));
        assert!(queue.drain_due(10.0).is_empty());
    }

    #[test]
    fn externally_cancelled_token_suppresses_action() {
        let mut queue = DelayedActionQueue::new();
        let handle = queue.schedule(HERO, 0.0, 0.1, ());
        queue.token(handle).unwrap().cancel();

        assert!(!queue.has_pending(HERO));
        assert!(queue.drain_due(10.0).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_owner_leaves_other_characters_alone() {
        let mut queue = DelayedActionQueue::new();
        queue.schedule(HERO, 0.0, 0.1, 1);
        queue.schedule(HERO, 0.0, 0.2, 2);
        queue.schedule(NPC, 0.0, 0.1, 3);

        assert_eq!(queue.cancel_owner(HERO), 2);
        let fired = queue.drain_due(1.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].owner, NPC);
    }

    #[test]
    fn drained_actions_are_ordered_by_due_time() {
        let mut queue = DelayedActionQueue::new();
        queue.schedule(HERO, 0.0, 0.3, "late");
        queue.schedule(NPC, 0.0, 0.1, "early");
        let fired: Vec<_> = queue.drain_due(1.0).into_iter().map(|f| f.action).collect();
        assert_eq!(fired, vec!["early", "late"]);
    }
}
