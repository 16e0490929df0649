//! Input recording and determinism checking.
//!
//! A [`ReplayRecorder`] records the [`InputFrame`] of every frame plus
//! periodic state-hash checkpoints into a [`ReplayLog`]. [`replay`] feeds
//! the recorded inputs into a freshly built [`FrameLoop`] and compares the
//! state hash at each checkpoint, reporting the first divergence.
//!
//! Physics state cannot be restored from a snapshot, so replay never
//! rewinds: the frame loop it is given must be built from the same map and
//! configs as the recorded one and must not have run yet. Its state hash is
//! checked against the log's initial snapshot before anything runs.
//!
//! # Recording
//!
//! ```
//! use tilewalk_engine::prelude::*;
//!
//! let build = || {
//!     let map = TileMap::from_ascii("######\n#@...#\n######").unwrap();
//!     FrameLoop::new(map, FrameConfig::default(), MotionConfig::default()).unwrap()
//! };
//!
//! let mut frames = build();
//! let mut recorder = ReplayRecorder::new(frames.capture_snapshot(), 10);
//! for tick in 0..60 {
//!     let input = if tick < 30 {
//!         InputFrame::pressed(&[Button::Right])
//!     } else {
//!         InputFrame::default()
//!     };
//!     frames.set_input(input);
//!     recorder.record_tick(frames.tick_count(), &input, Some(frames.state_hash()));
//!     frames.tick().unwrap();
//! }
//! let log = recorder.finish();
//!
//! let result = replay(&mut build(), &log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::snapshot::FrameSnapshot;
use crate::tick::{FrameLoop, InputFrame};

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// Initial snapshot plus the ordered inputs and checkpoints of a run.
///
/// Fully serializable to JSON for storage or regression fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    /// State at the start of recording.
    pub initial_snapshot: FrameSnapshot,
    /// Frames recorded. Replay runs exactly this many.
    pub total_ticks: u64,
    pub entries: Vec<ReplayEntry>,
}

// ---------------------------------------------------------------------------
// ReplayEntry
// ---------------------------------------------------------------------------

/// One entry of a [`ReplayLog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// Buttons held on `tick`. Frames with nothing held are not recorded.
    Input { tick: u64, input: InputFrame },
    /// State hash before `tick` ran, after its input was set.
    Checkpoint { tick: u64, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult / ReplayDivergence
// ---------------------------------------------------------------------------

/// Outcome of [`replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every recorded frame ran and every checkpoint matched.
    pub completed: bool,
    pub ticks_replayed: u64,
    /// The first checkpoint whose hash did not match.
    pub first_divergence: Option<ReplayDivergence>,
}

/// A checkpoint that did not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Builds a [`ReplayLog`] one frame at a time.
///
/// Call [`record_tick`](Self::record_tick) before each frame runs, with
/// strictly increasing tick numbers, then [`finish`](Self::finish).
pub struct ReplayRecorder {
    log: ReplayLog,
    /// Checkpoint every this many ticks. 0 means whenever a hash is given.
    checkpoint_interval: u64,
    ticks_recorded: u64,
    last_tick: Option<u64>,
}

impl ReplayRecorder {
    pub fn new(snapshot: FrameSnapshot, checkpoint_interval: u64) -> Self {
        Self {
            log: ReplayLog {
                initial_snapshot: snapshot,
                total_ticks: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            ticks_recorded: 0,
            last_tick: None,
        }
    }

    /// Record one frame before it runs.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not strictly greater than the previous one.
    pub fn record_tick(&mut self, tick: u64, input: &InputFrame, state_hash: Option<String>) {
        if let Some(prev) = self.last_tick {
            assert!(
                tick > prev,
                "ReplayRecorder::record_tick: tick {tick} is not strictly greater than previous tick {prev}"
            );
        }
        self.last_tick = Some(tick);
        self.ticks_recorded += 1;

        if !input.is_empty() {
            self.log.entries.push(ReplayEntry::Input { tick, input: *input });
        }

        if let Some(hash) = state_hash {
            let should_checkpoint =
                self.checkpoint_interval == 0 || tick % self.checkpoint_interval == 0;
            if should_checkpoint {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    tick,
                    state_hash: hash,
                });
            }
        }
    }

    pub fn finish(mut self) -> ReplayLog {
        self.log.total_ticks = self.ticks_recorded;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `frames`, checking every checkpoint.
///
/// Stops at the first divergence and reports it in the result.
///
/// # Errors
///
/// Fails, before running any frame, if the log is malformed (duplicate
/// entries, tick overflow, corrupted initial snapshot) or if `frames` does
/// not start in the log's initial state. A physics error while running a
/// frame is also returned.
pub fn replay(frames: &mut FrameLoop, log: &ReplayLog) -> Result<ReplayResult, anyhow::Error> {
    let mut input_map: BTreeMap<u64, InputFrame> = BTreeMap::new();
    let mut checkpoint_map: BTreeMap<u64, &str> = BTreeMap::new();

    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { tick, input } => {
                if input_map.insert(*tick, *input).is_some() {
                    return Err(anyhow::anyhow!(
                        "replay log contains duplicate Input entry at tick {tick}"
                    ));
                }
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                if checkpoint_map.insert(*tick, state_hash).is_some() {
                    return Err(anyhow::anyhow!(
                        "replay log contains duplicate Checkpoint entry at tick {tick}"
                    ));
                }
            }
        }
    }

    let start_tick = log.initial_snapshot.tick_counter;
    let end_tick = start_tick.checked_add(log.total_ticks).ok_or_else(|| {
        anyhow::anyhow!(
            "tick range overflow: start_tick ({start_tick}) + total_ticks ({}) exceeds u64::MAX",
            log.total_ticks
        )
    })?;

    log.initial_snapshot
        .verify()
        .context("replay log has a corrupted initial snapshot")?;
    let actual_start = frames.capture_snapshot();
    if actual_start.hash != log.initial_snapshot.hash {
        return Err(anyhow::anyhow!(
            "frame loop does not start in the recorded state: expected hash {} at tick {}, \
             got {} at tick {}",
            log.initial_snapshot.hash,
            start_tick,
            actual_start.hash,
            actual_start.tick_counter
        ));
    }

    let mut ticks_replayed = 0;
    for tick in start_tick..end_tick {
        // Input first: checkpoints were hashed after the input was set.
        frames.set_input(input_map.get(&tick).copied().unwrap_or_default());

        if let Some(&expected) = checkpoint_map.get(&tick) {
            let actual_hash = frames.state_hash();
            if actual_hash != expected {
                return Ok(ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: expected.to_owned(),
                        actual_hash,
                    }),
                });
            }
        }

        frames
            .tick()
            .with_context(|| format!("frame {tick} failed during replay"))?;
        ticks_replayed += 1;
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TileMap;
    use crate::tick::FrameConfig;
    use tilewalk_motion::prelude::*;

    fn build() -> FrameLoop {
        let map = TileMap::from_ascii("#######\n#@..B.#\n#.....#\n#######").unwrap();
        FrameLoop::new(map, FrameConfig::default(), MotionConfig::default()).unwrap()
    }

    fn script(tick: u64) -> InputFrame {
        match tick {
            0..=39 => InputFrame::pressed(&[Button::Right]),
            40..=59 => InputFrame::pressed(&[Button::Down, Button::B]),
            _ => InputFrame::default(),
        }
    }

    fn record(ticks: u64, interval: u64) -> ReplayLog {
        let mut frames = build();
        let mut recorder = ReplayRecorder::new(frames.capture_snapshot(), interval);
        for tick in 0..ticks {
            let input = script(tick);
            frames.set_input(input);
            recorder.record_tick(frames.tick_count(), &input, Some(frames.state_hash()));
            frames.tick().unwrap();
        }
        recorder.finish()
    }

    #[test]
    fn recorded_run_replays_cleanly() {
        let log = record(90, 10);
        assert_eq!(log.total_ticks, 90);
        // Inputs held for 60 frames, checkpoints at 0, 10, ..., 80.
        let inputs = log
            .entries
            .iter()
            .filter(|e| matches!(e, ReplayEntry::Input { .. }))
            .count();
        assert_eq!(inputs, 60);

        let result = replay(&mut build(), &log).unwrap();
        assert!(result.completed);
        assert_eq!(result.ticks_replayed, 90);
        assert!(result.first_divergence.is_none());
    }

    #[test]
    fn altered_input_is_reported_as_divergence() {
        let mut log = record(60, 0);
        for entry in &mut log.entries {
            if let ReplayEntry::Input { tick: 20, input } = entry {
                *input = InputFrame::pressed(&[Button::Up]);
            }
        }

        let result = replay(&mut build(), &log).unwrap();
        assert!(!result.completed);
        let divergence = result.first_divergence.unwrap();
        // The checkpoint at tick 20 is hashed after the altered input is set.
        assert_eq!(divergence.tick, 20);
        assert_ne!(divergence.expected_hash, divergence.actual_hash);
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let mut log = record(5, 1);
        log.entries.push(ReplayEntry::Checkpoint {
            tick: 0,
            state_hash: "x".to_owned(),
        });
        let err = replay(&mut build(), &log).unwrap_err();
        assert!(err.to_string().contains("duplicate Checkpoint"));
    }

    #[test]
    fn frame_loop_in_another_state_is_rejected() {
        let log = record(5, 1);
        let mut advanced = build();
        advanced.run_ticks(3).unwrap();
        let err = replay(&mut advanced, &log).unwrap_err();
        assert!(err.to_string().contains("does not start in the recorded state"));
        assert_eq!(advanced.tick_count(), 3);
    }

    #[test]
    fn empty_log_is_trivially_complete() {
        let log = ReplayRecorder::new(build().capture_snapshot(), 10).finish();
        let result = replay(&mut build(), &log).unwrap();
        assert!(result.completed);
        assert_eq!(result.ticks_replayed, 0);
    }

    #[test]
    fn log_survives_json() {
        let log = record(30, 5);
        let json = serde_json::to_string(&log).unwrap();
        let back: ReplayLog = serde_json::from_str(&json).unwrap();
        let result = replay(&mut build(), &back).unwrap();
        assert!(result.completed);
    }
}
