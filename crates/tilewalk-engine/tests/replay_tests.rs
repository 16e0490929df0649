//! Integration tests for recording and replaying runs that include wall
//! slides and delayed pushes.

use tilewalk_engine::prelude::*;

const MAP: &str = "
    #########
    #.......#
    #@..B...#
    #.......#
    #########
";

fn build() -> FrameLoop {
    let map = TileMap::from_ascii(MAP).unwrap();
    FrameLoop::new(map, FrameConfig::default(), MotionConfig::default()).unwrap()
}

fn script(tick: u64) -> InputFrame {
    match tick {
        0..=59 => InputFrame::pressed(&[Button::Right]),
        60..=79 => InputFrame::pressed(&[Button::Up, Button::Left]),
        80..=89 => InputFrame::default(),
        _ => InputFrame::pressed(&[Button::Down, Button::Right, Button::B]),
    }
}

fn record(ticks: u64) -> (ReplayLog, usize) {
    let mut frames = build();
    let mut recorder = ReplayRecorder::new(frames.capture_snapshot(), 5);
    let mut pushes = 0;
    for tick in 0..ticks {
        let input = script(tick);
        frames.set_input(input);
        recorder.record_tick(frames.tick_count(), &input, Some(frames.state_hash()));
        pushes += frames.tick().unwrap().pushes_executed;
    }
    (recorder.finish(), pushes)
}

#[test]
fn run_with_a_push_replays_identically() {
    let (log, pushes) = record(150);
    assert!(pushes >= 1, "the script should push the boulder at least once");

    let result = replay(&mut build(), &log).unwrap();
    assert!(result.completed);
    assert_eq!(result.ticks_replayed, 150);
    assert!(result.first_divergence.is_none());
}

#[test]
fn replay_from_json_matches() {
    let (log, _) = record(100);
    let json = serde_json::to_string_pretty(&log).unwrap();
    let restored: ReplayLog = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.total_ticks, 100);
    assert_eq!(restored.entries.len(), log.entries.len());
    assert_eq!(restored.initial_snapshot.hash, log.initial_snapshot.hash);

    let result = replay(&mut build(), &restored).unwrap();
    assert!(result.completed);
}

#[test]
fn replay_on_different_map_fails_up_front() {
    let (log, _) = record(20);
    let other = TileMap::from_ascii("#####\n#.@.#\n#####").unwrap();
    let mut frames = FrameLoop::new(other, FrameConfig::default(), MotionConfig::default()).unwrap();

    let err = replay(&mut frames, &log).unwrap_err();
    assert!(err.to_string().contains("does not start in the recorded state"));
    assert_eq!(frames.tick_count(), 0);
}

#[test]
fn tampered_checkpoint_is_the_first_divergence() {
    let (mut log, _) = record(40);
    for entry in &mut log.entries {
        if let ReplayEntry::Checkpoint { tick: 25, state_hash } = entry {
            *state_hash = "0".repeat(64);
        }
    }

    let result = replay(&mut build(), &log).unwrap();
    assert!(!result.completed);
    assert_eq!(result.ticks_replayed, 25);
    let divergence = result.first_divergence.unwrap();
    assert_eq!(divergence.tick, 25);
    assert_eq!(divergence.expected_hash, "0".repeat(64));
}
