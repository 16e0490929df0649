//! Headless corridor demo -- walk into a wall, slide along it, push a boulder.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example corridor_walk -p tilewalk-engine
//!
//! The script is fixed, so every run prints the same final state hash.

use tilewalk_engine::prelude::*;

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

const MAP: &str = "
    ############
    #..........#
    #@....B....#
    #..........#
    ############
";

/// (frames, buttons held)
const SCRIPT: &[(u64, &[Button])] = &[
    (90, &[Button::Right]),
    (30, &[Button::Up, Button::Right]),
    (20, &[]),
    (40, &[Button::Down, Button::Left, Button::B]),
    (60, &[Button::Left]),
];

fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let map = TileMap::from_ascii(MAP)?;
    let config = FrameConfig {
        headless: true,
        ..Default::default()
    };
    let mut frames = FrameLoop::new(map, config, MotionConfig::default())?;
    let mut recorder = ReplayRecorder::new(frames.capture_snapshot(), 30);

    for &(count, buttons) in SCRIPT {
        let input = InputFrame::pressed(buttons);
        frames.set_input(input);
        for _ in 0..count {
            recorder.record_tick(frames.tick_count(), &input, Some(frames.state_hash()));
            let diag = frames.tick()?;
            if diag.pushes_executed > 0 {
                tracing::info!(tick = diag.tick, "boulder pushed");
            }
        }
        let hero = frames.hero();
        let p = frames.hero_position();
        println!(
            "after {buttons:?}: tick {} at ({:.1}, {:.1}) facing {:?}, {:?}, last outcome {:?}",
            frames.tick_count(),
            p.x,
            p.y,
            hero.current_direction(),
            hero.action(),
            frames.last_diagnostics().outcome,
        );
    }

    for pushable in frames.map().pushables() {
        println!("{} ends on tile ({}, {})", pushable.id, pushable.tile.x, pushable.tile.y);
    }
    println!("final state hash: {}", frames.state_hash());

    let log = recorder.finish();
    let mut check = FrameLoop::new(TileMap::from_ascii(MAP)?, frames.config().clone(), MotionConfig::default())?;
    let result = replay(&mut check, &log)?;
    println!(
        "replay: {} frames, {}",
        result.ticks_replayed,
        if result.first_divergence.is_none() {
            "deterministic"
        } else {
            "DIVERGED"
        }
    );
    Ok(())
}
