//! Property tests for the motion pipeline.
//!
//! Random inputs, contact sets and body velocities are pushed through the
//! controller and resolver; the invariants below must hold for every frame.

use proptest::prelude::*;
use tilewalk_motion::direction;
use tilewalk_motion::prelude::*;

fn buttons_strategy() -> impl Strategy<Value = ButtonState> {
    (0u8..16, any::<bool>()).prop_map(|(mask, dash)| {
        let mut buttons = ButtonState::default();
        buttons.set(Button::Right, mask & 1 != 0);
        buttons.set(Button::Left, mask & 2 != 0);
        buttons.set(Button::Up, mask & 4 != 0);
        buttons.set(Button::Down, mask & 8 != 0);
        buttons.set(Button::B, dash);
        buttons
    })
}

/// Unit normals at an arbitrary angle.
fn normal_strategy() -> impl Strategy<Value = ContactNormal> {
    (0u32..3600).prop_map(|tenths| {
        let angle = (tenths as f64 / 10.0).to_radians();
        ContactNormal::new(angle.cos(), -angle.sin())
    })
}

fn velocity_strategy() -> impl Strategy<Value = Vec2> {
    (-1000i32..1000, -1000i32..1000).prop_map(|(x, y)| Vec2::new(x as f64 * 0.1, y as f64 * 0.1))
}

fn world_strategy() -> impl Strategy<Value = WorldKind> {
    prop_oneof![Just(WorldKind::Ordinary), Just(WorldKind::Overworld)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn mask_quantization_is_total(bits in 0u8..=255) {
        let mask = InputMask::from_bits(bits);
        match direction::from_input_mask(mask) {
            Some(d) => prop_assert!((d.unit_velocity().length() - 1.0).abs() < 1e-12),
            None => {
                let b = mask.bits();
                let contradictory = (b & 3 == 3) || (b & 12 == 12) || b == 0;
                prop_assert!(contradictory, "mask {b} has no direction");
            }
        }
    }

    #[test]
    fn range_360_stays_in_range(angle in -100_000.0f64..100_000.0) {
        let wrapped = direction::range_360(angle);
        prop_assert!((0.0..360.0).contains(&wrapped));
    }

    #[test]
    fn angles_near_an_octant_quantize_to_it(index in 0i64..8, jitter in -14.0f64..14.0) {
        let d = Direction::from_index(index);
        let centre = direction::screen_angle(d.unit_velocity());
        prop_assert_eq!(direction::from_angle(centre + jitter), d);
    }

    #[test]
    fn controller_speed_is_zero_walk_or_dash(
        inputs in prop::collection::vec(buttons_strategy(), 1..40),
    ) {
        let config = MotionConfig::default();
        let controller = MotionController::new(config.clone());
        let mut state = MotionState::new(CharacterId(1), Direction::Down);

        for (frame, buttons) in inputs.iter().enumerate() {
            let v = controller.update(&mut state, buttons, frame as u64, false);
            let speed = v.length();
            let expected = match state.action() {
                CharacterAction::Idle => 0.0,
                CharacterAction::Walk => config.walk_speed,
                CharacterAction::Dash => config.dash_speed,
                CharacterAction::Climb => config.climb_speed,
            };
            prop_assert!((speed - expected).abs() < 1e-9, "speed {speed} vs {expected}");
        }
    }

    #[test]
    fn force_and_stop_are_never_both_set(
        frames in prop::collection::vec(
            (
                buttons_strategy(),
                prop::collection::vec(normal_strategy(), 0..4),
                velocity_strategy(),
                world_strategy(),
            ),
            1..40,
        ),
    ) {
        let config = MotionConfig::default();
        let controller = MotionController::new(config.clone());
        let resolver = CollisionResolver::new(&config);
        let mut state = MotionState::new(CharacterId(1), Direction::Down);

        for (frame, (buttons, normals, body_velocity, world)) in frames.iter().enumerate() {
            controller.update(&mut state, buttons, frame as u64, false);
            let outcome = resolver.resolve(&mut state, normals, *body_velocity, *world);

            prop_assert!(!(state.force_direction() && state.stop_by_colliding()));
            if normals.is_empty() {
                prop_assert_eq!(outcome, ResolveOutcome::Free);
                prop_assert!(!state.force_direction());
            }
            if outcome == ResolveOutcome::Stopped {
                prop_assert_eq!(state.velocity(), Vec2::ZERO);
                prop_assert!(state.stop_by_colliding());
            }
            if let ResolveOutcome::Sliding { direction, .. } = outcome {
                prop_assert!(state.force_direction());
                prop_assert_eq!(state.desired_direction(), direction);
            }
        }
    }

    #[test]
    fn facing_never_jumps_more_than_one_octant(
        inputs in prop::collection::vec(buttons_strategy(), 1..60),
    ) {
        let controller = MotionController::new(MotionConfig::default());
        let mut state = MotionState::new(CharacterId(1), Direction::Down);

        for (frame, buttons) in inputs.iter().enumerate() {
            let before = state.current_direction();
            controller.update(&mut state, buttons, frame as u64, false);
            let offset = state.current_direction().offset_from(before);
            prop_assert!(offset == 0 || offset == 1 || offset == 7);
        }
    }

    #[test]
    fn slide_vector_is_tangent_and_points_along_slide(
        normal in normal_strategy(),
        upward in any::<bool>(),
        rightward in any::<bool>(),
    ) {
        let slide = match (upward, rightward) {
            (true, true) => Direction::UpRight,
            (true, false) => Direction::UpLeft,
            (false, true) => Direction::DownRight,
            (false, false) => Direction::DownLeft,
        };
        let v = tilewalk_motion::resolver::slide_velocity(normal.0, slide);
        let dot = v.x * normal.0.x + v.y * normal.0.y;
        prop_assert!(dot.abs() < 1e-9);
        prop_assert!((v.length() - 1.0).abs() < 1e-9);
        if normal.0.x.abs() > 1e-9 {
            // Off vertical walls the tangent always leans into the slide's
            // half of the screen.
            prop_assert_eq!(v.y < 0.0, upward);
        }
    }
}
