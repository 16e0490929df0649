//! Tuning values for the motion core.
//!
//! [`MotionConfig`] is plain data: it can be built in code, deserialized from
//! JSON (missing fields fall back to the defaults), and validated with
//! [`MotionConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::MotionError;

// ---------------------------------------------------------------------------
// WorldKind
// ---------------------------------------------------------------------------

/// The kind of map the character is on. Overworld maps move at a different
/// rate, so they use a smaller stop threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorldKind {
    /// Towns, dungeons and every other regular map.
    #[default]
    Ordinary,
    /// The overworld map.
    Overworld,
}

// ---------------------------------------------------------------------------
// MotionConfig
// ---------------------------------------------------------------------------

/// Tuning for the controller, resolver and interaction detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Walking speed in world units per second.
    pub walk_speed: f64,
    /// Dashing speed in world units per second.
    pub dash_speed: f64,
    /// Climbing speed in world units per second.
    pub climb_speed: f64,
    /// Normal components with magnitude below this snap to 0, and above
    /// `1 - slope_tolerance` snap to +-1.
    pub slope_tolerance: f64,
    /// Body speed (per axis) under which contacts stop the character on
    /// ordinary maps.
    pub stop_speed: f64,
    /// Same as `stop_speed`, for the overworld.
    pub stop_speed_overworld: f64,
    /// Half-width in degrees of the cone around the movement angle in which a
    /// contact counts as "straight ahead".
    pub contact_angle_tolerance: f64,
    /// Seconds between the first qualifying push contact and the push.
    pub push_delay: f64,
    /// The facing advances one octant every this many frames.
    pub turn_frame_interval: u64,
    /// Cancel a pending push when contact with the object is lost.
    pub cancel_push_on_release: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            walk_speed: 60.0,
            dash_speed: 90.0,
            climb_speed: 30.0,
            slope_tolerance: 0.1,
            stop_speed: 13.0,
            stop_speed_overworld: 9.0,
            contact_angle_tolerance: 15.0,
            push_delay: 0.25,
            turn_frame_interval: 2,
            cancel_push_on_release: false,
        }
    }
}

impl MotionConfig {
    /// Parse a config from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, MotionError> {
        let config: MotionConfig = serde_json::from_str(json).map_err(|e| MotionError::ConfigParse {
            details: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Stop threshold for the given kind of map.
    pub fn stop_speed_for(&self, world: WorldKind) -> f64 {
        match world {
            WorldKind::Ordinary => self.stop_speed,
            WorldKind::Overworld => self.stop_speed_overworld,
        }
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<(), MotionError> {
        let speeds = [
            ("walk_speed", self.walk_speed),
            ("dash_speed", self.dash_speed),
            ("climb_speed", self.climb_speed),
            ("stop_speed", self.stop_speed),
            ("stop_speed_overworld", self.stop_speed_overworld),
            ("push_delay", self.push_delay),
        ];
        for (field, value) in speeds {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MotionError::InvalidConfig {
                    field,
                    reason: format!("must be finite and non-negative, got {value}"),
                });
            }
        }
        if !(self.slope_tolerance >= 0.0 && self.slope_tolerance < 0.5) {
            return Err(MotionError::InvalidConfig {
                field: "slope_tolerance",
                reason: format!("must be in [0, 0.5), got {}", self.slope_tolerance),
            });
        }
        if !(self.contact_angle_tolerance >= 0.0 && self.contact_angle_tolerance <= 180.0) {
            return Err(MotionError::InvalidConfig {
                field: "contact_angle_tolerance",
                reason: format!("must be in [0, 180], got {}", self.contact_angle_tolerance),
            });
        }
        if self.turn_frame_interval == 0 {
            return Err(MotionError::InvalidConfig {
                field: "turn_frame_interval",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MotionConfig::default().validate().is_ok());
    }

    #[test]
    fn stop_speed_depends_on_world() {
        let config = MotionConfig::default();
        assert_eq!(config.stop_speed_for(WorldKind::Ordinary), 13.0);
        assert_eq!(config.stop_speed_for(WorldKind::Overworld), 9.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = MotionConfig::from_json_str(r#"{"walk_speed": 75.0}"#).unwrap();
        assert_eq!(config.walk_speed, 75.0);
        assert_eq!(config.dash_speed, 90.0);
        assert!(!config.cancel_push_on_release);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = MotionConfig::from_json_str("{ walk_speed: }").unwrap_err();
        assert!(matches!(err, MotionError::ConfigParse { .. }));
    }

    #[test]
    fn negative_speed_is_rejected() {
        let err = MotionConfig::from_json_str(r#"{"dash_speed": -1.0}"#).unwrap_err();
        assert!(
            matches!(err, MotionError::InvalidConfig { field: "dash_speed", .. }),
            "got {err}"
        );
    }

    #[test]
    fn zero_turn_interval_is_rejected() {
        let config = MotionConfig {
            turn_frame_interval: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_slope_tolerance_is_rejected() {
        let config = MotionConfig {
            slope_tolerance: 0.7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
