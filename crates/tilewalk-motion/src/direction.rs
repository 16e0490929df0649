//! Octant directions and the quantizers that produce them.
//!
//! Everything that turns continuous or bit-packed data into one of the eight
//! canonical facings lives here:
//!
//! - [`from_input_mask`] maps the 4-bit arrow mask to a direction through a
//!   fixed 16-entry table.
//! - [`from_angle`] bins an angle into 30-degree sectors (offset by 15
//!   degrees) and collapses the 12 sectors onto the 8 octants.
//! - [`screen_angle`] converts a Y-down vector into degrees in `[0, 360)`.
//!
//! Directions are numbered counter-clockwise starting at `Right = 0`, and all
//! index arithmetic is taken mod 8.

use std::ops::{Add, BitOr, Mul, Neg};

use serde::{Deserialize, Serialize};

/// Component length of a normalized diagonal (`1 / sqrt(2)`).
pub const INV_SQRT2: f64 = std::f64::consts::FRAC_1_SQRT_2;

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// A 2D vector in screen space (x grows right, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component (positive is down).
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the eight canonical facings.
///
/// The discriminant is the octant index. Indices increase counter-clockwise
/// on screen, so `rotate(1)` turns a quarter-octant "left" and `rotate(-1)`
/// turns "right".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Right = 0,
    UpRight = 1,
    Up = 2,
    UpLeft = 3,
    Left = 4,
    DownLeft = 5,
    Down = 6,
    DownRight = 7,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; 8] = [
        Direction::Right,
        Direction::UpRight,
        Direction::Up,
        Direction::UpLeft,
        Direction::Left,
        Direction::DownLeft,
        Direction::Down,
        Direction::DownRight,
    ];

    /// The octant index, `0..8`.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Build a direction from any integer, wrapping mod 8.
    pub fn from_index(index: i64) -> Direction {
        Self::ALL[index.rem_euclid(8) as usize]
    }

    /// Diagonals have odd indices.
    pub fn is_diagonal(self) -> bool {
        self.index() & 1 == 1
    }

    /// Whether this direction points into the upper half of the screen.
    pub fn is_upward(self) -> bool {
        matches!(self, Direction::UpRight | Direction::Up | Direction::UpLeft)
    }

    /// Rotate by `steps` octants (positive is counter-clockwise).
    pub fn rotate(self, steps: i64) -> Direction {
        Direction::from_index(self.index() as i64 + steps)
    }

    /// `(self - other) mod 8`.
    pub fn offset_from(self, other: Direction) -> u8 {
        (self.index() as i64 - other.index() as i64).rem_euclid(8) as u8
    }

    /// The non-diagonal component used while climbing: a diagonal collapses
    /// to the octant one index below it, cardinals are unchanged.
    pub fn cardinal_component(self) -> Direction {
        if self.is_diagonal() {
            self.rotate(-1)
        } else {
            self
        }
    }

    /// Advance one octant toward `target` along the shorter way round.
    ///
    /// When `target` is exactly opposite, the turn goes counter-clockwise.
    pub fn step_toward(self, target: Direction) -> Direction {
        match target.offset_from(self) {
            0 => self,
            1..=4 => self.rotate(1),
            _ => self.rotate(-1),
        }
    }

    /// Unit velocity for this direction from the fixed speed table.
    pub fn unit_velocity(self) -> Vec2 {
        UNIT_VELOCITY[self.index() as usize]
    }

    /// One-tile offset `(dx, dy)` for cardinal directions (y grows down).
    /// Diagonals have no tile offset.
    pub fn tile_offset(self) -> Option<(i32, i32)> {
        match self {
            Direction::Right => Some((1, 0)),
            Direction::Up => Some((0, -1)),
            Direction::Left => Some((-1, 0)),
            Direction::Down => Some((0, 1)),
            _ => None,
        }
    }
}

/// Unit velocities indexed by octant. Cardinals use one axis, diagonals use
/// `1 / sqrt(2)` on both axes so every entry has length 1.
const UNIT_VELOCITY: [Vec2; 8] = [
    Vec2::new(1.0, 0.0),
    Vec2::new(INV_SQRT2, -INV_SQRT2),
    Vec2::new(0.0, -1.0),
    Vec2::new(-INV_SQRT2, -INV_SQRT2),
    Vec2::new(-1.0, 0.0),
    Vec2::new(-INV_SQRT2, INV_SQRT2),
    Vec2::new(0.0, 1.0),
    Vec2::new(INV_SQRT2, INV_SQRT2),
];

// ---------------------------------------------------------------------------
// InputMask
// ---------------------------------------------------------------------------

/// The 4-bit set of pressed arrows: right=1, left=2, up=4, down=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InputMask(u8);

impl InputMask {
    pub const NONE: InputMask = InputMask(0);
    pub const RIGHT: InputMask = InputMask(1);
    pub const LEFT: InputMask = InputMask(2);
    pub const UP: InputMask = InputMask(4);
    pub const DOWN: InputMask = InputMask(8);

    /// Build a mask from raw bits. Bits above the low nibble are dropped.
    pub fn from_bits(bits: u8) -> Self {
        InputMask(bits & 0x0f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: InputMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for InputMask {
    type Output = InputMask;

    fn bitor(self, rhs: InputMask) -> InputMask {
        InputMask(self.0 | rhs.0)
    }
}

/// Direction for every 4-bit arrow mask. Opposing pairs and three-or-more
/// arrows have no direction.
const INPUT_MASK_TABLE: [Option<Direction>; 16] = [
    None,                       // nothing
    Some(Direction::Right),     // right
    Some(Direction::Left),      // left
    None,                       // right + left
    Some(Direction::Up),        // up
    Some(Direction::UpRight),   // up + right
    Some(Direction::UpLeft),    // up + left
    None,                       // up + left + right
    Some(Direction::Down),      // down
    Some(Direction::DownRight), // down + right
    Some(Direction::DownLeft),  // down + left
    None,                       // down + left + right
    None,                       // down + up
    None,                       // down + up + right
    None,                       // down + up + left
    None,                       // all four
];

/// Wall-facing direction for each 30-degree sector of a normal angle.
/// Sector `i` covers `[30*i - 15, 30*i + 15)` degrees.
const NORMAL_SECTOR_TABLE: [Direction; 12] = [
    Direction::Right,     // 345..15
    Direction::UpRight,   // 15..45
    Direction::UpRight,   // 45..75
    Direction::Up,        // 75..105
    Direction::UpLeft,    // 105..135
    Direction::UpLeft,    // 135..165
    Direction::Left,      // 165..195
    Direction::DownLeft,  // 195..225
    Direction::DownLeft,  // 225..255
    Direction::Down,      // 255..285
    Direction::DownRight, // 285..315
    Direction::DownRight, // 315..345
];

// ---------------------------------------------------------------------------
// Quantizers
// ---------------------------------------------------------------------------

/// Quantize an arrow mask. Contradictory masks yield `None`.
pub fn from_input_mask(mask: InputMask) -> Option<Direction> {
    INPUT_MASK_TABLE[mask.bits() as usize]
}

/// Quantize an angle in degrees (any range) to the wall-facing octant.
pub fn from_angle(angle_degrees: f64) -> Direction {
    let sector = ((range_360(angle_degrees) + 15.0) / 30.0).floor() as usize % 12;
    NORMAL_SECTOR_TABLE[sector]
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn range_360(angle_degrees: f64) -> f64 {
    let wrapped = angle_degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Angle of a screen-space vector in degrees: `atan2(-y, x)` mapped into
/// `[0, 360)`, so 0 is right and 90 is up. The zero vector has angle 0.
pub fn screen_angle(v: Vec2) -> f64 {
    if v.is_zero() {
        return 0.0;
    }
    range_360((-v.y).atan2(v.x).to_degrees())
}

/// Smallest absolute difference between two angles in degrees, in `[0, 180]`.
pub fn angle_delta(a: f64, b: f64) -> f64 {
    let d = range_360(a - b);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
