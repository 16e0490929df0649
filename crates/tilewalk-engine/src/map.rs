//! In-memory tile map.
//!
//! A [`TileMap`] holds the grid the character walks on: solid tiles, climb
//! features, pushable objects and the hero spawn. It answers the motion
//! core's two world queries by implementing [`TileEventLookup`] and
//! [`InteractableRegistry`].
//!
//! Maps are usually written as ASCII art:
//!
//! | char | meaning                                        |
//! |------|------------------------------------------------|
//! | `#`  | solid wall                                     |
//! | `.`  | floor                                          |
//! | ` `  | floor                                          |
//! | `@`  | floor, hero spawn                              |
//! | `B`  | floor with a pushable object on layer 0        |
//! | `H`  | floor with an active ladder (entered up/down)  |
//!
//! Tile `(x, y)` covers `[x * size, (x + 1) * size)` horizontally and the same
//! vertically, y growing down.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tilewalk_motion::config::WorldKind;
use tilewalk_motion::direction::{Direction, Vec2};
use tilewalk_motion::interaction::{
    BodyId, ClimbFeature, InteractableId, InteractableInfo, InteractableRegistry, TileEventLookup,
    TilePos,
};
use tilewalk_motion::MotionError;
use tracing::debug;

use crate::physics::DEFAULT_COLLISION_LAYER;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Tile geometry
// ---------------------------------------------------------------------------

/// World-space centre of `tile`.
pub fn tile_center(tile: TilePos, tile_size: f64) -> Vec2 {
    Vec2::new(
        (tile.x as f64 + 0.5) * tile_size,
        (tile.y as f64 + 0.5) * tile_size,
    )
}

/// The tile containing world-space `position`.
pub fn tile_at(position: Vec2, tile_size: f64) -> TilePos {
    TilePos::new(
        (position.x / tile_size).floor() as i32,
        (position.y / tile_size).floor() as i32,
    )
}

// ---------------------------------------------------------------------------
// Pushable
// ---------------------------------------------------------------------------

/// A pushable object on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pushable {
    pub id: InteractableId,
    pub tile: TilePos,
    pub collision_layer: u32,
    /// Physics body, once the frame loop has created one.
    pub body: Option<BodyId>,
}

// ---------------------------------------------------------------------------
// TileMap
// ---------------------------------------------------------------------------

/// Grid of tiles with walls, climb features and pushable objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    width: i32,
    height: i32,
    world: WorldKind,
    collision_layer: u32,
    spawn: Option<TilePos>,
    walls: BTreeSet<TilePos>,
    climb_features: BTreeMap<TilePos, Vec<ClimbFeature>>,
    pushables: BTreeMap<InteractableId, Pushable>,
}

impl TileMap {
    /// An empty `width` x `height` map of floor tiles.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            world: WorldKind::Ordinary,
            collision_layer: DEFAULT_COLLISION_LAYER,
            spawn: None,
            walls: BTreeSet::new(),
            climb_features: BTreeMap::new(),
            pushables: BTreeMap::new(),
        }
    }

    /// Parse an ASCII map. Rows may have different lengths; the map is as wide
    /// as the longest row.
    ///
    /// Blank lines are skipped and the indentation shared by every row is
    /// removed, so maps can be written as indented string literals. Any other
    /// leading space is floor. Errors report positions in `text`.
    pub fn from_ascii(text: &str) -> Result<Self, EngineError> {
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .collect();
        let indent = lines
            .iter()
            .map(|(_, l)| l.len() - l.trim_start_matches([' ', '\t']).len())
            .min()
            .unwrap_or(0);
        let rows: Vec<(usize, &str)> = lines
            .iter()
            .map(|&(number, l)| (number, l[indent..].trim_end_matches('\r')))
            .collect();
        let width = rows.iter().map(|(_, r)| r.chars().count()).max().unwrap_or(0);
        let mut map = TileMap::new(width as i32, rows.len() as i32);

        for (y, &(number, row)) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = TilePos::new(x as i32, y as i32);
                match ch {
                    '#' => {
                        map.walls.insert(tile);
                    }
                    '.' | ' ' => {}
                    '@' => map.spawn = Some(tile),
                    'B' => {
                        map.add_pushable(tile, DEFAULT_COLLISION_LAYER)?;
                    }
                    'H' => map.add_climb_feature(
                        tile,
                        ClimbFeature {
                            active: true,
                            activation_directions: vec![Direction::Up, Direction::Down],
                        },
                    )?,
                    found => {
                        return Err(EngineError::MapParse {
                            line: number + 1,
                            column: indent + x + 1,
                            found,
                        })
                    }
                }
            }
        }
        Ok(map)
    }

    pub fn with_world(mut self, world: WorldKind) -> Self {
        self.world = world;
        self
    }

    pub fn with_collision_layer(mut self, layer: u32) -> Self {
        self.collision_layer = layer;
        self
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn world(&self) -> WorldKind {
        self.world
    }

    /// The layer the hero is currently on.
    pub fn collision_layer(&self) -> u32 {
        self.collision_layer
    }

    pub fn set_collision_layer(&mut self, layer: u32) {
        self.collision_layer = layer;
    }

    pub fn spawn(&self) -> Option<TilePos> {
        self.spawn
    }

    pub fn set_spawn(&mut self, tile: TilePos) -> Result<(), EngineError> {
        self.check_bounds(tile)?;
        self.spawn = Some(tile);
        Ok(())
    }

    pub fn in_bounds(&self, tile: TilePos) -> bool {
        (0..self.width).contains(&tile.x) && (0..self.height).contains(&tile.y)
    }

    fn check_bounds(&self, tile: TilePos) -> Result<(), EngineError> {
        if self.in_bounds(tile) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds { tile })
        }
    }

    pub fn add_wall(&mut self, tile: TilePos) -> Result<(), EngineError> {
        self.check_bounds(tile)?;
        self.walls.insert(tile);
        Ok(())
    }

    pub fn is_wall(&self, tile: TilePos) -> bool {
        self.walls.contains(&tile)
    }

    /// Wall tiles in row-major order.
    pub fn walls(&self) -> impl Iterator<Item = TilePos> + '_ {
        let mut walls: Vec<TilePos> = self.walls.iter().copied().collect();
        walls.sort_by_key(|t| (t.y, t.x));
        walls.into_iter()
    }

    pub fn add_climb_feature(&mut self, tile: TilePos, feature: ClimbFeature) -> Result<(), EngineError> {
        self.check_bounds(tile)?;
        self.climb_features.entry(tile).or_default().push(feature);
        Ok(())
    }

    /// Add a pushable object and return its id.
    pub fn add_pushable(&mut self, tile: TilePos, collision_layer: u32) -> Result<InteractableId, EngineError> {
        self.check_bounds(tile)?;
        let id = InteractableId(self.pushables.len() as u32);
        self.pushables.insert(
            id,
            Pushable {
                id,
                tile,
                collision_layer,
                body: None,
            },
        );
        Ok(id)
    }

    pub fn pushable(&self, id: InteractableId) -> Option<&Pushable> {
        self.pushables.get(&id)
    }

    /// Pushable objects in id order.
    pub fn pushables(&self) -> impl Iterator<Item = &Pushable> {
        self.pushables.values()
    }

    /// Record the physics body created for a pushable object.
    pub fn attach_body(&mut self, id: InteractableId, body: BodyId) -> Result<(), EngineError> {
        let pushable = self
            .pushables
            .get_mut(&id)
            .ok_or(MotionError::UnknownInteractable { id })?;
        pushable.body = Some(body);
        Ok(())
    }

    /// Whether anything solid (a wall or another object) occupies `tile`.
    pub fn is_occupied(&self, tile: TilePos) -> bool {
        self.is_wall(tile) || self.pushables.values().any(|p| p.tile == tile)
    }
}

// ---------------------------------------------------------------------------
// Motion core collaborators
// ---------------------------------------------------------------------------

impl TileEventLookup for TileMap {
    fn climb_features_at(&self, tile: TilePos) -> Vec<ClimbFeature> {
        self.climb_features.get(&tile).cloned().unwrap_or_default()
    }
}

impl InteractableRegistry for TileMap {
    /// Only objects that already have a physics body can be touched.
    fn interactables(&self) -> Vec<InteractableInfo> {
        self.pushables
            .values()
            .filter_map(|p| {
                p.body.map(|body| InteractableInfo {
                    id: p.id,
                    body,
                    tile: Some(p.tile),
                    collision_layer: p.collision_layer,
                })
            })
            .collect()
    }

    fn position_allowed(&self, id: InteractableId, destination: TilePos) -> bool {
        self.pushables.contains_key(&id) && self.in_bounds(destination) && !self.is_occupied(destination)
    }

    fn begin_push(&mut self, id: InteractableId, direction: Direction) -> Result<TilePos, MotionError> {
        let from = self
            .pushables
            .get(&id)
            .map(|p| p.tile)
            .ok_or(MotionError::UnknownInteractable { id })?;
        let destination = from
            .step(direction)
            .filter(|tile| self.position_allowed(id, *tile))
            .ok_or(MotionError::PushBlocked { id, direction })?;

        if let Some(pushable) = self.pushables.get_mut(&id) {
            pushable.tile = destination;
        }
        debug!(interactable = %id, from_x = from.x, from_y = from.y, x = destination.x, y = destination.y, "object pushed");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = "
        #######
        #@..B.#
        #..H..#
        #######
    ";

    #[test]
    fn ascii_map_is_parsed() {
        let map = TileMap::from_ascii(ROOM).unwrap();
        assert_eq!((map.width(), map.height()), (7, 4));
        assert_eq!(map.spawn(), Some(TilePos::new(1, 1)));
        assert!(map.is_wall(TilePos::new(0, 0)));
        assert!(!map.is_wall(TilePos::new(2, 1)));
        assert_eq!(map.pushables().count(), 1);
        assert_eq!(map.climb_features_at(TilePos::new(3, 2)).len(), 1);
        assert!(map.climb_features_at(TilePos::new(2, 2)).is_empty());
        assert_eq!(map.walls().next(), Some(TilePos::new(0, 0)));
    }

    #[test]
    fn unknown_character_is_reported_with_position() {
        let err = TileMap::from_ascii("##\n#?").unwrap_err();
        assert!(matches!(
            err,
            EngineError::MapParse {
                line: 2,
                column: 2,
                found: '?'
            }
        ));
    }

    #[test]
    fn leading_spaces_beyond_the_shared_indent_are_floor() {
        let map = TileMap::from_ascii("#..\n  #").unwrap();
        assert!(map.is_wall(TilePos::new(2, 1)));
        assert!(!map.is_wall(TilePos::new(0, 1)));
        assert_eq!(map.width(), 3);

        let indented = TileMap::from_ascii(
            "
            ####
              @#
            ####
            ",
        )
        .unwrap();
        assert_eq!(indented.spawn(), Some(TilePos::new(2, 1)));
        assert!(indented.is_wall(TilePos::new(3, 1)));
        assert!(!indented.is_wall(TilePos::new(0, 1)));
    }

    #[test]
    fn parse_errors_point_into_the_original_text() {
        let err = TileMap::from_ascii("\n    ###\n    #?#\n").unwrap_err();
        assert!(matches!(
            err,
            EngineError::MapParse {
                line: 3,
                column: 6,
                found: '?'
            }
        ));
    }

    #[test]
    fn tile_geometry_round_trips_through_centre() {
        let tile = TilePos::new(3, 7);
        let centre = tile_center(tile, 16.0);
        assert_eq!(centre, Vec2::new(56.0, 120.0));
        assert_eq!(tile_at(centre, 16.0), tile);
        assert_eq!(tile_at(Vec2::new(-0.5, 15.9), 16.0), TilePos::new(-1, 0));
    }

    #[test]
    fn objects_without_bodies_are_not_interactable() {
        let mut map = TileMap::from_ascii(ROOM).unwrap();
        assert!(map.interactables().is_empty());
        map.attach_body(InteractableId(0), BodyId(9)).unwrap();
        let list = map.interactables();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].body, BodyId(9));
        assert_eq!(list[0].tile, Some(TilePos::new(4, 1)));
    }

    #[test]
    fn push_moves_object_one_tile() {
        let mut map = TileMap::from_ascii(ROOM).unwrap();
        let id = InteractableId(0);
        assert!(map.position_allowed(id, TilePos::new(5, 1)));
        assert_eq!(map.begin_push(id, Direction::Right).unwrap(), TilePos::new(5, 1));
        assert_eq!(map.pushable(id).unwrap().tile, TilePos::new(5, 1));

        // Next to the wall now.
        assert!(!map.position_allowed(id, TilePos::new(6, 1)));
        let err = map.begin_push(id, Direction::Right).unwrap_err();
        assert!(matches!(err, MotionError::PushBlocked { .. }));
    }

    #[test]
    fn objects_block_each_other() {
        let mut map = TileMap::from_ascii(ROOM).unwrap();
        let second = map.add_pushable(TilePos::new(5, 1), 0).unwrap();
        assert_eq!(second, InteractableId(1));
        assert!(!map.position_allowed(InteractableId(0), TilePos::new(5, 1)));
    }

    #[test]
    fn unknown_object_cannot_be_pushed() {
        let mut map = TileMap::from_ascii(ROOM).unwrap();
        let err = map.begin_push(InteractableId(5), Direction::Up).unwrap_err();
        assert!(matches!(err, MotionError::UnknownInteractable { .. }));
        assert!(!map.position_allowed(InteractableId(5), TilePos::new(2, 2)));
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let mut map = TileMap::new(4, 4);
        assert!(matches!(
            map.add_wall(TilePos::new(4, 0)),
            Err(EngineError::OutOfBounds { .. })
        ));
        assert!(map.set_spawn(TilePos::new(-1, 2)).is_err());
    }
}
