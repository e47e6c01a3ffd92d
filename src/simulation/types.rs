//! Core types for the transit simulation
//!
//! These are standalone types that don't depend on any engine.

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for entity IDs (maps, grids, actors, markers)
///
/// A map is simply an entity without a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub SimId);

/// A wrapper type for destination IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(pub SimId);

/// Which kind of spawner a spawn point entity represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPointKind {
    /// Used when the round begins
    RoundStart,
    /// Used for actors joining a round already in progress
    LateJoin,
}

/// Which side of the route a dock point belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockSide {
    /// The dock point on the map carrying the hub marker
    Hub,
    /// Any dock point on a map without the hub marker
    Destination,
}

/// Where the round currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunLevel {
    #[default]
    PreRound,
    InRound,
    PostRound,
}

/// A 3D position in the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn add(&self, other: &Position) -> Position {
        Position {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    /// Rotate around the Y axis by `angle` radians
    pub fn rotate_y(&self, angle: f32) -> Position {
        let (sin, cos) = angle.sin_cos();
        Position {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// Position plus Y-axis rotation, relative to some parent frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Position,
    pub rotation: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Position {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        rotation: 0.0,
    };

    pub fn new(position: Position, rotation: f32) -> Self {
        Self { position, rotation }
    }

    pub fn at(x: f32, z: f32) -> Self {
        Self::new(Position::new(x, 0.0, z), 0.0)
    }

    /// Map a point expressed in this frame into the parent frame
    pub fn apply(&self, point: &Position) -> Position {
        point.rotate_y(self.rotation).add(&self.position)
    }

    /// Express `child` (local to this frame) in the parent frame
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            position: self.apply(&child.position),
            rotation: self.rotation + child.rotation,
        }
    }
}

/// Fixed duration of the very first jump that docks a new shuttle at the hub
pub const ROUND_START_JUMP_SECS: f32 = 10.0;

/// How long a staging map lives before it is cleaned up
pub const STAGING_MAP_LIFETIME_SECS: f32 = 15.0;
