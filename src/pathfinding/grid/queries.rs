//! The [NavGrid] doesn't know anything about the world it covers, when it is built it asks
//! two collaborators about each cell centre:
//!
//! - an [OccupancyQuery] decides whether something solid overlaps the cell
//! - a [TerrainQuery] reports how expensive the ground under the cell is to cross
//!
//! Any `Fn(Vec2, f32) -> bool` closure is an [OccupancyQuery] and any `Fn(Vec2) -> i32` closure is
//! a [TerrainQuery], so a physics engine overlap test or a terrain layer lookup can be plugged
//! straight in. [OpenGround] answers "clear and cheap" for everything and [CostMap] answers both
//! from a table of costs.
//!

use bevy::prelude::*;

/// Decides whether a circle on the grid plane overlaps anything solid
pub trait OccupancyQuery: Send + Sync {
	/// `true` when a circle of `radius` centred on `point` is obstructed
	fn is_obstructed(&self, point: Vec2, radius: f32) -> bool;
}

/// Reports the movement penalty of the terrain at a point of the grid plane
pub trait TerrainQuery: Send + Sync {
	/// Extra cost of entering ground at `point`, negative values are treated as `0`
	fn movement_penalty(&self, point: Vec2) -> i32;
}

impl<F> OccupancyQuery for F
where
	F: Fn(Vec2, f32) -> bool + Send + Sync,
{
	fn is_obstructed(&self, point: Vec2, radius: f32) -> bool {
		self(point, radius)
	}
}

impl<F> TerrainQuery for F
where
	F: Fn(Vec2) -> i32 + Send + Sync,
{
	fn movement_penalty(&self, point: Vec2) -> i32 {
		self(point)
	}
}

/// Nothing is obstructed and all ground is free to cross
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenGround;

impl OccupancyQuery for OpenGround {
	fn is_obstructed(&self, _point: Vec2, _radius: f32) -> bool {
		false
	}
}

impl TerrainQuery for OpenGround {
	fn movement_penalty(&self, _point: Vec2) -> i32 {
		0
	}
}
