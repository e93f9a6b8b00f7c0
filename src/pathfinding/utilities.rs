//! Useful structures and tools used by the grid and the search engines
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Cost of stepping to an orthogonally adjacent cell
pub const ORTHOGONAL_COST: i32 = 10;
/// Cost of stepping to a diagonally adjacent cell, `10 * sqrt(2)` rounded
pub const DIAGONAL_COST: i32 = 14;

/// Convenience way of accessing the 8 directions of movement out of a [NavCell] and the
/// directions stored in a [FlowField].
///
/// Rows grow towards `North` (positive world `y` in 2d, positive world `z` in 3d) and
/// columns grow towards `East` (positive world `x`)
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default, Reflect)]
pub enum Ordinal {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
	/// Special case, used to indicate that a cell has no better neighbour
	#[default]
	Zero,
}

impl Ordinal {
	/// The 4 orthogonal directions in scan order
	pub const CARDINALS: [Ordinal; 4] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
	];
	/// All 8 directions in scan order, orthogonals first
	pub const ALL: [Ordinal; 8] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
		Ordinal::NorthEast,
		Ordinal::SouthEast,
		Ordinal::SouthWest,
		Ordinal::NorthWest,
	];
	/// Get the `(column, row)` step of the direction
	pub fn get_offset(&self) -> (i32, i32) {
		match self {
			Ordinal::North => (0, 1),
			Ordinal::East => (1, 0),
			Ordinal::South => (0, -1),
			Ordinal::West => (-1, 0),
			Ordinal::NorthEast => (1, 1),
			Ordinal::SouthEast => (1, -1),
			Ordinal::SouthWest => (-1, -1),
			Ordinal::NorthWest => (-1, 1),
			Ordinal::Zero => (0, 0),
		}
	}
	/// Find the direction of a `(column, row)` step. Each component is reduced to its sign so
	/// that any step on a straight or diagonal line resolves to a direction
	pub fn from_offset(column_step: i32, row_step: i32) -> Ordinal {
		match (column_step.signum(), row_step.signum()) {
			(0, 1) => Ordinal::North,
			(1, 0) => Ordinal::East,
			(0, -1) => Ordinal::South,
			(-1, 0) => Ordinal::West,
			(1, 1) => Ordinal::NorthEast,
			(1, -1) => Ordinal::SouthEast,
			(-1, -1) => Ordinal::SouthWest,
			(-1, 1) => Ordinal::NorthWest,
			_ => Ordinal::Zero,
		}
	}
	/// Get the direction pointing the opposite way
	pub fn inverse(&self) -> Ordinal {
		match self {
			Ordinal::North => Ordinal::South,
			Ordinal::East => Ordinal::West,
			Ordinal::South => Ordinal::North,
			Ordinal::West => Ordinal::East,
			Ordinal::NorthEast => Ordinal::SouthWest,
			Ordinal::SouthEast => Ordinal::NorthWest,
			Ordinal::SouthWest => Ordinal::NorthEast,
			Ordinal::NorthWest => Ordinal::SouthEast,
			Ordinal::Zero => Ordinal::Zero,
		}
	}
	/// Is this one of the four diagonal directions
	pub fn is_diagonal(&self) -> bool {
		matches!(
			self,
			Ordinal::NorthEast | Ordinal::SouthEast | Ordinal::SouthWest | Ordinal::NorthWest
		)
	}
	/// Unit vector on the grid plane pointing along the direction, [Ordinal::Zero] is `Vec2::ZERO`
	pub fn as_vec2(&self) -> Vec2 {
		let (x, y) = self.get_offset();
		Vec2::new(x as f32, y as f32).normalize_or_zero()
	}
	/// Find the neighbour of `cell` in this direction while respecting the grid limits
	pub fn step_from(&self, cell: CellCoord, columns: usize, rows: usize) -> Option<CellCoord> {
		let (dx, dy) = self.get_offset();
		let column = cell.get_column() as i64 + dx as i64;
		let row = cell.get_row() as i64 + dy as i64;
		if column < 0 || row < 0 || column >= columns as i64 || row >= rows as i64 {
			None
		} else {
			Some(CellCoord::new(column as usize, row as usize))
		}
	}
}

/// Octile distance between two cells, `14` per diagonal step and `10` per orthogonal step.
/// Used both as the A* heuristic and as the cost of moving between adjacent cells
pub fn octile_distance(a: CellCoord, b: CellCoord) -> i32 {
	let dx = a.get_column().abs_diff(b.get_column()) as i32;
	let dy = a.get_row().abs_diff(b.get_row()) as i32;
	let diagonal = dx.min(dy);
	let straight = dx.max(dy) - diagonal;
	DIAGONAL_COST * diagonal + ORTHOGONAL_COST * straight
}
