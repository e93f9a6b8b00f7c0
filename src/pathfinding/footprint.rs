//! Agents larger than a cell cannot squeeze through every walkable cell. A [Footprint] decides
//! whether an agent can stand on a cell, the search engines skip cells it rejects.
//!

use std::sync::Arc;

use bevy::prelude::*;

use crate::prelude::*;

/// Signature of a caller supplied footprint test
pub type FootprintFn = dyn Fn(&NavGrid, CellCoord) -> bool + Send + Sync;

/// The space an agent needs around the cell it stands on
#[derive(Clone, Default)]
pub enum Footprint {
	/// The agent fits in any walkable cell
	#[default]
	Point,
	/// Every cell overlapped by a box of these half extents, centred on the cell, must be walkable
	Box { half_extents: Vec2 },
	/// Caller supplied test
	Custom(Arc<FootprintFn>),
}

impl std::fmt::Debug for Footprint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Footprint::Point => write!(f, "Point"),
			Footprint::Box { half_extents } => {
				f.debug_struct("Box").field("half_extents", half_extents).finish()
			}
			Footprint::Custom(_) => write!(f, "Custom"),
		}
	}
}

impl Footprint {
	/// Footprint of an agent whose body is a box of `half_extents`
	pub fn new_box(half_extents: Vec2) -> Self {
		Footprint::Box { half_extents }
	}
	/// Footprint decided by `test`
	pub fn custom<F>(test: F) -> Self
	where
		F: Fn(&NavGrid, CellCoord) -> bool + Send + Sync + 'static,
	{
		Footprint::Custom(Arc::new(test))
	}
	/// Can the agent stand on `coord`. Walkability of `coord` itself is left to the caller
	pub fn can_occupy(&self, grid: &NavGrid, coord: CellCoord) -> bool {
		match self {
			Footprint::Point => true,
			Footprint::Box { half_extents } => {
				let center = grid.get_cell(coord).get_world_position();
				grid.cells_spanning_box(coord, center, *half_extents)
					.iter()
					.all(|c| grid.is_walkable(c))
			}
			Footprint::Custom(test) => test(grid, coord),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// 10x10 grid with column 5 walled off
	fn walled_grid() -> NavGrid {
		NavGrid::new_built(
			GridSettings::new(Vec2::ZERO, Vec2::new(10.0, 10.0), 1.0),
			Arc::new(|p: Vec2, _r: f32| p.x > 0.0 && p.x < 1.0),
			Arc::new(OpenGround),
		)
	}

	#[test]
	fn point_fits_anywhere() {
		let grid = walled_grid();
		assert!(Footprint::Point.can_occupy(&grid, CellCoord::new(4, 4)));
	}
	#[test]
	fn wide_box_touches_wall() {
		let grid = walled_grid();
		let footprint = Footprint::new_box(Vec2::new(0.9, 0.4));
		assert!(!footprint.can_occupy(&grid, CellCoord::new(4, 4)));
		assert!(footprint.can_occupy(&grid, CellCoord::new(2, 4)));
	}
	#[test]
	fn custom_test() {
		let grid = walled_grid();
		let footprint = Footprint::custom(|_grid, coord| coord.get_row() < 5);
		assert!(footprint.can_occupy(&grid, CellCoord::new(0, 4)));
		assert!(!footprint.can_occupy(&grid, CellCoord::new(0, 5)));
	}
}
