//! A [CompositeGrid] stitches several [NavGrid]s together, for instance one per floor or per
//! island of a level. Walkability questions about a world position are answered by whichever
//! sub-grid contains the position, positions covered by no sub-grid are answered by an
//! [OutsideGridPolicy].
//!

use bevy::prelude::*;

use crate::prelude::*;

/// How a [CompositeGrid] treats positions which no sub-grid contains
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum OutsideGridPolicy {
	/// Nothing can stand outside the grids
	#[default]
	Unwalkable,
	/// Outside the grids nothing is in the way
	NotAWall,
}

/// Union of several [NavGrid]s
#[derive(Component, Clone, Debug, Default)]
pub struct CompositeGrid {
	/// Sub-grids, the first one containing a position answers for it
	grids: Vec<NavGrid>,
	/// Answer for positions outside every sub-grid
	outside_policy: OutsideGridPolicy,
}

impl CompositeGrid {
	/// Create a new [CompositeGrid] from built sub-grids
	pub fn new(grids: Vec<NavGrid>, outside_policy: OutsideGridPolicy) -> Self {
		CompositeGrid {
			grids,
			outside_policy,
		}
	}
	/// Add another sub-grid
	pub fn push(&mut self, grid: NavGrid) {
		self.grids.push(grid);
	}
	pub fn get_grids(&self) -> &[NavGrid] {
		&self.grids
	}
	pub fn get_grids_mut(&mut self) -> &mut [NavGrid] {
		&mut self.grids
	}
	pub fn get_outside_policy(&self) -> OutsideGridPolicy {
		self.outside_policy
	}
	pub fn set_outside_policy(&mut self, policy: OutsideGridPolicy) {
		self.outside_policy = policy;
	}
	/// Smallest rectangle `(min, max)` enclosing every sub-grid, `None` without sub-grids
	pub fn get_bounds(&self) -> Option<(Vec2, Vec2)> {
		let mut bounds: Option<(Vec2, Vec2)> = None;
		for grid in self.grids.iter() {
			let settings = grid.get_settings();
			let min = settings.get_bottom_left();
			let max = min + settings.get_world_size();
			bounds = Some(match bounds {
				Some((b_min, b_max)) => (b_min.min(min), b_max.max(max)),
				None => (min, max),
			});
		}
		bounds
	}
	/// The sub-grid containing a world position
	pub fn grid_containing(&self, position: Vec2) -> Option<&NavGrid> {
		self.grids.iter().find(|g| g.is_inside_grid(position))
	}
	/// Index of the sub-grid containing a world position
	pub fn grid_index_containing(&self, position: Vec2) -> Option<usize> {
		self.grids.iter().position(|g| g.is_inside_grid(position))
	}
	/// Is the position within any sub-grid
	pub fn is_inside_grid(&self, position: Vec2) -> bool {
		self.grid_containing(position).is_some()
	}
	/// Walkability of the cell under a world position, delegated to the containing sub-grid
	pub fn is_walkable_at(&self, position: Vec2) -> bool {
		match self.grid_containing(position) {
			Some(grid) => grid.is_walkable(grid.cell_from_world_position(position)),
			None => self.outside_policy == OutsideGridPolicy::NotAWall,
		}
	}
	/// Movement penalty of the cell under a world position, `0` outside every sub-grid
	pub fn get_movement_penalty_at(&self, position: Vec2) -> i32 {
		match self.grid_containing(position) {
			Some(grid) => grid.get_movement_penalty(grid.cell_from_world_position(position)),
			None => 0,
		}
	}
	/// Can a box `position ± half_extents` stand here, every cell it overlaps must be walkable
	pub fn can_occupy_box(&self, position: Vec2, half_extents: Vec2) -> bool {
		match self.grid_containing(position) {
			Some(grid) => {
				let center = grid.cell_from_world_position(position);
				grid.cells_spanning_box(center, position, half_extents)
					.iter()
					.all(|c| grid.is_walkable(c))
			}
			None => self.outside_policy == OutsideGridPolicy::NotAWall,
		}
	}
	/// Build every sub-grid which hasn't been built yet
	pub fn ensure_built(&mut self) {
		for grid in self.grids.iter_mut() {
			grid.ensure_built();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	/// Two 4x4 grids side by side with a gap between them, the right one walled at x > 7
	fn two_islands(policy: OutsideGridPolicy) -> CompositeGrid {
		let left = NavGrid::new_built(
			GridSettings::new(Vec2::new(-4.0, 0.0), Vec2::new(4.0, 4.0), 1.0),
			Arc::new(OpenGround),
			Arc::new(OpenGround),
		);
		let right = NavGrid::new_built(
			GridSettings::new(Vec2::new(6.0, 0.0), Vec2::new(4.0, 4.0), 1.0),
			Arc::new(|p: Vec2, _r: f32| p.x > 7.0),
			Arc::new(|_p: Vec2| 5),
		);
		CompositeGrid::new(vec![left, right], policy)
	}

	#[test]
	fn bounds_union() {
		let composite = two_islands(OutsideGridPolicy::Unwalkable);
		let (min, max) = composite.get_bounds().unwrap();
		assert_eq!(Vec2::new(-6.0, -2.0), min);
		assert_eq!(Vec2::new(8.0, 2.0), max);
	}
	#[test]
	fn delegates_to_containing_grid() {
		let composite = two_islands(OutsideGridPolicy::Unwalkable);
		assert_eq!(Some(0), composite.grid_index_containing(Vec2::new(-4.0, 1.0)));
		assert_eq!(Some(1), composite.grid_index_containing(Vec2::new(5.0, 1.0)));
		assert!(composite.is_walkable_at(Vec2::new(5.5, 0.5)));
		assert!(!composite.is_walkable_at(Vec2::new(7.5, 0.5)));
		assert_eq!(5, composite.get_movement_penalty_at(Vec2::new(5.5, 0.5)));
		assert_eq!(0, composite.get_movement_penalty_at(Vec2::new(-4.5, 0.5)));
	}
	#[test]
	fn outside_unwalkable() {
		let composite = two_islands(OutsideGridPolicy::Unwalkable);
		assert!(!composite.is_inside_grid(Vec2::new(1.0, 0.0)));
		assert!(!composite.is_walkable_at(Vec2::new(1.0, 0.0)));
		assert!(!composite.can_occupy_box(Vec2::new(1.0, 0.0), Vec2::ONE));
	}
	#[test]
	fn outside_not_a_wall() {
		let composite = two_islands(OutsideGridPolicy::NotAWall);
		assert!(composite.is_walkable_at(Vec2::new(1.0, 0.0)));
		assert!(composite.can_occupy_box(Vec2::new(1.0, 0.0), Vec2::ONE));
	}
	#[test]
	fn box_overlapping_wall() {
		let composite = two_islands(OutsideGridPolicy::Unwalkable);
		assert!(composite.can_occupy_box(Vec2::new(5.5, 0.5), Vec2::new(0.4, 0.4)));
		assert!(!composite.can_occupy_box(Vec2::new(6.5, 0.5), Vec2::new(1.0, 0.4)));
	}
	#[test]
	fn empty_composite() {
		let composite = CompositeGrid::default();
		assert_eq!(None, composite.get_bounds());
		assert!(!composite.is_walkable_at(Vec2::ZERO));
	}
}
