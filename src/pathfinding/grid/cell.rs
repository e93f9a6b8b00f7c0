//! A [NavCell] is the unit of the [NavGrid]. Alongside its static properties (position and
//! walkability from when the grid was built, a terrain penalty) it carries the dynamic state
//! contributed by the [ObstacleOverlay] and the scratch values written by the search engines.
//!
//! Scratch values are only meaningful to the search which last wrote them, a single
//! [PathScheduler] guarantees that only one search runs over a grid at a time.
//!

use std::cmp::Ordering;

use bevy::prelude::*;

use crate::prelude::*;

/// Unique ID of a cell within a [NavGrid], `(column, row)`. Column `0` is the western edge
/// and row `0` is the southern edge of the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct CellCoord((usize, usize));

impl CellCoord {
	/// Create a new instance of [CellCoord]
	pub fn new(column: usize, row: usize) -> Self {
		CellCoord((column, row))
	}
	/// Get the `(column, row)` tuple
	pub fn get_column_row(&self) -> (usize, usize) {
		self.0
	}
	/// Get the column of the cell
	pub fn get_column(&self) -> usize {
		self.0 .0
	}
	/// Get the row of the cell
	pub fn get_row(&self) -> usize {
		self.0 .1
	}
	/// Get the direction of travel from `self` towards `other`
	pub fn direction_to(&self, other: CellCoord) -> Ordinal {
		let dx = other.get_column() as i64 - self.get_column() as i64;
		let dy = other.get_row() as i64 - self.get_row() as i64;
		Ordinal::from_offset(dx.signum() as i32, dy.signum() as i32)
	}
}

/// A single cell of a [NavGrid]
#[derive(Clone, Debug)]
pub struct NavCell {
	/// ID of the cell within its grid
	coord: CellCoord,
	/// Centre of the cell on the grid plane
	world_position: Vec2,
	/// Result of the occupancy query when the grid was built
	walkable_base: bool,
	/// Terrain penalty from when the grid was built, never negative
	terrain_penalty: i32,
	/// Obstacles currently overlapping the cell
	obstacles: Vec<ObstacleId>,
	/// Sum of the penalties of the attached penalizing obstacles
	obstacle_penalty: i32,
	/// Whether any attached obstacle is blocking
	blocked: bool,
	/// Arena indices of up to 8 neighbours
	neighbours: Vec<usize>,
	/// Arena indices of up to 4 orthogonal neighbours
	cardinal_neighbours: Vec<usize>,
	/// A* cost from the start cell
	g_cost: i32,
	/// A* heuristic cost to the target cell
	h_cost: i32,
	/// A* arena index of the cell this one was reached from
	parent: Option<usize>,
	/// Position within the A* open set
	heap_index: Option<usize>,
	/// Flow field accumulated cost to the nearest target
	best_cost: i32,
	/// Flow field direction towards the cheapest neighbour
	best_direction: Ordinal,
}

impl NavCell {
	/// Create a new instance of [NavCell] with no neighbours and no obstacles
	pub fn new(coord: CellCoord, world_position: Vec2, walkable: bool, terrain_penalty: i32) -> Self {
		NavCell {
			coord,
			world_position,
			walkable_base: walkable,
			terrain_penalty: terrain_penalty.max(0),
			obstacles: Vec::new(),
			obstacle_penalty: 0,
			blocked: false,
			neighbours: Vec::new(),
			cardinal_neighbours: Vec::new(),
			g_cost: 0,
			h_cost: 0,
			parent: None,
			heap_index: None,
			best_cost: UNREACHABLE_COST,
			best_direction: Ordinal::Zero,
		}
	}
	pub fn get_coord(&self) -> CellCoord {
		self.coord
	}
	pub fn get_world_position(&self) -> Vec2 {
		self.world_position
	}
	/// Walkability as reported by the occupancy query, ignoring obstacles
	pub fn is_walkable_base(&self) -> bool {
		self.walkable_base
	}
	/// A cell is walkable when the occupancy query found it clear and no blocking obstacle is attached
	pub fn is_walkable(&self) -> bool {
		self.walkable_base && !self.blocked
	}
	/// Terrain penalty plus the penalties of attached obstacles
	pub fn get_movement_penalty(&self) -> i32 {
		(self.terrain_penalty + self.obstacle_penalty).max(0)
	}
	pub fn get_terrain_penalty(&self) -> i32 {
		self.terrain_penalty
	}
	pub fn get_obstacles(&self) -> &[ObstacleId] {
		&self.obstacles
	}
	pub fn get_neighbours(&self) -> &[usize] {
		&self.neighbours
	}
	pub fn get_cardinal_neighbours(&self) -> &[usize] {
		&self.cardinal_neighbours
	}
	pub fn get_g_cost(&self) -> i32 {
		self.g_cost
	}
	pub fn get_h_cost(&self) -> i32 {
		self.h_cost
	}
	pub fn get_f_cost(&self) -> i32 {
		self.g_cost + self.h_cost
	}
	pub fn get_parent(&self) -> Option<usize> {
		self.parent
	}
	pub fn get_best_cost(&self) -> i32 {
		self.best_cost
	}
	pub fn get_best_direction(&self) -> Ordinal {
		self.best_direction
	}
	/// Replace the adjacency lists
	pub(crate) fn set_neighbours(&mut self, all: Vec<usize>, cardinal: Vec<usize>) {
		self.neighbours = all;
		self.cardinal_neighbours = cardinal;
	}
	/// Record the A* costs and parent of the cell
	pub(crate) fn set_search_state(&mut self, g_cost: i32, h_cost: i32, parent: Option<usize>) {
		self.g_cost = g_cost;
		self.h_cost = h_cost;
		self.parent = parent;
	}
	/// Record the flow field result of the cell
	pub(crate) fn set_flow_state(&mut self, best_cost: i32, best_direction: Ordinal) {
		self.best_cost = best_cost;
		self.best_direction = best_direction;
	}
	/// Add an obstacle reference, returns `false` if it was already attached
	pub(crate) fn attach_obstacle(&mut self, id: ObstacleId) -> bool {
		if self.obstacles.contains(&id) {
			false
		} else {
			self.obstacles.push(id);
			true
		}
	}
	/// Remove an obstacle reference, returns `false` if it wasn't attached
	pub(crate) fn detach_obstacle(&mut self, id: ObstacleId) -> bool {
		if let Some(i) = self.obstacles.iter().position(|o| *o == id) {
			self.obstacles.swap_remove(i);
			true
		} else {
			false
		}
	}
	/// Recompute the blocked flag and obstacle penalty from the attached obstacles. `lookup`
	/// resolves an ID to the kind of obstacle, IDs it cannot resolve are skipped
	pub(crate) fn refresh_obstacle_state<F>(&mut self, lookup: F)
	where
		F: Fn(ObstacleId) -> Option<ObstacleKind>,
	{
		let mut blocked = false;
		let mut penalty = 0;
		for id in self.obstacles.iter() {
			match lookup(*id) {
				Some(ObstacleKind::Blocking) => blocked = true,
				Some(ObstacleKind::Penalty(p)) => penalty += p,
				None => trace!("Skipping stale obstacle {:?} on {:?}", id, self.coord),
			}
		}
		self.blocked = blocked;
		self.obstacle_penalty = penalty;
	}
}

impl HeapItem for NavCell {
	fn get_heap_index(&self) -> Option<usize> {
		self.heap_index
	}
	fn set_heap_index(&mut self, index: Option<usize>) {
		self.heap_index = index;
	}
	fn compare_priority(&self, other: &Self) -> Ordering {
		self.get_f_cost()
			.cmp(&other.get_f_cost())
			.then(self.h_cost.cmp(&other.h_cost))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn coord_accessors() {
		let coord = CellCoord::new(3, 7);
		assert_eq!(3, coord.get_column());
		assert_eq!(7, coord.get_row());
		assert_eq!((3, 7), coord.get_column_row());
	}
	#[test]
	fn direction_between_coords() {
		let a = CellCoord::new(4, 4);
		assert_eq!(Ordinal::North, a.direction_to(CellCoord::new(4, 5)));
		assert_eq!(Ordinal::SouthWest, a.direction_to(CellCoord::new(1, 0)));
		assert_eq!(Ordinal::Zero, a.direction_to(a));
	}
	#[test]
	fn negative_terrain_penalty_clamped() {
		let cell = NavCell::new(CellCoord::new(0, 0), Vec2::ZERO, true, -5);
		assert_eq!(0, cell.get_movement_penalty());
	}
	#[test]
	fn blocking_obstacle_unwalkable() {
		let mut cell = NavCell::new(CellCoord::new(0, 0), Vec2::ZERO, true, 0);
		let id = ObstacleId::new(1);
		cell.attach_obstacle(id);
		cell.refresh_obstacle_state(|_| Some(ObstacleKind::Blocking));
		assert!(!cell.is_walkable());
		assert!(cell.is_walkable_base());
		cell.detach_obstacle(id);
		cell.refresh_obstacle_state(|_| Some(ObstacleKind::Blocking));
		assert!(cell.is_walkable());
	}
	#[test]
	fn penalty_attach_is_idempotent() {
		let mut cell = NavCell::new(CellCoord::new(0, 0), Vec2::ZERO, true, 2);
		let id = ObstacleId::new(4);
		assert!(cell.attach_obstacle(id));
		assert!(!cell.attach_obstacle(id));
		cell.refresh_obstacle_state(|_| Some(ObstacleKind::Penalty(30)));
		assert_eq!(32, cell.get_movement_penalty());
		assert!(cell.detach_obstacle(id));
		assert!(!cell.detach_obstacle(id));
		cell.refresh_obstacle_state(|_| Some(ObstacleKind::Penalty(30)));
		assert_eq!(2, cell.get_movement_penalty());
	}
	#[test]
	fn stale_obstacle_skipped() {
		let mut cell = NavCell::new(CellCoord::new(0, 0), Vec2::ZERO, true, 0);
		cell.attach_obstacle(ObstacleId::new(9));
		cell.refresh_obstacle_state(|_| None);
		assert!(cell.is_walkable());
		assert_eq!(0, cell.get_movement_penalty());
	}
	#[test]
	fn heap_priority_ties_on_h() {
		let mut a = NavCell::new(CellCoord::new(0, 0), Vec2::ZERO, true, 0);
		let mut b = NavCell::new(CellCoord::new(1, 0), Vec2::ZERO, true, 0);
		a.set_search_state(10, 20, None);
		b.set_search_state(20, 10, None);
		assert_eq!(Ordering::Greater, a.compare_priority(&b));
	}
}
