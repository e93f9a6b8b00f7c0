//! A* search over the cells of a [NavGrid].
//!
//! The open set is a [NodeHeap] ordered by `f = g + h` with ties going to the lower `h`, the
//! closed set is a flag per cell. Moving between adjacent cells costs the octile distance
//! (`10` orthogonal, `14` diagonal) plus the movement penalty of the cell being entered, and the
//! same octile distance estimates the remaining cost to the target.
//!
//! When the target cannot be reached a search may fall back to the closest cell it did explore,
//! the walkable closed cell with the smallest heuristic to the target, and search again towards
//! it. The retry never falls back a second time.
//!
//! A path can optionally be simplified, keeping only the cells where the direction of travel
//! changes:
//!
//! ```text
//!  _______________________          _______________________
//! |     |     |     |     |        |     |     |     |     |
//! |     |     |  x  |  x  |        |     |     |  x  |  x  |
//! |_____|_____|_____|_____|        |_____|_____|_____|_____|
//! |     |     |     |     |        |     |     |     |     |
//! |     |  x  |     |     |  --->  |     |  x  |     |     |
//! |_____|_____|_____|_____|        |_____|_____|_____|_____|
//! |     |     |     |     |        |     |     |     |     |
//! |  x  |     |     |     |        |  x  |     |     |     |
//! |_____|_____|_____|_____|        |_____|_____|_____|_____|
//! ```
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Describes a single A* search
#[derive(Clone, Debug)]
pub struct PathQuery {
	/// Where the agent is
	start: Vec2,
	/// Where the agent wants to be
	target: Vec2,
	/// Space the agent needs, `None` for a point sized agent
	footprint: Option<Footprint>,
	/// Settle for the closest reachable cell when the target cannot be reached
	fallback_to_nearest: bool,
	/// Collapse straight runs of the path
	simplify: bool,
}

impl PathQuery {
	/// Create a new instance of [PathQuery] for a point sized agent, without fallback or simplification
	pub fn new(start: Vec2, target: Vec2) -> Self {
		PathQuery {
			start,
			target,
			footprint: None,
			fallback_to_nearest: false,
			simplify: false,
		}
	}
	/// Create a new instance of [PathQuery] from 3d positions, the grid plane being `x, z`
	#[cfg(feature = "3d")]
	pub fn from_xyz(start: Vec3, target: Vec3) -> Self {
		PathQuery::new(Vec2::new(start.x, start.z), Vec2::new(target.x, target.z))
	}
	pub fn with_footprint(mut self, footprint: Footprint) -> Self {
		self.footprint = Some(footprint);
		self
	}
	pub fn with_fallback(mut self, fallback_to_nearest: bool) -> Self {
		self.fallback_to_nearest = fallback_to_nearest;
		self
	}
	pub fn with_simplify(mut self, simplify: bool) -> Self {
		self.simplify = simplify;
		self
	}
	pub fn get_start(&self) -> Vec2 {
		self.start
	}
	pub fn get_target(&self) -> Vec2 {
		self.target
	}
	pub fn get_footprint(&self) -> Option<&Footprint> {
		self.footprint.as_ref()
	}
	pub fn is_fallback_to_nearest(&self) -> bool {
		self.fallback_to_nearest
	}
	pub fn is_simplify(&self) -> bool {
		self.simplify
	}
}

/// Result of a successful search
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AStarPath {
	/// Cells from the start to the end of the path
	cells: Vec<CellCoord>,
	/// World positions of `cells`
	waypoints: Vec<Vec2>,
	/// Accumulated cost of the full, unsimplified path
	cost: i32,
}

impl AStarPath {
	pub fn get_cells(&self) -> &[CellCoord] {
		&self.cells
	}
	pub fn get_waypoints(&self) -> &[Vec2] {
		&self.waypoints
	}
	pub fn get_cost(&self) -> i32 {
		self.cost
	}
	pub fn len(&self) -> usize {
		self.cells.len()
	}
	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}
	/// Last cell of the path, this differs from the requested target after a fallback
	pub fn get_end(&self) -> Option<CellCoord> {
		self.cells.last().copied()
	}
}

/// Find a path across `grid` as described by `query`, building the grid first if need be.
/// Returns `None` when no path exists
pub fn find_path(grid: &mut NavGrid, query: &PathQuery) -> Option<AStarPath> {
	grid.ensure_built();
	let start = grid.get_index(grid.cell_from_world_position(query.start));
	let target = grid.get_index(grid.cell_from_world_position(query.target));
	let path = search(
		grid,
		start,
		target,
		query.footprint.as_ref(),
		query.fallback_to_nearest,
		query.simplify,
	);
	if path.is_none() {
		debug!(
			"No path from {:?} to {:?}",
			grid.get_coord(start),
			grid.get_coord(target)
		);
	}
	path
}

/// Search between two arena indices, optionally retrying towards the closest explored cell
fn search(
	grid: &mut NavGrid,
	start: usize,
	target: usize,
	footprint: Option<&Footprint>,
	fallback_to_nearest: bool,
	simplify: bool,
) -> Option<AStarPath> {
	let cell_count = grid.get_cell_count();
	let target_coord = grid.get_coord(target);
	let mut open = NodeHeap::with_capacity(cell_count.min(1024));
	let mut closed = vec![false; cell_count];
	// order cells were closed in, used to pick a fallback deterministically
	let mut closed_order = Vec::new();

	let start_h = octile_distance(grid.get_coord(start), target_coord);
	grid.get_cells_mut()[start].set_search_state(0, start_h, None);
	open.push(grid.get_cells_mut(), start);

	let mut found = false;
	while let Some(current) = open.pop(grid.get_cells_mut()) {
		closed[current] = true;
		closed_order.push(current);
		if current == target {
			found = true;
			break;
		}
		let current_coord = grid.get_coord(current);
		let current_g = grid.get_cells()[current].get_g_cost();
		let neighbour_count = grid.get_cells()[current].get_neighbours().len();
		for i in 0..neighbour_count {
			let neighbour = grid.get_cells()[current].get_neighbours()[i];
			if closed[neighbour] || !grid.get_cells()[neighbour].is_walkable() {
				continue;
			}
			let neighbour_coord = grid.get_coord(neighbour);
			if let Some(footprint) = footprint {
				if !footprint.can_occupy(grid, neighbour_coord) {
					continue;
				}
			}
			let cell = &grid.get_cells()[neighbour];
			let tentative = current_g
				+ octile_distance(current_coord, neighbour_coord)
				+ cell.get_movement_penalty();
			let in_open = open.contains(grid.get_cells(), neighbour);
			if tentative < cell.get_g_cost() || !in_open {
				let h = octile_distance(neighbour_coord, target_coord);
				grid.get_cells_mut()[neighbour].set_search_state(tentative, h, Some(current));
				if in_open {
					open.update(grid.get_cells_mut(), neighbour);
				} else {
					open.push(grid.get_cells_mut(), neighbour);
				}
			}
		}
	}
	open.clear(grid.get_cells_mut());

	if found {
		return Some(retrace(grid, start, target, simplify));
	}
	if !fallback_to_nearest {
		return None;
	}
	let substitute = nearest_explored(grid, &closed_order, target_coord, footprint)?;
	if substitute == start {
		return None;
	}
	debug!(
		"Target {:?} unreachable, falling back to {:?}",
		target_coord,
		grid.get_coord(substitute)
	);
	search(grid, start, substitute, footprint, false, simplify)
}

/// The walkable closed cell closest to the target by heuristic, the first one closed wins ties
fn nearest_explored(
	grid: &NavGrid,
	closed_order: &[usize],
	target: CellCoord,
	footprint: Option<&Footprint>,
) -> Option<usize> {
	let mut best: Option<(usize, i32)> = None;
	for index in closed_order.iter() {
		let cell = &grid.get_cells()[*index];
		if !cell.is_walkable() {
			continue;
		}
		if let Some(footprint) = footprint {
			if !footprint.can_occupy(grid, cell.get_coord()) {
				continue;
			}
		}
		let h = octile_distance(cell.get_coord(), target);
		if best.is_none_or(|(_, best_h)| h < best_h) {
			best = Some((*index, h));
		}
	}
	best.map(|(index, _)| index)
}

/// Walk the parent links back from the target and reverse them
fn retrace(grid: &NavGrid, start: usize, target: usize, simplify: bool) -> AStarPath {
	let cells = grid.get_cells();
	let mut indices = vec![target];
	let mut current = target;
	while current != start {
		match cells[current].get_parent() {
			Some(parent) => {
				indices.push(parent);
				current = parent;
			}
			None => break,
		}
	}
	indices.reverse();
	let cost = cells[target].get_g_cost();
	let mut coords: Vec<CellCoord> = indices.iter().map(|i| cells[*i].get_coord()).collect();
	if simplify {
		coords = simplify_path(&coords);
	}
	let waypoints = coords
		.iter()
		.map(|c| grid.get_cell(*c).get_world_position())
		.collect();
	AStarPath {
		cells: coords,
		waypoints,
		cost,
	}
}

/// Keep the end points of a path and every cell where the direction of travel changes
pub fn simplify_path(cells: &[CellCoord]) -> Vec<CellCoord> {
	if cells.len() < 3 {
		return cells.to_vec();
	}
	let mut simplified = vec![cells[0]];
	for i in 1..cells.len() - 1 {
		let incoming = cells[i - 1].direction_to(cells[i]);
		let outgoing = cells[i].direction_to(cells[i + 1]);
		if incoming != outgoing {
			simplified.push(cells[i]);
		}
	}
	simplified.push(cells[cells.len() - 1]);
	simplified
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	/// Grid of `columns x rows` 1 unit cells with its south-west corner on the origin
	fn grid_with_walls(columns: usize, rows: usize, walls: &'static [(usize, usize)]) -> NavGrid {
		let occupancy = move |p: Vec2, _r: f32| {
			let coord = (p.x.floor() as usize, p.y.floor() as usize);
			walls.contains(&coord)
		};
		NavGrid::new_built(
			GridSettings::new(
				Vec2::new(columns as f32 / 2.0, rows as f32 / 2.0),
				Vec2::new(columns as f32, rows as f32),
				1.0,
			),
			Arc::new(occupancy),
			Arc::new(OpenGround),
		)
	}
	/// World centre of a cell of [grid_with_walls]
	fn at(column: usize, row: usize) -> Vec2 {
		Vec2::new(column as f32 + 0.5, row as f32 + 0.5)
	}

	#[test]
	fn straight_corridor() {
		let mut grid = grid_with_walls(5, 1, &[]);
		let path = find_path(&mut grid, &PathQuery::new(at(0, 0), at(4, 0))).unwrap();
		assert_eq!(5, path.get_waypoints().len());
		assert_eq!(40, path.get_cost());
		assert_eq!(CellCoord::new(0, 0), path.get_cells()[0]);
		assert_eq!(Some(CellCoord::new(4, 0)), path.get_end());
		assert_eq!(at(2, 0), path.get_waypoints()[2]);
	}
	#[test]
	fn diagonal_cost() {
		let mut grid = grid_with_walls(3, 3, &[]);
		let path = find_path(&mut grid, &PathQuery::new(at(0, 0), at(2, 2))).unwrap();
		assert_eq!(28, path.get_cost());
		assert_eq!(3, path.len());
	}
	#[test]
	fn start_is_target() {
		let mut grid = grid_with_walls(3, 3, &[]);
		let path = find_path(&mut grid, &PathQuery::new(at(1, 1), at(1, 1))).unwrap();
		assert_eq!(1, path.len());
		assert_eq!(0, path.get_cost());
	}
	#[test]
	fn routes_around_wall() {
		//  _______________
		// |__|__|__|__|__|
		// |S_|x_|__|x_|T_|
		// |__|x_|__|x_|__|
		// |__|x_|__|x_|__|
		let mut grid = grid_with_walls(5, 4, &[(1, 0), (1, 1), (1, 2), (3, 0), (3, 1), (3, 2)]);
		let path = find_path(&mut grid, &PathQuery::new(at(0, 2), at(4, 2))).unwrap();
		for cell in path.get_cells() {
			assert!(grid.is_walkable(*cell));
		}
		assert_eq!(CellCoord::new(0, 2), path.get_cells()[0]);
		assert_eq!(Some(CellCoord::new(4, 2)), path.get_end());
		// up one row diagonally, across, down diagonally
		assert_eq!(14 + 10 + 10 + 14, path.get_cost());
	}
	#[test]
	fn consecutive_cells_adjacent() {
		let mut grid = grid_with_walls(6, 6, &[(2, 1), (2, 2), (2, 3), (2, 4), (4, 5), (4, 4)]);
		let path = find_path(&mut grid, &PathQuery::new(at(0, 3), at(5, 5))).unwrap();
		for pair in path.get_cells().windows(2) {
			let dx = pair[0].get_column().abs_diff(pair[1].get_column());
			let dy = pair[0].get_row().abs_diff(pair[1].get_row());
			assert!(dx <= 1 && dy <= 1);
		}
	}
	#[test]
	fn penalty_detour() {
		// a penalty across the middle of row 0 makes the path climb to row 1
		let mut grid = NavGrid::new_built(
			GridSettings::new(Vec2::new(2.5, 1.0), Vec2::new(5.0, 2.0), 1.0),
			Arc::new(OpenGround),
			Arc::new(|p: Vec2| if p.y < 1.0 && p.x > 1.0 && p.x < 4.0 { 100 } else { 0 }),
		);
		let path = find_path(&mut grid, &PathQuery::new(at(0, 0), at(4, 0))).unwrap();
		assert!(path.get_cells().iter().any(|c| c.get_row() == 1));
		assert_eq!(14 + 10 + 10 + 14, path.get_cost());
	}
	#[test]
	fn unreachable_without_fallback() {
		let mut grid = grid_with_walls(5, 3, &[(3, 0), (3, 1), (3, 2)]);
		let path = find_path(&mut grid, &PathQuery::new(at(0, 1), at(4, 1)));
		assert!(path.is_none());
	}
	#[test]
	fn unreachable_with_fallback() {
		let mut grid = grid_with_walls(5, 3, &[(3, 0), (3, 1), (3, 2)]);
		let query = PathQuery::new(at(0, 1), at(4, 1)).with_fallback(true);
		let path = find_path(&mut grid, &query).unwrap();
		assert_eq!(Some(CellCoord::new(2, 1)), path.get_end());
		assert_eq!(20, path.get_cost());
	}
	#[test]
	fn fallback_to_start_fails() {
		// the start is boxed in
		let mut grid = grid_with_walls(5, 3, &[(1, 0), (1, 1), (1, 2)]);
		let query = PathQuery::new(at(0, 1), at(4, 1)).with_fallback(true);
		let path = find_path(&mut grid, &query);
		assert!(path.is_none());
	}
	#[test]
	fn footprint_blocks_narrow_gap() {
		// a single cell gap in a wall at column 2
		let walls: &'static [(usize, usize)] = &[(2, 0), (2, 1), (2, 3), (2, 4)];
		let mut grid = grid_with_walls(5, 5, walls);
		let query = PathQuery::new(at(0, 2), at(4, 2));
		assert!(find_path(&mut grid, &query).is_some());
		let wide = query.with_footprint(Footprint::new_box(Vec2::new(0.4, 0.9)));
		assert!(find_path(&mut grid, &wide).is_none());
	}
	#[test]
	fn off_centre_points_use_containing_cells() {
		let mut grid = grid_with_walls(5, 3, &[]);
		let query = PathQuery::new(Vec2::new(0.95, 1.05), Vec2::new(4.1, 1.9));
		let path = find_path(&mut grid, &query).unwrap();
		assert_eq!(CellCoord::new(0, 1), path.get_cells()[0]);
		assert_eq!(Some(CellCoord::new(4, 1)), path.get_end());
		assert_eq!(40, path.get_cost());
	}
	#[test]
	fn repeated_searches_agree() {
		let mut grid = grid_with_walls(8, 8, &[(3, 3), (3, 4), (4, 3), (5, 6)]);
		let query = PathQuery::new(at(0, 0), at(7, 7));
		let first = find_path(&mut grid, &query).unwrap();
		let second = find_path(&mut grid, &query).unwrap();
		assert_eq!(first.get_cost(), second.get_cost());
		assert_eq!(first.len(), second.len());
	}
	#[test]
	fn simplified_keeps_turns() {
		let cells = vec![
			CellCoord::new(0, 0),
			CellCoord::new(1, 1),
			CellCoord::new(2, 2),
			CellCoord::new(3, 2),
			CellCoord::new(4, 2),
		];
		let result = simplify_path(&cells);
		let actual = vec![CellCoord::new(0, 0), CellCoord::new(2, 2), CellCoord::new(4, 2)];
		assert_eq!(actual, result);
	}
	#[test]
	fn simplify_is_opt_in() {
		let mut grid = grid_with_walls(5, 1, &[]);
		let query = PathQuery::new(at(0, 0), at(4, 0));
		let full = find_path(&mut grid, &query).unwrap();
		assert_eq!(5, full.len());
		let simple = find_path(&mut grid, &query.with_simplify(true)).unwrap();
		assert_eq!(2, simple.len());
		assert_eq!(40, simple.get_cost());
	}
	#[test]
	fn builds_unbuilt_grid() {
		let mut grid = NavGrid::new(GridSettings::new(Vec2::new(2.5, 0.5), Vec2::new(5.0, 1.0), 1.0));
		let path = find_path(&mut grid, &PathQuery::new(at(0, 0), at(4, 0))).unwrap();
		assert!(grid.is_built());
		assert_eq!(40, path.get_cost());
	}
}
