//! The [NavGrid] divides a rectangle of the world into square cells of equal size.
//!
//! The rectangle is described by [GridSettings], a centre, a size and the diameter of a cell.
//! The number of cells along each axis is the world size divided by the cell diameter rounded
//! to the nearest whole number. Cell `(0, 0)` sits in the bottom-left (south-west) corner:
//!
//! ```text
//!  row
//!   ^  _______________________
//!   | |     |     |     |     |
//!   3 | 0,3 | 1,3 | 2,3 | 3,3 |
//!   | |_____|_____|_____|_____|
//!   | |     |     |     |     |
//!   2 | 0,2 | 1,2 | 2,2 | 3,2 |
//!   | |_____|_____|_____|_____|
//!   | |     |     |     |     |
//!   1 | 0,1 | 1,1 | 2,1 | 3,1 |
//!   | |_____|_____|_____|_____|
//!   | |     |     |     |     |
//!   0 | 0,0 | 1,0 | 2,0 | 3,0 |
//!   | |_____|_____|_____|_____|
//!   +-----0-----1-----2-----3----> column
//! ```
//!
//! Cells are stored in a flat arena (`row * columns + column`) so the search engines can refer
//! to them, and to their neighbours, by index. Building the grid asks the [OccupancyQuery] and
//! [TerrainQuery] about every cell centre and precomputes both neighbour lists. A build discards
//! any obstacle state, use [ObstacleOverlay::reattach_all] afterwards.
//!
//! In 2d the grid plane is world `x, y`. The `3d` feature adds helpers treating the grid plane
//! as world `x, z`.
//!

pub mod cell;
pub mod composite;
pub mod cost_map;
pub mod queries;

use std::sync::Arc;

use bevy::prelude::*;

use crate::prelude::*;

/// Describes the rectangle of the world covered by a [NavGrid] and the size of its cells
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct GridSettings {
	/// Centre of the grid on the grid plane
	world_center: Vec2,
	/// Length and depth of the covered rectangle
	world_size: Vec2,
	/// Width of a single cell
	cell_diameter: f32,
}

impl Default for GridSettings {
	fn default() -> Self {
		GridSettings {
			world_center: Vec2::ZERO,
			world_size: Vec2::new(10.0, 10.0),
			cell_diameter: 1.0,
		}
	}
}

impl GridSettings {
	/// Create a new instance of [GridSettings], the world size and cell diameter must be positive
	pub fn new(world_center: Vec2, world_size: Vec2, cell_diameter: f32) -> Self {
		if !(cell_diameter > 0.0) {
			panic!(
				"Grid cell diameter must be positive, got {}",
				cell_diameter
			);
		}
		if !(world_size.x > 0.0 && world_size.y > 0.0) {
			panic!(
				"Grid world size must be positive on both axes, got ({}, {})",
				world_size.x, world_size.y
			);
		}
		GridSettings {
			world_center,
			world_size,
			cell_diameter,
		}
	}
	/// From a `ron` file generate the [GridSettings]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening GridSettings file");
		let settings: GridSettings = match ron::de::from_reader(file) {
			Ok(settings) => settings,
			Err(e) => panic!("Failed deserializing GridSettings: {}", e),
		};
		GridSettings::new(
			settings.world_center,
			settings.world_size,
			settings.cell_diameter,
		)
	}
	pub fn get_world_center(&self) -> Vec2 {
		self.world_center
	}
	pub fn get_world_size(&self) -> Vec2 {
		self.world_size
	}
	pub fn get_cell_diameter(&self) -> f32 {
		self.cell_diameter
	}
	pub fn get_cell_radius(&self) -> f32 {
		self.cell_diameter / 2.0
	}
	/// Number of `(columns, rows)` the settings produce, at least one of each
	pub fn get_cell_counts(&self) -> (usize, usize) {
		let columns = (self.world_size.x / self.cell_diameter).round() as usize;
		let rows = (self.world_size.y / self.cell_diameter).round() as usize;
		if columns == 0 || rows == 0 {
			warn!(
				"Grid of size {:?} cannot fit a cell of diameter {}, using a single cell",
				self.world_size, self.cell_diameter
			);
		}
		(columns.max(1), rows.max(1))
	}
	/// South-west corner of the covered rectangle
	pub fn get_bottom_left(&self) -> Vec2 {
		self.world_center - self.world_size / 2.0
	}
}

/// A rectangle of cells described by its four extreme cells, produced by
/// [NavGrid::cells_spanning_box]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSpan {
	/// Western most cell
	left: CellCoord,
	/// Eastern most cell
	right: CellCoord,
	/// Southern most cell
	bottom: CellCoord,
	/// Northern most cell
	top: CellCoord,
}

impl CellSpan {
	pub fn get_left(&self) -> CellCoord {
		self.left
	}
	pub fn get_right(&self) -> CellCoord {
		self.right
	}
	pub fn get_bottom(&self) -> CellCoord {
		self.bottom
	}
	pub fn get_top(&self) -> CellCoord {
		self.top
	}
	/// Is `coord` inside the rectangle
	pub fn contains(&self, coord: CellCoord) -> bool {
		coord.get_column() >= self.left.get_column()
			&& coord.get_column() <= self.right.get_column()
			&& coord.get_row() >= self.bottom.get_row()
			&& coord.get_row() <= self.top.get_row()
	}
	/// Number of cells inside the rectangle, never `0` as a span holds at least its centre cell
	pub fn get_cell_count(&self) -> usize {
		(self.right.get_column() - self.left.get_column() + 1)
			* (self.top.get_row() - self.bottom.get_row() + 1)
	}

	/// Iterate over every cell of the rectangle, row by row from the south
	pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
		let columns = self.left.get_column()..=self.right.get_column();
		let rows = self.bottom.get_row()..=self.top.get_row();
		rows.flat_map(move |row| columns.clone().map(move |column| CellCoord::new(column, row)))
	}
}

/// A grid of [NavCell]s covering a rectangle of the world
#[derive(Component, Clone)]
pub struct NavGrid {
	/// Area covered and size of cells
	settings: GridSettings,
	/// Number of cells along `x`
	columns: usize,
	/// Number of cells along `y` (or `z` in 3d)
	rows: usize,
	/// Arena of cells, `row * columns + column`
	cells: Vec<NavCell>,
	/// Decides static walkability during a build
	occupancy: Arc<dyn OccupancyQuery>,
	/// Decides terrain penalties during a build
	terrain: Arc<dyn TerrainQuery>,
	/// Incremented by every build
	generation: u64,
}

impl Default for NavGrid {
	fn default() -> Self {
		NavGrid::new(GridSettings::default())
	}
}

impl std::fmt::Debug for NavGrid {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NavGrid")
			.field("settings", &self.settings)
			.field("columns", &self.columns)
			.field("rows", &self.rows)
			.field("generation", &self.generation)
			.finish()
	}
}

impl NavGrid {
	/// Create a new unbuilt [NavGrid] over open ground, call [NavGrid::build] (or let a search
	/// do it) before querying cells
	pub fn new(settings: GridSettings) -> Self {
		NavGrid::with_queries(settings, Arc::new(OpenGround), Arc::new(OpenGround))
	}
	/// Create a new unbuilt [NavGrid] which uses the given collaborators when it is built
	pub fn with_queries(
		settings: GridSettings,
		occupancy: Arc<dyn OccupancyQuery>,
		terrain: Arc<dyn TerrainQuery>,
	) -> Self {
		let (columns, rows) = settings.get_cell_counts();
		NavGrid {
			settings,
			columns,
			rows,
			cells: Vec::new(),
			occupancy,
			terrain,
			generation: 0,
		}
	}
	/// Create a new [NavGrid] and build it straight away
	pub fn new_built(
		settings: GridSettings,
		occupancy: Arc<dyn OccupancyQuery>,
		terrain: Arc<dyn TerrainQuery>,
	) -> Self {
		let mut grid = NavGrid::with_queries(settings, occupancy, terrain);
		grid.build();
		grid
	}
	/// Replace the occupancy collaborator, takes effect on the next build
	pub fn set_occupancy_query(&mut self, occupancy: Arc<dyn OccupancyQuery>) {
		self.occupancy = occupancy;
	}
	/// Replace the terrain collaborator, takes effect on the next build
	pub fn set_terrain_query(&mut self, terrain: Arc<dyn TerrainQuery>) {
		self.terrain = terrain;
	}
	/// Replace the settings, takes effect on the next build
	pub fn set_settings(&mut self, settings: GridSettings) {
		self.settings = settings;
	}
	pub fn get_settings(&self) -> &GridSettings {
		&self.settings
	}
	pub fn get_columns(&self) -> usize {
		self.columns
	}
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	pub fn get_cell_count(&self) -> usize {
		self.cells.len()
	}
	/// Number of builds performed, a result computed against an older generation is stale
	pub fn get_generation(&self) -> u64 {
		self.generation
	}
	pub fn is_built(&self) -> bool {
		!self.cells.is_empty()
	}
	/// (Re)create every cell from the settings and collaborators, then wire up the neighbour
	/// lists. Attached obstacles and scratch values are discarded
	pub fn build(&mut self) {
		let (columns, rows) = self.settings.get_cell_counts();
		self.columns = columns;
		self.rows = rows;
		let diameter = self.settings.get_cell_diameter();
		let radius = self.settings.get_cell_radius();
		let bottom_left = self.settings.get_bottom_left();
		let mut cells = Vec::with_capacity(columns * rows);
		for row in 0..rows {
			for column in 0..columns {
				let world_position = bottom_left
					+ Vec2::new(
						column as f32 * diameter + radius,
						row as f32 * diameter + radius,
					);
				let walkable = !self.occupancy.is_obstructed(world_position, radius);
				let penalty = self.terrain.movement_penalty(world_position);
				cells.push(NavCell::new(
					CellCoord::new(column, row),
					world_position,
					walkable,
					penalty,
				));
			}
		}
		for index in 0..cells.len() {
			let coord = cells[index].get_coord();
			let mut all = Vec::with_capacity(8);
			let mut cardinal = Vec::with_capacity(4);
			for ordinal in Ordinal::ALL {
				if let Some(n) = ordinal.step_from(coord, columns, rows) {
					let n_index = n.get_row() * columns + n.get_column();
					all.push(n_index);
					if !ordinal.is_diagonal() {
						cardinal.push(n_index);
					}
				}
			}
			cells[index].set_neighbours(all, cardinal);
		}
		self.cells = cells;
		self.generation += 1;
		debug!(
			"Built grid of {} x {} cells, generation {}",
			columns, rows, self.generation
		);
	}
	/// Build the grid if it hasn't been built yet
	pub fn ensure_built(&mut self) {
		if !self.is_built() {
			debug!("Grid queried before being built, building now");
			self.build();
		}
	}
	/// Panic with a helpful message when the grid has no cells
	fn assert_built(&self) {
		if !self.is_built() {
			panic!("NavGrid has not been built, call `build()` before querying cells");
		}
	}
	/// Arena index of a cell
	pub fn get_index(&self, coord: CellCoord) -> usize {
		if coord.get_column() >= self.columns || coord.get_row() >= self.rows {
			panic!(
				"Cannot index NavGrid, out of bounds. Asked for column {}, row {}, grid has {} columns and {} rows",
				coord.get_column(),
				coord.get_row(),
				self.columns,
				self.rows
			);
		}
		coord.get_row() * self.columns + coord.get_column()
	}
	/// Coordinate of the cell at an arena index
	pub fn get_coord(&self, index: usize) -> CellCoord {
		CellCoord::new(index % self.columns, index / self.columns)
	}
	/// Direct `O(1)` access to a cell, panics when the indices are out of bounds
	pub fn cell_at(&self, column: usize, row: usize) -> &NavCell {
		self.assert_built();
		let index = self.get_index(CellCoord::new(column, row));
		&self.cells[index]
	}
	/// Access a cell by its [CellCoord], panics when out of bounds
	pub fn get_cell(&self, coord: CellCoord) -> &NavCell {
		self.cell_at(coord.get_column(), coord.get_row())
	}
	/// Mutable access to a cell by its [CellCoord], panics when out of bounds
	pub(crate) fn get_cell_mut(&mut self, coord: CellCoord) -> &mut NavCell {
		self.assert_built();
		let index = self.get_index(coord);
		&mut self.cells[index]
	}
	/// All cells of the arena
	pub fn get_cells(&self) -> &[NavCell] {
		&self.cells
	}
	/// All cells of the arena, mutably
	pub(crate) fn get_cells_mut(&mut self) -> &mut [NavCell] {
		&mut self.cells
	}
	/// Is the cell walkable, panics when out of bounds
	pub fn is_walkable(&self, coord: CellCoord) -> bool {
		self.get_cell(coord).is_walkable()
	}
	/// Movement penalty of the cell, panics when out of bounds
	pub fn get_movement_penalty(&self, coord: CellCoord) -> i32 {
		self.get_cell(coord).get_movement_penalty()
	}
	/// Centre of a cell, computed from the settings so it works on an unbuilt grid too
	pub fn get_world_position(&self, coord: CellCoord) -> Vec2 {
		let diameter = self.settings.get_cell_diameter();
		let radius = self.settings.get_cell_radius();
		self.settings.get_bottom_left()
			+ Vec2::new(
				coord.get_column() as f32 * diameter + radius,
				coord.get_row() as f32 * diameter + radius,
			)
	}
	/// Find the cell nearest to a world position, the cell containing it when inside the grid.
	/// Positions outside the grid are clamped onto its edge so this never fails for a built grid
	pub fn cell_from_world_position(&self, position: Vec2) -> CellCoord {
		self.assert_built();
		let diameter = self.settings.get_cell_diameter();
		let offset = (position - self.settings.get_bottom_left()) / diameter;
		let column = (offset.x.floor().max(0.0) as usize).min(self.columns - 1);
		let row = (offset.y.floor().max(0.0) as usize).min(self.rows - 1);
		CellCoord::new(column, row)
	}
	/// Is a world position strictly within the rectangle covered by the grid
	pub fn is_inside_grid(&self, position: Vec2) -> bool {
		let center = self.settings.get_world_center();
		let half = self.settings.get_world_size() / 2.0;
		(position.x - center.x).abs() < half.x && (position.y - center.y).abs() < half.y
	}
	/// Starting from `center` walk outward along each axis while the next cell still overlaps
	/// the box `world_center ± half_extents`, returning the extreme cells
	pub fn cells_spanning_box(
		&self,
		center: CellCoord,
		world_center: Vec2,
		half_extents: Vec2,
	) -> CellSpan {
		self.assert_built();
		let radius = self.settings.get_cell_radius();
		let min = world_center - half_extents;
		let max = world_center + half_extents;
		let column = center.get_column();
		let row = center.get_row();

		let mut left = column;
		while left > 0 && self.cell_at(left - 1, row).get_world_position().x + radius > min.x {
			left -= 1;
		}
		let mut right = column;
		while right + 1 < self.columns
			&& self.cell_at(right + 1, row).get_world_position().x - radius < max.x
		{
			right += 1;
		}
		let mut bottom = row;
		while bottom > 0
			&& self.cell_at(column, bottom - 1).get_world_position().y + radius > min.y
		{
			bottom -= 1;
		}
		let mut top = row;
		while top + 1 < self.rows && self.cell_at(column, top + 1).get_world_position().y - radius < max.y
		{
			top += 1;
		}
		CellSpan {
			left: CellCoord::new(left, row),
			right: CellCoord::new(right, row),
			bottom: CellCoord::new(column, bottom),
			top: CellCoord::new(column, top),
		}
	}
	/// Write a computed [FlowField] into the cells, ignored when the field was computed against
	/// an older build of the grid. Returns whether the field was applied
	pub fn apply_flow_field(&mut self, field: &FlowField) -> bool {
		if field.get_generation() != self.generation || field.get_cell_count() != self.cells.len() {
			return false;
		}
		for (index, cell) in self.cells.iter_mut().enumerate() {
			cell.set_flow_state(field.get_costs()[index], field.get_directions()[index]);
		}
		true
	}
	/// Find the cell nearest to a 3d world position, the grid plane being `x, z`
	#[cfg(feature = "3d")]
	pub fn cell_from_xyz(&self, position: Vec3) -> CellCoord {
		self.cell_from_world_position(Vec2::new(position.x, position.z))
	}
	/// Get the 3d position of a cell centre at `y = 0`, the grid plane being `x, z`
	#[cfg(feature = "3d")]
	pub fn get_xyz_from_cell(&self, coord: CellCoord) -> Vec3 {
		let p = self.get_world_position(coord);
		Vec3::new(p.x, 0.0, p.y)
	}
	/// Is a 3d world position strictly within the grid, the grid plane being `x, z`
	#[cfg(feature = "3d")]
	pub fn is_inside_grid_xyz(&self, position: Vec3) -> bool {
		self.is_inside_grid(Vec2::new(position.x, position.z))
	}
}
