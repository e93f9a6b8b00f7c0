//! A [FlowField] answers "which way should I go" for every cell of a [NavGrid] at once, which
//! suits crowds heading to the same places.
//!
//! Calculating a field happens in two passes:
//!
//! 1. Every cell's best cost is reset to [UNREACHABLE_COST] and each target cell is seeded with
//!    the negated weight of its target, so heavier targets are more attractive. A breadth-first
//!    wavefront then spreads from the seeds over orthogonal neighbours, a neighbour taking
//!    `current + FLOW_BASE_COST + penalty` whenever that beats its current value. Unwalkable
//!    cells (and cells the [Footprint] rejects) are never entered
//! 2. Every cell looks at its neighbours (orthogonal only, or all 8 when diagonals are allowed)
//!    and points at the one with the lowest cost, provided it is lower than its own. Cells with
//!    no better neighbour, targets and unreachable cells, point nowhere ([Ordinal::Zero])
//!
//! With a single target of weight `0` in the centre and no penalties:
//!
//! ```text
//!  _____________________________
//! |     |     |     |     |     |
//! |  4  |  3  |  2  |  3  |  4  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  3  |  2  |  1  |  2  |  3  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  2  |  1  |  0  |  1  |  2  |
//! |_____|_____|_____|_____|_____|
//! ```
//!
//! Every step adds [FLOW_BASE_COST] on top of the penalty of the cell entered rather than the
//! penalty alone, otherwise a field without penalties would be flat and point nowhere.
//!
//! The passes read an immutable [FlowFieldInput] snapshot of the grid so they can run on a worker
//! thread. The resulting field remembers the grid generation it was computed against and
//! [NavGrid::apply_flow_field] refuses it if the grid has been rebuilt since.
//!

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::prelude::*;

/// Best cost of a cell no target can reach
pub const UNREACHABLE_COST: i32 = i32::MAX;
/// Cost of stepping into an unpenalized cell
pub const FLOW_BASE_COST: i32 = 1;

/// A destination of a [FlowField]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowTarget {
	/// World position of the target
	position: Vec2,
	/// Attractiveness, the target cell is seeded with `-weight`
	weight: i32,
}

impl FlowTarget {
	/// Create a new instance of [FlowTarget]
	pub fn new(position: Vec2, weight: i32) -> Self {
		FlowTarget { position, weight }
	}
	pub fn get_position(&self) -> Vec2 {
		self.position
	}
	pub fn get_weight(&self) -> i32 {
		self.weight
	}
}

/// Describes a single flow field calculation
#[derive(Clone, Debug, Default)]
pub struct FlowQuery {
	/// Destinations
	targets: Vec<FlowTarget>,
	/// Allow directions to point diagonally
	diagonal: bool,
	/// Space the agents need, `None` for point sized agents
	footprint: Option<Footprint>,
}

impl FlowQuery {
	/// Create a new instance of [FlowQuery] with orthogonal directions only
	pub fn new(targets: Vec<FlowTarget>) -> Self {
		FlowQuery {
			targets,
			diagonal: false,
			footprint: None,
		}
	}
	pub fn with_diagonal(mut self, diagonal: bool) -> Self {
		self.diagonal = diagonal;
		self
	}
	pub fn with_footprint(mut self, footprint: Footprint) -> Self {
		self.footprint = Some(footprint);
		self
	}
	pub fn get_targets(&self) -> &[FlowTarget] {
		&self.targets
	}
	pub fn is_diagonal(&self) -> bool {
		self.diagonal
	}
	pub fn get_footprint(&self) -> Option<&Footprint> {
		self.footprint.as_ref()
	}
}

/// Snapshot of everything a flow field calculation needs from a [NavGrid]
#[derive(Clone, Debug)]
pub struct FlowFieldInput {
	/// Number of columns of the grid
	columns: usize,
	/// Number of rows of the grid
	rows: usize,
	/// Generation of the grid the snapshot was taken from
	generation: u64,
	/// Whether each cell can be entered
	passable: Vec<bool>,
	/// Cost of entering each cell
	step_costs: Vec<i32>,
	/// Arena index and seed cost of each target
	seeds: Vec<(usize, i32)>,
	/// Allow diagonal directions
	diagonal: bool,
}

impl FlowFieldInput {
	/// Take a snapshot of `grid` for `query`, the grid must be built
	pub fn from_grid(grid: &NavGrid, query: &FlowQuery) -> Self {
		let cells = grid.get_cells();
		let passable = cells
			.iter()
			.map(|cell| {
				cell.is_walkable()
					&& query
						.footprint
						.as_ref()
						.is_none_or(|f| f.can_occupy(grid, cell.get_coord()))
			})
			.collect();
		let step_costs = cells
			.iter()
			.map(|cell| FLOW_BASE_COST + cell.get_movement_penalty())
			.collect();
		let seeds = query
			.targets
			.iter()
			.map(|t| {
				let index = grid.get_index(grid.cell_from_world_position(t.position));
				(index, -t.weight)
			})
			.collect();
		FlowFieldInput {
			columns: grid.get_columns(),
			rows: grid.get_rows(),
			generation: grid.get_generation(),
			passable,
			step_costs,
			seeds,
			diagonal: query.diagonal,
		}
	}
	/// Run both passes over the snapshot
	pub fn calculate(&self) -> FlowField {
		let count = self.columns * self.rows;
		let mut costs = vec![UNREACHABLE_COST; count];
		let mut queue = VecDeque::new();
		for (index, seed) in self.seeds.iter() {
			// targets sharing a cell keep the most attractive seed
			if *seed < costs[*index] {
				costs[*index] = *seed;
				queue.push_back(*index);
			}
		}
		while let Some(current) = queue.pop_front() {
			let coord = self.coord(current);
			for ordinal in Ordinal::CARDINALS {
				let Some(n) = ordinal.step_from(coord, self.columns, self.rows) else {
					continue;
				};
				let n_index = self.index(n);
				if !self.passable[n_index] {
					continue;
				}
				let cost = costs[current].saturating_add(self.step_costs[n_index]);
				if cost < costs[n_index] {
					costs[n_index] = cost;
					queue.push_back(n_index);
				}
			}
		}
		let scan: &[Ordinal] = if self.diagonal {
			&Ordinal::ALL
		} else {
			&Ordinal::CARDINALS
		};
		let mut directions = vec![Ordinal::Zero; count];
		for (index, direction) in directions.iter_mut().enumerate() {
			let coord = self.coord(index);
			let mut best = costs[index];
			for ordinal in scan.iter() {
				if let Some(n) = ordinal.step_from(coord, self.columns, self.rows) {
					let n_cost = costs[self.index(n)];
					if n_cost < best {
						best = n_cost;
						*direction = *ordinal;
					}
				}
			}
		}
		FlowField {
			columns: self.columns,
			rows: self.rows,
			generation: self.generation,
			costs,
			directions,
		}
	}
	/// Coordinate of an arena index
	fn coord(&self, index: usize) -> CellCoord {
		CellCoord::new(index % self.columns, index / self.columns)
	}
	/// Arena index of a coordinate
	fn index(&self, coord: CellCoord) -> usize {
		coord.get_row() * self.columns + coord.get_column()
	}
}

/// Best cost and direction of every cell of a [NavGrid]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
	/// Number of columns of the grid
	columns: usize,
	/// Number of rows of the grid
	rows: usize,
	/// Generation of the grid the field was computed against
	generation: u64,
	/// Best cost per cell, [UNREACHABLE_COST] where no target reaches
	costs: Vec<i32>,
	/// Direction to move in per cell
	directions: Vec<Ordinal>,
}

impl FlowField {
	pub fn get_columns(&self) -> usize {
		self.columns
	}
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	pub fn get_generation(&self) -> u64 {
		self.generation
	}
	pub fn get_cell_count(&self) -> usize {
		self.costs.len()
	}
	pub fn get_costs(&self) -> &[i32] {
		&self.costs
	}
	pub fn get_directions(&self) -> &[Ordinal] {
		&self.directions
	}
	/// Arena index of a cell, panics when out of bounds
	fn index(&self, coord: CellCoord) -> usize {
		if coord.get_column() >= self.columns || coord.get_row() >= self.rows {
			panic!(
				"Cannot read FlowField, out of bounds. Asked for column {}, row {}, field has {} columns and {} rows",
				coord.get_column(),
				coord.get_row(),
				self.columns,
				self.rows
			);
		}
		coord.get_row() * self.columns + coord.get_column()
	}
	/// Best cost of a cell
	pub fn get_cost(&self, coord: CellCoord) -> i32 {
		self.costs[self.index(coord)]
	}
	/// Direction to move in from a cell
	pub fn get_direction(&self, coord: CellCoord) -> Ordinal {
		self.directions[self.index(coord)]
	}
	/// Direction to move in from a world position of `grid`
	pub fn get_direction_at(&self, grid: &NavGrid, position: Vec2) -> Ordinal {
		self.get_direction(grid.cell_from_world_position(position))
	}
	/// Can any target be reached from a cell
	pub fn is_reachable(&self, coord: CellCoord) -> bool {
		self.get_cost(coord) != UNREACHABLE_COST
	}
}

/// Calculate a [FlowField] for `query` over `grid`, building the grid first if need be, and
/// write the best costs and directions into its cells
pub fn compute_flow_field(grid: &mut NavGrid, query: &FlowQuery) -> FlowField {
	grid.ensure_built();
	let field = FlowFieldInput::from_grid(grid, query).calculate();
	grid.apply_flow_field(&field);
	field
}
