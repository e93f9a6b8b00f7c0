//! Dynamic obstacles laid over a [NavGrid].
//!
//! An [Obstacle] is either blocking (cells it overlaps become unwalkable) or penalizing (cells it
//! overlaps become more expensive), never both. The [ObstacleOverlay] owns the obstacles and
//! keeps track of which cells each one has claimed, cells only hold the [ObstacleId]s. A cell's
//! walkability and penalty are recomputed from its attached IDs whenever one attaches or
//! detaches, so attaching twice has no extra effect and detaching restores the cell exactly.
//!
//! Moving obstacles every frame would thrash the grid, so moves only mark an obstacle as pending.
//! [ObstacleOverlay::flush] then applies every pending change in a single pass, each touched
//! cell being recomputed once.
//!
//! The footprint of an obstacle is found by taking the cells spanning its bounding box, grown by
//! one cell radius, and keeping those whose centre passes a shape test:
//!
//! ```text
//!  _____________________________
//! |     |     |     |     |     |
//! |     |  .  |  .  |  .  |     |   . candidate from the bounding box
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |     |  x  |  x  |  x  |     |   x claimed, the shape reaches the cell
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |     |  .  |  x  |  .  |     |
//! |_____|_____|_____|_____|_____|
//! ```
//!

use std::collections::{BTreeMap, BTreeSet};

use bevy::prelude::*;

use crate::prelude::*;

/// Unique ID of an [Obstacle] within an [ObstacleOverlay]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct ObstacleId(u64);

impl ObstacleId {
	/// Create a new instance of [ObstacleId]
	pub fn new(id: u64) -> Self {
		ObstacleId(id)
	}
	pub fn get(&self) -> u64 {
		self.0
	}
}

impl From<Entity> for ObstacleId {
	fn from(entity: Entity) -> Self {
		ObstacleId(entity.to_bits())
	}
}

/// Effect of an obstacle on the cells it overlaps
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Reflect)]
pub enum ObstacleKind {
	/// Overlapped cells become unwalkable
	Blocking,
	/// Overlapped cells have their movement penalty raised by this amount
	Penalty(i32),
}

/// Outline of an obstacle on the grid plane, relative to its position
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Debug, Reflect)]
pub enum ObstacleShape {
	/// Axis aligned box centred on the position
	Box { half_extents: Vec2 },
	/// Circle centred on the position
	Circle { radius: f32 },
	/// Axis aligned bounds derived from an external collider, offsets from the position
	Bounds { min: Vec2, max: Vec2 },
}

impl ObstacleShape {
	/// Bounding box `(center, half_extents)` of the shape placed at `position`
	pub fn get_bounding_box(&self, position: Vec2) -> (Vec2, Vec2) {
		match self {
			ObstacleShape::Box { half_extents } => (position, *half_extents),
			ObstacleShape::Circle { radius } => (position, Vec2::splat(*radius)),
			ObstacleShape::Bounds { min, max } => {
				let center = position + (*min + *max) / 2.0;
				(center, (*max - *min).abs() / 2.0)
			}
		}
	}
	/// Does the shape placed at `position` reach a cell centred on `cell_center`
	pub fn overlaps_cell(&self, position: Vec2, cell_center: Vec2, cell_radius: f32) -> bool {
		match self {
			ObstacleShape::Circle { radius } => {
				position.distance(cell_center) < radius + cell_radius
			}
			ObstacleShape::Box { .. } | ObstacleShape::Bounds { .. } => {
				let (center, half_extents) = self.get_bounding_box(position);
				let closest = cell_center.clamp(center - half_extents, center + half_extents);
				closest.distance(cell_center) <= cell_radius
			}
		}
	}
}

/// A dynamic obstacle
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
	/// Outline of the obstacle
	shape: ObstacleShape,
	/// Blocking or penalizing
	kind: ObstacleKind,
	/// Position of the obstacle on the grid plane
	position: Vec2,
	/// Cells the obstacle is currently attached to
	claimed: Vec<CellCoord>,
}

impl Obstacle {
	/// Create a new instance of [Obstacle] which hasn't claimed any cells yet
	pub fn new(shape: ObstacleShape, kind: ObstacleKind, position: Vec2) -> Self {
		Obstacle {
			shape,
			kind,
			position,
			claimed: Vec::new(),
		}
	}
	pub fn get_shape(&self) -> ObstacleShape {
		self.shape
	}
	pub fn get_kind(&self) -> ObstacleKind {
		self.kind
	}
	pub fn get_position(&self) -> Vec2 {
		self.position
	}
	/// Cells the obstacle is currently attached to
	pub fn get_claimed(&self) -> &[CellCoord] {
		&self.claimed
	}
	/// Cells of `grid` the obstacle would claim at its current position
	pub fn compute_footprint(&self, grid: &NavGrid) -> Vec<CellCoord> {
		let radius = grid.get_settings().get_cell_radius();
		let (center, half_extents) = self.shape.get_bounding_box(self.position);
		let center_cell = grid.cell_from_world_position(center);
		grid.cells_spanning_box(center_cell, center, half_extents + Vec2::splat(radius))
			.iter()
			.filter(|coord| {
				let cell_center = grid.get_cell(*coord).get_world_position();
				self.shape.overlaps_cell(self.position, cell_center, radius)
			})
			.collect()
	}
}

/// Owner of every [Obstacle] laid over a [NavGrid]
#[derive(Component, Clone, Debug, Default)]
pub struct ObstacleOverlay {
	/// Obstacles by ID
	obstacles: BTreeMap<ObstacleId, Obstacle>,
	/// Obstacles whose footprint needs recomputing on the next flush
	pending: BTreeSet<ObstacleId>,
	/// Obstacles to drop on the next flush
	removals: BTreeSet<ObstacleId>,
	/// Next ID handed out by [ObstacleOverlay::insert]
	next_id: u64,
}

impl ObstacleOverlay {
	/// Add an obstacle, it claims cells on the next [ObstacleOverlay::flush] or [ObstacleOverlay::attach]
	pub fn insert(&mut self, shape: ObstacleShape, kind: ObstacleKind, position: Vec2) -> ObstacleId {
		while self.obstacles.contains_key(&ObstacleId(self.next_id)) {
			self.next_id += 1;
		}
		let id = ObstacleId(self.next_id);
		self.next_id += 1;
		self.insert_with_id(id, shape, kind, position);
		id
	}
	/// Add or replace an obstacle under a caller chosen ID, marking it pending. A replaced
	/// obstacle keeps its claims until the next flush and a queued removal of the ID is dropped
	pub fn insert_with_id(
		&mut self,
		id: ObstacleId,
		shape: ObstacleShape,
		kind: ObstacleKind,
		position: Vec2,
	) {
		match self.obstacles.get_mut(&id) {
			Some(obstacle) => {
				obstacle.shape = shape;
				obstacle.kind = kind;
				obstacle.position = position;
			}
			None => {
				self.obstacles.insert(id, Obstacle::new(shape, kind, position));
			}
		}
		self.removals.remove(&id);
		self.pending.insert(id);
	}
	pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
		self.obstacles.get(&id)
	}
	pub fn contains(&self, id: ObstacleId) -> bool {
		self.obstacles.contains_key(&id)
	}
	pub fn len(&self) -> usize {
		self.obstacles.len()
	}
	pub fn is_empty(&self) -> bool {
		self.obstacles.is_empty()
	}
	/// Iterate over every obstacle
	pub fn iter(&self) -> impl Iterator<Item = (&ObstacleId, &Obstacle)> {
		self.obstacles.iter()
	}
	/// Are there moves waiting for a flush
	pub fn has_pending(&self) -> bool {
		!self.pending.is_empty() || !self.removals.is_empty()
	}
	pub fn get_pending_count(&self) -> usize {
		self.pending.len() + self.removals.len()
	}
	/// Move an obstacle, the new footprint is applied on the next flush. Returns `false` for an unknown ID
	pub fn set_position(&mut self, id: ObstacleId, position: Vec2) -> bool {
		match self.obstacles.get_mut(&id) {
			Some(obstacle) => {
				if obstacle.position != position {
					obstacle.position = position;
					self.pending.insert(id);
				}
				true
			}
			None => false,
		}
	}
	/// Remove an obstacle, detaching it from its cells straight away
	pub fn remove(&mut self, id: ObstacleId, grid: &mut NavGrid) -> Option<Obstacle> {
		self.detach(id, grid);
		self.pending.remove(&id);
		self.removals.remove(&id);
		self.obstacles.remove(&id)
	}
	/// Remove an obstacle on the next flush. Returns `false` for an unknown ID
	pub fn queue_removal(&mut self, id: ObstacleId) -> bool {
		if self.obstacles.contains_key(&id) {
			self.pending.remove(&id);
			self.removals.insert(id);
			true
		} else {
			false
		}
	}
	/// Attach an obstacle to the cells under its current footprint, releasing any cells it
	/// claimed before. Returns the number of claimed cells
	pub fn attach(&mut self, id: ObstacleId, grid: &mut NavGrid) -> usize {
		let mut touched = BTreeSet::new();
		self.release_claims(id, grid, &mut touched);
		let claimed = self.claim_footprint(id, grid, &mut touched);
		self.pending.remove(&id);
		self.refresh_cells(grid, &touched);
		claimed
	}
	/// Detach an obstacle from every cell it claimed. Returns the number of released cells
	pub fn detach(&mut self, id: ObstacleId, grid: &mut NavGrid) -> usize {
		let mut touched = BTreeSet::new();
		let released = self.release_claims(id, grid, &mut touched);
		self.refresh_cells(grid, &touched);
		released
	}
	/// Apply every pending move and removal in a single pass. Returns the number of obstacles
	/// processed
	pub fn flush(&mut self, grid: &mut NavGrid) -> usize {
		if !self.has_pending() {
			return 0;
		}
		grid.ensure_built();
		let pending: Vec<ObstacleId> = std::mem::take(&mut self.pending).into_iter().collect();
		let removals: Vec<ObstacleId> = std::mem::take(&mut self.removals).into_iter().collect();
		let mut touched = BTreeSet::new();
		for id in pending.iter().chain(removals.iter()) {
			self.release_claims(*id, grid, &mut touched);
		}
		for id in removals.iter() {
			self.obstacles.remove(id);
		}
		for id in pending.iter() {
			self.claim_footprint(*id, grid, &mut touched);
		}
		self.refresh_cells(grid, &touched);
		trace!(
			"Flushed {} obstacles touching {} cells",
			pending.len() + removals.len(),
			touched.len()
		);
		pending.len() + removals.len()
	}
	/// Re-attach every obstacle after the grid has been rebuilt. The old claims refer to cells
	/// which no longer exist so they are dropped rather than released
	pub fn reattach_all(&mut self, grid: &mut NavGrid) {
		grid.ensure_built();
		for id in std::mem::take(&mut self.removals) {
			self.obstacles.remove(&id);
		}
		let ids: Vec<ObstacleId> = self.obstacles.keys().copied().collect();
		let mut touched = BTreeSet::new();
		for id in ids.iter() {
			if let Some(obstacle) = self.obstacles.get_mut(id) {
				obstacle.claimed.clear();
			}
			self.claim_footprint(*id, grid, &mut touched);
		}
		self.pending.clear();
		self.refresh_cells(grid, &touched);
		debug!("Re-attached {} obstacles", ids.len());
	}
	/// Remove the obstacle from each cell it claimed, recording the cells in `touched`
	fn release_claims(
		&mut self,
		id: ObstacleId,
		grid: &mut NavGrid,
		touched: &mut BTreeSet<CellCoord>,
	) -> usize {
		let Some(obstacle) = self.obstacles.get_mut(&id) else {
			return 0;
		};
		let claimed = std::mem::take(&mut obstacle.claimed);
		if !grid.is_built() {
			return 0;
		}
		let mut released = 0;
		for coord in claimed {
			if coord.get_column() < grid.get_columns() && coord.get_row() < grid.get_rows() {
				if grid.get_cell_mut(coord).detach_obstacle(id) {
					released += 1;
				}
				touched.insert(coord);
			}
		}
		released
	}
	/// Add the obstacle to every cell of its footprint, recording the cells in `touched`
	fn claim_footprint(
		&mut self,
		id: ObstacleId,
		grid: &mut NavGrid,
		touched: &mut BTreeSet<CellCoord>,
	) -> usize {
		grid.ensure_built();
		let Some(obstacle) = self.obstacles.get_mut(&id) else {
			return 0;
		};
		let footprint = obstacle.compute_footprint(grid);
		for coord in footprint.iter() {
			grid.get_cell_mut(*coord).attach_obstacle(id);
			touched.insert(*coord);
		}
		obstacle.claimed = footprint;
		obstacle.claimed.len()
	}
	/// Recompute walkability and penalty of each cell from the obstacles attached to it
	fn refresh_cells(&self, grid: &mut NavGrid, touched: &BTreeSet<CellCoord>) {
		for coord in touched.iter() {
			grid.get_cell_mut(*coord)
				.refresh_obstacle_state(|id| self.obstacles.get(&id).map(|o| o.kind));
		}
	}
}
