//! Logic for laying dynamic obstacles over a [NavGrid] and rebuilding the grid when the static
//! world changes
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Add an obstacle to every grid, or replace it when the ID is already in use. The obstacle
/// claims its cells when the overlay is next flushed
#[derive(Event)]
pub struct EventUpsertObstacle {
	/// ID of the obstacle, usually derived from the entity representing it
	id: ObstacleId,
	/// Outline of the obstacle
	shape: ObstacleShape,
	/// Blocking or penalizing
	kind: ObstacleKind,
	/// Position on the grid plane
	position: Vec2,
}

impl EventUpsertObstacle {
	/// Create a new instance of [EventUpsertObstacle]
	#[cfg(not(tarpaulin_include))]
	pub fn new(id: ObstacleId, shape: ObstacleShape, kind: ObstacleKind, position: Vec2) -> Self {
		EventUpsertObstacle {
			id,
			shape,
			kind,
			position,
		}
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_id(&self) -> ObstacleId {
		self.id
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_shape(&self) -> ObstacleShape {
		self.shape
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_kind(&self) -> ObstacleKind {
		self.kind
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_position(&self) -> Vec2 {
		self.position
	}
}

/// Move an existing obstacle
#[derive(Event)]
pub struct EventMoveObstacle {
	/// Obstacle to move
	id: ObstacleId,
	/// New position on the grid plane
	position: Vec2,
}

impl EventMoveObstacle {
	/// Create a new instance of [EventMoveObstacle]
	#[cfg(not(tarpaulin_include))]
	pub fn new(id: ObstacleId, position: Vec2) -> Self {
		EventMoveObstacle { id, position }
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_id(&self) -> ObstacleId {
		self.id
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_position(&self) -> Vec2 {
		self.position
	}
}

/// Remove an obstacle, its cells are restored when the overlay is next flushed
#[derive(Event)]
pub struct EventRemoveObstacle(pub ObstacleId);

/// Rebuild every grid from its occupancy and terrain queries, typically after level geometry
/// has changed. Obstacles are re-attached afterwards
#[derive(Event)]
pub struct EventRebuildGrid;

/// Read obstacle events and apply them to each [ObstacleOverlay]. Changes are coalesced into the
/// overlay's pending set and flushed by the scheduler on its next tick
#[cfg(not(tarpaulin_include))]
pub fn process_obstacle_events(
	mut upserts: EventReader<EventUpsertObstacle>,
	mut moves: EventReader<EventMoveObstacle>,
	mut removals: EventReader<EventRemoveObstacle>,
	mut query: Query<&mut ObstacleOverlay>,
) {
	let upserts: Vec<&EventUpsertObstacle> = upserts.read().collect();
	let moves: Vec<&EventMoveObstacle> = moves.read().collect();
	let removals: Vec<&EventRemoveObstacle> = removals.read().collect();
	if upserts.is_empty() && moves.is_empty() && removals.is_empty() {
		return;
	}
	for mut overlay in query.iter_mut() {
		for event in upserts.iter() {
			overlay.insert_with_id(
				event.get_id(),
				event.get_shape(),
				event.get_kind(),
				event.get_position(),
			);
		}
		for event in moves.iter() {
			if !overlay.set_position(event.get_id(), event.get_position()) {
				warn!("Cannot move unknown obstacle {:?}", event.get_id());
			}
		}
		for event in removals.iter() {
			if !overlay.queue_removal(event.0) {
				warn!("Cannot remove unknown obstacle {:?}", event.0);
			}
		}
	}
}

/// Read [EventRebuildGrid] and ask each scheduler to rebuild its grid on its next tick
#[cfg(not(tarpaulin_include))]
pub fn process_rebuild_events(
	mut events: EventReader<EventRebuildGrid>,
	mut query: Query<&mut PathScheduler>,
) {
	// several systems may ask for a rebuild in the same frame, one is enough
	if events.read().count() > 0 {
		for mut scheduler in query.iter_mut() {
			debug!("Grid rebuild requested");
			scheduler.request_rebuild();
		}
	}
}
