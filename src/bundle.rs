//! The [GridPathfindingBundle] spawns everything an entity needs to have paths and flow fields
//! calculated over an area of the world
//!

use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// A [NavGrid], the [ObstacleOverlay] laid over it and the [PathScheduler] serialising
/// requests against it
#[derive(Bundle)]
pub struct GridPathfindingBundle {
	/// Cells of the area
	grid: NavGrid,
	/// Dynamic obstacles
	obstacles: ObstacleOverlay,
	/// Queue of path and flow field requests
	scheduler: PathScheduler,
}

impl GridPathfindingBundle {
	/// Create a new instance of [GridPathfindingBundle] over open ground
	pub fn new(settings: GridSettings) -> Self {
		GridPathfindingBundle::new_with_queries(
			settings,
			Arc::new(OpenGround),
			Arc::new(OpenGround),
			FlowDispatch::default(),
		)
	}
	/// Create a new instance of [GridPathfindingBundle] whose static walkability and terrain
	/// penalties come from the given collaborators
	pub fn new_with_queries(
		settings: GridSettings,
		occupancy: Arc<dyn OccupancyQuery>,
		terrain: Arc<dyn TerrainQuery>,
		flow_dispatch: FlowDispatch,
	) -> Self {
		GridPathfindingBundle {
			grid: NavGrid::new_built(settings, occupancy, terrain),
			obstacles: ObstacleOverlay::default(),
			scheduler: PathScheduler::new(flow_dispatch),
		}
	}
	/// Create a new instance of [GridPathfindingBundle] whose walls and penalties are read from
	/// a [CostMap] laid over the same area
	pub fn new_with_cost_map(settings: GridSettings, cost_map: CostMap) -> Self {
		let cost_map = Arc::new(cost_map.with_world_bounds(
			settings.get_world_center(),
			settings.get_world_size(),
		));
		GridPathfindingBundle::new_with_queries(
			settings,
			cost_map.clone(),
			cost_map,
			FlowDispatch::default(),
		)
	}
	/// Create a new instance of [GridPathfindingBundle] where the [GridSettings] and the
	/// [CostMap] are derived from disk
	#[cfg(feature = "ron")]
	pub fn new_from_disk(settings_path: &str, cost_map_path: &str) -> Self {
		let settings = GridSettings::from_ron(settings_path.to_string());
		let cost_map = CostMap::from_ron(
			cost_map_path.to_string(),
			settings.get_world_center(),
			settings.get_world_size(),
		);
		GridPathfindingBundle::new_with_cost_map(settings, cost_map)
	}
	pub fn get_grid(&self) -> &NavGrid {
		&self.grid
	}
	pub fn get_obstacles(&self) -> &ObstacleOverlay {
		&self.obstacles
	}
	pub fn get_scheduler(&self) -> &PathScheduler {
		&self.scheduler
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn new_bundle() {
		let bundle = GridPathfindingBundle::new(GridSettings::new(
			Vec2::ZERO,
			Vec2::new(30.0, 30.0),
			1.0,
		));
		assert_eq!(900, bundle.get_grid().get_cell_count());
		assert!(bundle.get_grid().is_built());
		assert!(bundle.get_scheduler().is_idle());
	}
	#[test]
	fn cost_map_walls() {
		let mut cost_map = CostMap::new(4, 4, Vec2::ZERO, Vec2::ONE);
		// north-west corner
		cost_map.set_cost(255, 0, 0);
		cost_map.set_cost(40, 3, 3);
		let settings = GridSettings::new(Vec2::ZERO, Vec2::new(4.0, 4.0), 1.0);
		let bundle = GridPathfindingBundle::new_with_cost_map(settings, cost_map);
		let grid = bundle.get_grid();
		assert!(!grid.is_walkable(CellCoord::new(0, 3)));
		assert!(grid.is_walkable(CellCoord::new(0, 0)));
		assert_eq!(39, grid.get_movement_penalty(CellCoord::new(3, 0)));
	}
	#[test]
	#[cfg(feature = "ron")]
	fn bundle_from_disk() {
		let dir = env!("CARGO_MANIFEST_DIR").to_string();
		let bundle = GridPathfindingBundle::new_from_disk(
			&(dir.clone() + "/assets/grid_settings.ron"),
			&(dir + "/assets/cost_map.ron"),
		);
		assert_eq!(100, bundle.get_grid().get_cell_count());
		// the wall down column 4 stops two cells short of the southern edge
		assert!(!bundle.get_grid().is_walkable(CellCoord::new(4, 9)));
		assert!(bundle.get_grid().is_walkable(CellCoord::new(4, 1)));
	}
}
