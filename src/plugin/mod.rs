//! Defines the Bevy [Plugin] for grid pathfinding
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod obstacle_layer;
pub mod request_layer;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Obstacle changes and new requests are read
	Intake,
	/// Schedulers advance
	Calculate,
	/// Outcomes are sent as events
	Publish,
}

pub struct GridPathfindingPlugin;

impl Plugin for GridPathfindingPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<Ordinal>()
			.register_type::<CellCoord>()
			.register_type::<GridSettings>()
			.register_type::<ObstacleId>()
			.register_type::<ObstacleKind>()
			.register_type::<ObstacleShape>()
			.register_type::<OutsideGridPolicy>()
			.register_type::<FlowDispatch>()
			.add_event::<obstacle_layer::EventUpsertObstacle>()
			.add_event::<obstacle_layer::EventMoveObstacle>()
			.add_event::<obstacle_layer::EventRemoveObstacle>()
			.add_event::<obstacle_layer::EventRebuildGrid>()
			.add_event::<request_layer::EventPathRequest>()
			.add_event::<request_layer::EventFlowFieldRequest>()
			.add_event::<request_layer::EventCancelRequest>()
			.add_event::<request_layer::EventPathResult>()
			.add_event::<request_layer::EventFlowFieldResult>()
			.configure_sets(
				Update,
				(
					OrderingSet::Intake,
					OrderingSet::Calculate,
					OrderingSet::Publish,
				)
					.chain(),
			)
			.add_systems(
				Update,
				(
					(
						obstacle_layer::process_obstacle_events,
						obstacle_layer::process_rebuild_events,
						request_layer::event_insert_request_queue,
						request_layer::process_cancel_events,
					)
						.chain()
						.in_set(OrderingSet::Intake),
					request_layer::tick_schedulers.in_set(OrderingSet::Calculate),
					request_layer::publish_completed_requests.in_set(OrderingSet::Publish),
				),
			);
	}
}
