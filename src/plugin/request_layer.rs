//! Logic for turning request events into scheduled work and publishing the outcomes
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Ask for an A* path across each grid
#[derive(Event)]
pub struct EventPathRequest {
	/// Start, target and options of the search
	query: PathQuery,
	/// Agent the path is for, a newer request of the same agent replaces a queued older one
	agent: Option<AgentId>,
}

impl EventPathRequest {
	/// Create a new instance of [EventPathRequest]
	pub fn new(query: PathQuery) -> Self {
		EventPathRequest { query, agent: None }
	}
	/// Request a path on behalf of an agent
	pub fn for_agent(agent: impl Into<AgentId>, query: PathQuery) -> Self {
		EventPathRequest {
			query,
			agent: Some(agent.into()),
		}
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_query(&self) -> &PathQuery {
		&self.query
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_agent(&self) -> Option<AgentId> {
		self.agent
	}
}

/// Ask for a flow field over each grid
#[derive(Event)]
pub struct EventFlowFieldRequest {
	/// Targets and options of the field
	query: FlowQuery,
	/// Agent (or squad) the field is for
	agent: Option<AgentId>,
}

impl EventFlowFieldRequest {
	/// Create a new instance of [EventFlowFieldRequest]
	pub fn new(query: FlowQuery) -> Self {
		EventFlowFieldRequest { query, agent: None }
	}
	/// Request a field on behalf of an agent
	pub fn for_agent(agent: impl Into<AgentId>, query: FlowQuery) -> Self {
		EventFlowFieldRequest {
			query,
			agent: Some(agent.into()),
		}
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_query(&self) -> &FlowQuery {
		&self.query
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_agent(&self) -> Option<AgentId> {
		self.agent
	}
}

/// Cancel the queued request of an agent, a request already being computed still completes
#[derive(Event)]
pub struct EventCancelRequest(pub AgentId);

/// Outcome of an [EventPathRequest]
#[derive(Event, Clone, Debug)]
pub struct EventPathResult {
	/// Entity holding the grid that was searched
	grid: Entity,
	/// ID the scheduler assigned to the request
	id: RequestId,
	/// Agent the path is for
	agent: Option<AgentId>,
	/// `None` when no path exists
	path: Option<AStarPath>,
}

impl EventPathResult {
	#[cfg(not(tarpaulin_include))]
	pub fn get_grid(&self) -> Entity {
		self.grid
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_id(&self) -> RequestId {
		self.id
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_agent(&self) -> Option<AgentId> {
		self.agent
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_path(&self) -> Option<&AStarPath> {
		self.path.as_ref()
	}
}

/// Outcome of an [EventFlowFieldRequest]
#[derive(Event, Clone, Debug)]
pub struct EventFlowFieldResult {
	/// Entity holding the grid the field covers
	grid: Entity,
	/// ID the scheduler assigned to the request
	id: RequestId,
	/// Agent the field is for
	agent: Option<AgentId>,
	/// `None` when the field was discarded because the grid was rebuilt
	field: Option<FlowField>,
}

impl EventFlowFieldResult {
	#[cfg(not(tarpaulin_include))]
	pub fn get_grid(&self) -> Entity {
		self.grid
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_id(&self) -> RequestId {
		self.id
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_agent(&self) -> Option<AgentId> {
		self.agent
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_field(&self) -> Option<&FlowField> {
		self.field.as_ref()
	}
}

/// Process [EventPathRequest] and [EventFlowFieldRequest] and queue them with each [PathScheduler]
#[cfg(not(tarpaulin_include))]
pub fn event_insert_request_queue(
	mut path_events: EventReader<EventPathRequest>,
	mut flow_events: EventReader<EventFlowFieldRequest>,
	mut query: Query<&mut PathScheduler>,
) {
	for event in path_events.read() {
		for mut scheduler in query.iter_mut() {
			let request = PathRequest::new_path(event.get_query().clone());
			let id = match event.get_agent() {
				Some(agent) => scheduler.submit_for_agent(agent, request),
				None => scheduler.submit(request),
			};
			trace!("Queued path request {:?}", id);
		}
	}
	for event in flow_events.read() {
		for mut scheduler in query.iter_mut() {
			let request = PathRequest::new_flow_field(event.get_query().clone());
			let id = match event.get_agent() {
				Some(agent) => scheduler.submit_for_agent(agent, request),
				None => scheduler.submit(request),
			};
			trace!("Queued flow field request {:?}", id);
		}
	}
}

/// Read [EventCancelRequest] and drop the agent's queued request
#[cfg(not(tarpaulin_include))]
pub fn process_cancel_events(
	mut events: EventReader<EventCancelRequest>,
	mut query: Query<&mut PathScheduler>,
) {
	for event in events.read() {
		for mut scheduler in query.iter_mut() {
			if !scheduler.cancel_agent(event.0) {
				trace!("Nothing queued to cancel for {:?}", event.0);
			}
		}
	}
}

/// Advance each scheduler by one step
#[cfg(not(tarpaulin_include))]
pub fn tick_schedulers(
	mut query: Query<(&mut NavGrid, &mut ObstacleOverlay, &mut PathScheduler)>,
) {
	for (mut grid, mut overlay, mut scheduler) in query.iter_mut() {
		if let Some(id) = scheduler.tick(&mut grid, &mut overlay) {
			debug!("Completed request {:?}", id);
		}
	}
}

/// Drain the completed requests of each scheduler and send them as result events
#[cfg(not(tarpaulin_include))]
pub fn publish_completed_requests(
	mut query: Query<(Entity, &mut PathScheduler)>,
	mut path_results: EventWriter<EventPathResult>,
	mut flow_results: EventWriter<EventFlowFieldResult>,
) {
	for (grid, mut scheduler) in query.iter_mut() {
		for completed in scheduler.drain_completed() {
			let id = completed.get_id();
			let agent = completed.get_agent();
			match completed.into_outcome() {
				PathOutcome::Path(path) => {
					path_results.write(EventPathResult {
						grid,
						id,
						agent,
						path,
					});
				}
				PathOutcome::FlowField(field) => {
					flow_results.write(EventFlowFieldResult {
						grid,
						id,
						agent,
						field,
					});
				}
			}
		}
	}
}
