//! The [PathScheduler] serialises path and flow field requests against a single [NavGrid].
//!
//! Requests are queued first-in first-out and exactly one is in flight at a time, which lets the
//! search engines use the scratch values stored on each cell without them ever being shared. The
//! scheduler is cooperative, it only makes progress when the host calls [PathScheduler::tick]
//! (once per frame). A request taken off the queue computes on the next tick, after it completes
//! the next queued request is started straight away and computes on the tick after that:
//!
//! ```text
//! submit(a) submit(b)      tick            tick            tick
//!     |         |           |               |               |
//!  a started  b queued   a computes      b computes      idle
//!                        a completes     b completes
//!                        b started
//! ```
//!
//! A request which is still queued can be cancelled, once started it always runs to completion
//! and reports its outcome. The outcome is handed to the request's callback, or posted to a
//! mailbox drained with [PathScheduler::drain_completed] when it has none.
//!
//! Flow fields over large grids may run on a worker thread ([FlowDispatch::Background]). The
//! worker reads a snapshot of the grid, and while it runs the scheduler holds back obstacle flushes
//! and grid rebuilds so the grid only ever has one writer.
//!

use std::collections::{BTreeMap, VecDeque};
use std::thread::JoinHandle;

use bevy::prelude::*;

use crate::prelude::*;

/// Unique ID of a request submitted to a [PathScheduler]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct RequestId(u64);

impl RequestId {
	pub fn get(&self) -> u64 {
		self.0
	}
}

/// Identity of the agent a request is made for
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct AgentId(u64);

impl AgentId {
	/// Create a new instance of [AgentId]
	pub fn new(id: u64) -> Self {
		AgentId(id)
	}
	pub fn get(&self) -> u64 {
		self.0
	}
}

impl From<Entity> for AgentId {
	fn from(entity: Entity) -> Self {
		AgentId(entity.to_bits())
	}
}

/// Called once with the outcome of a request
pub type PathCallback = Box<dyn FnOnce(RequestId, PathOutcome) + Send + Sync>;

/// What a request asks for
#[derive(Clone, Debug)]
pub enum RequestKind {
	/// An A* path
	Path(PathQuery),
	/// A flow field
	FlowField(FlowQuery),
}

/// What a request produced
#[derive(Clone, Debug, PartialEq)]
pub enum PathOutcome {
	/// Result of an A* search, `None` when no path exists
	Path(Option<AStarPath>),
	/// Result of a flow field calculation, `None` when it was discarded
	FlowField(Option<FlowField>),
}

impl PathOutcome {
	/// Did the request produce a path or field
	pub fn is_found(&self) -> bool {
		match self {
			PathOutcome::Path(path) => path.is_some(),
			PathOutcome::FlowField(field) => field.is_some(),
		}
	}
}

/// A request waiting to be scheduled
pub struct PathRequest {
	/// What to compute
	kind: RequestKind,
	/// Agent the request is for
	agent: Option<AgentId>,
	/// Receives the outcome, otherwise it goes to the mailbox
	callback: Option<PathCallback>,
}

impl std::fmt::Debug for PathRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PathRequest")
			.field("kind", &self.kind)
			.field("agent", &self.agent)
			.field("callback", &self.callback.is_some())
			.finish()
	}
}

impl PathRequest {
	/// Create a new A* request
	pub fn new_path(query: PathQuery) -> Self {
		PathRequest {
			kind: RequestKind::Path(query),
			agent: None,
			callback: None,
		}
	}
	/// Create a new flow field request
	pub fn new_flow_field(query: FlowQuery) -> Self {
		PathRequest {
			kind: RequestKind::FlowField(query),
			agent: None,
			callback: None,
		}
	}
	pub fn with_agent(mut self, agent: AgentId) -> Self {
		self.agent = Some(agent);
		self
	}
	/// Deliver the outcome to `callback` instead of the mailbox
	pub fn with_callback<F>(mut self, callback: F) -> Self
	where
		F: FnOnce(RequestId, PathOutcome) + Send + Sync + 'static,
	{
		self.callback = Some(Box::new(callback));
		self
	}
	pub fn get_kind(&self) -> &RequestKind {
		&self.kind
	}
	pub fn get_agent(&self) -> Option<AgentId> {
		self.agent
	}
}

/// Outcome of a request which had no callback
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedRequest {
	/// Request the outcome belongs to
	id: RequestId,
	/// Agent the request was for
	agent: Option<AgentId>,
	/// What the request produced
	outcome: PathOutcome,
}

impl CompletedRequest {
	pub fn get_id(&self) -> RequestId {
		self.id
	}
	pub fn get_agent(&self) -> Option<AgentId> {
		self.agent
	}
	pub fn get_outcome(&self) -> &PathOutcome {
		&self.outcome
	}
	/// Take ownership of the outcome
	pub fn into_outcome(self) -> PathOutcome {
		self.outcome
	}
}

/// Where flow field requests are computed
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum FlowDispatch {
	/// On the calling thread during the tick
	#[default]
	Inline,
	/// On a worker thread, collected by a later tick
	Background,
}

/// Progress of a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
	/// Waiting behind other requests, can still be cancelled
	Queued,
	/// Started, will report an outcome
	InFlight,
	/// Completed, cancelled or never submitted
	Unknown,
}

/// Work remaining for the request in flight
enum Work {
	/// Not computed yet
	Pending(RequestKind),
	/// Flow field computing on a worker thread
	Running(JoinHandle<FlowField>),
}

/// A request that has been assigned an ID
struct Scheduled {
	/// ID handed back on submission
	id: RequestId,
	/// Agent the request is for
	agent: Option<AgentId>,
	/// Receives the outcome
	callback: Option<PathCallback>,
	/// What is left to do
	work: Work,
}

/// Single-flight queue of path and flow field requests
#[derive(Component, Default)]
pub struct PathScheduler {
	/// Requests waiting their turn
	queue: VecDeque<Scheduled>,
	/// The request being computed
	in_flight: Option<Scheduled>,
	/// Latest request of each agent
	agent_requests: BTreeMap<AgentId, RequestId>,
	/// Outcomes of requests without a callback
	completed: Vec<CompletedRequest>,
	/// Next ID to hand out
	next_id: u64,
	/// Where flow fields are computed
	flow_dispatch: FlowDispatch,
	/// A grid rebuild has been asked for
	rebuild_requested: bool,
}

impl PathScheduler {
	/// Create a new instance of [PathScheduler]
	pub fn new(flow_dispatch: FlowDispatch) -> Self {
		PathScheduler {
			flow_dispatch,
			..Default::default()
		}
	}
	pub fn get_flow_dispatch(&self) -> FlowDispatch {
		self.flow_dispatch
	}
	/// Queue a request, starting it straight away when nothing is in flight
	pub fn submit(&mut self, request: PathRequest) -> RequestId {
		let id = RequestId(self.next_id);
		self.next_id += 1;
		if let Some(agent) = request.agent {
			self.agent_requests.insert(agent, id);
		}
		self.queue.push_back(Scheduled {
			id,
			agent: request.agent,
			callback: request.callback,
			work: Work::Pending(request.kind),
		});
		if self.in_flight.is_none() {
			self.start_next();
		}
		id
	}
	/// Queue a request for `agent`, cancelling its previous request if that is still queued.
	/// An agent therefore never has more than one request waiting
	pub fn submit_for_agent(&mut self, agent: AgentId, request: PathRequest) -> RequestId {
		if let Some(previous) = self.agent_requests.get(&agent).copied() {
			if self.cancel(previous) {
				trace!("Replaced stale request {:?} of {:?}", previous, agent);
			}
		}
		self.submit(request.with_agent(agent))
	}
	/// Cancel a queued request, its callback will never be called. Returns `false` when the
	/// request has already started, completed or doesn't exist
	pub fn cancel(&mut self, id: RequestId) -> bool {
		let Some(position) = self.queue.iter().position(|s| s.id == id) else {
			return false;
		};
		if let Some(scheduled) = self.queue.remove(position) {
			if let Some(agent) = scheduled.agent {
				if self.agent_requests.get(&agent) == Some(&id) {
					self.agent_requests.remove(&agent);
				}
			}
			debug!("Cancelled request {:?}", id);
			true
		} else {
			false
		}
	}
	/// Cancel the queued request of `agent`. Returns `false` when the agent has nothing queued
	pub fn cancel_agent(&mut self, agent: AgentId) -> bool {
		match self.agent_requests.get(&agent).copied() {
			Some(id) => self.cancel(id),
			None => false,
		}
	}
	/// Latest request submitted for `agent` that has not completed
	pub fn get_agent_request(&self, agent: AgentId) -> Option<RequestId> {
		self.agent_requests.get(&agent).copied()
	}
	/// Progress of a request
	pub fn get_state(&self, id: RequestId) -> RequestState {
		if self.in_flight.as_ref().is_some_and(|s| s.id == id) {
			RequestState::InFlight
		} else if self.queue.iter().any(|s| s.id == id) {
			RequestState::Queued
		} else {
			RequestState::Unknown
		}
	}
	/// ID of the request being computed
	pub fn get_in_flight(&self) -> Option<RequestId> {
		self.in_flight.as_ref().map(|s| s.id)
	}
	/// Number of requests waiting behind the one in flight
	pub fn get_queue_len(&self) -> usize {
		self.queue.len()
	}
	/// Nothing queued and nothing in flight
	pub fn is_idle(&self) -> bool {
		self.in_flight.is_none() && self.queue.is_empty()
	}
	/// Is a flow field being computed on a worker thread
	pub fn is_background_running(&self) -> bool {
		matches!(
			self.in_flight,
			Some(Scheduled {
				work: Work::Running(_),
				..
			})
		)
	}
	/// Ask for the grid to be rebuilt (and obstacles re-attached) on the next tick where no
	/// worker is reading it
	pub fn request_rebuild(&mut self) {
		self.rebuild_requested = true;
	}
	pub fn is_rebuild_requested(&self) -> bool {
		self.rebuild_requested
	}
	/// Take the outcomes of completed requests which had no callback
	pub fn drain_completed(&mut self) -> Vec<CompletedRequest> {
		std::mem::take(&mut self.completed)
	}
	/// Advance the scheduler by one step. Returns the ID of the request that completed, if any
	pub fn tick(&mut self, grid: &mut NavGrid, obstacles: &mut ObstacleOverlay) -> Option<RequestId> {
		if self.is_background_running() {
			if self.rebuild_requested || obstacles.has_pending() {
				trace!("Grid writes deferred while a flow field is computing");
			}
		} else {
			if self.rebuild_requested {
				self.rebuild_requested = false;
				grid.build();
				obstacles.reattach_all(grid);
			}
			if obstacles.has_pending() {
				obstacles.flush(grid);
			}
		}
		let scheduled = self.in_flight.take()?;
		let Scheduled {
			id,
			agent,
			callback,
			work,
		} = scheduled;
		let outcome = match work {
			Work::Pending(RequestKind::Path(query)) => PathOutcome::Path(find_path(grid, &query)),
			Work::Pending(RequestKind::FlowField(query)) => match self.flow_dispatch {
				FlowDispatch::Inline => PathOutcome::FlowField(Some(compute_flow_field(grid, &query))),
				FlowDispatch::Background => {
					grid.ensure_built();
					let input = FlowFieldInput::from_grid(grid, &query);
					let handle = std::thread::spawn(move || input.calculate());
					self.in_flight = Some(Scheduled {
						id,
						agent,
						callback,
						work: Work::Running(handle),
					});
					return None;
				}
			},
			Work::Running(handle) => {
				if !handle.is_finished() {
					self.in_flight = Some(Scheduled {
						id,
						agent,
						callback,
						work: Work::Running(handle),
					});
					return None;
				}
				match handle.join() {
					Ok(field) => {
						if grid.apply_flow_field(&field) {
							PathOutcome::FlowField(Some(field))
						} else {
							warn!("Discarding flow field of {:?}, the grid was rebuilt", id);
							PathOutcome::FlowField(None)
						}
					}
					Err(_) => {
						error!("Flow field worker of {:?} panicked", id);
						PathOutcome::FlowField(None)
					}
				}
			}
		};
		self.complete(id, agent, callback, outcome);
		Some(id)
	}
	/// Deliver an outcome and start the next queued request
	fn complete(
		&mut self,
		id: RequestId,
		agent: Option<AgentId>,
		callback: Option<PathCallback>,
		outcome: PathOutcome,
	) {
		if let Some(agent) = agent {
			if self.agent_requests.get(&agent) == Some(&id) {
				self.agent_requests.remove(&agent);
			}
		}
		match callback {
			Some(callback) => callback(id, outcome),
			None => self.completed.push(CompletedRequest { id, agent, outcome }),
		}
		self.start_next();
	}
	/// Move the head of the queue in flight
	fn start_next(&mut self) {
		if self.in_flight.is_none() {
			self.in_flight = self.queue.pop_front();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	/// A built 5x1 corridor of 1 unit cells with its south-west corner on the origin
	fn corridor() -> (NavGrid, ObstacleOverlay) {
		let mut grid = NavGrid::new(GridSettings::new(
			Vec2::new(2.5, 0.5),
			Vec2::new(5.0, 1.0),
			1.0,
		));
		grid.build();
		(grid, ObstacleOverlay::default())
	}
	/// Path request across the corridor
	fn across() -> PathRequest {
		PathRequest::new_path(PathQuery::new(Vec2::new(0.5, 0.5), Vec2::new(4.5, 0.5)))
	}

	#[test]
	fn submit_starts_immediately() {
		let mut scheduler = PathScheduler::default();
		let a = scheduler.submit(across());
		let b = scheduler.submit(across());
		assert_eq!(RequestState::InFlight, scheduler.get_state(a));
		assert_eq!(RequestState::Queued, scheduler.get_state(b));
		assert_eq!(1, scheduler.get_queue_len());
	}
	#[test]
	fn one_completion_per_tick() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		let a = scheduler.submit(across());
		let b = scheduler.submit(across());
		assert_eq!(Some(a), scheduler.tick(&mut grid, &mut obstacles));
		assert_eq!(Some(b), scheduler.get_in_flight());
		assert_eq!(Some(b), scheduler.tick(&mut grid, &mut obstacles));
		assert_eq!(None, scheduler.tick(&mut grid, &mut obstacles));
		assert!(scheduler.is_idle());
		let completed = scheduler.drain_completed();
		assert_eq!(2, completed.len());
		assert_eq!(a, completed[0].get_id());
		match completed[0].get_outcome() {
			PathOutcome::Path(Some(path)) => assert_eq!(40, path.get_cost()),
			other => panic!("Unexpected outcome {:?}", other),
		}
	}
	#[test]
	fn callbacks_in_submission_order() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		let order = Arc::new(Mutex::new(Vec::new()));
		let mut ids = Vec::new();
		for _ in 0..3 {
			let order = order.clone();
			ids.push(scheduler.submit(across().with_callback(move |id, outcome| {
				assert!(outcome.is_found());
				order.lock().unwrap().push(id);
			})));
		}
		while !scheduler.is_idle() {
			scheduler.tick(&mut grid, &mut obstacles);
		}
		assert_eq!(ids, *order.lock().unwrap());
		assert!(scheduler.drain_completed().is_empty());
	}
	#[test]
	fn cancel_queued() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		let fired = Arc::new(Mutex::new(Vec::new()));
		let a_fired = fired.clone();
		let a = scheduler.submit(across().with_callback(move |id, _| a_fired.lock().unwrap().push(id)));
		let b_fired = fired.clone();
		let b = scheduler.submit(across().with_callback(move |id, _| b_fired.lock().unwrap().push(id)));
		assert!(scheduler.cancel(b));
		assert!(!scheduler.cancel(b));
		while !scheduler.is_idle() {
			scheduler.tick(&mut grid, &mut obstacles);
		}
		assert_eq!(vec![a], *fired.lock().unwrap());
	}
	#[test]
	fn cancel_in_flight_fails() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		let fired = Arc::new(Mutex::new(0));
		let counter = fired.clone();
		let a = scheduler.submit(across().with_callback(move |_, _| *counter.lock().unwrap() += 1));
		assert!(!scheduler.cancel(a));
		scheduler.tick(&mut grid, &mut obstacles);
		assert_eq!(1, *fired.lock().unwrap());
		assert!(!scheduler.cancel(a));
		assert!(!scheduler.cancel(RequestId(99)));
	}
	#[test]
	fn agent_replaces_stale_request() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		let agent = AgentId::new(7);
		let blocker = scheduler.submit(across());
		let first = scheduler.submit_for_agent(agent, across());
		let second = scheduler.submit_for_agent(agent, across());
		assert_eq!(RequestState::Unknown, scheduler.get_state(first));
		assert_eq!(RequestState::Queued, scheduler.get_state(second));
		while !scheduler.is_idle() {
			scheduler.tick(&mut grid, &mut obstacles);
		}
		let ids: Vec<RequestId> = scheduler.drain_completed().iter().map(|c| c.get_id()).collect();
		assert_eq!(vec![blocker, second], ids);
	}
	#[test]
	fn cancel_by_agent() {
		let mut scheduler = PathScheduler::default();
		let agent = AgentId::new(3);
		scheduler.submit(across());
		let id = scheduler.submit_for_agent(agent, across());
		assert_eq!(Some(id), scheduler.get_agent_request(agent));
		assert!(scheduler.cancel_agent(agent));
		assert_eq!(None, scheduler.get_agent_request(agent));
		assert!(!scheduler.cancel_agent(agent));
	}
	#[test]
	fn agent_in_flight_not_replaced() {
		let mut scheduler = PathScheduler::default();
		let agent = AgentId::new(1);
		let first = scheduler.submit_for_agent(agent, across());
		let second = scheduler.submit_for_agent(agent, across());
		assert_eq!(RequestState::InFlight, scheduler.get_state(first));
		assert_eq!(RequestState::Queued, scheduler.get_state(second));
	}
	#[test]
	fn no_path_reported() {
		let (mut grid, mut obstacles) = corridor();
		let wall = obstacles.insert(
			ObstacleShape::Circle { radius: 0.3 },
			ObstacleKind::Blocking,
			Vec2::new(2.5, 0.5),
		);
		let mut scheduler = PathScheduler::default();
		scheduler.submit(across());
		scheduler.tick(&mut grid, &mut obstacles);
		assert!(obstacles.get(wall).is_some());
		let completed = scheduler.drain_completed();
		assert_eq!(PathOutcome::Path(None), *completed[0].get_outcome());
	}
	#[test]
	fn inline_flow_field() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::new(FlowDispatch::Inline);
		let query = FlowQuery::new(vec![FlowTarget::new(Vec2::new(0.5, 0.5), 0)]);
		scheduler.submit(PathRequest::new_flow_field(query));
		scheduler.tick(&mut grid, &mut obstacles);
		let completed = scheduler.drain_completed();
		match completed[0].get_outcome() {
			PathOutcome::FlowField(Some(field)) => {
				assert_eq!(4, field.get_cost(CellCoord::new(4, 0)));
			}
			other => panic!("Unexpected outcome {:?}", other),
		}
		assert_eq!(Ordinal::West, grid.cell_at(4, 0).get_best_direction());
	}
	#[test]
	fn background_flow_field() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::new(FlowDispatch::Background);
		let query = FlowQuery::new(vec![FlowTarget::new(Vec2::new(0.5, 0.5), 0)]);
		let id = scheduler.submit(PathRequest::new_flow_field(query));
		let path = scheduler.submit(across());
		assert_eq!(None, scheduler.tick(&mut grid, &mut obstacles));
		let mut completed = None;
		for _ in 0..1000 {
			if let Some(done) = scheduler.tick(&mut grid, &mut obstacles) {
				completed = Some(done);
				break;
			}
			std::thread::sleep(std::time::Duration::from_millis(1));
		}
		assert_eq!(Some(id), completed);
		assert_eq!(Some(path), scheduler.get_in_flight());
		assert_eq!(3, grid.cell_at(3, 0).get_best_cost());
	}
	#[test]
	fn obstacles_flushed_on_tick() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		obstacles.insert(
			ObstacleShape::Circle { radius: 0.3 },
			ObstacleKind::Penalty(50),
			Vec2::new(2.5, 0.5),
		);
		scheduler.tick(&mut grid, &mut obstacles);
		assert!(!obstacles.has_pending());
		assert_eq!(50, grid.get_movement_penalty(CellCoord::new(2, 0)));
	}
	#[test]
	fn rebuild_reattaches_obstacles() {
		let (mut grid, mut obstacles) = corridor();
		let mut scheduler = PathScheduler::default();
		obstacles.insert(
			ObstacleShape::Circle { radius: 0.3 },
			ObstacleKind::Blocking,
			Vec2::new(2.5, 0.5),
		);
		scheduler.tick(&mut grid, &mut obstacles);
		scheduler.request_rebuild();
		scheduler.tick(&mut grid, &mut obstacles);
		assert!(!scheduler.is_rebuild_requested());
		assert_eq!(2, grid.get_generation());
		assert!(!grid.is_walkable(CellCoord::new(2, 0)));
	}
}
