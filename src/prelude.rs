//! `use bevy_grid_pathfinding_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::pathfinding::{
	astar::*,
	flow_field::*,
	footprint::*,
	grid::{cell::*, composite::*, cost_map::*, queries::*, *},
	heap::*,
	obstacles::*,
	scheduler::*,
	utilities::*,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{obstacle_layer::*, request_layer::*, *},
};
