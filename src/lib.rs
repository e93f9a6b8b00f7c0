//! This is a plugin for Bevy game engine to setup and handle grid based pathfinding, A* paths
//! for individual agents and flow fields for crowds, over a grid that dynamic obstacles can be
//! laid upon
//!

pub mod bundle;
pub mod pathfinding;
pub mod plugin;

pub mod prelude;
