//! Grid pathfinding for agents moving across a 2d plane (or the `x, z` plane of a 3d world).
//!
//! [Pathfinding basics (Sebastian Lague)](https://github.com/SebLague/Pathfinding)
//!
//! [Amit's A* pages](http://theory.stanford.edu/~amitp/GameProgramming/)
//!
//! [leifnode](https://leifnode.com/2013/12/flow-field-pathfinding/)
//!
//! A world area is divided into a uniform grid of square cells. Cells are indexed by
//! `(column, row)` from the bottom-left corner of the area, so moving North increases the row:
//!
//! ```text
//!   row
//!    ^ _____________________________
//!    ||__|__|__|__|__|__|__|__|__|__|
//!    ||__|__|__|__|__|__|__|__|__|__|
//!    ||__|__|__|__|__|__|__|__|__|__|
//!    ||__|__|__|__|__|__|__|__|__|__|
//!    ||__|__|__|__|__|__|__|__|__|__|
//!    ||x_|__|__|__|__|__|__|__|__|__|  x = (0, 0)
//!    +------------------------------> column
//! ```
//!
//! Definitions:
//!
//! * Cell - a square of the grid which is either walkable or blocked, and carries a movement
//! penalty making it more expensive to cross
//! * Obstacle - a dynamic shape laid over the grid which blocks or penalizes the cells it overlaps
//! * Footprint - the space an agent needs, larger agents skip cells that are too tight for them
//! * A* path - the cheapest route of cells from a start to a target, for individual agents
//! * Flow field - every cell stores its cost to the nearest target and the direction of its
//! cheapest neighbour, so a crowd steers by reading the cell it stands on
//! * Scheduler - serialises path and flow field requests so exactly one runs at a time
//!
//! Movement costs `10` orthogonally and `14` diagonally (A*) and the penalty of the entered cell
//! is added on top.
//!

pub mod astar;
pub mod flow_field;
pub mod footprint;
pub mod grid;
pub mod heap;
pub mod obstacles;
pub mod scheduler;
pub mod utilities;
