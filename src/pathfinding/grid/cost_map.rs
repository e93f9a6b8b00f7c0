//! A [CostMap] lays a table of 8-bit costs over a rectangle of the world and answers both the
//! [OccupancyQuery] and the [TerrainQuery] of a [NavGrid] from it. A value of `1` is the default,
//! `255` means the ground is impassable (a wall or cliff) and any other value indicates ground
//! which is harder to cross, its movement penalty being `cost - 1`.
//!
//! The table doesn't need the same resolution as the grid, each query looks up the entry
//! underneath the point asked about. Tables are written the way they look on screen, the first
//! line is the northern edge of the rectangle:
//!
//! ```text
//!  _______________________________
//! |     |     |     |     |     |
//! |  1  |  1  |  1  |  1  |  1  |   <- line 0, north
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  1  | 255 | 255 |  1  |  1  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  1  |  1  |  30 |  30 |  1  |   <- line 2, south
//! |_____|_____|_____|_____|_____|
//! ```
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Cost value of ground that can never be crossed
pub const IMPASSABLE_COST: u8 = 255;

/// Table of costs covering a rectangle of the world
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CostMap {
	/// Entries per line
	columns: usize,
	/// Number of lines
	rows: usize,
	/// Line-major costs, line `0` is the northern edge
	costs: Vec<u8>,
	/// Centre of the covered rectangle
	#[cfg_attr(feature = "serde", serde(skip))]
	world_center: Vec2,
	/// Size of the covered rectangle
	#[cfg_attr(feature = "serde", serde(skip))]
	world_size: Vec2,
}

impl CostMap {
	/// Create a new [CostMap] of `columns` by `rows` entries set to `1`
	pub fn new(columns: usize, rows: usize, world_center: Vec2, world_size: Vec2) -> Self {
		if columns == 0 || rows == 0 {
			panic!(
				"CostMap requires at least one column and row, got {} x {}",
				columns, rows
			);
		}
		CostMap {
			columns,
			rows,
			costs: vec![1; columns * rows],
			world_center,
			world_size,
		}
	}
	/// Cover a different rectangle of the world with the same table
	pub fn with_world_bounds(mut self, world_center: Vec2, world_size: Vec2) -> Self {
		self.world_center = world_center;
		self.world_size = world_size;
		self
	}
	pub fn get_columns(&self) -> usize {
		self.columns
	}
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	/// Get the cost at `(column, line)`, line `0` being the northern edge
	pub fn get_cost(&self, column: usize, line: usize) -> u8 {
		if column >= self.columns || line >= self.rows {
			panic!("Cannot get a CostMap value, index out of bounds. Asked for column {}, line {}, map has {} columns and {} lines", column, line, self.columns, self.rows)
		}
		self.costs[line * self.columns + column]
	}
	/// Set the cost at `(column, line)`, line `0` being the northern edge
	pub fn set_cost(&mut self, value: u8, column: usize, line: usize) {
		if column >= self.columns || line >= self.rows {
			panic!("Cannot set a CostMap value, index out of bounds. Asked for column {}, line {}, map has {} columns and {} lines", column, line, self.columns, self.rows)
		}
		self.costs[line * self.columns + column] = value;
	}
	/// Cost of the entry under a world position, positions outside the map use the nearest edge entry
	pub fn get_cost_at(&self, point: Vec2) -> u8 {
		let bottom_left = self.world_center - self.world_size / 2.0;
		let percent_x = ((point.x - bottom_left.x) / self.world_size.x).clamp(0.0, 1.0);
		let percent_y = ((point.y - bottom_left.y) / self.world_size.y).clamp(0.0, 1.0);
		let column = ((percent_x * self.columns as f32) as usize).min(self.columns - 1);
		let row = ((percent_y * self.rows as f32) as usize).min(self.rows - 1);
		self.get_cost(column, self.rows - 1 - row)
	}
	/// From a `ron` file generate the [CostMap] and lay it over the given rectangle
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String, world_center: Vec2, world_size: Vec2) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening CostMap file");
		let map: CostMap = match ron::de::from_reader(file) {
			Ok(map) => map,
			Err(e) => panic!("Failed deserializing CostMap: {}", e),
		};
		if map.costs.len() != map.columns * map.rows {
			panic!(
				"CostMap file declares {} x {} entries but lists {}",
				map.columns,
				map.rows,
				map.costs.len()
			);
		}
		map.with_world_bounds(world_center, world_size)
	}
	/// From a headerless `csv` file of `u8` values generate the [CostMap] and lay it over the
	/// given rectangle, every line must have the same number of values
	#[cfg(feature = "csv")]
	pub fn from_csv(path: String, world_center: Vec2, world_size: Vec2) -> Self {
		let data = std::fs::File::open(path).expect("Failed opening csv");
		let mut rdr = csv::ReaderBuilder::new()
			.has_headers(false)
			.from_reader(data);
		let mut lines: Vec<Vec<u8>> = Vec::new();
		for record in rdr.records() {
			let record = match record {
				Ok(record) => record,
				Err(e) => panic!("Failed reading csv record: {}", e),
			};
			let line = record
				.iter()
				.map(|value| value.trim().parse::<u8>().expect("CSV expects u8 values"))
				.collect::<Vec<u8>>();
			lines.push(line);
		}
		let columns = lines.first().map(|l| l.len()).unwrap_or(0);
		if lines.iter().any(|l| l.len() != columns) {
			panic!("CSV cost map lines must all have {} values", columns);
		}
		let mut map = CostMap::new(columns, lines.len(), world_center, world_size);
		for (line_number, line) in lines.iter().enumerate() {
			for (column, value) in line.iter().enumerate() {
				map.set_cost(*value, column, line_number);
			}
		}
		map
	}
	/// Create a [CostMap] from a greyscale image where each pixel represents an entry, white
	/// pixels are cheap (`1`) and black pixels are impassable (`255`)
	#[cfg(feature = "heightmap")]
	pub fn from_heightmap(path: String, world_center: Vec2, world_size: Vec2) -> Self {
		use photon_rs::native::open_image;
		let img = open_image(&path).expect("Failed to open heightmap");
		let width = img.get_width() as usize;
		let height = img.get_height() as usize;
		let raw_pixels = img.get_raw_pixels();
		// raw pixels start from the top left and come in sets of 3 or 4 (alpha)
		let chunk_size = if width * height * 4 == raw_pixels.len() {
			4
		} else {
			3
		};
		let mut map = CostMap::new(width, height, world_center, world_size);
		for (i, px) in raw_pixels.chunks(chunk_size).enumerate() {
			let colour_avg = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
			let value = (255 - colour_avg as u8).clamp(1, 255);
			map.set_cost(value, i % width, i / width);
		}
		map
	}
}

impl OccupancyQuery for CostMap {
	/// Only the entry under the circle centre is considered
	fn is_obstructed(&self, point: Vec2, _radius: f32) -> bool {
		self.get_cost_at(point) == IMPASSABLE_COST
	}
}

impl TerrainQuery for CostMap {
	fn movement_penalty(&self, point: Vec2) -> i32 {
		match self.get_cost_at(point) {
			IMPASSABLE_COST => 0,
			cost => cost.saturating_sub(1) as i32,
		}
	}
}
