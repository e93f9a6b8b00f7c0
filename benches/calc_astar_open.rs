//! Measure an A* search across a world of open ground
//!
//! World is 200 cells by 200 cells
//!

use bevy::prelude::*;
use bevy_grid_pathfinding_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create and build the grid before benchmarking
fn prepare_grid(size: f32) -> NavGrid {
	let mut grid = NavGrid::new(GridSettings::new(Vec2::ZERO, Vec2::splat(size), 1.0));
	grid.build();
	grid
}

/// Search from the bottom left corner to the top right corner
fn astar_open(grid: &mut NavGrid, query: &PathQuery) {
	let path = find_path(grid, query);
	assert!(path.is_some());
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let mut grid = prepare_grid(200.0);
	let query = PathQuery::new(Vec2::new(-99.5, -99.5), Vec2::new(99.5, 99.5));
	group.bench_function("calc_astar_open", |b| {
		b.iter(|| astar_open(black_box(&mut grid), black_box(&query)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
