//! Measure a FlowField generation for a world of open ground
//!
//! World is 500 cells by 500 cells
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

/// Flow towards the bottom left corner
fn flow_open(grid: &mut NavGrid, query: &FlowQuery) {
	let field = compute_flow_field(grid, query);
	assert_eq!(grid.get_cell_count(), field.get_cell_count());
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let mut grid = prepare_grid(500.0);
	let query =
		FlowQuery::new(vec![FlowTarget::new(Vec2::new(-249.5, -249.5), 0)]).with_diagonal(true);
	group.bench_function("calc_flow_open", |b| {
		b.iter(|| flow_open(black_box(&mut grid), black_box(&query)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
