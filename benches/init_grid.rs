//! Measure building a large NavGrid
//!

use bevy::prelude::*;
use bevy_grid_pathfinding_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create and build a grid of `size` by `size` cells
fn init_grid(size: f32, cell_diameter: f32) {
	let mut grid = NavGrid::new(GridSettings::new(Vec2::ZERO, Vec2::splat(size), cell_diameter));
	grid.build();
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("data_initialisation");
	group.significance_level(0.05).sample_size(100);
	group.bench_function("init_grid", |b| {
		b.iter(|| init_grid(black_box(500.0), black_box(1.0)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
