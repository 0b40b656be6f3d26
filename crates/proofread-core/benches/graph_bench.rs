//! # Graph Benchmarks
//!
//! Performance benchmarks for proofread-core graph operations.
//!
//! Run with: `cargo bench -p proofread-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use proofread_core::{
    AffinityParams, AffinitySearch, Edge, EdgeEditor, EditorConfig, InclusionRemover,
    LowestWeightCombine, Node, NodeId, RegionGraph, merge, unmerge,
};
use std::hint::black_box;

/// A `side` x `side` lattice of regions; the outer ring touches the boundary.
fn create_grid_graph(side: u64) -> RegionGraph {
    let mut graph = RegionGraph::new();
    let id = |x: u64, y: u64| NodeId(y * side + x + 1);

    for y in 0..side {
        for x in 0..side {
            let on_edge = x == 0 || y == 0 || x + 1 == side || y + 1 == side;
            let size = 1_000 + (x * 7 + y * 13) % 5_000;
            graph
                .insert_node(Node::new(id(x, y), size).with_boundary(on_edge))
                .expect("insert");
        }
    }
    for y in 0..side {
        for x in 0..side {
            let weight = ((x * 31 + y * 17) % 100) as f64 / 100.0;
            if x + 1 < side {
                graph
                    .insert_edge(Edge::new(id(x, y), id(x + 1, y), weight))
                    .expect("edge");
            }
            if y + 1 < side {
                graph
                    .insert_edge(Edge::new(id(x, y), id(x, y + 1), weight))
                    .expect("edge");
            }
        }
    }
    graph
}

/// A chain of enclosed regions hanging off one boundary body.
fn create_inclusion_graph(size: u64) -> RegionGraph {
    let mut graph = RegionGraph::new();
    graph
        .insert_node(Node::new(NodeId(1), 100_000).with_boundary(true))
        .expect("insert");
    for i in 2..=size {
        graph.insert_node(Node::new(NodeId(i), 10)).expect("insert");
        graph
            .insert_edge(Edge::new(NodeId(1), NodeId(i), 0.5))
            .expect("edge");
    }
    graph
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_affinity_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("affinity_search");

    for side in [10u64, 30, 60].iter() {
        let graph = create_grid_graph(*side);
        group.bench_with_input(BenchmarkId::from_parameter(side), &graph, |b, graph| {
            b.iter(|| {
                black_box(AffinitySearch::search(
                    graph,
                    NodeId(1),
                    &AffinityParams::default(),
                ))
            });
        });
    }

    group.finish();
}

fn bench_merge_unmerge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_unmerge");

    for side in [10u64, 30, 60].iter() {
        let graph = create_grid_graph(*side);
        group.bench_with_input(BenchmarkId::from_parameter(side), &graph, |b, graph| {
            let mut graph = graph.clone();
            b.iter(|| {
                let record = merge(&mut graph, NodeId(2), NodeId(1), &mut LowestWeightCombine)
                    .expect("merge");
                unmerge(&mut graph, &record).expect("unmerge");
                black_box(&graph);
            });
        });
    }

    group.finish();
}

fn bench_inclusion_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("inclusion_removal");

    for size in [100u64, 1000, 5000].iter() {
        let graph = create_inclusion_graph(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| {
                let mut graph = graph.clone();
                black_box(InclusionRemover::remove_inclusions(&mut graph))
            });
        });
    }

    group.finish();
}

fn bench_body_mode_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_mode_setup");

    for side in [10u64, 30].iter() {
        let graph = create_grid_graph(*side);
        group.bench_with_input(BenchmarkId::from_parameter(side), &graph, |b, graph| {
            b.iter(|| {
                let mut editor = EdgeEditor::new(graph.clone(), EditorConfig::default());
                editor.set_body_mode(1_000.0, 0);
                black_box(editor.staged())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_affinity_search,
    bench_merge_unmerge,
    bench_inclusion_removal,
    bench_body_mode_setup,
);
criterion_main!(benches);
