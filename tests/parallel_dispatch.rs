use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use loopmesh::parallel::{Message, TaskGroup, Wait, WorkerContext};
use loopmesh::prelude::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use serial_test::serial;

fn claimed_ranges(group: &TaskGroup, range: Range<usize>, block: usize) -> Vec<Range<usize>> {
    let seen = Arc::new(Mutex::new(Vec::<Range<usize>>::new()));
    let sink = seen.clone();
    group
        .dispatch_for(range, block, move |_: &WorkerContext, r: Range<usize>| sink.lock().push(r))
        .unwrap();
    group.when_all_done().wait().unwrap();
    let mut out = std::mem::take(&mut *seen.lock());
    out.sort_by_key(|r| r.start);
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn blocks_tile_the_range(workers in 1usize..6, block in 1usize..20, end in 0usize..300) {
        let pool = WorkerPool::with_workers(workers).unwrap();
        let group = pool.task_group();
        let ranges = claimed_ranges(&group, 0..end, block);
        let mut next = 0;
        for r in &ranges {
            prop_assert_eq!(r.start, next);
            prop_assert!(r.end > r.start && r.len() <= block);
            next = r.end;
        }
        prop_assert_eq!(next, end);
    }
}

#[test]
fn hundred_in_sevens() {
    for workers in [1, 2, 3, 8] {
        let pool = WorkerPool::with_workers(workers).unwrap();
        let ranges = claimed_ranges(&pool.task_group(), 0..100, 7);
        assert_eq!(ranges.len(), 15);
        assert_eq!(ranges.last(), Some(&(98..100)));
        assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), 100);
    }
}

#[test]
fn oversized_blocks_cover_the_range_once() {
    let huge = usize::MAX / 2 + 1;
    let pool = WorkerPool::with_workers(4).unwrap();
    assert_eq!(claimed_ranges(&pool.task_group(), 0..10, huge), vec![0..10]);
    assert_eq!(claimed_ranges(&pool.task_group(), 5..15, huge), vec![5..15]);
    assert_eq!(
        claimed_ranges(&pool.task_group(), 3..10, usize::MAX),
        vec![3..10]
    );

    let visited = Arc::new(AtomicUsize::new(0));
    let counter = visited.clone();
    Serial
        .for_each_block(
            5..15,
            huge,
            Arc::new(move |r: Range<usize>| {
                counter.fetch_add(r.len(), Ordering::Relaxed);
            }),
        )
        .unwrap();
    assert_eq!(visited.load(Ordering::Relaxed), 10);
}

#[test]
fn huge_block_size_subdivides_like_the_default() {
    let opts = SubdivideOptions {
        block_size: usize::MAX / 2 + 1,
        ..Default::default()
    };
    let pool = WorkerPool::with_workers(4).unwrap();
    let mut m = TriMesh::default();
    for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
        m.add_vertex(p).unwrap();
    }
    m.insert_triangle([VertexId(0), VertexId(1), VertexId(2)], None).unwrap();
    m.insert_triangle([VertexId(0), VertexId(2), VertexId(3)], None).unwrap();
    m.finalize_boundaries().unwrap();
    m.compact().unwrap();
    let source = Arc::new(m);
    let a = subdivide(&source, &pool, &opts).unwrap();
    let b = subdivide(&source, &Serial, &SubdivideOptions::default()).unwrap();
    for i in 0..a.vertex_count() as u32 {
        assert_eq!(a.position(VertexId(i)).unwrap(), b.position(VertexId(i)).unwrap());
    }
    assert_eq!(a.face_count(), b.face_count());
}

#[test]
fn setup_data_is_scoped_to_its_group() {
    let pool = WorkerPool::with_workers(3).unwrap();
    let a = pool.task_group();
    let b = pool.task_group();
    a.dispatch_all(Message::setup(7u32)).unwrap();
    b.dispatch_all(Message::setup(11u32)).unwrap();

    let sum = Arc::new(AtomicUsize::new(0));
    for group in [&a, &b] {
        let s = sum.clone();
        group
            .dispatch_all(Message::task(move |ctx: &WorkerContext| {
                s.fetch_add(ctx.setup::<u32>().copied().unwrap_or(0) as usize, Ordering::SeqCst);
            }))
            .unwrap();
    }
    a.when_all_done().wait().unwrap();
    b.when_all_done().wait().unwrap();
    assert_eq!(sum.load(Ordering::SeqCst), 3 * 7 + 3 * 11);

    // completion broadcast a teardown, so the data is gone
    let seen = Arc::new(AtomicUsize::new(0));
    let s = seen.clone();
    a.dispatch_all(Message::task(move |ctx: &WorkerContext| {
        if ctx.setup::<u32>().is_some() {
            s.fetch_add(1, Ordering::SeqCst);
        }
    }))
    .unwrap();
    a.when_all_done().wait().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn single_tasks_run_once_each() {
    let pool = WorkerPool::with_workers(4).unwrap();
    let group = pool.task_group();
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let h = hits.clone();
        group
            .dispatch_one(Message::task(move |_: &WorkerContext| {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
    }
    group.when_all_done().wait().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 50);
    assert_eq!(group.outstanding(), 0);
}

#[test]
fn panics_surface_on_wait() {
    let pool = WorkerPool::with_workers(2).unwrap();
    let group = pool.task_group();
    group
        .dispatch_one(Message::task(|_: &WorkerContext| panic!("bad block")))
        .unwrap();
    let err = group.when_all_done().wait().unwrap_err();
    assert_eq!(err, MeshError::TaskPanicked("bad block".into()));

    // the worker survives
    let ranges = claimed_ranges(&group, 0..10, 4);
    assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
}

#[test]
fn shut_down_pool_refuses_work() {
    let mut pool = WorkerPool::with_workers(2).unwrap();
    pool.shutdown();
    let group = pool.task_group();
    let err = group.dispatch_one(Message::task(|_: &WorkerContext| {})).unwrap_err();
    assert_eq!(err, MeshError::PoolShutdown);
    assert_eq!(group.outstanding(), 0);
}

#[test]
#[serial]
fn default_pool_is_shared() {
    let a = default_pool().unwrap();
    let b = default_pool().unwrap();
    assert!(std::ptr::eq(a, b));
    assert!(a.workers() >= 1);
}

#[test]
#[serial]
fn default_pool_subdivides() {
    let mut m = TriMesh::default();
    for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        m.add_vertex(p).unwrap();
    }
    m.insert_triangle([VertexId(0), VertexId(1), VertexId(2)], None).unwrap();
    m.finalize_boundaries().unwrap();
    let fine = subdivide_levels(m, default_pool().unwrap(), &SubdivideOptions::default()).unwrap();
    assert_eq!(fine.face_count(), 4);
}

#[test]
fn pool_config_from_json() {
    let cfg: PoolConfig = serde_json::from_str(r#"{ "workers": 3 }"#).unwrap();
    assert_eq!(cfg.workers, 3);
    assert_eq!(cfg.name_prefix, "loopmesh-worker");
    let pool = WorkerPool::new(cfg).unwrap();
    assert_eq!(pool.workers(), 3);
}
