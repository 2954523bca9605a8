//! End-to-end tests for the clustering engine.
//!
//! Covers the merge loop outcomes on small hand-built pages plus the
//! structural properties every segmentation must satisfy.

use boxclust_core::layout::{
    BoxId, ClusteringManager, ClusteringParams, Color, PageBox, PageSize, Segmentation,
    Termination, cluster_boxes, overlapping_count,
};
use boxclust_core::utils::{HasBBox, Rect, bbox_intersects, shrink_rect};

fn page_boxes(rects: &[Rect]) -> Vec<PageBox> {
    rects
        .iter()
        .enumerate()
        .map(|(i, r)| PageBox::new(BoxId::new(i), format!("b{i}"), *r, Color::new(30, 30, 30)))
        .collect()
}

/// Converts a (top, left, bottom, right) fixture into a page rectangle.
fn tlbr(top: f64, left: f64, bottom: f64, right: f64) -> Rect {
    (left, top, right, bottom)
}

fn five_box_fixture() -> Vec<PageBox> {
    page_boxes(&[
        tlbr(101.0, 285.0, 205.4, 453.4),
        tlbr(135.0, 562.0, 179.2, 1051.2),
        tlbr(258.0, 288.0, 367.4, 355.4),
        tlbr(277.0, 392.0, 472.2, 490.2),
        tlbr(225.0, 632.0, 442.2, 989.2),
    ])
}

fn fixture_page() -> PageSize {
    PageSize::new(1280.0, 1024.0)
}

fn summary(seg: &Segmentation) -> Vec<(Rect, Vec<BoxId>)> {
    seg.clusters
        .iter()
        .map(|c| (c.bbox(), c.members().collect()))
        .collect()
}

fn assert_no_overlap(seg: &Segmentation, shrink: f64) {
    for (i, a) in seg.clusters.iter().enumerate() {
        for b in &seg.clusters[i + 1..] {
            assert!(
                !bbox_intersects(shrink_rect(a.bbox(), shrink), shrink_rect(b.bbox(), shrink)),
                "clusters {:?} and {:?} overlap",
                a.bbox(),
                b.bbox()
            );
        }
        for r in seg.residual_boxes() {
            assert!(
                !bbox_intersects(shrink_rect(a.bbox(), shrink), r.bbox()),
                "residual box {} overlaps cluster {:?}",
                r.key(),
                a.bbox()
            );
        }
    }
}

fn assert_partition(seg: &Segmentation) {
    let mut seen = vec![0usize; seg.boxes.len()];
    for c in &seg.clusters {
        for m in c.members() {
            seen[m.index()] += 1;
        }
    }
    for id in seg.residual.iter().chain(&seg.containers) {
        seen[id.index()] += 1;
    }
    assert!(seen.iter().all(|n| *n == 1), "{seen:?}");
}

// ============================================================================
// Merge outcomes
// ============================================================================

#[test]
fn test_relatively_close_pair_merges() {
    // A and B are 5 apart, C is 100 below B.
    let seg = cluster_boxes(
        &ClusteringParams::default(),
        PageSize::new(1000.0, 1000.0),
        page_boxes(&[
            (0.0, 0.0, 100.0, 20.0),
            (0.0, 25.0, 100.0, 45.0),
            (0.0, 145.0, 100.0, 165.0),
        ]),
    )
    .unwrap();

    assert_eq!(seg.stats.initial_relations, 2);
    assert_eq!(summary(&seg), vec![((0.0, 0.0, 100.0, 45.0), vec![BoxId::new(0), BoxId::new(1)])]);
    assert_eq!(seg.residual, vec![BoxId::new(2)]);
    assert_eq!(seg.stats.termination, Termination::Threshold);
    assert_eq!(seg.stats.iterations, 2);
}

#[test]
fn test_evenly_spaced_column_stays_apart() {
    let rects: Vec<Rect> = (0..4)
        .map(|k| {
            let top = 10.0 + 40.0 * k as f64;
            (10.0, top, 110.0, top + 20.0)
        })
        .collect();
    let seg = cluster_boxes(
        &ClusteringParams::default(),
        PageSize::new(500.0, 500.0),
        page_boxes(&rects),
    )
    .unwrap();
    assert!(seg.clusters.is_empty());
    assert_eq!(seg.residual.len(), 4);
}

#[test]
fn test_cluster_pair_after_cap_aborts_loop() {
    let params = ClusteringParams {
        clustering_threshold: 1.0,
        cluster_iteration_cap: 0,
        ..ClusteringParams::default()
    };
    let seg = cluster_boxes(
        &params,
        PageSize::new(1000.0, 1000.0),
        page_boxes(&[
            (0.0, 0.0, 100.0, 20.0),
            (0.0, 22.0, 100.0, 42.0),
            (0.0, 60.0, 100.0, 80.0),
            (0.0, 82.0, 100.0, 102.0),
        ]),
    )
    .unwrap();

    assert_eq!(seg.stats.termination, Termination::ClusterCap);
    assert_eq!(seg.clusters.len(), 2);
    assert_eq!(seg.clusters[0].bbox(), (0.0, 0.0, 100.0, 42.0));
    assert_eq!(seg.clusters[1].bbox(), (0.0, 60.0, 100.0, 102.0));
    let aborted = seg.aborted_candidate.as_ref().unwrap();
    assert_eq!(aborted.bbox, (0.0, 0.0, 100.0, 102.0));
    assert_eq!(aborted.members.len(), 4);
    assert!(aborted.endpoints.0.is_cluster() && aborted.endpoints.1.is_cluster());
}

#[test]
fn test_empty_page() {
    let seg = cluster_boxes(
        &ClusteringParams::default(),
        PageSize::new(100.0, 100.0),
        Vec::new(),
    )
    .unwrap();
    assert!(seg.clusters.is_empty());
    assert!(seg.residual.is_empty());
    assert_eq!(seg.stats.termination, Termination::Exhausted);
}

// ============================================================================
// Five-box scenario
// ============================================================================

#[test]
fn test_five_box_fixture_is_deterministic() {
    let params = ClusteringParams::default();
    let first = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    let second = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.residual, second.residual);
    assert_eq!(first.stats, second.stats);

    let sequential = ClusteringParams {
        parallel_discovery: false,
        ..ClusteringParams::default()
    };
    let third = cluster_boxes(&sequential, fixture_page(), five_box_fixture()).unwrap();
    assert_eq!(summary(&first), summary(&third));
    assert_eq!(first.residual, third.residual);
}

#[test]
fn test_five_box_fixture_is_overlap_free() {
    let params = ClusteringParams::default();
    let seg = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    assert_no_overlap(&seg, params.shrink);
    assert_partition(&seg);
    assert!(seg.stats.iterations <= seg.stats.initial_relations + params.cluster_iteration_cap);
}

/// Clusters as (bbox, sorted members), ordered by their first member.
fn sorted_summary(seg: &Segmentation) -> Vec<(Rect, Vec<usize>)> {
    let mut clusters: Vec<(Rect, Vec<usize>)> = seg
        .clusters
        .iter()
        .map(|c| {
            let mut members: Vec<usize> = c.members().map(|m| m.index()).collect();
            members.sort_unstable();
            (c.bbox(), members)
        })
        .collect();
    clusters.sort_by_key(|(_, members)| members[0]);
    clusters
}

#[test]
fn test_five_box_fixture_at_default_threshold() {
    let params = ClusteringParams::default();
    let seg = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    assert!(seg.clusters.is_empty());
    assert_eq!(seg.residual, (0..5).map(BoxId::new).collect::<Vec<_>>());
    assert_eq!(seg.stats.termination, Termination::Threshold);
    assert_eq!(seg.stats.iterations, 1);
    assert_eq!(seg.stats.merges, 0);
}

#[test]
fn test_five_box_fixture_at_half_threshold() {
    let params = ClusteringParams::with_threshold(0.5).unwrap();
    let seg = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    // A, C and D form the left column; B and E the right one.
    assert_eq!(
        sorted_summary(&seg),
        vec![
            ((285.0, 101.0, 490.2, 472.2), vec![0, 2, 3]),
            ((562.0, 135.0, 1051.2, 442.2), vec![1, 4]),
        ]
    );
    assert!(seg.residual.is_empty());
    assert_eq!(seg.stats.termination, Termination::Threshold);
    assert_no_overlap(&seg, params.shrink);
}

#[test]
fn test_five_box_fixture_at_full_threshold() {
    let params = ClusteringParams::with_threshold(1.0).unwrap();
    let seg = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    assert_eq!(
        sorted_summary(&seg),
        vec![((285.0, 101.0, 1051.2, 472.2), vec![0, 1, 2, 3, 4])]
    );
    assert!(seg.residual.is_empty());
    assert_eq!(seg.stats.termination, Termination::Exhausted);
}

#[test]
fn test_permissive_threshold_is_overlap_free() {
    let params = ClusteringParams::with_threshold(1.0).unwrap();
    let seg = cluster_boxes(&params, fixture_page(), five_box_fixture()).unwrap();
    assert_no_overlap(&seg, params.shrink);
    assert_partition(&seg);
    assert!(seg.stats.iterations <= seg.stats.initial_relations + params.cluster_iteration_cap);
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_container_removal_leaves_at_most_one_overlap() {
    let mut manager = ClusteringManager::new(
        PageSize::new(800.0, 800.0),
        page_boxes(&[
            (0.0, 0.0, 800.0, 800.0),
            (10.0, 10.0, 400.0, 400.0),
            (20.0, 20.0, 100.0, 60.0),
            (120.0, 20.0, 200.0, 60.0),
            (220.0, 20.0, 300.0, 60.0),
            (500.0, 500.0, 600.0, 550.0),
            (590.0, 540.0, 650.0, 600.0),
        ]),
        ClusteringParams::default(),
    );
    let removed = manager.remove_containers();
    assert_eq!(removed, vec![BoxId::new(0), BoxId::new(1)]);

    let state = manager.state();
    for id in state.active_boxes() {
        assert!(overlapping_count(state, id) <= 1);
    }
    assert!(state.check_index_sync().is_ok());
}

#[test]
fn test_containers_are_reported_and_not_clustered() {
    let seg = cluster_boxes(
        &ClusteringParams::default(),
        PageSize::new(400.0, 400.0),
        page_boxes(&[
            (0.0, 0.0, 400.0, 400.0),
            (10.0, 10.0, 50.0, 30.0),
            (50.0, 10.0, 90.0, 30.0),
            (200.0, 200.0, 240.0, 220.0),
        ]),
    )
    .unwrap();
    assert_eq!(seg.containers, vec![BoxId::new(0)]);
    assert_eq!(seg.stats.containers_removed, 1);
    assert!(seg.clusters.iter().all(|c| !c.contains(BoxId::new(0))));
    assert_partition(&seg);
}
