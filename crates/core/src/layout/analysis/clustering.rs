//! Greedy agglomerative clustering of page boxes.
//!
//! Contains ClusteringManager, which runs container removal, neighbour
//! discovery and the merge loop over one page, and cluster_boxes() as the
//! one-call entry point.
//!
//! The merge loop repeatedly takes the relation with the lowest similarity,
//! builds a candidate cluster from its endpoints, grows the candidate over
//! everything its interior overlaps and commits it only if nothing foreign
//! still overlaps afterwards.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::utils::{HasBBox, Rect, bbox2str, shrink_rect};

use super::super::elements::{BoxId, Cluster, ClusterId, EntityRef, PageBox, Relation};
use super::super::params::ClusteringParams;
use super::super::records::PageSize;
use super::containers::remove_containers;
use super::neighbours::discover_neighbours;
use super::similarity::entity_similarity;
use super::state::ClusteringState;

/// Why the merge loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No relations were left.
    #[default]
    Exhausted,
    /// The best remaining relation scored above the clustering threshold.
    Threshold,
    /// Two clusters were about to merge after the iteration cap.
    ClusterCap,
    /// The total iteration bound was reached.
    IterationBound,
}

/// Counters and thresholds of one clustering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringStats {
    pub input_boxes: usize,
    pub containers_removed: usize,
    pub initial_relations: usize,
    pub iterations: usize,
    pub merges: usize,
    pub discarded_candidates: usize,
    pub density_threshold: f64,
    pub clustering_threshold: f64,
    pub termination: Termination,
}

/// A merge candidate that was not committed, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSnapshot {
    pub bbox: Rect,
    pub members: Vec<BoxId>,
    pub endpoints: (EntityRef, EntityRef),
}

/// Result of clustering one page.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub page: PageSize,
    /// Every input box, indexed by `BoxId`.
    pub boxes: Vec<PageBox>,
    /// Committed clusters in commit order.
    pub clusters: Vec<Cluster>,
    /// Boxes that ended up in no cluster, in input order.
    pub residual: Vec<BoxId>,
    /// Boxes dropped as containers.
    pub containers: Vec<BoxId>,
    /// Candidate that stopped the loop at the cluster iteration cap.
    pub aborted_candidate: Option<CandidateSnapshot>,
    pub stats: ClusteringStats,
}

impl Segmentation {
    pub fn page_box(&self, id: BoxId) -> &PageBox {
        &self.boxes[id.index()]
    }

    pub fn residual_boxes(&self) -> impl Iterator<Item = &PageBox> {
        self.residual.iter().map(|id| self.page_box(*id))
    }
}

/// A cluster under construction plus the committed clusters it swallowed.
struct Candidate {
    cluster: Cluster,
    absorbed: IndexSet<ClusterId>,
}

impl Candidate {
    fn snapshot(&self, endpoints: (EntityRef, EntityRef)) -> CandidateSnapshot {
        CandidateSnapshot {
            bbox: self.cluster.bbox(),
            members: self.cluster.members().collect(),
            endpoints,
        }
    }
}

/// Orchestrates one clustering run over a page.
pub struct ClusteringManager {
    state: ClusteringState,
    stats: ClusteringStats,
    aborted_candidate: Option<CandidateSnapshot>,
}

impl ClusteringManager {
    pub fn new(page: PageSize, boxes: Vec<PageBox>, params: ClusteringParams) -> Self {
        let stats = ClusteringStats {
            input_boxes: boxes.len(),
            clustering_threshold: params.clustering_threshold,
            ..ClusteringStats::default()
        };
        Self {
            state: ClusteringState::new(page, boxes, params),
            stats,
            aborted_candidate: None,
        }
    }

    pub fn state(&self) -> &ClusteringState {
        &self.state
    }

    pub fn stats(&self) -> &ClusteringStats {
        &self.stats
    }

    /// Step 1: drops container boxes.
    pub fn remove_containers(&mut self) -> Vec<BoxId> {
        let removed = remove_containers(&mut self.state);
        self.stats.containers_removed += removed.len();
        removed
    }

    /// Step 2: discovers and scores box-level relations.
    pub fn discover_relations(&mut self) -> usize {
        let found = discover_neighbours(&mut self.state);
        self.stats.initial_relations = self.state.relations.len();
        found
    }

    /// Step 3: computes the density threshold of the active boxes.
    pub fn compute_thresholds(&mut self) -> f64 {
        self.stats.density_threshold = self.state.density();
        debug!(
            density_threshold = self.stats.density_threshold,
            clustering_threshold = self.stats.clustering_threshold,
            "thresholds"
        );
        self.stats.density_threshold
    }

    /// Step 4: the greedy merge loop.
    pub fn merge(&mut self) -> Termination {
        let threshold = self.state.params.clustering_threshold;
        let cap = self.state.params.cluster_iteration_cap;
        let bound = self.stats.initial_relations + cap;
        let mut termination = Termination::Exhausted;

        while let Some((key, similarity)) = self.state.queue.pop_min() {
            if self.stats.iterations >= bound {
                termination = Termination::IterationBound;
                break;
            }
            self.stats.iterations += 1;
            let iteration = self.stats.iterations;

            let Some(relation) = self.state.remove_relation(&key) else {
                continue;
            };
            debug_assert!(
                self.state.is_active(key.first()) && self.state.is_active(key.second()),
                "relation {} - {} has an inactive endpoint",
                key.first(),
                key.second()
            );

            if similarity > threshold {
                trace!(iteration, similarity, "best relation above threshold");
                termination = Termination::Threshold;
                break;
            }

            let endpoints = (key.first(), key.second());
            let candidate = self.build_candidate(&relation);

            if key.first().is_cluster() && key.second().is_cluster() && iteration > cap {
                let snapshot = candidate.snapshot(endpoints);
                warn!(
                    iteration,
                    bbox = %bbox2str(snapshot.bbox),
                    "cluster iteration cap reached, aborting merge loop"
                );
                self.aborted_candidate = Some(snapshot);
                termination = Termination::ClusterCap;
                break;
            }

            match self.resolve_overlaps(candidate) {
                Some(resolved) => {
                    let id = self.commit(resolved);
                    self.stats.merges += 1;
                    trace!(
                        iteration,
                        similarity,
                        first = %endpoints.0,
                        second = %endpoints.1,
                        cluster = id.value(),
                        "merged"
                    );
                    debug_assert!(self.state.check_index_sync().is_ok());
                }
                None => {
                    self.stats.discarded_candidates += 1;
                    trace!(
                        iteration,
                        first = %endpoints.0,
                        second = %endpoints.1,
                        "candidate overlaps foreign entities, skipped"
                    );
                }
            }
        }

        // Whatever is left is discarded.
        self.state.queue.clear();
        self.stats.termination = termination;
        debug!(
            iterations = self.stats.iterations,
            merges = self.stats.merges,
            discarded = self.stats.discarded_candidates,
            clusters = self.state.clusters.len(),
            ?termination,
            "merge loop finished"
        );
        termination
    }

    /// Runs every step and returns the segmentation.
    pub fn run(mut self) -> Result<Segmentation> {
        self.remove_containers();
        self.discover_relations();
        self.compute_thresholds();
        self.merge();
        self.state.check_index_sync()?;
        Ok(self.into_segmentation())
    }

    /// Flattens both endpoints into a fresh cluster.
    fn build_candidate(&self, relation: &Relation) -> Candidate {
        let mut candidate = Candidate {
            cluster: Cluster::new(self.state.next_cluster_id()),
            absorbed: IndexSet::new(),
        };
        for endpoint in [relation.key.first(), relation.key.second()] {
            self.absorb(&mut candidate, endpoint);
        }
        candidate
    }

    /// Adds an entity to the candidate. Returns true if the candidate grew.
    fn absorb(&self, candidate: &mut Candidate, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Box(id) => candidate.cluster.add_box(self.state.page_box(id)),
            EntityRef::Cluster(id) => {
                if !candidate.absorbed.insert(id) {
                    return false;
                }
                if let Some(existing) = self.state.cluster(id) {
                    candidate.cluster.add_cluster(existing, &self.state.boxes);
                }
                true
            }
        }
    }

    fn is_foreign(candidate: &Candidate, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Box(id) => !candidate.cluster.contains(id),
            EntityRef::Cluster(id) => !candidate.absorbed.contains(&id),
        }
    }

    /// Grows the candidate over every entity overlapping its shrunk bounds
    /// until nothing new is found. Returns None if a foreign entity still
    /// overlaps afterwards.
    fn resolve_overlaps(&self, mut candidate: Candidate) -> Option<Candidate> {
        let shrink = self.state.params.shrink;
        for _ in 0..self.state.params.max_absorption_rounds {
            let query = shrink_rect(candidate.cluster.bbox(), shrink);
            let hits = self.state.index.search_entities(query);
            let mut grew = false;
            for hit in hits {
                if Self::is_foreign(&candidate, hit) {
                    grew |= self.absorb(&mut candidate, hit);
                }
            }
            if !grew {
                break;
            }
        }
        candidate.cluster.recompute_bounds(&self.state.boxes);

        let query = shrink_rect(candidate.cluster.bbox(), shrink);
        let blocked = self
            .state
            .index
            .search_entities(query)
            .into_iter()
            .any(|hit| Self::is_foreign(&candidate, hit));
        (!blocked).then_some(candidate)
    }

    /// Replaces the absorbed boxes and clusters by the candidate and rebuilds
    /// its external relations.
    fn commit(&mut self, candidate: Candidate) -> ClusterId {
        let Candidate {
            mut cluster,
            absorbed,
        } = candidate;
        let id = self.state.allocate_cluster_id();
        debug_assert_eq!(id, cluster.id());
        cluster.id = id;

        let members: Vec<BoxId> = cluster.members().collect();
        for member in &members {
            self.state.deactivate_box(*member);
        }
        for old in &absorbed {
            self.state.remove_cluster(*old);
        }
        self.state.insert_cluster(cluster);

        let entity = EntityRef::Cluster(id);
        let Some(bbox) = self.state.entity_bbox(entity) else {
            return id;
        };
        let mut externals: IndexSet<EntityRef> = IndexSet::new();
        for member in &members {
            for (neighbour, _) in self.state.page_box(*member).direct_neighbours() {
                match self.state.owner_of(neighbour) {
                    Some(owner) if owner != entity => {
                        externals.insert(owner);
                    }
                    _ => {}
                }
            }
        }

        for other in externals {
            let Some(other_bbox) = self.state.entity_bbox(other) else {
                continue;
            };
            let mut relation = Relation::between(entity, bbox, other, other_bbox);
            relation.similarity = entity_similarity(&self.state, entity, other);
            self.state.insert_relation(relation);
        }
        id
    }

    fn into_segmentation(self) -> Segmentation {
        let ClusteringState {
            page,
            boxes,
            active_boxes,
            containers,
            clusters,
            ..
        } = self.state;
        let mut residual: Vec<BoxId> = active_boxes.into_iter().collect();
        residual.sort_unstable();
        Segmentation {
            page,
            boxes,
            clusters: clusters.into_values().collect(),
            residual,
            containers,
            aborted_candidate: self.aborted_candidate,
            stats: self.stats,
        }
    }
}

/// Clusters the boxes of one page.
pub fn cluster_boxes(
    params: &ClusteringParams,
    page: PageSize,
    boxes: Vec<PageBox>,
) -> Result<Segmentation> {
    params.validate()?;
    ClusteringManager::new(page, boxes, params.clone()).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::elements::Color;

    fn boxes(rects: &[(f64, f64, f64, f64)]) -> Vec<PageBox> {
        rects
            .iter()
            .enumerate()
            .map(|(i, r)| PageBox::new(BoxId::new(i), format!("b{i}"), *r, Color::new(40, 40, 40)))
            .collect()
    }

    #[test]
    fn test_touching_pair_is_merged() {
        let seg = cluster_boxes(
            &ClusteringParams::default(),
            PageSize::new(200.0, 200.0),
            boxes(&[(10.0, 10.0, 50.0, 30.0), (50.0, 10.0, 90.0, 30.0)]),
        )
        .unwrap();
        assert_eq!(seg.clusters.len(), 1);
        assert_eq!(seg.clusters[0].bbox(), (10.0, 10.0, 90.0, 30.0));
        assert!(seg.residual.is_empty());
        assert_eq!(seg.stats.merges, 1);
        assert_eq!(seg.stats.termination, Termination::Exhausted);
    }

    #[test]
    fn test_lone_box_stays_residual() {
        let seg = cluster_boxes(
            &ClusteringParams::default(),
            PageSize::new(200.0, 200.0),
            boxes(&[(10.0, 10.0, 50.0, 30.0)]),
        )
        .unwrap();
        assert!(seg.clusters.is_empty());
        assert_eq!(seg.residual, vec![BoxId::new(0)]);
        assert_eq!(seg.stats.initial_relations, 0);
    }

    #[test]
    fn test_zero_threshold_merges_only_touching() {
        let params = ClusteringParams::with_threshold(0.0).unwrap();
        let seg = cluster_boxes(
            &params,
            PageSize::new(500.0, 500.0),
            boxes(&[
                (10.0, 10.0, 50.0, 30.0),
                (50.0, 10.0, 90.0, 30.0),
                (10.0, 200.0, 50.0, 220.0),
            ]),
        )
        .unwrap();
        assert_eq!(seg.clusters.len(), 1);
        assert_eq!(seg.residual, vec![BoxId::new(2)]);
        assert_eq!(seg.stats.termination, Termination::Threshold);
    }

    #[test]
    fn test_candidate_absorbs_overlapping_box() {
        // The bridge box overlaps the envelope of the touching pair and gets
        // absorbed.
        let mut manager = ClusteringManager::new(
            PageSize::new(300.0, 300.0),
            boxes(&[
                (10.0, 10.0, 50.0, 30.0),
                (50.0, 60.0, 90.0, 80.0),
                (45.0, 10.0, 55.0, 80.0),
            ]),
            ClusteringParams::default(),
        );
        let relation = Relation::between(
            EntityRef::Box(BoxId::new(0)),
            (10.0, 10.0, 50.0, 30.0),
            EntityRef::Box(BoxId::new(1)),
            (50.0, 60.0, 90.0, 80.0),
        );
        let candidate = manager.build_candidate(&relation);
        let resolved = manager.resolve_overlaps(candidate).unwrap();
        assert_eq!(resolved.cluster.len(), 3);
        assert_eq!(resolved.cluster.bbox(), (10.0, 10.0, 90.0, 80.0));

        let id = manager.commit(resolved);
        assert_eq!(manager.state().clusters().count(), 1);
        assert_eq!(manager.state().active_boxes().count(), 0);
        assert_eq!(
            manager.state().page_box(BoxId::new(2)).cluster(),
            Some(id)
        );
        assert!(manager.state().check_index_sync().is_ok());
    }

    #[test]
    fn test_candidate_still_overlapping_foreign_box_is_discarded() {
        // Absorbing the tall box grows the envelope over the last box, and a
        // single absorption round leaves it foreign.
        let manager = ClusteringManager::new(
            PageSize::new(300.0, 300.0),
            boxes(&[
                (10.0, 10.0, 50.0, 30.0),
                (50.0, 10.0, 90.0, 30.0),
                (60.0, 15.0, 70.0, 60.0),
                (60.0, 55.0, 70.0, 70.0),
            ]),
            ClusteringParams {
                max_absorption_rounds: 1,
                ..ClusteringParams::default()
            },
        );
        let relation = Relation::between(
            EntityRef::Box(BoxId::new(0)),
            (10.0, 10.0, 50.0, 30.0),
            EntityRef::Box(BoxId::new(1)),
            (50.0, 10.0, 90.0, 30.0),
        );
        let candidate = manager.build_candidate(&relation);
        assert!(manager.resolve_overlaps(candidate).is_none());
        assert_eq!(manager.state().active_boxes().count(), 4);
        assert!(manager.state().check_index_sync().is_ok());

        // With more rounds the chain is absorbed completely.
        let manager = ClusteringManager::new(
            PageSize::new(300.0, 300.0),
            manager.state().boxes().to_vec(),
            ClusteringParams::default(),
        );
        let candidate = manager.build_candidate(&relation);
        let resolved = manager.resolve_overlaps(candidate).unwrap();
        assert_eq!(resolved.cluster.len(), 4);
        assert_eq!(resolved.cluster.bbox(), (10.0, 10.0, 90.0, 70.0));
    }
}
