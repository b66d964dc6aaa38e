//! Same-kind repulsion and predator/prey resolution
//!
//! Both passes rebuild the spatial index from the positions they operate
//! on and only use it to find candidate pairs. Eating is queued on the
//! entity store and takes effect once the caller applies deferred effects.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::game::constants::interaction::IOU_EAT_THRESHOLD;
use crate::game::kind::{InteractionRule, Kind};
use crate::game::spatial::SpatialIndex;
use crate::game::state::{EntityId, EntityStore};
use crate::util::ivec2::IVec2;

/// What happens to an eaten entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPolicy {
    /// Prey takes the predator's kind
    #[default]
    Transform,
    /// Prey leaves the board
    Remove,
}

impl LossPolicy {
    pub fn from_transform_flag(transform_on_loss: bool) -> Self {
        if transform_on_loss {
            LossPolicy::Transform
        } else {
            LossPolicy::Remove
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionSummary {
    /// Same-kind pairs closer than the object size this tick
    pub repulsed_pairs: usize,
    /// Eat verdicts queued this tick (several may target one prey)
    pub queued: usize,
}

/// Intersection-over-union of two axis-aligned `size`x`size` squares
/// anchored at their top-left corners
pub fn iou(a: IVec2, b: IVec2, size: i32) -> f32 {
    let size = size as i64;
    let overlap = |a: i32, b: i32| -> i64 {
        let (a, b) = (a as i64, b as i64);
        ((a + size).min(b + size) - a.max(b)).max(0)
    };

    let intersection = overlap(a.x, b.x) * overlap(a.y, b.y);
    let union = 2 * size * size - intersection;
    if union <= 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// Run repulsion then the eat pass
pub fn resolve(
    store: &mut EntityStore,
    rule: &InteractionRule,
    policy: LossPolicy,
) -> InteractionSummary {
    let repulsed_pairs = repel(store);
    let queued = eat(store, rule, policy);
    InteractionSummary {
        repulsed_pairs,
        queued,
    }
}

/// Push apart every same-kind pair closer than the object size
///
/// Each unordered pair is handled once: both members step one unit away
/// from each other per axis, judged on positions at the start of the pass.
pub fn repel(store: &mut EntityStore) -> usize {
    let size = store.board().object_size();
    let index = SpatialIndex::build(&store.index_points());

    let mut displacements: Vec<(EntityId, IVec2)> = Vec::new();
    let mut pairs = 0;

    for entity in store.alive() {
        for neighbor in index.within_radius(entity.position, size as f32) {
            // Visit (a, b) only from the lower id
            if neighbor.id <= entity.id || store.kind_of(neighbor.id) != Some(entity.kind) {
                continue;
            }
            let away = (entity.position - neighbor.position).signum();
            displacements.push((entity.id, away));
            displacements.push((neighbor.id, -away));
            pairs += 1;
        }
    }

    for (id, step) in displacements {
        store.move_by(id, step);
    }

    if pairs > 0 {
        trace!("repulsion separated {} pairs", pairs);
    }
    pairs
}

/// Queue every prey overlapping a predator by more than the IoU threshold
///
/// Predators are scanned in ascending id and their candidates in ascending
/// id, so when several predators overlap one prey the highest-id predator is
/// the one recorded.
pub fn eat(store: &mut EntityStore, rule: &InteractionRule, policy: LossPolicy) -> usize {
    let size = store.board().object_size();
    let index = SpatialIndex::build(&store.index_points());
    // Any positive overlap needs both axis offsets below `size`
    let reach = size as f32 * std::f32::consts::SQRT_2 + 1.0;

    let mut verdicts: Vec<(EntityId, EntityId, Kind)> = Vec::new();
    for predator in store.alive() {
        let mut candidates = index.within_radius(predator.position, reach);
        candidates.sort_unstable_by_key(|n| n.id);

        for prey in candidates {
            if prey.id == predator.id {
                continue;
            }
            let eligible = store
                .kind_of(prey.id)
                .is_some_and(|kind| rule.defeats(predator.kind, kind));
            if eligible && iou(predator.position, prey.position, size) > IOU_EAT_THRESHOLD {
                verdicts.push((prey.id, predator.id, predator.kind));
            }
        }
    }

    let queued = verdicts.len();
    for (prey, predator, kind) in verdicts {
        match policy {
            LossPolicy::Transform => store.queue_transform(prey, kind, predator),
            LossPolicy::Remove => store.queue_removal(prey, predator),
        }
    }
    queued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Board, DeferredEffect, InteractionEvent};

    fn store(placements: &[(IVec2, Kind)]) -> EntityStore {
        EntityStore::from_placements(Board::new(300, 300, 20).unwrap(), placements)
    }

    #[test]
    fn test_iou_known_overlap() {
        // 19x19 overlap: 361 / (800 - 361)
        let value = iou(IVec2::new(100, 100), IVec2::new(101, 101), 20);
        assert!((value - 361.0 / 439.0).abs() < 1e-6);
        assert!(value > IOU_EAT_THRESHOLD);
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        assert!((iou(IVec2::new(50, 50), IVec2::new(50, 50), 20) - 1.0).abs() < 1e-6);
        assert_eq!(iou(IVec2::new(50, 50), IVec2::new(70, 50), 20), 0.0);
        assert_eq!(iou(IVec2::new(50, 50), IVec2::new(90, 90), 20), 0.0);
    }

    #[test]
    fn test_iou_zero_union_is_zero() {
        assert_eq!(iou(IVec2::new(5, 5), IVec2::new(5, 5), 0), 0.0);
    }

    #[test]
    fn test_iou_is_symmetric() {
        let points = [
            IVec2::new(100, 100),
            IVec2::new(101, 101),
            IVec2::new(95, 110),
            IVec2::new(119, 81),
            IVec2::new(130, 100),
        ];
        for &a in &points {
            for &b in &points {
                assert_eq!(iou(a, b, 20), iou(b, a, 20));
            }
        }
    }

    #[test]
    fn test_rock_eats_overlapping_scissor() {
        let mut store = store(&[(IVec2::new(100, 100), Kind::Rock), (IVec2::new(101, 101), Kind::Scissor)]);
        let queued = eat(&mut store, &InteractionRule::classic(), LossPolicy::Transform);

        assert_eq!(queued, 1);
        assert_eq!(store.pending_effect(1), Some(DeferredEffect::Transform(Kind::Rock)));
        // Nothing changes until the deferred queue is applied
        assert_eq!(store.kind_of(1), Some(Kind::Scissor));

        store.apply_deferred();
        assert_eq!(store.kind_of(1), Some(Kind::Rock));
    }

    #[test]
    fn test_remove_policy_queues_removal() {
        let mut store = store(&[(IVec2::new(100, 100), Kind::Rock), (IVec2::new(101, 101), Kind::Scissor)]);
        eat(&mut store, &InteractionRule::classic(), LossPolicy::Remove);
        assert_eq!(store.pending_effect(1), Some(DeferredEffect::Remove));
        assert!(store.pending_effect(0).is_none());
    }

    #[test]
    fn test_eat_threshold() {
        // 15x15 overlap: 225 / 575 = 0.39
        let mut close = store(&[(IVec2::new(100, 100), Kind::Paper), (IVec2::new(105, 105), Kind::Rock)]);
        assert_eq!(eat(&mut close, &InteractionRule::classic(), LossPolicy::Transform), 1);

        // 10x10 overlap: 100 / 700 = 0.14
        let mut far = store(&[(IVec2::new(100, 100), Kind::Paper), (IVec2::new(110, 110), Kind::Rock)]);
        assert_eq!(eat(&mut far, &InteractionRule::classic(), LossPolicy::Transform), 0);
    }

    #[test]
    fn test_prey_never_eats_predator() {
        let mut store = store(&[(IVec2::new(100, 100), Kind::Scissor), (IVec2::new(100, 100), Kind::Scissor)]);
        assert_eq!(eat(&mut store, &InteractionRule::classic(), LossPolicy::Transform), 0);
    }

    #[test]
    fn test_last_predator_in_id_order_is_recorded() {
        let mut store = store(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(101, 101), Kind::Scissor),
            (IVec2::new(102, 100), Kind::Rock),
        ]);
        let queued = eat(&mut store, &InteractionRule::classic(), LossPolicy::Remove);
        assert_eq!(queued, 2);

        let events = store.apply_deferred();
        assert_eq!(
            events,
            vec![InteractionEvent::Removed { predator: 2, prey: 1, kind: Kind::Scissor }]
        );
    }

    #[test]
    fn test_full_scan_before_any_mutation() {
        // Every entity overlaps the one it beats, so all three flip at once
        let mut store = store(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(101, 101), Kind::Scissor),
            (IVec2::new(102, 100), Kind::Paper),
        ]);
        let summary = resolve(&mut store, &InteractionRule::classic(), LossPolicy::Transform);
        assert_eq!(summary.queued, 3);
        store.apply_deferred();

        assert_eq!(store.kind_of(0), Some(Kind::Paper));
        assert_eq!(store.kind_of(1), Some(Kind::Rock));
        assert_eq!(store.kind_of(2), Some(Kind::Scissor));
    }

    #[test]
    fn test_repulsion_moves_pair_apart_once() {
        let mut store = store(&[(IVec2::new(100, 100), Kind::Rock), (IVec2::new(105, 103), Kind::Rock)]);
        let pairs = repel(&mut store);

        assert_eq!(pairs, 1);
        assert_eq!(store.get(0).unwrap().position, IVec2::new(99, 99));
        assert_eq!(store.get(1).unwrap().position, IVec2::new(106, 104));
    }

    #[test]
    fn test_repulsion_same_axis_only_moves_along_separation() {
        let mut store = store(&[(IVec2::new(100, 100), Kind::Paper), (IVec2::new(110, 100), Kind::Paper)]);
        repel(&mut store);
        assert_eq!(store.get(0).unwrap().position, IVec2::new(99, 100));
        assert_eq!(store.get(1).unwrap().position, IVec2::new(111, 100));
    }

    #[test]
    fn test_repulsion_ignores_other_kinds_and_distant_pairs() {
        let mut store = store(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(105, 100), Kind::Paper),
            (IVec2::new(120, 100), Kind::Rock),
        ]);
        assert_eq!(repel(&mut store), 0);
        assert_eq!(store.get(0).unwrap().position, IVec2::new(100, 100));
        assert_eq!(store.get(2).unwrap().position, IVec2::new(120, 100));
    }

    #[test]
    fn test_repulsion_respects_bounds() {
        let mut store = store(&[(IVec2::new(20, 20), Kind::Rock), (IVec2::new(25, 25), Kind::Rock)]);
        repel(&mut store);
        assert_eq!(store.get(0).unwrap().position, IVec2::new(20, 20));
        assert_eq!(store.get(1).unwrap().position, IVec2::new(26, 26));
    }

    #[test]
    fn test_empty_board_resolves_nothing() {
        let mut store = store(&[]);
        let summary = resolve(&mut store, &InteractionRule::classic(), LossPolicy::Transform);
        assert_eq!(summary, InteractionSummary::default());
    }

    #[test]
    fn test_loss_policy_from_flag() {
        assert_eq!(LossPolicy::from_transform_flag(true), LossPolicy::Transform);
        assert_eq!(LossPolicy::from_transform_flag(false), LossPolicy::Remove);
    }
}
