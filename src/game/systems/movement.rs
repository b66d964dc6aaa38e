use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use crate::game::kind::{InteractionRule, Kind};
use crate::game::spatial::{Neighbor, SpatialIndex};
use crate::game::state::{Entity, EntityId, EntityStore};
use crate::util::ivec2::IVec2;

/// Movement strategy applied to every entity for a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Independent uniform steps on both axes
    Random,
    /// Step toward the nearest prey, stand still without one
    Hunter,
    /// Chase the nearest prey or flee the nearest predator, steering off walls
    #[default]
    AdvancedHunter,
}

impl MovementMode {
    pub fn name(self) -> &'static str {
        match self {
            MovementMode::Random => "random",
            MovementMode::Hunter => "hunter",
            MovementMode::AdvancedHunter => "advanced_hunter",
        }
    }
}

impl fmt::Display for MovementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown movement mode '{0}' (expected random, hunter or advanced_hunter)")]
pub struct ParseModeError(pub String);

impl FromStr for MovementMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random" => Ok(MovementMode::Random),
            "hunter" => Ok(MovementMode::Hunter),
            "advanced_hunter" | "advanced" => Ok(MovementMode::AdvancedHunter),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Wall-avoidance candidates: N, NE, E, SE, S, SW, W, NW
///
/// Earlier entries win ties.
pub const COMPASS: [IVec2; 8] = [
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, 0),
    IVec2::new(-1, -1),
];

/// Neighbours inspected when scoring a wall-avoidance candidate (self included)
const CLEARANCE_QUERY_K: usize = 2;

/// Move every alive entity once, in ascending id order
///
/// Decisions read `index`, the snapshot taken before anyone moved this tick.
/// Returns how many entities actually took a step.
pub fn update<R: Rng + ?Sized>(
    mode: MovementMode,
    store: &mut EntityStore,
    index: &SpatialIndex,
    rule: &InteractionRule,
    rng: &mut R,
) -> usize {
    let mut moved = 0;
    for id in store.alive_ids() {
        let step = plan_step(mode, id, store, index, rule, rng);
        if !step.is_zero() {
            store.move_by(id, step);
            moved += 1;
        }
    }
    trace!("{} movement: {} entities stepped", mode, moved);
    moved
}

/// Step vector for a single entity, each component in {-1, 0, 1}
pub fn plan_step<R: Rng + ?Sized>(
    mode: MovementMode,
    id: EntityId,
    store: &EntityStore,
    index: &SpatialIndex,
    rule: &InteractionRule,
    rng: &mut R,
) -> IVec2 {
    let entity = match store.get(id) {
        Some(e) if e.alive => e,
        _ => return IVec2::ZERO,
    };

    match mode {
        MovementMode::Random => random_step(rng),
        MovementMode::Hunter => hunter_step(entity, store, index, rule),
        MovementMode::AdvancedHunter => advanced_hunter_step(entity, store, index, rule),
    }
}

fn random_step<R: Rng + ?Sized>(rng: &mut R) -> IVec2 {
    IVec2::new(rng.gen_range(-1..=1), rng.gen_range(-1..=1))
}

fn hunter_step(
    entity: &Entity,
    store: &EntityStore,
    index: &SpatialIndex,
    rule: &InteractionRule,
) -> IVec2 {
    let prey_kind = rule.prey_of(entity.kind);
    index
        .nearest_where(entity.position, |other| {
            other != entity.id && store.kind_of(other) == Some(prey_kind)
        })
        .map_or(IVec2::ZERO, |prey| (prey.position - entity.position).signum())
}

fn advanced_hunter_step(
    entity: &Entity,
    store: &EntityStore,
    index: &SpatialIndex,
    rule: &InteractionRule,
) -> IVec2 {
    let prey_kind = rule.prey_of(entity.kind);
    let predator_kind = rule.predator_of(entity.kind);

    // One ascending-distance scan finds the first prey and first predator
    let mut prey: Option<Neighbor> = None;
    let mut predator: Option<Neighbor> = None;
    for neighbor in index.query_k_nearest(entity.position, index.len()) {
        if neighbor.id == entity.id {
            continue;
        }
        match store.kind_of(neighbor.id) {
            Some(kind) if kind == prey_kind && prey.is_none() => prey = Some(neighbor),
            Some(kind) if kind == predator_kind && predator.is_none() => predator = Some(neighbor),
            _ => {}
        }
        if prey.is_some() && predator.is_some() {
            break;
        }
    }

    let step = match (prey, predator) {
        (Some(p), Some(q)) if p.distance <= q.distance => (p.position - entity.position).signum(),
        (Some(p), None) => (p.position - entity.position).signum(),
        (_, Some(q)) => (entity.position - q.position).signum(),
        (None, None) => return IVec2::ZERO,
    };

    if store.board().contains(entity.position + step) {
        return step;
    }
    avoid_walls(entity, predator_kind, store, index)
}

/// Pick the in-bounds compass step that leaves the most room from predators
///
/// Each candidate is scored by the distance to a predator among the
/// `CLEARANCE_QUERY_K` nearest entities of the stepped-to position, infinite
/// when none is found there. The first strictly best candidate wins. The
/// entity stays put when every direction is out of bounds, or when no
/// candidate sees a predator at all.
fn avoid_walls(
    entity: &Entity,
    predator_kind: Kind,
    store: &EntityStore,
    index: &SpatialIndex,
) -> IVec2 {
    let board = store.board();
    let allowed: SmallVec<[IVec2; 8]> = COMPASS
        .iter()
        .copied()
        .filter(|&dir| board.contains(entity.position + dir))
        .collect();

    let mut best: Option<(IVec2, f32)> = None;
    let mut any_predator_seen = false;
    for dir in allowed {
        let score = predator_clearance(entity.id, entity.position + dir, predator_kind, store, index);
        any_predator_seen |= score.is_finite();
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((dir, score));
        }
    }

    let step = match best {
        Some((dir, _)) if any_predator_seen => dir,
        _ => IVec2::ZERO,
    };
    trace!("entity {} steered off wall at {:?} with {:?}", entity.id, entity.position, step);
    step
}

fn predator_clearance(
    self_id: EntityId,
    from: IVec2,
    predator_kind: Kind,
    store: &EntityStore,
    index: &SpatialIndex,
) -> f32 {
    index
        .query_k_nearest(from, CLEARANCE_QUERY_K)
        .into_iter()
        .filter(|n| n.id != self_id)
        .find(|n| store.kind_of(n.id) == Some(predator_kind))
        .map_or(f32::INFINITY, |n| n.distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Board;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board() -> Board {
        Board::new(200, 200, 20).unwrap()
    }

    fn setup(placements: &[(IVec2, Kind)]) -> (EntityStore, SpatialIndex) {
        let store = EntityStore::from_placements(board(), placements);
        let index = SpatialIndex::build(&store.index_points());
        (store, index)
    }

    fn step_of(mode: MovementMode, id: EntityId, store: &EntityStore, index: &SpatialIndex) -> IVec2 {
        let mut rng = StdRng::seed_from_u64(0);
        plan_step(mode, id, store, index, &InteractionRule::classic(), &mut rng)
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("random".parse::<MovementMode>(), Ok(MovementMode::Random));
        assert_eq!("Hunter".parse::<MovementMode>(), Ok(MovementMode::Hunter));
        assert_eq!("advanced-hunter".parse::<MovementMode>(), Ok(MovementMode::AdvancedHunter));
        assert_eq!("advanced".parse::<MovementMode>(), Ok(MovementMode::AdvancedHunter));
        assert!("teleport".parse::<MovementMode>().is_err());
    }

    #[test]
    fn test_random_steps_are_unit_and_seeded() {
        let (store, index) = setup(&[(IVec2::new(100, 100), Kind::Rock)]);
        let rule = InteractionRule::classic();
        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);

        for _ in 0..100 {
            let sa = plan_step(MovementMode::Random, 0, &store, &index, &rule, &mut a);
            let sb = plan_step(MovementMode::Random, 0, &store, &index, &rule, &mut b);
            assert_eq!(sa, sb);
            assert!((-1..=1).contains(&sa.x) && (-1..=1).contains(&sa.y));
        }
    }

    #[test]
    fn test_hunter_alone_does_not_move() {
        let (mut store, index) = setup(&[(IVec2::new(100, 100), Kind::Rock)]);
        let mut rng = StdRng::seed_from_u64(1);
        let moved = update(MovementMode::Hunter, &mut store, &index, &InteractionRule::classic(), &mut rng);
        assert_eq!(moved, 0);
        assert_eq!(store.get(0).unwrap().position, IVec2::new(100, 100));
    }

    #[test]
    fn test_hunter_steps_toward_nearest_prey() {
        let (store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(60, 130), Kind::Scissor),
            (IVec2::new(150, 40), Kind::Scissor),
            (IVec2::new(101, 100), Kind::Paper),
        ]);
        assert_eq!(step_of(MovementMode::Hunter, 0, &store, &index), IVec2::new(-1, 1));
    }

    #[test]
    fn test_hunter_ignores_same_position_self() {
        // Another rock sharing the position is not prey and self is excluded by id
        let (store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(120, 100), Kind::Scissor),
        ]);
        assert_eq!(step_of(MovementMode::Hunter, 1, &store, &index), IVec2::RIGHT);
    }

    #[test]
    fn test_advanced_prefers_closer_prey() {
        let (store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(105, 100), Kind::Scissor),
            (IVec2::new(100, 70), Kind::Paper),
        ]);
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::RIGHT);
    }

    #[test]
    fn test_advanced_tie_goes_to_prey() {
        let (store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(110, 100), Kind::Scissor),
            (IVec2::new(90, 100), Kind::Paper),
        ]);
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::RIGHT);
    }

    #[test]
    fn test_advanced_flees_closer_predator() {
        let (store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(150, 150), Kind::Scissor),
            (IVec2::new(95, 95), Kind::Paper),
        ]);
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::new(1, 1));
    }

    #[test]
    fn test_advanced_without_prey_or_predator_stays() {
        let (store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(110, 100), Kind::Rock),
        ]);
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::ZERO);
    }

    #[test]
    fn test_advanced_steers_off_right_wall() {
        // Rock pinned on the right edge (x = 180) with a paper pushing it east
        let (store, index) = setup(&[
            (IVec2::new(180, 100), Kind::Rock),
            (IVec2::new(170, 100), Kind::Paper),
        ]);
        let before = IVec2::new(180, 100).distance(IVec2::new(170, 100));

        let step = step_of(MovementMode::AdvancedHunter, 0, &store, &index);
        let next = IVec2::new(180, 100) + step;

        assert!(board().contains(next), "stepped out of bounds to {:?}", next);
        assert_ne!(step.x, 1, "must not move into the wall");
        assert!(next.distance(IVec2::new(170, 100)) > before);
        // N and S score equally; N comes first in compass order
        assert_eq!(step, IVec2::UP);
    }

    #[test]
    fn test_advanced_wall_escape_prefers_predator_free_direction() {
        // The rock at (180, 110) hides the paper from the southward candidate only
        let (store, index) = setup(&[
            (IVec2::new(180, 100), Kind::Rock),
            (IVec2::new(170, 100), Kind::Paper),
            (IVec2::new(180, 110), Kind::Rock),
        ]);
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::DOWN);
    }

    #[test]
    fn test_advanced_wall_escape_without_visible_predator_stays() {
        // A packmate next to the rock crowds the paper out of every candidate query
        let (store, index) = setup(&[
            (IVec2::new(180, 100), Kind::Rock),
            (IVec2::new(160, 100), Kind::Paper),
            (IVec2::new(178, 100), Kind::Rock),
        ]);
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::ZERO);
    }

    #[test]
    fn test_advanced_predator_from_east_near_right_wall() {
        // One step short of the right edge, paper closing in from the east
        let (store, index) = setup(&[
            (IVec2::new(179, 100), Kind::Rock),
            (IVec2::new(180, 100), Kind::Paper),
        ]);
        let step = step_of(MovementMode::AdvancedHunter, 0, &store, &index);
        let next = IVec2::new(179, 100) + step;

        assert_eq!(step, IVec2::LEFT);
        assert!(board().contains(next));
        assert!(next.distance(IVec2::new(180, 100)) > 1.0);
    }

    #[test]
    fn test_advanced_corner_escape() {
        // Predator to the north-west of a rock in the bottom-right corner
        let (store, index) = setup(&[
            (IVec2::new(180, 180), Kind::Rock),
            (IVec2::new(175, 170), Kind::Paper),
        ]);
        let step = step_of(MovementMode::AdvancedHunter, 0, &store, &index);
        let next = IVec2::new(180, 180) + step;
        assert!(board().contains(next));
        assert!(step.x <= 0 && step.y <= 0);
        // W moves further from (175, 170) than N or NW
        assert_eq!(step, IVec2::LEFT);
    }

    #[test]
    fn test_advanced_single_point_interior_stays() {
        // A 40x40 board with object size 20 has exactly one legal position
        let board = Board::new(40, 40, 20).unwrap();
        let store = EntityStore::from_placements(
            board,
            &[(IVec2::new(20, 20), Kind::Rock), (IVec2::new(20, 20), Kind::Paper)],
        );
        let index = SpatialIndex::build(&store.index_points());
        // Zero-distance predator: flee step is zero and stays in bounds
        assert_eq!(step_of(MovementMode::AdvancedHunter, 0, &store, &index), IVec2::ZERO);
    }

    #[test]
    fn test_update_reads_pre_movement_snapshot() {
        // Both rocks chase the same scissor; moves never shift what the index reports
        let (mut store, index) = setup(&[
            (IVec2::new(100, 100), Kind::Rock),
            (IVec2::new(104, 100), Kind::Rock),
            (IVec2::new(102, 120), Kind::Scissor),
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        update(MovementMode::Hunter, &mut store, &index, &InteractionRule::classic(), &mut rng);

        assert_eq!(store.get(0).unwrap().position, IVec2::new(101, 101));
        assert_eq!(store.get(1).unwrap().position, IVec2::new(103, 101));
        // Scissor hunts paper, there is none
        assert_eq!(store.get(2).unwrap().position, IVec2::new(102, 120));
    }

    #[test]
    fn test_positions_stay_in_bounds_under_random_walk() {
        let board = board();
        let mut store = EntityStore::create(9, board, 8);
        let rule = InteractionRule::classic();
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..500 {
            let index = SpatialIndex::build(&store.index_points());
            update(MovementMode::Random, &mut store, &index, &rule, &mut rng);
            assert!(store.alive().all(|e| board.contains(e.position)));
        }
    }
}
