//! Board and entity storage
//!
//! Entities live in an arena: an entity's id is its slot index and removed
//! entities keep their slot, so ids stay stable for the whole session.
//! Removals and kind changes found during a scan are queued and applied
//! only after the scan finishes.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::game::kind::Kind;
use crate::util::ivec2::IVec2;

/// Stable entity identifier (slot index in the store)
pub type EntityId = usize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("object size must be positive, got {0}")]
    InvalidObjectSize(i32),
    #[error("object size {object_size} leaves no interior on a {width}x{height} board")]
    EmptyInterior {
        width: i32,
        height: i32,
        object_size: i32,
    },
}

/// Immutable board geometry for a session
///
/// Only constructible through [`Board::new`], so the interior is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Board {
    width: i32,
    height: i32,
    object_size: i32,
}

impl Board {
    pub fn new(width: i32, height: i32, object_size: i32) -> Result<Self, BoardError> {
        if width <= 0 || height <= 0 {
            return Err(BoardError::InvalidDimensions { width, height });
        }
        if object_size <= 0 {
            return Err(BoardError::InvalidObjectSize(object_size));
        }
        if width < 2 * object_size || height < 2 * object_size {
            return Err(BoardError::EmptyInterior {
                width,
                height,
                object_size,
            });
        }
        Ok(Self {
            width,
            height,
            object_size,
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Sprite footprint, also the repulsion and overlap threshold
    #[inline]
    pub fn object_size(&self) -> i32 {
        self.object_size
    }

    /// Smallest legal position on both axes
    #[inline]
    pub fn min(&self) -> IVec2 {
        IVec2::new(self.object_size, self.object_size)
    }

    /// Largest legal position on both axes
    #[inline]
    pub fn max(&self) -> IVec2 {
        IVec2::new(self.width - self.object_size, self.height - self.object_size)
    }

    #[inline]
    pub fn clamp(&self, position: IVec2) -> IVec2 {
        position.clamp(self.min(), self.max())
    }

    #[inline]
    pub fn contains(&self, position: IVec2) -> bool {
        let (min, max) = (self.min(), self.max());
        (min.x..=max.x).contains(&position.x) && (min.y..=max.y).contains(&position.y)
    }
}

impl Default for Board {
    fn default() -> Self {
        use crate::game::constants::board::{HEIGHT, OBJECT_SIZE, WIDTH};
        Self {
            width: WIDTH,
            height: HEIGHT,
            object_size: OBJECT_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub position: IVec2,
    pub kind: Kind,
    pub alive: bool,
}

/// What happens to an entity that loses an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredEffect {
    Remove,
    Transform(Kind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEffect {
    predator: EntityId,
    effect: DeferredEffect,
}

/// Applied outcome of a queued effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    Removed {
        predator: EntityId,
        prey: EntityId,
        kind: Kind,
    },
    Transformed {
        predator: EntityId,
        prey: EntityId,
        from: Kind,
        to: Kind,
    },
}

/// Alive entity as handed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub x: i32,
    pub y: i32,
    pub kind: Kind,
}

/// Owns every entity record of a session
#[derive(Debug, Clone)]
pub struct EntityStore {
    board: Board,
    entities: Vec<Entity>,
    pending: HashMap<EntityId, PendingEffect>,
}

impl EntityStore {
    /// Place `count_per_kind` entities of each kind uniformly at random inside the board interior
    pub fn create(seed: u64, board: Board, count_per_kind: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (min, max) = (board.min(), board.max());

        let mut entities = Vec::with_capacity(count_per_kind * Kind::COUNT);
        for kind in Kind::ALL {
            for _ in 0..count_per_kind {
                let position = IVec2::new(rng.gen_range(min.x..=max.x), rng.gen_range(min.y..=max.y));
                entities.push(Entity {
                    id: entities.len(),
                    position,
                    kind,
                    alive: true,
                });
            }
        }

        debug!(
            "Placed {} entities ({} per kind) on {}x{} board",
            entities.len(),
            count_per_kind,
            board.width(),
            board.height()
        );

        Self {
            board,
            entities,
            pending: HashMap::new(),
        }
    }

    /// Build a store from explicit placements; positions are clamped into the interior
    pub fn from_placements(board: Board, placements: &[(IVec2, Kind)]) -> Self {
        let entities = placements
            .iter()
            .enumerate()
            .map(|(id, &(position, kind))| Entity {
                id,
                position: board.clamp(position),
                kind,
                alive: true,
            })
            .collect();

        Self {
            board,
            entities,
            pending: HashMap::new(),
        }
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Kind of an alive entity
    pub fn kind_of(&self, id: EntityId) -> Option<Kind> {
        self.entities.get(id).filter(|e| e.alive).map(|e| e.kind)
    }

    /// All slots, including removed entities
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn alive(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().filter(|e| e.alive)
    }

    pub fn alive_ids(&self) -> Vec<EntityId> {
        self.alive().map(|e| e.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    /// Positional snapshot of alive entities for index construction
    pub fn index_points(&self) -> Vec<(IVec2, EntityId)> {
        self.alive().map(|e| (e.position, e.id)).collect()
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.alive()
            .map(|e| EntitySnapshot {
                id: e.id,
                x: e.position.x,
                y: e.position.y,
                kind: e.kind,
            })
            .collect()
    }

    /// Alive count per kind, indexed by `Kind::index`
    pub fn population(&self) -> [usize; Kind::COUNT] {
        let mut counts = [0; Kind::COUNT];
        for entity in self.alive() {
            counts[entity.kind.index()] += 1;
        }
        counts
    }

    /// The one kind every alive entity shares, if exactly one kind remains
    pub fn sole_survivor(&self) -> Option<Kind> {
        let population = self.population();
        let mut remaining = Kind::ALL.into_iter().filter(|k| population[k.index()] > 0);
        match (remaining.next(), remaining.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        }
    }

    /// Step an alive entity by one unit per axis, then clamp into the interior
    ///
    /// Components outside {-1, 0, 1} are reduced to their sign.
    pub fn move_by(&mut self, id: EntityId, step: IVec2) {
        let board = self.board;
        if let Some(entity) = self.entities.get_mut(id).filter(|e| e.alive) {
            entity.position = board.clamp(entity.position + step.signum());
        }
    }

    /// Queue `prey` to take `new_kind` once the current scan completes
    pub fn queue_transform(&mut self, prey: EntityId, new_kind: Kind, predator: EntityId) {
        self.queue(prey, predator, DeferredEffect::Transform(new_kind));
    }

    /// Queue `prey` for removal once the current scan completes
    pub fn queue_removal(&mut self, prey: EntityId, predator: EntityId) {
        self.queue(prey, predator, DeferredEffect::Remove);
    }

    fn queue(&mut self, prey: EntityId, predator: EntityId, effect: DeferredEffect) {
        if self.kind_of(prey).is_none() {
            return;
        }
        // Last writer wins per victim
        self.pending.insert(prey, PendingEffect { predator, effect });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Effect queued for `prey` this tick, if any
    pub fn pending_effect(&self, prey: EntityId) -> Option<DeferredEffect> {
        self.pending.get(&prey).map(|p| p.effect)
    }

    /// Apply every queued effect in ascending victim id and clear the queue
    pub fn apply_deferred(&mut self) -> Vec<InteractionEvent> {
        let mut queued: Vec<(EntityId, PendingEffect)> = self.pending.drain().collect();
        queued.sort_unstable_by_key(|(prey, _)| *prey);

        let mut events = Vec::with_capacity(queued.len());
        for (prey, PendingEffect { predator, effect }) in queued {
            let Some(entity) = self.entities.get_mut(prey).filter(|e| e.alive) else {
                continue;
            };
            match effect {
                DeferredEffect::Remove => {
                    entity.alive = false;
                    debug!("{} {} removed by {}", entity.kind, prey, predator);
                    events.push(InteractionEvent::Removed {
                        predator,
                        prey,
                        kind: entity.kind,
                    });
                }
                DeferredEffect::Transform(to) => {
                    let from = entity.kind;
                    entity.kind = to;
                    debug!("{} {} became {} via {}", from, prey, to, predator);
                    events.push(InteractionEvent::Transformed {
                        predator,
                        prey,
                        from,
                        to,
                    });
                }
            }
        }
        events
    }
}
