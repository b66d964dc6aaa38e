//! Tick orchestration and the paced run loop
//!
//! One tick: build the index from current positions, move every entity,
//! resolve repulsion and eating, then apply the deferred queue. The
//! scheduler only ticks while Running and checks control commands between
//! ticks, never during one.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigError, SimConfig};
use crate::game::constants::frame::{IDLE_POLL, STATS_LOG_INTERVAL};
use crate::game::constants::session::MOVEMENT_STREAM;
use crate::game::control::{ControlHandle, ControlInbox, ControlState, RunState};
use crate::game::kind::{InteractionRule, Kind, RuleError};
use crate::game::performance::{BudgetStatus, FpsMeter, FramePacer, PacingStrategy, TickBudget};
use crate::game::render::{Frame, FrameSink, RenderError};
use crate::game::spatial::SpatialIndex;
use crate::game::state::{BoardError, EntityStore, InteractionEvent};
use crate::game::systems::{interaction, movement};

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid board: {0}")]
    Board(#[from] BoardError),
    #[error("invalid interaction rule: {0}")]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Outcome of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<InteractionEvent>,
    pub population: [usize; Kind::COUNT],
    pub moved: usize,
    pub repulsed_pairs: usize,
    /// Set once every alive entity shares one kind
    pub survivor: Option<Kind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Only one kind is left on the board
    Winner(Kind),
    /// Nothing is left alive
    Extinct,
    /// The tick limit was reached with several kinds alive
    TickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub ticks: u64,
    pub population: [usize; Kind::COUNT],
    pub observed_fps: f64,
}

/// Session-scoped simulation state
#[derive(Debug)]
pub struct SimulationContext {
    pub store: EntityStore,
    pub rule: InteractionRule,
    pub control: ControlState,
    pub seed: u64,
    pub tick: u64,
    rng: StdRng,
}

impl SimulationContext {
    pub fn new(store: EntityStore, rule: InteractionRule, control: ControlState, seed: u64) -> Self {
        Self {
            store,
            rule,
            control,
            seed,
            tick: 0,
            rng: StdRng::seed_from_u64(seed ^ MOVEMENT_STREAM),
        }
    }

    /// Run one tick with the active settings
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;

        let index = SpatialIndex::build(&self.store.index_points());
        let moved = movement::update(self.control.mode, &mut self.store, &index, &self.rule, &mut self.rng);
        let summary = interaction::resolve(&mut self.store, &self.rule, self.control.loss_policy);
        let events = self.store.apply_deferred();

        if !events.is_empty() {
            trace!("tick {}: {} effects applied", self.tick, events.len());
        }

        TickReport {
            tick: self.tick,
            events,
            population: self.store.population(),
            moved,
            repulsed_pairs: summary.repulsed_pairs,
            survivor: self.store.sole_survivor(),
        }
    }
}

/// Drives ticks at the desired rate and reports frame statistics
#[derive(Debug)]
pub struct FrameScheduler {
    context: SimulationContext,
    inbox: ControlInbox,
    pacer: FramePacer,
    fps: FpsMeter,
    budget: TickBudget,
    last_stats_log: Instant,
    last_status: BudgetStatus,
}

impl FrameScheduler {
    /// Create a session from configuration; the scheduler starts Stopped
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let board = config.board()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        info!("Session seed {}", seed);

        let store = EntityStore::create(seed, board, config.objects_per_kind);
        let control = ControlState::new(config.movement_mode, config.loss_policy(), config.desired_fps);
        Self::with_store(store, InteractionRule::classic(), control, seed, config.pacing)
    }

    /// Create a session around an existing store
    pub fn with_store(
        store: EntityStore,
        rule: InteractionRule,
        control: ControlState,
        seed: u64,
        pacing: PacingStrategy,
    ) -> Result<Self, SimError> {
        rule.validate()?;

        info!(
            "Session ready: {} entities on {}x{} board, mode={}, loss={:?}, target {} FPS ({} pacing)",
            store.alive_count(),
            store.board().width(),
            store.board().height(),
            control.mode,
            control.loss_policy,
            control.desired_fps,
            pacing
        );

        Ok(Self {
            pacer: FramePacer::new(control.desired_fps, pacing),
            fps: FpsMeter::default(),
            budget: TickBudget::new(control.desired_fps),
            context: SimulationContext::new(store, rule, control, seed),
            inbox: ControlInbox::new(),
            last_stats_log: Instant::now(),
            last_status: BudgetStatus::Excellent,
        })
    }

    pub fn control_handle(&self) -> ControlHandle {
        self.inbox.handle()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn store(&self) -> &EntityStore {
        &self.context.store
    }

    pub fn run_state(&self) -> RunState {
        self.context.control.run_state
    }

    pub fn observed_fps(&self) -> f64 {
        self.fps.fps()
    }

    pub fn budget(&self) -> &TickBudget {
        &self.budget
    }

    /// Run one tick regardless of run state, without pacing
    pub fn tick(&mut self) -> TickReport {
        self.context.tick()
    }

    /// Apply queued control commands
    fn poll_controls(&mut self) {
        let fps_before = self.context.control.desired_fps;
        let state_before = self.context.control.run_state;

        if self.inbox.drain_into(&mut self.context.control) == 0 {
            return;
        }

        let control = self.context.control;
        if control.desired_fps != fps_before {
            debug!("Target rate {} -> {} FPS", fps_before, control.desired_fps);
            self.pacer.set_fps(control.desired_fps);
            self.budget.set_fps(control.desired_fps);
        }
        if control.run_state != state_before {
            info!("Simulation {:?} at tick {}", control.run_state, self.context.tick);
        }
    }

    /// One loop iteration: controls, then a paced tick when Running
    ///
    /// Returns `None` when Stopped, after idling briefly.
    pub fn run_frame<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<Option<TickReport>, SimError> {
        self.poll_controls();

        if !self.context.control.is_running() {
            std::thread::sleep(IDLE_POLL);
            return Ok(None);
        }

        let tick_start = Instant::now();
        let report = self.context.tick();

        let entities = self.context.store.snapshot();
        sink.present(&Frame {
            tick: report.tick,
            board: *self.context.store.board(),
            entities: &entities,
        })?;

        self.budget.record(tick_start.elapsed(), entities.len());
        self.pacer.wait(tick_start);
        self.fps.record();

        self.check_budget();
        if self.last_stats_log.elapsed() >= STATS_LOG_INTERVAL {
            self.log_stats();
            self.last_stats_log = Instant::now();
        }

        Ok(Some(report))
    }

    /// Loop until one kind remains, the board empties or `max_ticks` ticks ran
    pub fn run<S: FrameSink + ?Sized>(&mut self, sink: &mut S, max_ticks: u64) -> Result<RunSummary, SimError> {
        let outcome = loop {
            if let Some(kind) = self.context.store.sole_survivor() {
                break RunOutcome::Winner(kind);
            }
            if self.context.store.alive_count() == 0 {
                break RunOutcome::Extinct;
            }
            if self.context.tick >= max_ticks {
                break RunOutcome::TickLimit;
            }
            self.run_frame(sink)?;
        };
        sink.finish()?;

        let summary = RunSummary {
            outcome,
            ticks: self.context.tick,
            population: self.context.store.population(),
            observed_fps: self.fps.fps(),
        };

        match outcome {
            RunOutcome::Winner(kind) => info!("{} wins after {} ticks", kind, summary.ticks),
            RunOutcome::Extinct => info!("No entities left after {} ticks", summary.ticks),
            RunOutcome::TickLimit => info!(
                "Tick limit {} reached, population {:?}",
                max_ticks, summary.population
            ),
        }

        Ok(summary)
    }

    fn check_budget(&mut self) {
        let status = self.budget.status();
        if status == BudgetStatus::Critical && self.last_status != BudgetStatus::Critical {
            warn!("Tick work exceeds frame budget: {}", self.budget.status_message());
        }
        self.last_status = status;
    }

    fn log_stats(&self) {
        let [rock, paper, scissor] = self.context.store.population();
        info!(
            "Tick {}: rock {}, paper {}, scissor {} | {:.1} FPS | Perf: {}",
            self.context.tick,
            rock,
            paper,
            scissor,
            self.fps.fps(),
            self.budget.status_message()
        );
    }
}
