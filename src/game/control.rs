//! Run/stop and live-setting commands
//!
//! Commands are sent through a cloneable `ControlHandle` and drained by the
//! scheduler at the start of every frame, so a change always lands between
//! ticks.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{info, warn};

use crate::game::constants::frame::{MAX_FPS, MIN_FPS};
use crate::game::systems::interaction::LossPolicy;
use crate::game::systems::movement::MovementMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Toggle,
    SetMode(MovementMode),
    SetLossPolicy(LossPolicy),
    SetFps(u32),
}

/// Sending side of the control channel
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Sender<ControlCommand>,
}

impl ControlHandle {
    /// Returns false once the scheduler is gone
    pub fn send(&self, command: ControlCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(ControlCommand::Start)
    }

    pub fn stop(&self) -> bool {
        self.send(ControlCommand::Stop)
    }

    pub fn toggle(&self) -> bool {
        self.send(ControlCommand::Toggle)
    }
}

/// Settings the scheduler reads every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub run_state: RunState,
    pub mode: MovementMode,
    pub loss_policy: LossPolicy,
    pub desired_fps: u32,
}

impl ControlState {
    pub fn new(mode: MovementMode, loss_policy: LossPolicy, desired_fps: u32) -> Self {
        Self {
            run_state: RunState::Stopped,
            mode,
            loss_policy,
            desired_fps: clamp_fps(desired_fps),
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn apply(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Start => self.run_state = RunState::Running,
            ControlCommand::Stop => self.run_state = RunState::Stopped,
            ControlCommand::Toggle => {
                self.run_state = match self.run_state {
                    RunState::Running => RunState::Stopped,
                    RunState::Stopped => RunState::Running,
                };
            }
            ControlCommand::SetMode(mode) => {
                if mode != self.mode {
                    info!("Movement mode {} -> {}", self.mode, mode);
                }
                self.mode = mode;
            }
            ControlCommand::SetLossPolicy(policy) => self.loss_policy = policy,
            ControlCommand::SetFps(fps) => self.desired_fps = clamp_fps(fps),
        }
    }
}

fn clamp_fps(fps: u32) -> u32 {
    let clamped = fps.clamp(MIN_FPS, MAX_FPS);
    if clamped != fps {
        warn!("Requested {} FPS, clamped to {}", fps, clamped);
    }
    clamped
}

/// Receiving side, owned by the scheduler
#[derive(Debug)]
pub struct ControlInbox {
    rx: Receiver<ControlCommand>,
    // Keeps the channel open when no external handle exists
    tx: Sender<ControlCommand>,
}

impl ControlInbox {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { rx, tx }
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    /// Apply every queued command in send order; returns how many were applied
    pub fn drain_into(&self, state: &mut ControlState) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(command) => {
                    state.apply(command);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}

impl Default for ControlInbox {
    fn default() -> Self {
        Self::new()
    }
}
