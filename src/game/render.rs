//! Frame presentation
//!
//! The scheduler hands every completed tick to a `FrameSink`. Sinks only
//! see an immutable view of the alive entities, positioned at the top-left
//! corner of their sprite.

use serde::Serialize;
use std::io::Write;
use std::ops::Index;

use crate::game::kind::Kind;
use crate::game::state::{Board, EntitySnapshot};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("frame output failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One presented frame
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Frame<'a> {
    pub tick: u64,
    pub board: Board,
    pub entities: &'a [EntitySnapshot],
}

pub trait FrameSink {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;

    /// Called once when the run loop exits
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Discards every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Frame<'_>) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Writes one JSON object per frame, newline separated
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    frames: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects frames in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub frames: Vec<(u64, Vec<EntitySnapshot>)>,
}

impl FrameSink for RecordingSink {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        self.frames.push((frame.tick, frame.entities.to_vec()));
        Ok(())
    }
}

/// Per-kind sprite lookup (an image handle, a glyph, a colour)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteTable<S> {
    sprites: [S; Kind::COUNT],
}

impl<S> SpriteTable<S> {
    pub fn new(rock: S, paper: S, scissor: S) -> Self {
        Self {
            sprites: [rock, paper, scissor],
        }
    }

    pub fn from_fn(mut f: impl FnMut(Kind) -> S) -> Self {
        Self {
            sprites: Kind::ALL.map(&mut f),
        }
    }

    pub fn get(&self, kind: Kind) -> &S {
        &self.sprites[kind.index()]
    }
}

impl<S> Index<Kind> for SpriteTable<S> {
    type Output = S;

    fn index(&self, kind: Kind) -> &S {
        self.get(kind)
    }
}
