//! Gesture input: the classifier boundary and the guard that owns it.
//!
//! A [`GestureSource`] produces one label per tick. Sources that fail to start
//! are not fatal: [`ActiveSource`] degrades them to a constant
//! [`Gesture::None`] stream, and every mission then simply fails.

pub mod keyboard;
pub mod pose;

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::heading::Mission;

pub use keyboard::KeyboardGestures;
pub use pose::{LandmarkFeed, PoseClassifier, PoseFrame, ReplayFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gesture {
    #[default]
    None,
    LeftTurn,
    RightTurn,
    Stop,
}

impl Gesture {
    pub fn matches(self, mission: Mission) -> bool {
        matches!(
            (self, mission),
            (Gesture::LeftTurn, Mission::LeftTurn)
                | (Gesture::RightTurn, Mission::RightTurn)
                | (Gesture::Stop, Mission::Stop)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Gesture::None => "-",
            Gesture::LeftTurn => "LEFT",
            Gesture::RightTurn => "RIGHT",
            Gesture::Stop => "STOP",
        }
    }
}

#[derive(Debug, Error)]
pub enum GestureError {
    #[error("cannot open pose feed {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("pose feed read failed: {0}")]
    Read(#[from] io::Error),
    #[error("pose feed line {line} is not a pose frame: {source}")]
    Frame {
        line: usize,
        source: serde_json::Error,
    },
    #[error("pose feed {0} has no frames")]
    Empty(PathBuf),
}

pub trait GestureSource {
    /// Opens the underlying device. Calling it again while open is a no-op.
    fn start(&mut self) -> Result<(), GestureError>;

    /// One synchronous classification step.
    fn update(&mut self);

    fn current(&self) -> Gesture;

    /// Latest pose, for the on-screen preview.
    fn preview(&self) -> Option<&PoseFrame> {
        None
    }

    /// Releases the device. Safe to call when already stopped.
    fn stop(&mut self);
}

/// Owns a started source and stops it when dropped, on every exit path.
pub struct ActiveSource<S: GestureSource> {
    source: S,
    degraded: bool,
}

impl<S: GestureSource> ActiveSource<S> {
    pub fn acquire(mut source: S) -> Self {
        let degraded = match source.start() {
            Ok(()) => {
                info!("gesture source started");
                false
            }
            Err(e) => {
                warn!(error = %e, "gesture source unavailable, every label will be NONE");
                true
            }
        };
        Self { source, degraded }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn update(&mut self) {
        if !self.degraded {
            self.source.update();
        }
    }

    pub fn current(&self) -> Gesture {
        if self.degraded {
            Gesture::None
        } else {
            self.source.current()
        }
    }

    pub fn preview(&self) -> Option<&PoseFrame> {
        if self.degraded {
            None
        } else {
            self.source.preview()
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: GestureSource> Drop for ActiveSource<S> {
    fn drop(&mut self) {
        self.source.stop();
    }
}

/// Either input the front end can be started with.
pub enum AnySource {
    Keys(KeyboardGestures),
    Poses(PoseClassifier<ReplayFeed>),
}

impl AnySource {
    pub fn keyboard(&mut self) -> Option<&mut KeyboardGestures> {
        match self {
            AnySource::Keys(k) => Some(k),
            AnySource::Poses(_) => None,
        }
    }
}

impl GestureSource for AnySource {
    fn start(&mut self) -> Result<(), GestureError> {
        match self {
            AnySource::Keys(s) => s.start(),
            AnySource::Poses(s) => s.start(),
        }
    }

    fn update(&mut self) {
        match self {
            AnySource::Keys(s) => s.update(),
            AnySource::Poses(s) => s.update(),
        }
    }

    fn current(&self) -> Gesture {
        match self {
            AnySource::Keys(s) => s.current(),
            AnySource::Poses(s) => s.current(),
        }
    }

    fn preview(&self) -> Option<&PoseFrame> {
        match self {
            AnySource::Keys(s) => s.preview(),
            AnySource::Poses(s) => s.preview(),
        }
    }

    fn stop(&mut self) {
        match self {
            AnySource::Keys(s) => s.stop(),
            AnySource::Poses(s) => s.stop(),
        }
    }
}
