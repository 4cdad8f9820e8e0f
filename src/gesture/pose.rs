//! Arm-signal classification from body landmarks.
//!
//! Only the right arm is read: shoulder, elbow, wrist and hip, in normalized
//! image coordinates (0..1, y down) of an already mirrored frame. Landmark
//! extraction happens upstream; this module sees the points only.

use std::fs;
use std::path::PathBuf;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Gesture, GestureError, GestureSource};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub right_shoulder: [f32; 2],
    pub right_elbow: [f32; 2],
    pub right_wrist: [f32; 2],
    pub right_hip: [f32; 2],
}

impl PoseFrame {
    pub fn shoulder(&self) -> Vec2 {
        Vec2::from(self.right_shoulder)
    }

    pub fn elbow(&self) -> Vec2 {
        Vec2::from(self.right_elbow)
    }

    pub fn wrist(&self) -> Vec2 {
        Vec2::from(self.right_wrist)
    }

    pub fn hip(&self) -> Vec2 {
        Vec2::from(self.right_hip)
    }
}

/// Angle at `b` between the rays to `a` and `c`, in degrees within 0..=180.
pub fn joint_angle(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = radians.to_degrees().abs();
    if angle > 180.0 { 360.0 - angle } else { angle }
}

pub fn classify(frame: &PoseFrame) -> Gesture {
    let (shoulder, elbow, wrist, hip) = (frame.shoulder(), frame.elbow(), frame.wrist(), frame.hip());

    let elbow_angle = joint_angle(shoulder, elbow, wrist);
    let arm_angle = joint_angle(elbow, shoulder, hip);
    let wrist_level = (shoulder.y - wrist.y).abs() < 0.15;
    let elbow_level = (shoulder.y - elbow.y).abs() < 0.15;
    let wrist_out = wrist.x < shoulder.x;
    let arm_raised = arm_angle > 75.0 && arm_angle < 105.0;

    // Arm straight out to the side.
    let left = elbow_angle > 150.0 && wrist_level && wrist_out && arm_raised;
    // Upper arm out, forearm pointing up.
    let right = elbow_angle > 75.0
        && elbow_angle < 105.0
        && wrist.y < elbow.y
        && elbow_level
        && wrist_out
        && arm_raised;
    // Straight arm angled down and away from the hip.
    let stop = elbow_angle > 165.0
        && wrist.y > shoulder.y + 0.15
        && arm_angle > 30.0
        && arm_angle < 80.0
        && wrist_out;

    if left {
        Gesture::LeftTurn
    } else if right {
        Gesture::RightTurn
    } else if stop {
        Gesture::Stop
    } else {
        Gesture::None
    }
}

/// Supplies one landmark set per tick, or `None` when no body was found.
pub trait LandmarkFeed {
    fn open(&mut self) -> Result<(), GestureError>;
    fn is_open(&self) -> bool;
    fn next_frame(&mut self) -> Option<PoseFrame>;
    fn close(&mut self);
}

/// Plays back a recorded JSON Lines file, one frame per line, looping at the
/// end. A `null` line is a tick without a detected pose.
pub struct ReplayFeed {
    path: PathBuf,
    frames: Vec<Option<PoseFrame>>,
    cursor: usize,
    open: bool,
}

impl ReplayFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: Vec::new(),
            cursor: 0,
            open: false,
        }
    }
}

impl LandmarkFeed for ReplayFeed {
    fn open(&mut self) -> Result<(), GestureError> {
        if self.open {
            return Ok(());
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| GestureError::Open {
            path: self.path.clone(),
            source,
        })?;
        let mut frames = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame = serde_json::from_str::<Option<PoseFrame>>(line)
                .map_err(|source| GestureError::Frame { line: i + 1, source })?;
            frames.push(frame);
        }
        if frames.is_empty() {
            return Err(GestureError::Empty(self.path.clone()));
        }
        info!(path = %self.path.display(), frames = frames.len(), "pose feed opened");
        self.frames = frames;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn next_frame(&mut self) -> Option<PoseFrame> {
        if !self.open || self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.frames.len();
        frame
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.frames.clear();
            debug!(path = %self.path.display(), "pose feed closed");
        }
    }
}

pub struct PoseClassifier<F: LandmarkFeed> {
    feed: F,
    label: Gesture,
    latest: Option<PoseFrame>,
}

impl<F: LandmarkFeed> PoseClassifier<F> {
    pub fn new(feed: F) -> Self {
        Self {
            feed,
            label: Gesture::None,
            latest: None,
        }
    }
}

impl<F: LandmarkFeed> GestureSource for PoseClassifier<F> {
    fn start(&mut self) -> Result<(), GestureError> {
        if self.feed.is_open() {
            return Ok(());
        }
        self.feed.open()
    }

    fn update(&mut self) {
        if !self.feed.is_open() {
            self.label = Gesture::None;
            self.latest = None;
            return;
        }
        self.latest = self.feed.next_frame();
        self.label = self.latest.as_ref().map(classify).unwrap_or_default();
    }

    fn current(&self) -> Gesture {
        self.label
    }

    fn preview(&self) -> Option<&PoseFrame> {
        self.latest.as_ref()
    }

    fn stop(&mut self) {
        self.feed.close();
        self.label = Gesture::None;
        self.latest = None;
    }
}
