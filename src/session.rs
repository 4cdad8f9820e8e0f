//! The round controller: menu, riding, grading a signal, showing the result,
//! game over.
//!
//! Everything a round needs lives in [`Session`]. The front end calls
//! [`Session::tick`] once per frame with the classifier's label and reacts to
//! the returned [`SessionEvent`] (sounds, saving scores).

use glam::Vec2;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::SessionConfig;
use crate::gesture::Gesture;
use crate::grading::{GradePhase, MissionGrader, Resolution, Verdict};
use crate::heading::{Heading, Mission};
use crate::road::{Road, RoadSegment, SegmentId, SegmentPlanner, TriggerDistances, planner_for};
use crate::world::{Backdrop, world_velocity};

/// The rider never leaves the origin; the road moves instead.
pub const PLAYER: Vec2 = Vec2::ZERO;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Menu,
    Playing,
    Grading,
    ResultAnim,
    GameOver,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MissionStarted {
        mission: Mission,
        segment: SegmentId,
    },
    MissionResolved(Resolution),
    GameOver {
        score: u32,
        new_best: bool,
    },
    ReturnedToMenu,
}

pub struct Session {
    config: SessionConfig,
    phase: Phase,
    tick: u64,
    phase_started: u64,
    score: u32,
    best: u32,
    mistakes: u32,
    heading: Heading,
    velocity: Vec2,
    road: Road,
    grader: MissionGrader,
    backdrop: Backdrop,
    active_segment: Option<SegmentId>,
    last_resolution: Option<Resolution>,
    rng: StdRng,
}

impl Session {
    pub fn new(config: SessionConfig, rng: StdRng) -> Self {
        Self {
            road: Road::new(&config.road),
            grader: MissionGrader::new(config.grading),
            backdrop: Backdrop::new(config.backdrop_tile),
            config,
            phase: Phase::Menu,
            tick: 0,
            phase_started: 0,
            score: 0,
            best: 0,
            mistakes: 0,
            heading: Heading::Up,
            velocity: Vec2::ZERO,
            active_segment: None,
            last_resolution: None,
            rng,
        }
    }

    /// Carries over a best score from a previous run, e.g. a stored account.
    pub fn with_best(mut self, best: u32) -> Self {
        self.best = best;
        self
    }

    /// Begins a round from the menu or the game-over screen.
    pub fn start(&mut self) -> bool {
        let planner = planner_for(&self.config.road);
        self.start_with_planner(planner)
    }

    pub fn start_with_planner(&mut self, planner: Box<dyn SegmentPlanner>) -> bool {
        if !matches!(self.phase, Phase::Menu | Phase::GameOver) {
            return false;
        }
        self.score = 0;
        self.mistakes = 0;
        self.heading = Heading::Up;
        self.road = Road::with_planner(&self.config.road, planner);
        self.road.spawn(PLAYER, &mut self.rng);
        self.backdrop = Backdrop::new(self.config.backdrop_tile);
        self.grader.reset();
        self.active_segment = None;
        self.last_resolution = None;
        self.velocity = world_velocity(self.heading, self.config.speed);
        self.enter(Phase::Playing);
        true
    }

    pub fn tick(&mut self, gesture: Gesture) -> Option<SessionEvent> {
        self.tick += 1;
        match self.phase {
            Phase::Menu => None,
            Phase::Playing => self.update_playing(),
            Phase::Grading => self
                .grader
                .tick(self.tick, gesture)
                .map(|resolution| self.finish_grading(resolution)),
            Phase::ResultAnim => self.update_result(),
            Phase::GameOver => {
                if self.ticks_in_phase() >= self.config.game_over_ticks as u64 {
                    self.enter(Phase::Menu);
                    Some(SessionEvent::ReturnedToMenu)
                } else {
                    None
                }
            }
        }
    }

    fn update_playing(&mut self) -> Option<SessionEvent> {
        self.velocity = world_velocity(self.heading, self.config.speed);
        self.road.scroll(self.velocity);
        self.backdrop.advance(self.velocity);
        self.road.spawn(PLAYER, &mut self.rng);

        let id = self.road.find_trigger(PLAYER, self.triggers())?;
        self.begin_grading(id)
    }

    fn begin_grading(&mut self, id: SegmentId) -> Option<SessionEvent> {
        let mission = self.road.judge(id)?;
        if mission.rotates() {
            // Pin the corner onto the rider so the new heading lines up with
            // the tile's exit leg.
            if let Some(center) = self.road.get(id).map(RoadSegment::center) {
                self.road.shift(PLAYER - center);
            }
        }
        self.velocity = Vec2::ZERO;
        self.active_segment = Some(id);
        self.grader.arm(mission, self.tick);
        self.enter(Phase::Grading);
        info!(?mission, segment = id, "mission started");
        Some(SessionEvent::MissionStarted {
            mission,
            segment: id,
        })
    }

    fn finish_grading(&mut self, resolution: Resolution) -> SessionEvent {
        match resolution.verdict {
            Verdict::Success => self.score += self.config.success_points,
            Verdict::Fail => self.mistakes += 1,
        }
        // The road has already turned, so the rider turns with it either way.
        if resolution.mission.rotates() {
            self.heading = resolution.mission.kind().exit_heading(self.heading);
            if let Some(tile) = self.active_segment.and_then(|id| self.road.get(id)) {
                debug_assert_eq!(tile.exit(), self.heading, "rider left the road");
            }
        }
        self.grader.reset();
        self.active_segment = None;
        self.last_resolution = Some(resolution);
        self.velocity = Vec2::ZERO;
        self.enter(Phase::ResultAnim);
        SessionEvent::MissionResolved(resolution)
    }

    fn update_result(&mut self) -> Option<SessionEvent> {
        if self.ticks_in_phase() < self.config.result_ticks as u64 {
            return None;
        }
        if self.mistakes >= self.config.mistake_limit {
            let new_best = self.score > self.best;
            self.best = self.best.max(self.score);
            self.enter(Phase::GameOver);
            info!(score = self.score, new_best, "game over");
            return Some(SessionEvent::GameOver {
                score: self.score,
                new_best,
            });
        }
        self.velocity = world_velocity(self.heading, self.config.speed);
        self.enter(Phase::Playing);
        None
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = ?self.phase, to = ?phase, tick = self.tick, "phase change");
        self.phase = phase;
        self.phase_started = self.tick;
    }

    fn triggers(&self) -> TriggerDistances {
        TriggerDistances {
            turn: self.config.turn_trigger,
            stop: self.config.stop_trigger,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn grade_phase(&self) -> GradePhase {
        self.grader.phase()
    }

    pub fn ticks_in_phase(&self) -> u64 {
        self.tick - self.phase_started
    }

    pub fn frame(&self) -> u64 {
        self.tick
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn mistake_limit(&self) -> u32 {
        self.config.mistake_limit
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn road(&self) -> &Road {
        &self.road
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    /// Mission being graded, while in [`Phase::Grading`].
    pub fn mission(&self) -> Option<Mission> {
        self.grader.mission()
    }

    pub fn reacting(&self) -> bool {
        self.phase == Phase::Grading && self.grader.phase() == GradePhase::Armed
    }

    /// Ticks left until the current mission is graded.
    pub fn hold_remaining(&self) -> u32 {
        self.grader.remaining_ticks(self.tick)
    }

    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last_resolution.as_ref()
    }

    /// The next signal the rider will meet, placed or still planned.
    pub fn next_signal(&self) -> Option<Mission> {
        self.road
            .segments()
            .filter(|s| !s.is_judged())
            .find_map(RoadSegment::mission)
            .or_else(|| {
                self.road
                    .upcoming()
                    .into_iter()
                    .find_map(|d| d.kind.mission())
            })
    }
}
