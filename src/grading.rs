//! Turns a stream of per-tick gesture labels into a verdict for one mission.
//!
//! After arming, the first `reaction_ticks` are ignored so the rider has time
//! to raise an arm; the next `sampling_ticks` labels are buffered; the tick
//! after that resolves.

use tracing::{debug, info};

use crate::config::GradingConfig;
use crate::gesture::Gesture;
use crate::heading::Mission;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradePhase {
    Idle,
    Armed,
    Sampling,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Fail,
}

/// Result-screen wording. The verdict itself is only pass or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Perfect,
    Great,
    Good,
    Bad,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::Perfect => "PERFECT!",
            Rating::Great => "GREAT",
            Rating::Good => "GOOD",
            Rating::Bad => "BAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub mission: Mission,
    pub accuracy: f64,
    pub samples: usize,
    pub verdict: Verdict,
    pub rating: Rating,
}

/// Share of samples matching `mission`; zero for an empty buffer.
pub fn accuracy(samples: &[Gesture], mission: Mission) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let hits = samples.iter().filter(|g| g.matches(mission)).count();
    hits as f64 / samples.len() as f64
}

pub fn verdict(accuracy: f64, threshold: f64) -> Verdict {
    if accuracy >= threshold {
        Verdict::Success
    } else {
        Verdict::Fail
    }
}

pub fn rating(accuracy: f64, threshold: f64) -> Rating {
    match verdict(accuracy, threshold) {
        Verdict::Fail => Rating::Bad,
        Verdict::Success if accuracy >= 0.9 => Rating::Perfect,
        Verdict::Success if accuracy >= 0.7 => Rating::Great,
        Verdict::Success => Rating::Good,
    }
}

#[derive(Debug, Clone)]
struct Active {
    mission: Mission,
    started: u64,
}

#[derive(Debug, Clone)]
pub struct MissionGrader {
    config: GradingConfig,
    phase: GradePhase,
    active: Option<Active>,
    samples: Vec<Gesture>,
}

impl MissionGrader {
    pub fn new(config: GradingConfig) -> Self {
        Self {
            config,
            phase: GradePhase::Idle,
            active: None,
            samples: Vec::with_capacity(config.sampling_ticks as usize),
        }
    }

    pub fn phase(&self) -> GradePhase {
        self.phase
    }

    pub fn mission(&self) -> Option<Mission> {
        self.active.as_ref().map(|a| a.mission)
    }

    pub fn samples(&self) -> &[Gesture] {
        &self.samples
    }

    /// Starts grading `mission` at tick `now`, discarding any old samples.
    pub fn arm(&mut self, mission: Mission, now: u64) {
        self.samples.clear();
        self.active = Some(Active {
            mission,
            started: now,
        });
        self.phase = GradePhase::Armed;
        debug!(?mission, now, "grader armed");
    }

    /// Ticks left in the sampling window, for the hold countdown.
    pub fn remaining_ticks(&self, now: u64) -> u32 {
        let Some(active) = &self.active else {
            return 0;
        };
        let end = active.started
            + self.config.reaction_ticks as u64
            + self.config.sampling_ticks as u64;
        end.saturating_sub(now) as u32
    }

    /// Advances to tick `now` with the classifier's current label. Returns the
    /// resolution on the tick the sampling window closes.
    pub fn tick(&mut self, now: u64, gesture: Gesture) -> Option<Resolution> {
        let active = self.active.as_ref()?;
        if self.phase == GradePhase::Resolved {
            return None;
        }
        let mission = active.mission;
        let elapsed = now.saturating_sub(active.started);
        let reaction = self.config.reaction_ticks as u64;
        let window_end = reaction + self.config.sampling_ticks as u64;

        if elapsed < reaction {
            self.phase = GradePhase::Armed;
            None
        } else if elapsed < window_end {
            self.phase = GradePhase::Sampling;
            self.samples.push(gesture);
            None
        } else {
            Some(self.resolve(mission))
        }
    }

    fn resolve(&mut self, mission: Mission) -> Resolution {
        let threshold = self.config.success_threshold;
        let accuracy = accuracy(&self.samples, mission);
        let resolution = Resolution {
            mission,
            accuracy,
            samples: self.samples.len(),
            verdict: verdict(accuracy, threshold),
            rating: rating(accuracy, threshold),
        };
        self.phase = GradePhase::Resolved;
        info!(
            ?mission,
            accuracy,
            samples = resolution.samples,
            verdict = ?resolution.verdict,
            "mission graded"
        );
        resolution
    }

    /// Drops the finished mission and returns to idle.
    pub fn reset(&mut self) {
        self.active = None;
        self.samples.clear();
        self.phase = GradePhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(hits: usize, misses: usize, hit: Gesture) -> Vec<Gesture> {
        let mut v = vec![hit; hits];
        v.extend(std::iter::repeat(Gesture::None).take(misses));
        v
    }

    #[test]
    fn accuracy_is_exact_ratio() {
        for n in 1..=20 {
            for k in 0..=n {
                let samples = labels(k, n - k, Gesture::LeftTurn);
                let acc = accuracy(&samples, Mission::LeftTurn);
                assert_eq!(acc, k as f64 / n as f64);
                let expected = if k * 5 >= n * 2 {
                    Verdict::Success
                } else {
                    Verdict::Fail
                };
                assert_eq!(verdict(acc, 0.4), expected, "{k}/{n}");
            }
        }
    }

    #[test]
    fn boundary_ratio_passes() {
        let samples = labels(2, 3, Gesture::Stop);
        let acc = accuracy(&samples, Mission::Stop);
        assert_eq!(verdict(acc, 0.4), Verdict::Success);
        assert_eq!(rating(acc, 0.4), Rating::Good);
    }

    #[test]
    fn empty_buffer_fails() {
        assert_eq!(accuracy(&[], Mission::RightTurn), 0.0);
        assert_eq!(verdict(0.0, 0.4), Verdict::Fail);
    }

    #[test]
    fn wrong_gesture_does_not_count() {
        let samples = vec![Gesture::RightTurn; 10];
        assert_eq!(accuracy(&samples, Mission::LeftTurn), 0.0);
    }

    #[test]
    fn ratings_follow_accuracy() {
        assert_eq!(rating(1.0, 0.4), Rating::Perfect);
        assert_eq!(rating(0.75, 0.4), Rating::Great);
        assert_eq!(rating(0.5, 0.4), Rating::Good);
        assert_eq!(rating(0.39, 0.4), Rating::Bad);
    }

    #[test]
    fn reaction_window_is_not_sampled() {
        let config = GradingConfig {
            reaction_ticks: 3,
            sampling_ticks: 4,
            success_threshold: 0.4,
        };
        let mut grader = MissionGrader::new(config);
        grader.arm(Mission::RightTurn, 100);
        assert_eq!(grader.phase(), GradePhase::Armed);

        // Wrong gestures while reacting are ignored.
        for now in 101..103 {
            assert_eq!(grader.tick(now, Gesture::Stop), None);
            assert_eq!(grader.phase(), GradePhase::Armed);
        }
        for now in 103..107 {
            assert_eq!(grader.tick(now, Gesture::RightTurn), None);
            assert_eq!(grader.phase(), GradePhase::Sampling);
        }
        assert_eq!(grader.samples().len(), 4);

        let resolution = grader.tick(107, Gesture::None).unwrap();
        assert_eq!(resolution.accuracy, 1.0);
        assert_eq!(resolution.verdict, Verdict::Success);
        assert_eq!(grader.phase(), GradePhase::Resolved);
        assert_eq!(grader.tick(108, Gesture::None), None);
    }

    #[test]
    fn resolution_reports_the_armed_mission() {
        let mut grader = MissionGrader::new(GradingConfig {
            reaction_ticks: 0,
            sampling_ticks: 2,
            success_threshold: 0.4,
        });
        for mission in [Mission::LeftTurn, Mission::RightTurn, Mission::Stop] {
            grader.arm(mission, 0);
            grader.tick(0, Gesture::None);
            grader.tick(1, Gesture::None);
            let resolution = grader.tick(2, Gesture::None).unwrap();
            assert_eq!(resolution.mission, mission);
            assert_eq!(resolution.verdict, Verdict::Fail);
            grader.reset();
        }
    }

    #[test]
    fn zero_length_window_fails() {
        let config = GradingConfig {
            reaction_ticks: 1,
            sampling_ticks: 0,
            success_threshold: 0.4,
        };
        let mut grader = MissionGrader::new(config);
        grader.arm(Mission::Stop, 0);
        let resolution = grader.tick(1, Gesture::Stop).unwrap();
        assert_eq!(resolution.samples, 0);
        assert_eq!(resolution.accuracy, 0.0);
        assert_eq!(resolution.verdict, Verdict::Fail);
    }

    #[test]
    fn rearming_clears_old_samples() {
        let mut grader = MissionGrader::new(GradingConfig {
            reaction_ticks: 0,
            sampling_ticks: 5,
            success_threshold: 0.4,
        });
        grader.arm(Mission::LeftTurn, 0);
        grader.tick(0, Gesture::LeftTurn);
        grader.tick(1, Gesture::LeftTurn);
        assert_eq!(grader.samples().len(), 2);

        grader.reset();
        assert_eq!(grader.phase(), GradePhase::Idle);
        assert_eq!(grader.tick(2, Gesture::LeftTurn), None);

        grader.arm(Mission::Stop, 10);
        assert!(grader.samples().is_empty());
        assert_eq!(grader.remaining_ticks(10), 5);
    }
}
