// Whole-round scenarios driven through the public session API with a
// scripted road, so every mission arrives at a known tick.
use rand::SeedableRng;
use rand::rngs::StdRng;
use signal_runner::config::{GradingConfig, SessionConfig};
use signal_runner::grading::{GradePhase, Verdict};
use signal_runner::road::{Descriptor, SegmentPlanner};
use signal_runner::{Gesture, Heading, Mission, Phase, SegmentKind, Session, SessionEvent};

struct Scripted {
    kinds: Vec<SegmentKind>,
    next: usize,
    cursor: Heading,
}

impl Scripted {
    fn boxed(kinds: &[SegmentKind]) -> Box<dyn SegmentPlanner> {
        Box::new(Scripted {
            kinds: kinds.to_vec(),
            next: 0,
            cursor: Heading::Up,
        })
    }
}

impl SegmentPlanner for Scripted {
    fn next(&mut self, _rng: &mut StdRng) -> Descriptor {
        let kind = self.kinds.get(self.next).copied().unwrap_or(SegmentKind::Straight);
        self.next += 1;
        let entry = self.cursor;
        self.cursor = kind.exit_heading(entry);
        Descriptor {
            kind,
            entry,
            exit: self.cursor,
        }
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        result_ticks: 3,
        game_over_ticks: 5,
        grading: GradingConfig {
            reaction_ticks: 2,
            sampling_ticks: 5,
            success_threshold: 0.4,
        },
        ..SessionConfig::default()
    }
}

fn ride_to_mission(session: &mut Session) -> Mission {
    for _ in 0..1000 {
        if let Some(SessionEvent::MissionStarted { mission, .. }) = session.tick(Gesture::None) {
            assert_eq!(session.phase(), Phase::Grading);
            return mission;
        }
    }
    panic!("no mission reached");
}

/// Feeds `samples` as the sampling window and returns the resolution event.
fn hold(session: &mut Session, samples: &[Gesture]) -> SessionEvent {
    assert_eq!(session.tick(Gesture::None), None);
    assert_eq!(session.grade_phase(), GradePhase::Armed);
    for &g in samples {
        assert_eq!(session.tick(g), None);
        assert_eq!(session.grade_phase(), GradePhase::Sampling);
    }
    session.tick(Gesture::None).expect("window closed without a verdict")
}

#[test]
fn left_turn_held_sixty_percent_passes_and_turns() {
    let mut session = Session::new(config(), StdRng::seed_from_u64(1));
    assert!(session.start_with_planner(Scripted::boxed(&[
        SegmentKind::Straight,
        SegmentKind::LeftTurn,
    ])));

    assert_eq!(ride_to_mission(&mut session), Mission::LeftTurn);
    assert_eq!(session.velocity(), glam::Vec2::ZERO);

    let event = hold(
        &mut session,
        &[
            Gesture::LeftTurn,
            Gesture::LeftTurn,
            Gesture::LeftTurn,
            Gesture::None,
            Gesture::None,
        ],
    );
    let SessionEvent::MissionResolved(resolution) = event else {
        panic!("expected a resolution, got {event:?}");
    };
    assert_eq!(resolution.mission, Mission::LeftTurn);
    assert_eq!(resolution.samples, 5);
    assert!((resolution.accuracy - 0.6).abs() < 1e-12);
    assert_eq!(resolution.verdict, Verdict::Success);

    assert_eq!(session.score(), 70);
    assert_eq!(session.mistakes(), 0);
    assert_eq!(session.heading(), Heading::Left);
    assert_eq!(session.phase(), Phase::ResultAnim);

    // The road stays frozen through the result, then the rider heads left.
    for _ in 0..3 {
        session.tick(Gesture::None);
    }
    assert_eq!(session.phase(), Phase::Playing);
    session.tick(Gesture::None);
    assert_eq!(session.velocity(), glam::Vec2::new(-8.0, 0.0));
}

#[test]
fn failed_turn_still_follows_the_road() {
    let mut session = Session::new(config(), StdRng::seed_from_u64(2));
    session.start_with_planner(Scripted::boxed(&[
        SegmentKind::Straight,
        SegmentKind::RightTurn,
    ]));

    assert_eq!(ride_to_mission(&mut session), Mission::RightTurn);
    let event = hold(&mut session, &[Gesture::LeftTurn; 5]);
    assert!(matches!(
        event,
        SessionEvent::MissionResolved(r) if r.verdict == Verdict::Fail
    ));
    assert_eq!(session.mistakes(), 1);
    assert_eq!(session.score(), 0);
    assert_eq!(session.heading(), Heading::Right);
}

#[test]
fn stop_never_turns_and_is_graded_once() {
    let mut session = Session::new(config(), StdRng::seed_from_u64(3));
    session.start_with_planner(Scripted::boxed(&[
        SegmentKind::Straight,
        SegmentKind::Stop,
    ]));

    assert_eq!(ride_to_mission(&mut session), Mission::Stop);
    hold(&mut session, &[Gesture::Stop; 5]);
    assert_eq!(session.heading(), Heading::Up);
    assert_eq!(session.score(), 70);

    // Riding on across the judged stop line must not grade it again.
    for _ in 0..200 {
        assert!(!matches!(
            session.tick(Gesture::None),
            Some(SessionEvent::MissionStarted { .. })
        ));
    }
    assert_eq!(session.phase(), Phase::Playing);
}

#[test]
fn third_mistake_ends_the_round_then_returns_to_menu() {
    use SegmentKind::*;
    let mut session = Session::new(config(), StdRng::seed_from_u64(4));
    session.start_with_planner(Scripted::boxed(&[
        Straight, Stop, Straight, Straight, Stop, Straight, Straight, Stop,
    ]));

    for round in 1..=3 {
        assert_eq!(ride_to_mission(&mut session), Mission::Stop);
        hold(&mut session, &[Gesture::None; 5]);
        assert_eq!(session.mistakes(), round);

        // Result animation: two quiet ticks, then the outcome on the third.
        assert_eq!(session.tick(Gesture::None), None);
        assert_eq!(session.tick(Gesture::None), None);
        let after = session.tick(Gesture::None);
        if round < 3 {
            assert_eq!(after, None);
            assert_eq!(session.phase(), Phase::Playing);
        } else {
            assert_eq!(
                after,
                Some(SessionEvent::GameOver {
                    score: 0,
                    new_best: false
                })
            );
            assert_eq!(session.phase(), Phase::GameOver);
        }
    }

    for _ in 0..4 {
        assert_eq!(session.tick(Gesture::None), None);
    }
    assert_eq!(session.tick(Gesture::None), Some(SessionEvent::ReturnedToMenu));
    assert_eq!(session.phase(), Phase::Menu);
}
