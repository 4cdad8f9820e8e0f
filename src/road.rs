//! Procedural road: planned tile descriptors, materialized segments and the
//! retention queue that bounds them.
//!
//! Positions are relative to the rider, who sits at the origin. Every tile is
//! chained onto the one before it: it enters with the previous exit heading
//! and starts at the previous exit point, so the road never has gaps.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::config::{RoadConfig, RoadPolicy};
use crate::heading::{Heading, Mission, SegmentKind};

pub type SegmentId = u64;

/// A tile the planner has decided on but not yet placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: SegmentKind,
    pub entry: Heading,
    pub exit: Heading,
}

impl Descriptor {
    fn after(cursor: &mut Heading, kind: SegmentKind) -> Self {
        let entry = *cursor;
        let exit = kind.exit_heading(entry);
        *cursor = exit;
        Self { kind, entry, exit }
    }
}

#[derive(Debug, Clone)]
pub struct RoadSegment {
    id: SegmentId,
    kind: SegmentKind,
    entry: Heading,
    exit: Heading,
    center: Vec2,
    half: f32,
    judged: bool,
}

impl RoadSegment {
    /// Places a tile of `kind` after `prev`, or at `origin` heading up when
    /// there is no previous tile.
    pub fn chained(
        id: SegmentId,
        kind: SegmentKind,
        prev: Option<&RoadSegment>,
        origin: Vec2,
        tile_size: f32,
    ) -> Self {
        let (entry, start) = match prev {
            Some(p) => (p.exit, p.exit_point()),
            None => (Heading::Up, origin),
        };
        let half = tile_size / 2.0;
        Self {
            id,
            kind,
            entry,
            exit: kind.exit_heading(entry),
            center: start + entry.unit() * half,
            half,
            judged: false,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn mission(&self) -> Option<Mission> {
        self.kind.mission()
    }

    pub fn entry(&self) -> Heading {
        self.entry
    }

    pub fn exit(&self) -> Heading {
        self.exit
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn size(&self) -> f32 {
        self.half * 2.0
    }

    pub fn entry_point(&self) -> Vec2 {
        self.center - self.entry.unit() * self.half
    }

    pub fn exit_point(&self) -> Vec2 {
        self.center + self.exit.unit() * self.half
    }

    /// Whether `point` lies on this tile's square, edges included.
    pub fn contains(&self, point: Vec2) -> bool {
        (point - self.center).abs().max_element() <= self.half
    }

    pub fn is_judged(&self) -> bool {
        self.judged
    }

    /// Marks the tile as graded. Only the first call hands out the mission.
    fn judge(&mut self) -> Option<Mission> {
        if self.judged {
            return None;
        }
        let mission = self.mission()?;
        self.judged = true;
        Some(mission)
    }

    fn translate(&mut self, offset: Vec2) {
        self.center += offset;
    }
}

pub trait SegmentPlanner {
    fn next(&mut self, rng: &mut StdRng) -> Descriptor;

    /// Descriptors already decided but not yet handed out.
    fn upcoming(&self) -> Vec<Descriptor> {
        Vec::new()
    }
}

/// Keeps a queue of planned tiles: runs of straights, each closed by exactly
/// one mission picked uniformly.
pub struct LookaheadPlanner {
    queue: VecDeque<Descriptor>,
    cursor: Heading,
    target: usize,
    min_straight: u32,
    max_straight: u32,
}

impl LookaheadPlanner {
    pub fn new(target: usize, min_straight: u32, max_straight: u32) -> Self {
        Self {
            queue: VecDeque::with_capacity(target + max_straight as usize + 1),
            cursor: Heading::Up,
            target,
            min_straight,
            max_straight,
        }
    }

    fn refill(&mut self, rng: &mut StdRng) {
        while self.queue.len() < self.target {
            let run = rng.gen_range(self.min_straight..=self.max_straight);
            for _ in 0..run {
                let d = Descriptor::after(&mut self.cursor, SegmentKind::Straight);
                self.queue.push_back(d);
            }
            let kind = SegmentKind::MISSIONS[rng.gen_range(0..SegmentKind::MISSIONS.len())];
            let d = Descriptor::after(&mut self.cursor, kind);
            self.queue.push_back(d);
        }
    }
}

impl SegmentPlanner for LookaheadPlanner {
    fn next(&mut self, rng: &mut StdRng) -> Descriptor {
        self.refill(rng);
        let d = self
            .queue
            .pop_front()
            .unwrap_or_else(|| Descriptor::after(&mut self.cursor, SegmentKind::Straight));
        self.refill(rng);
        d
    }

    fn upcoming(&self) -> Vec<Descriptor> {
        self.queue.iter().copied().collect()
    }
}

/// Decides tile by tile. After every mission, and at the start, the next
/// `min_straight` tiles are forced straight.
pub struct CooldownPlanner {
    tiles_to_spawn: u32,
    min_straight: u32,
    mission_chance: f64,
    cursor: Heading,
}

impl CooldownPlanner {
    pub fn new(min_straight: u32, mission_chance: f64) -> Self {
        Self {
            tiles_to_spawn: min_straight,
            min_straight,
            mission_chance,
            cursor: Heading::Up,
        }
    }
}

impl SegmentPlanner for CooldownPlanner {
    fn next(&mut self, rng: &mut StdRng) -> Descriptor {
        if self.tiles_to_spawn > 0 {
            self.tiles_to_spawn -= 1;
            return Descriptor::after(&mut self.cursor, SegmentKind::Straight);
        }
        if rng.gen_bool(self.mission_chance) {
            self.tiles_to_spawn = self.min_straight;
            let kind = SegmentKind::MISSIONS[rng.gen_range(0..SegmentKind::MISSIONS.len())];
            Descriptor::after(&mut self.cursor, kind)
        } else {
            Descriptor::after(&mut self.cursor, SegmentKind::Straight)
        }
    }
}

pub fn planner_for(config: &RoadConfig) -> Box<dyn SegmentPlanner> {
    match config.policy {
        RoadPolicy::Lookahead => Box::new(LookaheadPlanner::new(
            config.lookahead,
            config.min_straight,
            config.max_straight,
        )),
        RoadPolicy::Cooldown => Box::new(CooldownPlanner::new(
            config.min_straight,
            config.mission_chance,
        )),
    }
}

/// Trigger radii around a mission tile's center.
#[derive(Debug, Clone, Copy)]
pub struct TriggerDistances {
    pub turn: f32,
    pub stop: f32,
}

impl TriggerDistances {
    pub fn for_mission(&self, mission: Mission) -> f32 {
        match mission {
            Mission::Stop => self.stop,
            Mission::LeftTurn | Mission::RightTurn => self.turn,
        }
    }
}

pub struct Road {
    planner: Box<dyn SegmentPlanner>,
    segments: VecDeque<RoadSegment>,
    next_id: SegmentId,
    current: Option<SegmentId>,
    tile_size: f32,
    visibility: f32,
    retention: usize,
}

impl Road {
    pub fn new(config: &RoadConfig) -> Self {
        Self::with_planner(config, planner_for(config))
    }

    pub fn with_planner(config: &RoadConfig, planner: Box<dyn SegmentPlanner>) -> Self {
        Self {
            planner,
            segments: VecDeque::with_capacity(config.retention + 1),
            next_id: 0,
            current: None,
            tile_size: config.tile_size,
            visibility: config.visibility,
            retention: config.retention,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &RoadSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> Option<&RoadSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn upcoming(&self) -> Vec<Descriptor> {
        self.planner.upcoming()
    }

    /// Moves every tile against the rider's velocity.
    pub fn scroll(&mut self, velocity: Vec2) {
        self.shift(-velocity);
    }

    pub fn shift(&mut self, offset: Vec2) {
        for s in &mut self.segments {
            s.translate(offset);
        }
    }

    /// Materializes planned tiles until the frontier is at least `visibility`
    /// away from the rider, then evicts the oldest tiles past retention.
    /// Returns the number of tiles placed.
    ///
    /// At most half the retention is kept ahead of the rider's tile, so a road
    /// that curls back on itself cannot push unvisited tiles out of the queue.
    pub fn spawn(&mut self, player: Vec2, rng: &mut StdRng) -> usize {
        self.track(player);
        let max_ahead = (self.retention / 2).max(1) as u64;
        let mut placed = 0;
        loop {
            let (frontier, ahead) = match (self.segments.back(), self.current) {
                (Some(last), Some(current)) => (last.exit_point(), last.id - current),
                _ => (player, 0),
            };
            if !self.segments.is_empty()
                && (frontier.distance(player) >= self.visibility || ahead >= max_ahead)
            {
                break;
            }
            self.materialize(player, rng);
            placed += 1;
        }
        self.evict();
        placed
    }

    /// Tile the rider is on.
    pub fn current(&self) -> Option<&RoadSegment> {
        self.get(self.current?)
    }

    /// Follows the rider along the chain: steps to the next tile once the
    /// rider is inside it.
    fn track(&mut self, player: Vec2) {
        while let Some(current) = self.current {
            match self.get(current + 1) {
                Some(next) if next.contains(player) => self.current = Some(current + 1),
                _ => break,
            }
        }
    }

    fn materialize(&mut self, player: Vec2, rng: &mut StdRng) {
        let descriptor = self.planner.next(rng);
        let segment = RoadSegment::chained(
            self.next_id,
            descriptor.kind,
            self.segments.back(),
            player,
            self.tile_size,
        );
        debug_assert_eq!(segment.entry, descriptor.entry, "planner heading drifted");
        debug!(
            id = segment.id,
            kind = ?segment.kind,
            entry = ?segment.entry,
            exit = ?segment.exit,
            "road tile placed"
        );
        self.current.get_or_insert(segment.id);
        self.next_id += 1;
        self.segments.push_back(segment);
    }

    fn evict(&mut self) {
        while self.segments.len() > self.retention {
            let behind = match (self.segments.front(), self.current) {
                (Some(front), Some(current)) => front.id < current,
                _ => false,
            };
            if !behind {
                break;
            }
            if let Some(old) = self.segments.pop_front() {
                debug!(id = old.id, "road tile evicted");
            }
        }
    }

    /// The rider's tile, or the one right after it, when it is an unjudged
    /// mission tile whose center is within its trigger radius. Tiles further
    /// down the chain never trigger, even where the road crosses itself.
    pub fn find_trigger(&self, player: Vec2, distances: TriggerDistances) -> Option<SegmentId> {
        let current = self.current?;
        self.segments
            .iter()
            .filter(|s| (current..=current + 1).contains(&s.id) && !s.judged)
            .find_map(|s| {
                let mission = s.mission()?;
                (s.center.distance(player) <= distances.for_mission(mission)).then_some(s.id)
            })
    }

    /// Flags the tile as graded and returns its mission, at most once per tile.
    pub fn judge(&mut self, id: SegmentId) -> Option<Mission> {
        self.segments.iter_mut().find(|s| s.id == id)?.judge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Hands out a fixed list of kinds, then straights.
    struct Scripted {
        kinds: VecDeque<SegmentKind>,
        cursor: Heading,
    }

    impl Scripted {
        fn boxed(kinds: &[SegmentKind]) -> Box<dyn SegmentPlanner> {
            Box::new(Self {
                kinds: kinds.iter().copied().collect(),
                cursor: Heading::Up,
            })
        }
    }

    impl SegmentPlanner for Scripted {
        fn next(&mut self, _rng: &mut StdRng) -> Descriptor {
            let kind = self.kinds.pop_front().unwrap_or(SegmentKind::Straight);
            Descriptor::after(&mut self.cursor, kind)
        }
    }

    fn assert_cooldown(descriptors: &[Descriptor], min_straight: usize) {
        let mut since_mission: Option<usize> = None;
        for d in descriptors {
            if d.kind.is_mission() {
                if let Some(gap) = since_mission {
                    assert!(gap >= min_straight, "only {gap} straights between missions");
                }
                since_mission = Some(0);
            } else if let Some(gap) = since_mission.as_mut() {
                *gap += 1;
            }
        }
    }

    #[test]
    fn first_tile_starts_at_player_heading_up() {
        let tile = RoadSegment::chained(0, SegmentKind::Straight, None, Vec2::ZERO, 400.0);
        assert_eq!(tile.entry(), Heading::Up);
        assert_eq!(tile.entry_point(), Vec2::ZERO);
        assert_eq!(tile.center(), Vec2::new(0.0, -200.0));
        assert_eq!(tile.exit_point(), Vec2::new(0.0, -400.0));
    }

    #[test]
    fn turn_tile_exits_sideways() {
        let first = RoadSegment::chained(0, SegmentKind::Straight, None, Vec2::ZERO, 400.0);
        let turn = RoadSegment::chained(1, SegmentKind::LeftTurn, Some(&first), Vec2::ZERO, 400.0);
        assert_eq!(turn.entry(), Heading::Up);
        assert_eq!(turn.exit(), Heading::Left);
        assert_eq!(turn.center(), Vec2::new(0.0, -600.0));
        assert_eq!(turn.exit_point(), Vec2::new(-200.0, -600.0));
    }

    #[test]
    fn lookahead_runs_straights_between_missions() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut planner = LookaheadPlanner::new(20, 3, 6);
        let plan: Vec<Descriptor> = (0..500).map(|_| planner.next(&mut rng)).collect();

        assert_cooldown(&plan, 3);
        // Every run is closed by a mission, so missions keep coming.
        assert!(plan.iter().filter(|d| d.kind.is_mission()).count() >= 500 / 7);
        for pair in plan.windows(2) {
            assert_eq!(pair[0].exit, pair[1].entry);
        }
        assert!(planner.upcoming().len() >= 20);
    }

    #[test]
    fn cooldown_planner_forces_straight_runs() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut planner = CooldownPlanner::new(3, 0.4);
        let plan: Vec<Descriptor> = (0..1000).map(|_| planner.next(&mut rng)).collect();

        assert!(plan[..3].iter().all(|d| d.kind == SegmentKind::Straight));
        assert_cooldown(&plan, 3);
        assert!(plan.iter().any(|d| d.kind.is_mission()));
    }

    #[test]
    fn cooldown_planner_always_missions_when_certain() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut planner = CooldownPlanner::new(2, 1.0);
        let kinds: Vec<bool> = (0..9).map(|_| planner.next(&mut rng).kind.is_mission()).collect();
        assert_eq!(
            kinds,
            [false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn spawn_fills_visibility_and_chains() {
        use SegmentKind::*;
        let config = RoadConfig::default();
        let mut road = Road::with_planner(
            &config,
            Scripted::boxed(&[
                Straight, Straight, Straight, LeftTurn, Straight, Straight, Straight, RightTurn,
            ]),
        );
        let mut rng = StdRng::seed_from_u64(3);

        // Up three tiles, left three, then the right turn's exit clears 2000.
        let placed = road.spawn(Vec2::ZERO, &mut rng);
        assert_eq!(placed, 8);
        let last = road.segments().last().unwrap();
        assert_eq!(last.exit(), Heading::Up);
        assert_eq!(last.exit_point(), Vec2::new(-1600.0, -1600.0));
        assert!(last.exit_point().distance(Vec2::ZERO) >= config.visibility);

        let tiles: Vec<&RoadSegment> = road.segments().collect();
        for pair in tiles.windows(2) {
            assert_eq!(pair[0].exit(), pair[1].entry());
            assert_eq!(pair[0].exit_point(), pair[1].entry_point());
        }

        // Nothing new is needed until the road has moved.
        assert_eq!(road.spawn(Vec2::ZERO, &mut rng), 0);
    }

    #[test]
    fn retention_evicts_oldest_first() {
        let config = RoadConfig {
            retention: 6,
            ..RoadConfig::default()
        };
        let mut road = Road::with_planner(&config, Scripted::boxed(&[]));
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..200 {
            road.scroll(Vec2::new(0.0, -40.0));
            road.spawn(Vec2::ZERO, &mut rng);
            assert!(road.len() <= 6);
        }
        let ids: Vec<SegmentId> = road.segments().map(|s| s.id()).collect();
        assert!(ids[0] > 0, "oldest tiles were kept");
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn judged_tile_never_triggers_again() {
        let config = RoadConfig::default();
        let mut road = Road::with_planner(
            &config,
            Scripted::boxed(&[SegmentKind::Straight, SegmentKind::LeftTurn]),
        );
        let mut rng = StdRng::seed_from_u64(0);
        road.spawn(Vec2::ZERO, &mut rng);

        let distances = TriggerDistances {
            turn: 24.0,
            stop: 150.0,
        };
        assert_eq!(road.find_trigger(Vec2::ZERO, distances), None);

        // Bring the turn tile's center onto the rider.
        road.shift(Vec2::new(0.0, 600.0));
        road.spawn(Vec2::ZERO, &mut rng);
        assert_eq!(road.current().map(RoadSegment::id), Some(1));
        let id = road.find_trigger(Vec2::ZERO, distances).unwrap();
        assert_eq!(road.judge(id), Some(Mission::LeftTurn));
        assert!(road.get(id).unwrap().is_judged());

        assert_eq!(road.judge(id), None);
        assert_eq!(road.find_trigger(Vec2::ZERO, distances), None);
        assert!(road.get(id).unwrap().is_judged());
    }

    #[test]
    fn stop_triggers_from_further_away() {
        let config = RoadConfig::default();
        let mut road = Road::with_planner(
            &config,
            Scripted::boxed(&[SegmentKind::Straight, SegmentKind::Stop]),
        );
        let mut rng = StdRng::seed_from_u64(0);
        road.spawn(Vec2::ZERO, &mut rng);

        let distances = TriggerDistances {
            turn: 24.0,
            stop: 150.0,
        };
        // Stop tile center sits at y = -600; 140 units short of it.
        road.shift(Vec2::new(0.0, 460.0));
        road.spawn(Vec2::ZERO, &mut rng);
        assert!(road.find_trigger(Vec2::ZERO, distances).is_some());
    }

    #[test]
    fn straight_tiles_cannot_be_judged() {
        let config = RoadConfig::default();
        let mut road = Road::with_planner(&config, Scripted::boxed(&[]));
        let mut rng = StdRng::seed_from_u64(0);
        road.spawn(Vec2::ZERO, &mut rng);
        assert_eq!(road.judge(0), None);
        assert!(!road.get(0).unwrap().is_judged());
    }
}
