//! Directions of travel, road tile kinds and the missions they carry.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::Up, Heading::Down, Heading::Left, Heading::Right];

    /// Unit vector in screen space (y grows downward).
    pub fn unit(self) -> Vec2 {
        match self {
            Heading::Up => Vec2::new(0.0, -1.0),
            Heading::Down => Vec2::new(0.0, 1.0),
            Heading::Left => Vec2::new(-1.0, 0.0),
            Heading::Right => Vec2::new(1.0, 0.0),
        }
    }

    pub fn turned_left(self) -> Heading {
        match self {
            Heading::Up => Heading::Left,
            Heading::Left => Heading::Down,
            Heading::Down => Heading::Right,
            Heading::Right => Heading::Up,
        }
    }

    pub fn turned_right(self) -> Heading {
        match self {
            Heading::Up => Heading::Right,
            Heading::Right => Heading::Down,
            Heading::Down => Heading::Left,
            Heading::Left => Heading::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Straight,
    LeftTurn,
    RightTurn,
    Stop,
}

impl SegmentKind {
    pub const MISSIONS: [SegmentKind; 3] =
        [SegmentKind::LeftTurn, SegmentKind::RightTurn, SegmentKind::Stop];

    pub fn mission(self) -> Option<Mission> {
        match self {
            SegmentKind::Straight => None,
            SegmentKind::LeftTurn => Some(Mission::LeftTurn),
            SegmentKind::RightTurn => Some(Mission::RightTurn),
            SegmentKind::Stop => Some(Mission::Stop),
        }
    }

    /// Heading a rider leaves this tile with after entering it at `entry`.
    pub fn exit_heading(self, entry: Heading) -> Heading {
        match self {
            SegmentKind::Straight | SegmentKind::Stop => entry,
            SegmentKind::LeftTurn => entry.turned_left(),
            SegmentKind::RightTurn => entry.turned_right(),
        }
    }

    pub fn is_mission(self) -> bool {
        self.mission().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mission {
    LeftTurn,
    RightTurn,
    Stop,
}

impl Mission {
    pub fn label(self) -> &'static str {
        match self {
            Mission::LeftTurn => "LEFT TURN",
            Mission::RightTurn => "RIGHT TURN",
            Mission::Stop => "STOP",
        }
    }

    pub fn kind(self) -> SegmentKind {
        match self {
            Mission::LeftTurn => SegmentKind::LeftTurn,
            Mission::RightTurn => SegmentKind::RightTurn,
            Mission::Stop => SegmentKind::Stop,
        }
    }

    /// Turn missions change the heading once resolved; stops never do.
    pub fn rotates(self) -> bool {
        !matches!(self, Mission::Stop)
    }
}
