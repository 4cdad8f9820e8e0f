//! Signal Runner: a top-down road runner steered by bicycle hand signals.
//!
//! The rider approaches turns and stop lines; at each one the game freezes,
//! waits a moment for the rider to react, then samples the gesture classifier
//! and grades whether the right signal was held.

pub mod accounts;
pub mod config;
pub mod gesture;
pub mod grading;
pub mod heading;
pub mod road;
pub mod session;
pub mod world;

pub use config::GameConfig;
pub use gesture::Gesture;
pub use heading::{Heading, Mission, SegmentKind};
pub use session::{Phase, Session, SessionEvent};
