//! Key presses standing in for arm signals.
//!
//! Terminals report presses and auto-repeats but rarely releases, so a press
//! holds its label for a fixed number of ticks. Holding the key down keeps
//! refreshing it through key repeat.

use super::{Gesture, GestureError, GestureSource};

pub struct KeyboardGestures {
    hold_ticks: u32,
    held: Gesture,
    remaining: u32,
}

impl KeyboardGestures {
    pub fn new(hold_ticks: u32) -> Self {
        Self {
            hold_ticks,
            held: Gesture::None,
            remaining: 0,
        }
    }

    pub fn press(&mut self, gesture: Gesture) {
        self.held = gesture;
        self.remaining = self.hold_ticks;
    }
}

impl GestureSource for KeyboardGestures {
    fn start(&mut self) -> Result<(), GestureError> {
        Ok(())
    }

    fn update(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.held = Gesture::None;
        }
    }

    fn current(&self) -> Gesture {
        self.held
    }

    fn stop(&mut self) {
        self.held = Gesture::None;
        self.remaining = 0;
    }
}
