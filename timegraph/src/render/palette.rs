//! Timeline color scheme

use crate::domain::{Color, Tid};
use std::hash::{Hash, Hasher};

pub const RED: Color = Color::new(231, 68, 53, 255);
pub const BLUE: Color = Color::new(43, 145, 175, 255);
pub const PURPLE: Color = Color::new(185, 117, 181, 255);
pub const GREEN: Color = Color::new(87, 166, 74, 255);
pub const BEIGE: Color = Color::new(215, 171, 105, 255);
pub const ORANGE: Color = Color::new(248, 101, 22, 255);

const PALETTE: [Color; 6] = [RED, BLUE, PURPLE, GREEN, BEIGE, ORANGE];

/// Thread tracks producing self-instrumentation timers
pub const INTROSPECTION_GREEN: Color = GREEN;

pub const SELECTION: Color = Color::new(255, 255, 255, 255);
pub const TEXT: Color = Color::new(255, 255, 255, 255);
pub const EVENT: Color = Color::new(255, 255, 255, 150);
pub const TRACK_BACKGROUND: Color = Color::new(50, 50, 50, 255);
pub const SCHEDULER_TRACK: Color = Color::new(70, 70, 70, 255);
pub const GRAPH_LINE: Color = Color::new(0, 255, 0, 255);

/// Alpha applied to boxes that do not match the selected function
pub const INACTIVE_ALPHA: u8 = 100;

// Iterator overlay
pub const ITERATOR_LIGHT_BLUE_GRAY: Color = Color::new(177, 203, 250, 60);
pub const ITERATOR_MID_BLUE_GRAY: Color = Color::new(81, 102, 157, 60);
pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

/// Cycle through the palette
#[must_use]
pub fn color_for_id(id: u64) -> Color {
    #[allow(clippy::cast_possible_truncation)]
    let index = (id % PALETTE.len() as u64) as usize;
    PALETTE[index]
}

#[must_use]
pub fn color_for_tid(tid: Tid) -> Color {
    color_for_id(u64::from(tid.0.unsigned_abs()))
}

#[must_use]
pub fn color_for_string(value: &str) -> Color {
    let mut hasher = rustc_hash::FxHasher::default();
    value.hash(&mut hasher);
    color_for_id(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        assert_eq!(color_for_id(0), RED);
        assert_eq!(color_for_id(5), ORANGE);
        assert_eq!(color_for_id(6), RED);
        assert_eq!(color_for_tid(Tid(1)), BLUE);
    }

    #[test]
    fn test_string_colors_are_stable() {
        assert_eq!(color_for_string("frame"), color_for_string("frame"));
    }
}
