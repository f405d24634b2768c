pub mod notes;
pub mod pattern;

pub use notes::{midi_note_to_freq, note_name};
pub use pattern::{Pattern, PatternStore, Step};
