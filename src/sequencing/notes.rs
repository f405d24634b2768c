/*
MIDI Notes
==========

Middle C (C4) = MIDI note 60, A4 = 69 = 440 Hz.

    note_number = 12 * (octave + 1) + semitone
    frequency   = 440 * 2^((note - 69) / 12)          (equal temperament)

Only the notes the default bassline is written in get named constants; any
other pitch is just its MIDI number.
*/

pub const C2: u8 = 36;
pub const F2: u8 = 41;
pub const G2: u8 = 43;
pub const C3: u8 = 48;
pub const A4: u8 = 69; // A440 tuning reference

const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Convert MIDI note number to frequency in Hz.
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Display name of a MIDI note, e.g. `"C2"` for 36 or `"A#4"` for 70.
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", NAMES[(note % 12) as usize], octave)
}
