/*
Step Patterns
=============

A pattern is a row of steps played one per 16th note:

    step:    0    1    2    3    4    5   ...  15
           [C2 ][C3 ][G2 ][F2 ][C2 ][C3 ] ... [F2 ]
    accent:  x         x         x
    slide:        x                   x

The transport cursor always counts 0..16. Each pattern reads the cursor modulo
its *own* length, so a shorter pattern loops inside the bar and a longer one
only ever plays its first 16 steps.

Steps are plain `Copy` values: editing a step replaces it wholesale.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::notes::{C2, C3, F2, G2};
use crate::error::{Error, Result};
use crate::VOICE_COUNT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    /// MIDI note number (0-127)
    pub note: u8,
    pub accent: bool,
    /// Stored for editing; playback does not read it.
    pub slide: bool,
    pub active: bool,
}

impl Step {
    /// An active, unaccented step.
    pub const fn note(note: u8) -> Self {
        Self {
            note,
            accent: false,
            slide: false,
            active: true,
        }
    }

    /// An inactive step (plays nothing).
    pub const fn rest(note: u8) -> Self {
        Self {
            note,
            accent: false,
            slide: false,
            active: false,
        }
    }

    pub const fn with_accent(mut self, accent: bool) -> Self {
        self.accent = accent;
        self
    }

    pub const fn with_slide(mut self, slide: bool) -> Self {
        self.slide = slide;
        self
    }

    /// Same step shifted by `semitones`, saturating at the MIDI range.
    pub fn transposed(self, semitones: i8) -> Self {
        let note = (self.note as i16 + semitones as i16).clamp(0, 127) as u8;
        Self { note, ..self }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pattern {
    /// Steps in playback order
    pub steps: Vec<Step>,
    /// Loop length used for cursor lookups
    pub length: usize,
}

impl Pattern {
    /// Pattern whose length matches its steps.
    pub fn new(steps: Vec<Step>) -> Self {
        let length = steps.len();
        Self { steps, length }
    }

    /// The step the transport plays at `cursor`.
    ///
    /// Returns `None` when the pattern is empty or `length` points past the
    /// stored steps.
    pub fn step_at(&self, cursor: usize) -> Option<Step> {
        if self.length == 0 {
            return None;
        }
        self.steps.get(cursor % self.length).copied()
    }

    /// Replace one step. Out-of-range indices are ignored.
    pub fn set_step(&mut self, index: usize, step: Step) {
        if let Some(slot) = self.steps.get_mut(index) {
            *slot = step;
        }
    }

    pub fn transposed(&self, semitones: i8) -> Self {
        Self {
            steps: self.steps.iter().map(|s| s.transposed(semitones)).collect(),
            length: self.length,
        }
    }

    /// The 16-step bassline every voice starts from.
    pub fn default_bassline() -> Self {
        const NOTES: [u8; 4] = [C2, C3, G2, F2];
        const ACCENTS: [usize; 7] = [0, 2, 4, 7, 9, 12, 14];
        const SLIDES: [usize; 4] = [1, 5, 9, 13];

        let steps = (0..16)
            .map(|i| {
                Step::note(NOTES[i % NOTES.len()])
                    .with_accent(ACCENTS.contains(&i))
                    .with_slide(SLIDES.contains(&i))
            })
            .collect();
        Self::new(steps)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::default_bassline()
    }
}

/// One pattern per voice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternStore {
    patterns: [Pattern; VOICE_COUNT],
}

impl PatternStore {
    pub fn new(patterns: [Pattern; VOICE_COUNT]) -> Self {
        Self { patterns }
    }

    pub fn pattern(&self, voice: usize) -> Result<&Pattern> {
        self.patterns.get(voice).ok_or(Error::VoiceIndex {
            index: voice,
            count: VOICE_COUNT,
        })
    }

    pub fn set_pattern(&mut self, voice: usize, pattern: Pattern) -> Result<()> {
        let slot = self.patterns.get_mut(voice).ok_or(Error::VoiceIndex {
            index: voice,
            count: VOICE_COUNT,
        })?;
        *slot = pattern;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }
}

impl Default for PatternStore {
    /// The default bassline, an octave higher for each voice.
    fn default() -> Self {
        let base = Pattern::default_bassline();
        Self::new([base.clone(), base.transposed(12), base.transposed(24)])
    }
}
