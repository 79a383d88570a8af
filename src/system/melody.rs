//! Horn melodies
//!
//! Notes are (pitch, divider) pairs in the usual buzzer-sketch notation: the
//! divider is the fraction of a whole note (4 = quarter, 8 = eighth) and a
//! negative divider marks a dotted note.

use embassy_time::Duration;

/// Default horn tempo in beats per minute
pub const DEFAULT_TEMPO: u32 = 95;

/// Share of a note's slot that actually sounds, in percent; the rest is silence
const SOUNDING_PERCENT: u64 = 90;

/// Pitches in Hz
pub mod pitch {
    pub const REST: u16 = 0;
    pub const B4: u16 = 494;
    pub const C5: u16 = 523;
    pub const DS5: u16 = 622;
    pub const E5: u16 = 659;
    pub const F5: u16 = 698;
    pub const FS5: u16 = 740;
    pub const G5: u16 = 784;
    pub const GS5: u16 = 831;
    pub const A5: u16 = 880;
    pub const B5: u16 = 988;
    pub const C6: u16 = 1047;
    pub const E6: u16 = 1319;
    pub const G6: u16 = 1568;
}

/// One note of a melody
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Note {
    pub pitch: u16,
    pub divider: i8,
}

const fn n(pitch: u16, divider: i8) -> Note {
    Note { pitch, divider }
}

/// A finite note sequence
pub type Melody = &'static [Note];

/// Pac-Man intro
pub const PACMAN: [Note; 31] = {
    use pitch::*;
    [
        n(B4, 16),
        n(B5, 16),
        n(FS5, 16),
        n(DS5, 16),
        n(B5, 32),
        n(FS5, -16),
        n(DS5, 8),
        n(C5, 16),
        n(C6, 16),
        n(G6, 16),
        n(E6, 16),
        n(C6, 32),
        n(G6, -16),
        n(E6, 8),
        n(B4, 16),
        n(B5, 16),
        n(FS5, 16),
        n(DS5, 16),
        n(B5, 32),
        n(FS5, -16),
        n(DS5, 8),
        n(DS5, 32),
        n(E5, 32),
        n(F5, 32),
        n(F5, 32),
        n(FS5, 32),
        n(G5, 32),
        n(G5, 32),
        n(GS5, 32),
        n(A5, 16),
        n(B5, 8),
    ]
};

/// Length of a whole note at `tempo` bpm, in milliseconds
pub fn whole_note_ms(tempo: u32) -> u64 {
    (60_000 * 4) / u64::from(tempo.max(1))
}

impl Note {
    /// Full slot of this note: sounding part plus trailing rest
    ///
    /// Dotted notes (negative divider) last a quarter longer. A zero divider is
    /// an empty slot.
    pub fn duration(&self, tempo: u32) -> Duration {
        let whole = whole_note_ms(tempo);
        let ms = match self.divider {
            0 => 0,
            d if d > 0 => whole / d as u64,
            d => whole / u64::from(d.unsigned_abs()) * 5 / 4,
        };
        Duration::from_millis(ms)
    }

    /// Sounding part and rest part of this note's slot
    pub fn split(&self, tempo: u32) -> (Duration, Duration) {
        let total = self.duration(tempo).as_millis();
        let sounding = total * SOUNDING_PERCENT / 100;
        (
            Duration::from_millis(sounding),
            Duration::from_millis(total - sounding),
        )
    }
}

/// Total playing time of a melody
pub fn melody_duration(melody: &[Note], tempo: u32) -> Duration {
    melody
        .iter()
        .fold(Duration::from_millis(0), |acc, note| acc + note.duration(tempo))
}
