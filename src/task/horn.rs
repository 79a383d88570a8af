//! Horn Overlay Task
//!
//! Plays the configured melody once per horn request. The melody always runs to
//! completion; requests that arrive while it plays are dropped when it ends.
//! Each note is a timed slice during which the task is suspended, so the poll
//! loop and the pixel animation keep running.

use crate::system::event::HornGate;
use crate::system::hardware::Tone;
use crate::system::melody::{melody_duration, pitch, Note};
use embassy_time::Timer;

/// Plays `melody` on `tone` every time `gate` is armed
pub async fn horn<T: Tone>(gate: &HornGate, tone: &mut T, melody: &[Note], tempo: u32) {
    loop {
        gate.wait().await;
        info!(
            "horn: playing {} notes, {} ms",
            melody.len(),
            melody_duration(melody, tempo).as_millis()
        );
        play(tone, melody, tempo).await;
        gate.clear();
    }
}

/// Plays a melody note by note without blocking the executor
pub async fn play<T: Tone>(tone: &mut T, melody: &[Note], tempo: u32) {
    for note in melody {
        let (sounding, rest) = note.split(tempo);
        tone.play_note(note.pitch);
        Timer::after(sounding).await;
        tone.play_note(pitch::REST);
        Timer::after(rest).await;
    }
}
