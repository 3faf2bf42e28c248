/// Sound engine: procedural 8-bit style effects via rodio.
///
/// Every effect is synthesized into an in-memory WAV buffer once, at init.
/// Playback is fire-and-forget through a detached rodio `Sink`, so a tick
/// never waits on audio.
///
/// Build without the "sound" feature to compile the silent stub instead.

use crate::domain::entity::Item;
use crate::sim::event::GameEvent;

/// One effect per audible game event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Pickup,
    Switch,
    Unlock,
    Armed,
    Explosion,
    Launch,
    RiddleRight,
    RiddleWrong,
    RoomChange,
    GameOver,
    Victory,
}

impl Sfx {
    pub const COUNT: usize = 11;

    pub const ALL: [Sfx; Sfx::COUNT] = [
        Sfx::Pickup,
        Sfx::Switch,
        Sfx::Unlock,
        Sfx::Armed,
        Sfx::Explosion,
        Sfx::Launch,
        Sfx::RiddleRight,
        Sfx::RiddleWrong,
        Sfx::RoomChange,
        Sfx::GameOver,
        Sfx::Victory,
    ];

    /// Which effect, if any, an event makes.
    pub fn for_event(event: &GameEvent) -> Option<Sfx> {
        match event {
            GameEvent::ItemPicked { .. } => Some(Sfx::Pickup),
            GameEvent::ItemDropped { item: Item::Bomb, .. } => Some(Sfx::Armed),
            GameEvent::SwitchToggled { .. } => Some(Sfx::Switch),
            GameEvent::PuzzleSolved | GameEvent::DoorUnlocked { .. } => Some(Sfx::Unlock),
            GameEvent::BombExploded { .. } => Some(Sfx::Explosion),
            GameEvent::SpringLaunched { .. } => Some(Sfx::Launch),
            GameEvent::RiddleSolved { .. } => Some(Sfx::RiddleRight),
            GameEvent::RiddleFailed { .. } => Some(Sfx::RiddleWrong),
            GameEvent::RoomChanged { .. } => Some(Sfx::RoomChange),
            GameEvent::GameOver => Some(Sfx::GameOver),
            GameEvent::Victory => Some(Sfx::Victory),
            _ => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::PI;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("audio unavailable: {e}");
                    return None;
                }
            };
            let buffers = Sfx::ALL.iter().map(|&s| Arc::new(make_wav(&synth(s)))).collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(sfx as usize) else {
                return;
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples
    // ════════════════════════════════════════════════════════════

    fn synth(sfx: Sfx) -> Vec<f32> {
        match sfx {
            // C6 E6 G6
            Sfx::Pickup => notes(&[(1047.0, 0.045), (1319.0, 0.045), (1568.0, 0.045)], 0.3, 0.25),
            Sfx::Switch => notes(&[(880.0, 0.02), (660.0, 0.03)], 0.5, 0.2),
            Sfx::Unlock => notes(&[(784.0, 0.08), (1047.0, 0.15)], 0.3, 0.3),
            Sfx::Armed => noise_sweep(0.10, 900.0, 1400.0, 0.7, 0.15),
            Sfx::Explosion => noise_sweep(0.45, 180.0, 40.0, 0.85, 0.45),
            Sfx::Launch => sweep(0.18, 250.0, 900.0, 0.25),
            Sfx::RiddleRight => notes(&[(659.0, 0.07), (784.0, 0.07), (1047.0, 0.14)], 0.2, 0.3),
            Sfx::RiddleWrong => notes(&[(220.0, 0.12), (185.0, 0.2)], 0.6, 0.3),
            Sfx::RoomChange => sweep(0.25, 300.0, 600.0, 0.2),
            // A4 F#4 Eb4 C4
            Sfx::GameOver => fade_tail(notes(&[(440.0, 0.12), (370.0, 0.12), (311.0, 0.12), (261.0, 0.2)], 0.0, 0.3)),
            // C5 E5 G5 C6, last held
            Sfx::Victory => notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)], 0.3, 0.3),
        }
    }

    /// Sequence of notes. `overtone` mixes in the third harmonic for a
    /// squarer sound.
    fn notes(seq: &[(f32, f32)], overtone: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * 2.0 * PI).sin() * (1.0 - overtone)
                    + (t * freq * 3.0 * 2.0 * PI).sin() * overtone;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Pure tone gliding linearly from `from` to `to` Hz.
    fn sweep(duration: f32, from: f32, to: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq * 2.0 * PI / SAMPLE_RATE as f32;
                phase.sin() * (1.0 - t).powf(0.6) * volume
            })
            .collect()
    }

    /// Tone glide mixed with LCG noise; `mix` is the noise share.
    fn noise_sweep(duration: f32, from: f32, to: f32, mix: f32, volume: f32) -> Vec<f32> {
        let tone = sweep(duration, from, to, 1.0);
        let n = tone.len();
        let mut rng: u32 = 12345;
        tone.into_iter()
            .enumerate()
            .map(|(i, s)| {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - i as f32 / n as f32).powf(0.8);
                (s * (1.0 - mix) + noise * mix * env) * volume
            })
            .collect()
    }

    fn fade_tail(mut samples: Vec<f32>) -> Vec<f32> {
        let total = samples.len();
        let fade_len = (total / 4).max(1);
        for (k, s) in samples.iter_mut().skip(total - fade_len.min(total)).enumerate() {
            *s *= 1.0 - k as f32 / fade_len as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let channels: u16 = 1;
        let bits: u16 = 16;
        let byte_rate = SAMPLE_RATE * channels as u32 * bits as u32 / 8;
        let block_align = channels * bits / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

/// Play whatever this tick's events call for.
pub fn play_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else {
        return;
    };
    for effect in events.iter().filter_map(Sfx::for_event) {
        sfx.play(effect);
    }
}
