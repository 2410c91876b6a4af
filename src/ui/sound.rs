/// Sound engine: procedural retro sound effects via rodio.
///
/// Every effect is synthesized into an in-memory WAV buffer at init time
/// and played fire-and-forget through a detached rodio `Sink`.
///
/// Which simulation event triggers which effect is decided by `cue_for`,
/// which is independent of the audio backend. Build without the "sound"
/// feature to get a silent stub engine.

use crate::sim::event::GameEvent;

/// Sound effect identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Step,
    BombPlaced,
    Explosion,
    EnemyKilled,
    PlayerHit,
    LevelClear,
    Win,
    GameOver,
}

impl Sfx {
    pub const ALL: [Sfx; 8] = [
        Sfx::Step,
        Sfx::BombPlaced,
        Sfx::Explosion,
        Sfx::EnemyKilled,
        Sfx::PlayerHit,
        Sfx::LevelClear,
        Sfx::Win,
        Sfx::GameOver,
    ];
}

/// Audio cue for a simulation event, if it has one.
pub fn cue_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::PlayerStepped { .. } => Some(Sfx::Step),
        GameEvent::BombPlaced { .. } => Some(Sfx::BombPlaced),
        GameEvent::BombExploded { .. } => Some(Sfx::Explosion),
        GameEvent::EnemyKilled { .. } => Some(Sfx::EnemyKilled),
        GameEvent::PlayerHit { .. } => Some(Sfx::PlayerHit),
        GameEvent::LevelCleared { .. } => Some(Sfx::LevelClear),
        GameEvent::GameWon => Some(Sfx::Win),
        GameEvent::GameOver => Some(Sfx::GameOver),
        GameEvent::TileDestroyed { .. } | GameEvent::PlayerRespawned => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::debug;

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// Indexed by `Sfx as usize`.
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    debug!(error = %e, "no audio output, running silent");
                    return None;
                }
            };
            let buffers = Sfx::ALL.iter().map(|&s| Arc::new(make_wav(&synth(s)))).collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(sfx as usize) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    fn synth(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Step => sweep(180.0, 140.0, 0.03, 0.12),
            Sfx::BombPlaced => sweep(220.0, 90.0, 0.09, 0.35),
            Sfx::Explosion => gen_explosion(),
            Sfx::EnemyKilled => sweep(900.0, 250.0, 0.25, 0.25),
            Sfx::PlayerHit => notes(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.3),
            Sfx::LevelClear => notes(&[523.0, 659.0, 784.0, 1047.0], 0.1, 0.3),
            Sfx::Win => notes(&[523.0, 659.0, 784.0, 1047.0, 784.0, 1047.0, 1319.0], 0.12, 0.3),
            Sfx::GameOver => notes(&[392.0, 330.0, 262.0, 196.0], 0.25, 0.3),
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples
    // ════════════════════════════════════════════════════════════

    /// Sine glide from `from` Hz to `to` Hz with a linear fade out.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t) * volume
            })
            .collect()
    }

    /// A note sequence with a square-ish timbre, last note faded.
    fn notes(freqs: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        let mut samples = Vec::with_capacity(n * freqs.len());
        for &freq in freqs {
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        let fade = n.min(samples.len());
        let total = samples.len();
        for (k, s) in samples[total - fade..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade as f32;
        }
        samples
    }

    /// Low rumble under a decaying noise burst.
    fn gen_explosion() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.45) as usize;
        let mut lcg: u32 = 0x2545_f491;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                lcg = lcg.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let noise = (lcg >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let rumble = (ti * (70.0 - 30.0 * t) * TAU).sin();
                (noise * 0.6 + rumble * 0.4) * (1.0 - t).powf(1.5) * 0.45
            })
            .collect()
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

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn every_effect_synthesizes_audible_samples() {
            for sfx in Sfx::ALL {
                let s = synth(sfx);
                assert!(!s.is_empty(), "{sfx:?}");
                assert!(s.iter().all(|v| v.abs() <= 1.0), "{sfx:?}");
            }
        }

        #[test]
        fn wav_header_is_consistent() {
            let wav = make_wav(&[0.0; 10]);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + 20);
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
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
