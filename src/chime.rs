use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const SAMPLE_RATE: u32 = 44_100;
const PLAYERS: [&str; 3] = ["paplay", "aplay", "afplay"];

/// Audible completion signal.
pub trait Chime {
    fn play(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentChime;

impl Chime for SilentChime {
    fn play(&self) -> Result<()> {
        debug!("chime muted");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSettings {
    pub enabled: bool,
    pub frequency_hz: f32,
    pub gain: f32,
    pub duration_ms: u64,
}

impl Default for ToneSettings {
    fn default() -> Self {
        ToneSettings {
            enabled: true,
            frequency_hz: 880.0,
            gain: 0.06,
            duration_ms: 700,
        }
    }
}

/// Plays a short sine tone through the first system audio player found.
#[derive(Debug, Clone)]
pub struct ToneChime {
    settings: ToneSettings,
}

impl ToneChime {
    pub fn new(settings: ToneSettings) -> Self {
        ToneChime { settings }
    }

    pub fn wav(&self) -> Vec<u8> {
        sine_wav(
            self.settings.frequency_hz,
            self.settings.gain,
            Duration::from_millis(self.settings.duration_ms),
        )
    }
}

impl Chime for ToneChime {
    fn play(&self) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("ticktask-chime")
            .suffix(".wav")
            .tempfile()
            .context("creating chime file")?;
        file.write_all(&self.wav()).context("writing chime file")?;
        file.flush()?;
        let path = file.into_temp_path();

        // The frame loop must not block on the audio device. The temp file
        // is removed once the player exits.
        thread::Builder::new()
            .name("chime".into())
            .spawn(move || {
                if let Err(err) = run_player(&path) {
                    warn!(error = %err, "could not play chime");
                }
                drop(path);
            })
            .context("spawning chime thread")?;
        Ok(())
    }
}

pub fn chime_for(settings: ToneSettings) -> Box<dyn Chime> {
    if settings.enabled {
        Box::new(ToneChime::new(settings))
    } else {
        Box::new(SilentChime)
    }
}

fn run_player(path: &std::path::Path) -> Result<()> {
    for player in PLAYERS {
        match Command::new(player)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {
                debug!(player, "chime played");
                return Ok(());
            }
            Ok(status) => debug!(player, %status, "player failed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => debug!(player, error = %err, "player failed to start"),
        }
    }
    Err(anyhow!("no working audio player among {:?}", PLAYERS))
}

/// 16-bit mono PCM WAV of a sine wave.
pub fn sine_wav(frequency_hz: f32, gain: f32, duration: Duration) -> Vec<u8> {
    let samples = (SAMPLE_RATE as u64 * duration.as_millis() as u64 / 1000) as u32;
    let data_len = samples * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    let gain = gain.clamp(0.0, 1.0);
    for n in 0..samples {
        let t = n as f32 / SAMPLE_RATE as f32;
        let value = (2.0 * PI * frequency_hz * t).sin() * gain * i16::MAX as f32;
        out.extend_from_slice(&(value as i16).to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_matches_payload() {
        let wav = sine_wav(880.0, 0.06, Duration::from_millis(700));
        let samples = SAMPLE_RATE as usize * 7 / 10;
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(wav.len(), 44 + samples * 2);
        let data_len = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_len as usize, samples * 2);
    }

    #[test]
    fn tone_stays_within_gain() {
        let wav = sine_wav(880.0, 0.06, Duration::from_millis(50));
        let limit = (0.06 * i16::MAX as f32) as i16 + 1;
        for chunk in wav[44..].chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            assert!(sample.abs() <= limit);
        }
    }

    #[test]
    fn disabled_settings_give_silent_chime() {
        let settings = ToneSettings {
            enabled: false,
            ..ToneSettings::default()
        };
        assert!(chime_for(settings).play().is_ok());
    }
}
