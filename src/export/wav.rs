//! WAV file export functionality

use std::io::{Seek, Write};
use std::path::Path;
use std::sync::Arc;

use super::{apply_fade_out, mix_frame, normalize_samples, ExportConfig};
use crate::error::{ModError, Result};
use crate::player::{Block, Session, SessionConfig};
use crate::score::Module;

/// Frames rendered per session block
const FRAMES_PER_BLOCK: usize = 4096;

/// Outcome of a render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    /// Output frames written
    pub frames: usize,
    /// Length in seconds
    pub seconds: f32,
    /// Whether the song ended before `max_duration` was reached
    pub song_ended: bool,
}

/// Render `module` into interleaved samples (one or two per frame).
pub fn render_interleaved(
    module: impl Into<Arc<Module>>,
    config: &ExportConfig,
) -> Result<(Vec<f32>, ExportSummary)> {
    let mut session = session_for(module, config);
    let mut samples = Vec::new();
    let summary = render_frames(&mut session, config, |frame| {
        samples.extend_from_slice(frame);
        Ok(())
    })?;
    Ok((samples, summary))
}

/// Render `module` to a WAV file.
///
/// Rendering stops at the end of the song or after `config.max_duration`
/// seconds, whichever comes first.
///
/// # Examples
///
/// ```no_run
/// use mod_replayer::export::{render_to_wav, ExportConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let module = mod_replayer::parse(&std::fs::read("song.mod")?)?;
/// let summary = render_to_wav(module, "song.wav", &ExportConfig::stereo())?;
/// println!("{:.1}s written", summary.seconds);
/// # Ok(())
/// # }
/// ```
pub fn render_to_wav<P: AsRef<Path>>(
    module: impl Into<Arc<Module>>,
    output_path: P,
    config: &ExportConfig,
) -> Result<ExportSummary> {
    let path = output_path.as_ref();
    let channels = config.channels.clamp(1, 2);

    // Post-processing needs the whole song in memory
    if config.normalize || config.fade_out_duration > 0.0 {
        let (mut samples, summary) = render_interleaved(module, config)?;

        if config.normalize {
            log::debug!("normalizing {} samples", samples.len());
            normalize_samples(&mut samples);
        }
        if config.fade_out_duration > 0.0 {
            apply_fade_out(
                &mut samples,
                config.fade_out_duration,
                config.sample_rate,
                channels,
            );
        }

        let mut writer = create_writer(path, config)?;
        for &sample in &samples {
            write_sample(&mut writer, sample, config.float_samples)?;
        }
        finalize(writer)?;
        log::info!("wrote {} ({:.1}s)", path.display(), summary.seconds);
        Ok(summary)
    } else {
        // Streaming path: mix and write block by block
        let mut session = session_for(module, config);
        let mut writer = create_writer(path, config)?;
        let summary = render_frames(&mut session, config, |frame| {
            for &sample in frame {
                write_sample(&mut writer, sample, config.float_samples)?;
            }
            Ok(())
        })?;
        finalize(writer)?;
        log::info!("wrote {} ({:.1}s)", path.display(), summary.seconds);
        Ok(summary)
    }
}

fn session_for(module: impl Into<Arc<Module>>, config: &ExportConfig) -> Session {
    Session::with_config(
        module,
        SessionConfig::with_sample_rate(config.sample_rate as f32),
    )
}

/// Pull blocks from `session` and hand each mixed frame to `sink`.
fn render_frames(
    session: &mut Session,
    config: &ExportConfig,
    mut sink: impl FnMut(&[f32]) -> Result<()>,
) -> Result<ExportSummary> {
    let channels = config.channels.clamp(1, 2) as usize;
    let max_frames = config.max_frames();
    let mut out = [0.0f32; 2];
    let mut pans = vec![0.5f32; session.channel_count()];
    let mut frames_written = 0;
    let mut song_ended = false;

    while frames_written < max_frames {
        let frames = (max_frames - frames_written).min(FRAMES_PER_BLOCK);

        // pan changes take effect from the next block
        for (index, pan) in pans.iter_mut().enumerate() {
            *pan = session.channel(index).map_or(0.5, |channel| channel.panning);
        }

        let buffers = match session.next_block(frames) {
            Block::Audio(buffers) => buffers,
            Block::EndOfSong => {
                song_ended = true;
                break;
            }
        };
        for frame in 0..frames {
            mix_frame(
                buffers,
                &pans,
                frame,
                config.stereo_separation,
                &mut out[..channels],
            );
            sink(&out[..channels])?;
        }
        frames_written += frames;
    }

    if !song_ended && session.is_finished() {
        song_ended = true;
    }

    Ok(ExportSummary {
        frames: frames_written,
        seconds: frames_written as f32 / config.sample_rate.max(1) as f32,
        song_ended,
    })
}

fn create_writer(
    path: &Path,
    config: &ExportConfig,
) -> Result<hound::WavWriter<std::io::BufWriter<std::fs::File>>> {
    let spec = hound::WavSpec {
        channels: config.channels.clamp(1, 2),
        sample_rate: config.sample_rate,
        bits_per_sample: if config.float_samples { 32 } else { 16 },
        sample_format: if config.float_samples {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };

    hound::WavWriter::create(path, spec)
        .map_err(|e| ModError::Export(format!("Failed to create WAV file: {}", e)))
}

fn write_sample<W: Write + Seek>(
    writer: &mut hound::WavWriter<W>,
    sample: f32,
    float: bool,
) -> Result<()> {
    let result = if float {
        writer.write_sample(sample)
    } else {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
    };
    result.map_err(|e| ModError::Export(format!("Failed to write sample: {}", e)))
}

fn finalize<W: Write + Seek>(writer: hound::WavWriter<W>) -> Result<()> {
    writer
        .finalize()
        .map_err(|e| ModError::Export(format!("Failed to finalize WAV file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Effect, PatternList, Sample};

    /// One division: a looping square wave on channels 0 (left) and 1 (right).
    fn module() -> Module {
        let mut patterns = PatternList::new();
        let pattern = patterns.add_pattern(0).unwrap();
        let division = pattern.add_division(0, 4).unwrap();
        for channel in 0..2 {
            let slot = division.channel_mut(channel).unwrap();
            slot.set_effect(Effect::SetSample { index: 0 });
            slot.set_effect(Effect::SetPitch { period: 428 });
        }
        patterns.song_positions = vec![0];

        let mut pcm = vec![0.5; 16];
        pcm.extend(vec![-0.5; 16]);
        Module {
            patterns,
            samples: vec![Sample::new("square", pcm, 1.0).unwrap().with_loop(0, 32)],
            ..Module::default()
        }
    }

    #[test]
    fn test_render_stops_at_song_end() {
        let config = ExportConfig::with_sample_rate(8000).normalize(false);
        let (samples, summary) = render_interleaved(module(), &config).unwrap();
        assert!(summary.song_ended);
        // 6 ticks of 160 samples at 8 kHz, padded to one block
        assert_eq!(summary.frames, FRAMES_PER_BLOCK);
        assert_eq!(samples.len(), FRAMES_PER_BLOCK);
        assert!(samples[..960].iter().any(|&s| s != 0.0));
        assert!(samples[960..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_respects_max_duration() {
        let mut config = ExportConfig::stereo().max_duration(0.0625);
        config.sample_rate = 8000;
        let (samples, summary) = render_interleaved(module(), &config).unwrap();
        assert_eq!(summary.frames, 500);
        assert_eq!(samples.len(), 1000);
        assert!(!summary.song_ended);
    }

    #[test]
    fn test_hard_panned_channels_split_sides() {
        let config = ExportConfig::stereo().max_duration(0.001);
        let (samples, _) = render_interleaved(module(), &config).unwrap();
        // channel 0 is hard left, channel 1 hard right: equal sides
        assert_eq!(samples[0], samples[1]);
        assert!(samples[0] > 0.0);
    }

    #[test]
    fn test_wav_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let config = ExportConfig::stereo()
            .float_samples(true)
            .normalize(false)
            .max_duration(0.05);

        let summary = render_to_wav(module(), &path, &config).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(reader.duration() as usize, summary.frames);
    }

    #[test]
    fn test_missing_directory_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        let result = render_to_wav(module(), &path, &ExportConfig::default());
        assert!(matches!(result, Err(ModError::Export(_))));
    }
}
