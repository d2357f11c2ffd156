//! Audio decoding to mono PCM using symphonia

use super::traits::ProgressSink;
use crate::error::AnalysisError;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Packets decoded between two cancellation polls
const CANCEL_POLL_PACKETS: usize = 64;

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a whole audio file to mono f32 samples
///
/// Stops early with `AnalysisError::Cancelled` when the sink reports
/// cancellation.
pub fn decode_to_mono(path: &Path, progress: &dyn ProgressSink) -> Result<MonoAudio> {
    let mut stream = PacketStream::open(path)?;
    let mut samples: Vec<f32> = Vec::new();
    let mut packets = 0usize;

    while stream.decode_next(&mut samples)? {
        packets += 1;
        if packets % CANCEL_POLL_PACKETS == 0 && progress.is_cancelled() {
            log::debug!("Decoding of {:?} cancelled after {} packets", path, packets);
            return Err(AnalysisError::Cancelled.into());
        }
    }

    if samples.is_empty() {
        anyhow::bail!("No audio samples decoded from {:?}", path);
    }

    let audio = MonoAudio {
        samples,
        sample_rate: stream.sample_rate,
    };
    log::debug!(
        "Decoded {} packets, {} samples ({:.1}s) at {}Hz",
        packets,
        audio.samples.len(),
        audio.duration_secs(),
        audio.sample_rate
    );
    Ok(audio)
}

/// Demuxer and decoder for the first audio track of a file
struct PacketStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    buffer: Option<(SignalSpec, SampleBuffer<f32>)>,
}

impl PacketStream {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {:?}", path))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let format = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("Failed to probe audio format: {:?}", path))?
            .format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found")?;
        let sample_rate = track
            .codec_params
            .sample_rate
            .context("No sample rate in audio track")?;
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create audio decoder")?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            buffer: None,
        })
    }

    /// Append the next packet's samples, downmixed, to `out`
    ///
    /// Returns false at end of stream. Corrupt packets are skipped.
    fn decode_next(&mut self, out: &mut Vec<f32>) -> Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(e) => {
                    log::warn!("Stopping at unreadable packet: {}", e);
                    return Ok(false);
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("Skipping undecodable packet: {}", e);
                    return Ok(true);
                }
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let frames = decoded.capacity();

            let reusable = matches!(
                &self.buffer,
                Some((buffer_spec, buffer))
                    if *buffer_spec == spec && buffer.capacity() >= frames * channels
            );
            if !reusable {
                self.buffer = Some((spec, SampleBuffer::new(frames as u64, spec)));
            }

            if let Some((_, buffer)) = self.buffer.as_mut() {
                buffer.copy_interleaved_ref(decoded);
                downmix_into(buffer.samples(), channels, out);
            }
            return Ok(true);
        }
    }
}

/// Average interleaved frames down to one channel
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
