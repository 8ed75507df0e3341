//! Decoders for submitted audio blobs.
//!
//! Every accepted media type is normalized to the same working form:
//! mono 16-bit PCM at 16kHz. WAV goes through hound; MPEG through a
//! symphonia probe/packet loop. A decode failure is a mandatory-step
//! error: the run cannot proceed without samples.

use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, ScribedError};
use crate::task::{DecodedAudio, MediaType};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decodes submitted bytes into mono 16kHz working audio.
pub fn decode_audio(bytes: &[u8], media_type: MediaType) -> Result<DecodedAudio> {
    let samples = match media_type {
        MediaType::Wav => decode_wav(bytes)?,
        MediaType::Mpeg => decode_mpeg(bytes)?,
    };
    if samples.is_empty() {
        return Err(ScribedError::AudioDecode {
            message: "no audio samples in submitted data".to_string(),
        });
    }
    Ok(DecodedAudio::new(samples, SAMPLE_RATE))
}

/// WAV decode: read 16-bit PCM, downmix stereo, resample to 16kHz.
fn decode_wav(bytes: &[u8]) -> Result<Vec<i16>> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| ScribedError::AudioDecode {
            message: format!("Failed to parse WAV data: {e}"),
        })?;

    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw_samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ScribedError::AudioDecode {
            message: format!("Failed to read WAV samples: {e}"),
        })?;

    let mono = downmix(&raw_samples, source_channels as usize);
    Ok(resample(&mono, source_rate, SAMPLE_RATE))
}

/// MPEG decode via symphonia: probe the container, decode packet by
/// packet, convert to interleaved i16, then downmix and resample.
fn decode_mpeg(bytes: &[u8]) -> Result<Vec<i16>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ScribedError::AudioDecode {
            message: format!("Unrecognized MPEG data: {e}"),
        })?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| ScribedError::AudioDecode {
            message: "No audio track found".to_string(),
        })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params.sample_rate.unwrap_or(SAMPLE_RATE);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| ScribedError::AudioDecode {
            message: format!("Unsupported MPEG codec: {e}"),
        })?;

    let mut interleaved: Vec<i16> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(ScribedError::AudioDecode {
                    message: format!("MPEG read failed: {e}"),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Recoverable per-frame corruption: skip the frame.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(ScribedError::AudioDecode {
                    message: format!("MPEG decode failed: {e}"),
                });
            }
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    let mono = downmix(&interleaved, channels);
    Ok(resample(&mono, source_rate, SAMPLE_RATE))
}

/// Downmix interleaved frames to mono by averaging channels.
fn downmix(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
