//! Speech-to-text transcription using whisper-rs.
//!
//! Converts downloaded voice notes (OGG Opus from Telegram) to text.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::tutor::responder::SpeechToText;

/// Whisper transcription engine over a local ggml model.
pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
}

impl WhisperTranscriber {
    /// Load a Whisper model from a .bin file.
    pub fn new(model_path: &Path) -> Result<Self, TranscribeError> {
        info!("Loading Whisper model from {:?}", model_path);

        if !model_path.exists() {
            return Err(TranscribeError::Model(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let path_str = model_path
            .to_str()
            .ok_or_else(|| TranscribeError::Model("invalid model path".into()))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| TranscribeError::Model(format!("failed to load model: {e}")))?;

        info!("Whisper model loaded");
        Ok(Self { ctx: Arc::new(ctx) })
    }

    fn run_decode(ctx: &WhisperContext, pcm_data: &[f32]) -> Result<String, TranscribeError> {
        let mut state = ctx
            .create_state()
            .map_err(|e| TranscribeError::Decode(format!("failed to create state: {e}")))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("en"));
        params.set_translate(false);
        params.set_no_timestamps(true);
        params.set_single_segment(false);

        state
            .full(params, pcm_data)
            .map_err(|e| TranscribeError::Decode(format!("transcription failed: {e}")))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(s) = segment.to_str() {
                text.push_str(s);
                text.push(' ');
            }
        }

        Ok(text.trim().to_string())
    }
}

#[async_trait::async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String, TranscribeError> {
        debug!("Transcribing {:?}", audio);

        let pcm_data = convert_ogg_to_pcm(audio)?;

        // The decode is CPU-bound; keep it off the event loop.
        let ctx = Arc::clone(&self.ctx);
        let text = tokio::task::spawn_blocking(move || Self::run_decode(&ctx, &pcm_data))
            .await
            .map_err(|e| TranscribeError::Decode(format!("decode task failed: {e}")))??;

        info!("Transcribed: \"{}\"", truncate(&text, 100));
        Ok(text)
    }
}

/// Convert an OGG Opus file to 16KHz mono f32 PCM samples using ffmpeg.
fn convert_ogg_to_pcm(input: &Path) -> Result<Vec<f32>, TranscribeError> {
    let input_path = input
        .to_str()
        .ok_or_else(|| TranscribeError::Audio("invalid audio path".into()))?;

    // Output format: 16-bit signed little-endian, 16KHz, mono
    let output = Command::new("ffmpeg")
        .args([
            "-i",
            input_path,
            "-ar",
            "16000",
            "-ac",
            "1",
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-y",
            "pipe:1",
        ])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .output()
        .map_err(|e| TranscribeError::Audio(format!("failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TranscribeError::Audio(format!("ffmpeg failed: {stderr}")));
    }

    // Convert i16 samples to f32
    let samples: Vec<f32> = output
        .stdout
        .chunks_exact(2)
        .map(|chunk| {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            sample as f32 / 32768.0
        })
        .collect();

    debug!("Converted to {} f32 samples", samples.len());
    Ok(samples)
}

/// Truncate to `max` characters, never splitting a multibyte character.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

#[derive(Debug)]
pub enum TranscribeError {
    /// Model file missing or failed to load.
    Model(String),
    /// Audio read/conversion failure (I/O or ffmpeg).
    Audio(String),
    /// Whisper decode failure.
    Decode(String),
}

impl std::fmt::Display for TranscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscribeError::Model(e) => write!(f, "model error: {e}"),
            TranscribeError::Audio(e) => write!(f, "audio error: {e}"),
            TranscribeError::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for TranscribeError {}
