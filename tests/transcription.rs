//! Integration tests for voice transcription.
//!
//! These tests require:
//! 1. A Whisper model file (ggml-base.en.bin recommended for tests)
//! 2. ffmpeg installed for audio conversion
//!
//! Run with: cargo test --features integ_test --test transcription

#[cfg(feature = "integ_test")]
mod tests {
    use std::path::PathBuf;

    use fluently::tutor::{SpeechToText, WhisperTranscriber};

    /// Path to test Whisper model (set via env var or default location)
    fn get_test_model_path() -> PathBuf {
        std::env::var("WHISPER_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/test/ggml-base.en.bin"))
    }

    /// Path to test audio files
    fn get_test_audio_dir() -> PathBuf {
        PathBuf::from("data/test/audio")
    }

    /// Test that the Whisper model loads successfully.
    #[test]
    fn test_whisper_loads() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found at {:?}", model_path);
            eprintln!("Download from: https://huggingface.co/ggerganov/whisper.cpp/tree/main");
            return;
        }

        let transcriber = WhisperTranscriber::new(&model_path);
        assert!(
            transcriber.is_ok(),
            "Failed to load Whisper: {:?}",
            transcriber.err()
        );
    }

    /// Test transcription of a simple audio file.
    ///
    /// Requires a test audio file at data/test/audio/hello.ogg containing
    /// someone saying "hello" or similar.
    #[tokio::test]
    async fn test_transcribe_hello() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found");
            return;
        }

        let audio_path = get_test_audio_dir().join("hello.ogg");
        if !audio_path.exists() {
            eprintln!("Skipping test: test audio not found at {:?}", audio_path);
            eprintln!("Create a short voice recording saying 'hello' and save as hello.ogg");
            return;
        }

        let transcriber = WhisperTranscriber::new(&model_path).expect("Failed to load model");
        let result = transcriber.transcribe(&audio_path).await;
        assert!(result.is_ok(), "Transcription failed: {:?}", result.err());

        let text = result.unwrap().to_lowercase();
        println!("Transcribed: {}", text);

        assert!(
            text.contains("hello") || text.contains("hi") || text.contains("hey"),
            "Expected greeting in transcription, got: {}",
            text
        );
    }
}
