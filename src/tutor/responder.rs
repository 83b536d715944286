//! Reply generation: collaborator trait seams plus the routing glue.
//!
//! `ChatModel` and `SpeechToText` are object-safe so tests can substitute
//! deterministic fakes for the OpenAI and Whisper implementations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::tutor::dispatch::HandlerError;
use crate::tutor::openai::LlmError;
use crate::tutor::whisper::TranscribeError;

/// The language-model collaborator.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn reply(&self, user_text: &str) -> Result<String, LlmError>;
}

/// The speech-transcription collaborator.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, TranscribeError>;
}

/// Stateless reply generation over the injected collaborators.
pub struct Responder {
    chat: Arc<dyn ChatModel>,
    stt: Option<Arc<dyn SpeechToText>>,
}

impl Responder {
    pub fn new(chat: Arc<dyn ChatModel>, stt: Option<Arc<dyn SpeechToText>>) -> Self {
        Self { chat, stt }
    }

    /// Tutor reply for typed (or transcribed) text.
    pub async fn respond_to_text(&self, text: &str) -> Result<String, HandlerError> {
        self.chat.reply(text).await.map_err(HandlerError::Llm)
    }

    /// Voice-mode replies are not built yet; surface that explicitly instead
    /// of silently reusing the text path.
    pub async fn respond_to_voice(&self, _transcript: &str) -> Result<String, HandlerError> {
        Err(HandlerError::VoiceModeUnavailable)
    }

    /// Transcribe a downloaded voice note.
    pub async fn transcribe(&self, audio: &Path) -> Result<String, HandlerError> {
        match &self.stt {
            Some(stt) => stt.transcribe(audio).await.map_err(HandlerError::Transcribe),
            None => Err(HandlerError::TranscriptionUnavailable),
        }
    }
}
