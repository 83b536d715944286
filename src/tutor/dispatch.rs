//! Event dispatcher: one closed inbound-event type, one handle function.
//!
//! Per-user state machine over the session store: UNSET users get guidance,
//! TEXT users get tutor replies (typed or transcribed), VOICE users get the
//! explicit not-yet-available notice.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::tutor::openai::LlmError;
use crate::tutor::prompts;
use crate::tutor::responder::Responder;
use crate::tutor::session::{Mode, Selection, SessionStore};
use crate::tutor::whisper::TranscribeError;

/// The message sender, as much of it as the handlers need.
#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: i64,
    pub first_name: String,
}

/// Everything the platform can hand us, as one closed type.
#[derive(Debug)]
pub enum InboundEvent {
    /// The /start command.
    Start { user: UserRef },
    /// An inline-button press carrying a mode choice.
    ModeSelected { user: UserRef, mode: Mode },
    /// A typed message.
    Text { user: UserRef, text: String },
    /// A voice note, already downloaded to the scratch directory.
    Voice { user: UserRef, audio: PathBuf },
}

/// An outgoing reply. `mode_keyboard` attaches the two-button Text/Voice
/// inline keyboard; `html` enables Telegram HTML parse mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub html: bool,
    pub mode_keyboard: bool,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            mode_keyboard: false,
        }
    }

    pub fn greeting(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            mode_keyboard: true,
        }
    }
}

/// Uniform handler failure, surfaced to one top-level log-and-fallback policy.
#[derive(Debug)]
pub enum HandlerError {
    Llm(LlmError),
    Transcribe(TranscribeError),
    /// No transcription collaborator configured (no whisper model).
    TranscriptionUnavailable,
    /// Voice-mode tutoring is an unimplemented capability.
    VoiceModeUnavailable,
    /// Telegram send/download failure.
    Platform(String),
}

impl HandlerError {
    /// The user-visible reply for this failure. Every handler failure path
    /// produces one; nothing fails silently.
    pub fn user_message(&self) -> &'static str {
        match self {
            HandlerError::VoiceModeUnavailable => {
                "Voice-mode tutoring isn't available yet. Please practice with text for now."
            }
            HandlerError::TranscriptionUnavailable => {
                "Sorry, I can't listen to voice notes right now. Please type your message instead."
            }
            _ => "Something went wrong, please try again.",
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Llm(e) => write!(f, "language model: {e}"),
            HandlerError::Transcribe(e) => write!(f, "transcription: {e}"),
            HandlerError::TranscriptionUnavailable => write!(f, "no transcriber configured"),
            HandlerError::VoiceModeUnavailable => write!(f, "voice mode not implemented"),
            HandlerError::Platform(e) => write!(f, "platform: {e}"),
        }
    }
}

impl std::error::Error for HandlerError {}

/// The per-update dispatcher.
pub struct TutorDispatcher {
    bot_name: String,
    sessions: SessionStore,
    responder: Responder,
}

impl TutorDispatcher {
    pub fn new(bot_name: String, sessions: SessionStore, responder: Responder) -> Self {
        Self {
            bot_name,
            sessions,
            responder,
        }
    }

    /// Route one inbound event, returning the replies to send in order.
    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<Reply>, HandlerError> {
        match event {
            InboundEvent::Start { user } => Ok(self.handle_start(&user)),
            InboundEvent::ModeSelected { user, mode } => Ok(self.handle_mode_selected(&user, mode).await),
            InboundEvent::Text { user, text } => self.handle_text(&user, &text).await,
            InboundEvent::Voice { user, audio } => self.handle_voice(&user, &audio).await,
        }
    }

    fn handle_start(&self, user: &UserRef) -> Vec<Reply> {
        info!("👋 /start from {} ({})", user.first_name, user.id);
        vec![Reply::greeting(prompts::greeting(
            &user.first_name,
            &self.bot_name,
        ))]
    }

    async fn handle_mode_selected(&self, user: &UserRef, mode: Mode) -> Vec<Reply> {
        match self.sessions.select(user.id, mode).await {
            Selection::Accepted => {
                info!("User {} chose {} mode", user.id, mode);
                vec![
                    Reply::plain(format!("Great! You chose {}.", mode.label())),
                    Reply::plain(prompts::pick_opening_prompt()),
                ]
            }
            Selection::AlreadySet(current) => {
                info!(
                    "User {} tried to re-select {} but is locked to {}",
                    user.id, mode, current
                );
                vec![Reply::plain(format!(
                    "You have already chosen: {}.",
                    current.label()
                ))]
            }
            Selection::Replaced(previous) => {
                info!("User {} switched {} -> {}", user.id, previous, mode);
                vec![Reply::plain(format!(
                    "Okay, switching from {} to {}.",
                    previous.label(),
                    mode.label()
                ))]
            }
        }
    }

    async fn handle_text(&self, user: &UserRef, text: &str) -> Result<Vec<Reply>, HandlerError> {
        match self.sessions.get(user.id).await {
            None => Ok(vec![Reply::plain(prompts::choose_first())]),
            Some(Mode::Text) => {
                let reply = self.responder.respond_to_text(text).await?;
                Ok(vec![Reply::plain(reply)])
            }
            Some(Mode::Voice) => {
                let reply = self.responder.respond_to_voice(text).await?;
                Ok(vec![Reply::plain(reply)])
            }
        }
    }

    async fn handle_voice(
        &self,
        user: &UserRef,
        audio: &std::path::Path,
    ) -> Result<Vec<Reply>, HandlerError> {
        let mode = match self.sessions.get(user.id).await {
            None => return Ok(vec![Reply::plain(prompts::choose_first())]),
            Some(mode) => mode,
        };

        let transcript = self.responder.transcribe(audio).await?;
        info!(
            "🎤 Voice note from {} transcribed ({} chars)",
            user.id,
            transcript.len()
        );

        let reply = match mode {
            Mode::Text => self.responder.respond_to_text(&transcript).await?,
            Mode::Voice => {
                warn!("User {} is in voice mode; replies unimplemented", user.id);
                self.responder.respond_to_voice(&transcript).await?
            }
        };

        Ok(vec![Reply::plain(reply)])
    }
}
