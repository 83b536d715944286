//! Tutor module - session state, dispatch, and collaborator clients.

pub mod dispatch;
pub mod openai;
pub mod prompts;
pub mod responder;
pub mod session;
pub mod telegram;
pub mod whisper;

pub use dispatch::{HandlerError, InboundEvent, Reply, TutorDispatcher, UserRef};
pub use openai::OpenAiChat;
pub use responder::{ChatModel, Responder, SpeechToText};
pub use session::{Mode, ModeChangePolicy, SessionStore};
pub use telegram::TelegramClient;
pub use whisper::WhisperTranscriber;
