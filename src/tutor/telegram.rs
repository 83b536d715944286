//! Telegram client using teloxide.

use std::path::{Path, PathBuf};

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::{info, warn};

use crate::tutor::dispatch::{HandlerError, Reply};
use crate::tutor::session::Mode;

/// The two-button Text/Voice choice keyboard.
pub fn mode_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("💬 Text", Mode::Text.as_callback_data()),
        InlineKeyboardButton::callback("🎤 Voice", Mode::Voice.as_callback_data()),
    ]])
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
    /// Scratch directory for downloaded voice notes.
    voice_dir: PathBuf,
}

impl TelegramClient {
    pub fn new(bot: Bot, data_dir: &Path) -> Self {
        Self {
            bot,
            voice_dir: data_dir.join("voice_messages"),
        }
    }

    /// Send one dispatcher reply to a chat.
    pub async fn send_reply(&self, chat_id: ChatId, reply: &Reply) -> Result<(), HandlerError> {
        let mut request = self.bot.send_message(chat_id, reply.text.as_str());

        if reply.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if reply.mode_keyboard {
            request = request.reply_markup(mode_keyboard());
        }

        request.await.map(|_| ()).map_err(|e| {
            let msg = format!("failed to send: {e}");
            warn!("{}", msg);
            HandlerError::Platform(msg)
        })
    }

    /// Download a voice note into the scratch directory, keyed by its file id.
    ///
    /// The directory is created on demand. OGG Opus is what Telegram sends
    /// for voice messages, hence the fixed extension.
    pub async fn download_voice(&self, file_id: &str) -> Result<PathBuf, HandlerError> {
        tokio::fs::create_dir_all(&self.voice_dir)
            .await
            .map_err(|e| HandlerError::Platform(format!("failed to create scratch dir: {e}")))?;

        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| HandlerError::Platform(format!("failed to get file info: {e}")))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| HandlerError::Platform(format!("failed to download voice: {e}")))?;

        let path = voice_scratch_path(&self.voice_dir, file_id);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| HandlerError::Platform(format!("failed to write voice file: {e}")))?;

        info!("📥 Downloaded voice note {} ({} bytes)", file_id, data.len());
        Ok(path)
    }

    /// Remove a downloaded voice note once transcription has been attempted.
    pub async fn discard_voice(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove voice scratch file {:?}: {e}", path);
        }
    }
}

/// Scratch path for a voice attachment: `<dir>/<file_id>.ogg`.
pub fn voice_scratch_path(voice_dir: &Path, file_id: &str) -> PathBuf {
    voice_dir.join(format!("{file_id}.ogg"))
}
