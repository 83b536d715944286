use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use fluently::config::Config;
use fluently::tutor::{
    InboundEvent, Mode, OpenAiChat, Reply, Responder, SessionStore, SpeechToText, TelegramClient,
    TutorDispatcher, UserRef, WhisperTranscriber,
};

struct BotState {
    telegram: TelegramClient,
    dispatcher: TutorDispatcher,
}

impl BotState {
    fn new(config: &Config, bot: &Bot) -> Self {
        let chat = Arc::new(OpenAiChat::new(config.openai_api_key.clone()));

        let transcriber: Option<Arc<dyn SpeechToText>> = match &config.whisper_model_path {
            Some(path) => match WhisperTranscriber::new(path) {
                Ok(w) => Some(Arc::new(w)),
                Err(e) => {
                    warn!("Voice transcription disabled: {e}");
                    None
                }
            },
            None => {
                info!("No WHISPER_MODEL_PATH set; voice notes are unsupported");
                None
            }
        };

        let dispatcher = TutorDispatcher::new(
            config.bot_name.clone(),
            SessionStore::new(config.mode_change),
            Responder::new(chat, transcriber),
        );

        Self {
            telegram: TelegramClient::new(bot.clone(), &config.data_dir),
            dispatcher,
        }
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Greet the user and offer the text/voice choice.
    Start,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fluently: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging: stdout plus a non-blocking file under <data_dir>/logs.
    // An unwritable data dir downgrades to stdout-only logging; only bad
    // configuration is startup-fatal.
    let log_dir = config.data_dir.join("logs");
    let mut _file_guard = None;
    let mut log_file_error = None;
    let file_layer = match open_log_file(&log_dir) {
        Ok(log_file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            _file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(
                        tracing_subscriber::EnvFilter::from_default_env()
                            .add_directive(tracing::Level::INFO.into()),
                    ),
            )
        }
        Err(e) => {
            log_file_error = Some(e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_layer)
        .init();

    if let Some(e) = log_file_error {
        warn!("File logging disabled ({}): {e}", log_dir.display());
    }

    info!("🚀 Starting {}...", config.bot_name);

    let bot = Bot::new(&config.telegram_bot_token);
    let state = Arc::new(BotState::new(&config, &bot));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.voice().is_some())
                .endpoint(handle_voice),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some())
                .endpoint(handle_text),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error from the update listener",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Open (creating as needed) the append-mode log file under `log_dir`.
fn open_log_file(log_dir: &std::path::Path) -> Result<std::fs::File, std::io::Error> {
    std::fs::create_dir_all(log_dir)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("fluently.log"))
}

/// Route one event and send whatever comes back. Handler failures are logged
/// and always answered with a user-visible fallback reply.
async fn deliver(state: &BotState, chat_id: ChatId, event: InboundEvent) {
    match state.dispatcher.handle(event).await {
        Ok(replies) => {
            for reply in replies {
                if let Err(e) = state.telegram.send_reply(chat_id, &reply).await {
                    error!("Failed to deliver reply: {e}");
                }
            }
        }
        Err(e) => {
            error!("Handler failed: {e}");
            let fallback = Reply::plain(e.user_message());
            if let Err(send_err) = state.telegram.send_reply(chat_id, &fallback).await {
                error!("Failed to send fallback reply: {send_err}");
            }
        }
    }
}

fn sender(msg: &Message) -> Option<UserRef> {
    msg.from.as_ref().map(|user| UserRef {
        id: user.id.0 as i64,
        first_name: user.first_name.clone(),
    })
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = sender(&msg) else {
        return Ok(());
    };

    match cmd {
        Command::Start => deliver(&state, msg.chat.id, InboundEvent::Start { user }).await,
    }

    Ok(())
}

async fn handle_text(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = sender(&msg) else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    info!("📨 Text from {} ({})", user.first_name, user.id);
    deliver(
        &state,
        msg.chat.id,
        InboundEvent::Text {
            user,
            text: text.to_string(),
        },
    )
    .await;

    Ok(())
}

async fn handle_voice(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = sender(&msg) else {
        return Ok(());
    };
    let Some(voice) = msg.voice() else {
        return Ok(());
    };

    info!("🎤 Voice note from {} ({})", user.first_name, user.id);

    let audio = match state.telegram.download_voice(&voice.file.id.0).await {
        Ok(path) => path,
        Err(e) => {
            error!("Voice download failed: {e}");
            let fallback = Reply::plain(e.user_message());
            if let Err(send_err) = state.telegram.send_reply(msg.chat.id, &fallback).await {
                error!("Failed to send fallback reply: {send_err}");
            }
            return Ok(());
        }
    };

    deliver(
        &state,
        msg.chat.id,
        InboundEvent::Voice {
            user,
            audio: audio.clone(),
        },
    )
    .await;

    // Scratch files are removed once transcription has been attempted.
    state.telegram.discard_voice(&audio).await;

    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    // Acknowledge the press so the client stops its spinner.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(mode) = Mode::from_callback_data(data) else {
        warn!("Unknown callback data: {data}");
        return Ok(());
    };

    let user = UserRef {
        id: q.from.id.0 as i64,
        first_name: q.from.first_name.clone(),
    };
    // Button presses arrive from the private chat; the user id doubles as the
    // private chat id when the original message is inaccessible.
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user.id));

    deliver(&state, chat_id, InboundEvent::ModeSelected { user, mode }).await;

    Ok(())
}
