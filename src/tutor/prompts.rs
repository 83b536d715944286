//! Canned bot copy: the greeting and the opening conversation prompts.

use rand::seq::SliceRandom;

/// Conversation starters sent right after a user picks a mode.
pub const OPENING_PROMPTS: &[&str] = &[
    "How are you today?",
    "What did you do this morning?",
    "Tell me about your favorite food.",
    "What are your plans for the weekend?",
    "Describe the city or town you live in.",
    "What was the best part of your week?",
];

/// Greeting for /start. Telegram HTML: bot name bold, one italic emphasis.
pub fn greeting(first_name: &str, bot_name: &str) -> String {
    format!(
        "Hello {first_name}, welcome to <b>{bot_name}</b>! \
         I'm here to help you practice your <i>spoken English</i>.\n\n\
         How would you like to chat?"
    )
}

pub fn choose_first() -> &'static str {
    "Please choose text or voice first — send /start and pick one of the buttons."
}

/// Pick one opening prompt at random.
pub fn pick_opening_prompt() -> &'static str {
    let mut rng = rand::thread_rng();
    // The set is a non-empty constant, so choose always succeeds.
    OPENING_PROMPTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(OPENING_PROMPTS[0])
}
