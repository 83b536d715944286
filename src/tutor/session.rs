//! Per-user session state: which interaction mode a user picked.
//!
//! Sessions live in process memory only. A restart drops every entry and all
//! users fall back to the unset state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

/// A user's chosen interaction channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    Voice,
}

impl Mode {
    /// Callback data string carried by the inline keyboard buttons.
    pub fn as_callback_data(&self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Voice => "voice",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "text" => Some(Mode::Text),
            "voice" => Some(Mode::Voice),
            _ => None,
        }
    }

    /// Human-readable label used in confirmation replies.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Text => "text messages",
            Mode::Voice => "voice messages",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_callback_data())
    }
}

/// What happens when a user picks a mode while one is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeChangePolicy {
    /// First selection wins; later selections are rejected. Matches the
    /// original bot's behavior.
    #[default]
    Locked,
    /// Later selections overwrite the stored mode.
    Allowed,
}

impl ModeChangePolicy {
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value {
            "locked" => Some(Self::Locked),
            "allowed" => Some(Self::Allowed),
            _ => None,
        }
    }
}

/// Outcome of a mode selection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// No mode was stored for this user; the selection was recorded.
    Accepted,
    /// A mode was already stored and the policy is `Locked`; nothing changed.
    AlreadySet(Mode),
    /// A mode was already stored and the policy is `Allowed`; it was replaced.
    Replaced(Mode),
}

/// In-memory user-id → mode table.
///
/// The single map lock serializes read-then-write, so first-write-wins holds
/// even if teloxide ever runs handlers concurrently. Cloning shares the table.
#[derive(Clone, Default)]
pub struct SessionStore {
    modes: Arc<Mutex<HashMap<i64, Mode>>>,
    policy: ModeChangePolicy,
}

impl SessionStore {
    pub fn new(policy: ModeChangePolicy) -> Self {
        Self {
            modes: Arc::new(Mutex::new(HashMap::new())),
            policy,
        }
    }

    pub async fn get(&self, user_id: i64) -> Option<Mode> {
        self.modes.lock().await.get(&user_id).copied()
    }

    /// Record a mode selection for `user_id` according to the change policy.
    pub async fn select(&self, user_id: i64, mode: Mode) -> Selection {
        let mut modes = self.modes.lock().await;
        match modes.get(&user_id).copied() {
            None => {
                modes.insert(user_id, mode);
                Selection::Accepted
            }
            Some(current) => match self.policy {
                ModeChangePolicy::Locked => Selection::AlreadySet(current),
                ModeChangePolicy::Allowed => {
                    modes.insert(user_id, mode);
                    Selection::Replaced(current)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_callback_data_round_trip() {
        assert_eq!(Mode::from_callback_data("text"), Some(Mode::Text));
        assert_eq!(Mode::from_callback_data("voice"), Some(Mode::Voice));
        assert_eq!(Mode::from_callback_data("video"), None);
        assert_eq!(Mode::Text.as_callback_data(), "text");
        assert_eq!(Mode::Voice.as_callback_data(), "voice");
    }

    #[tokio::test]
    async fn test_unset_until_selected() {
        let store = SessionStore::new(ModeChangePolicy::Locked);
        assert_eq!(store.get(1).await, None);
    }

    #[tokio::test]
    async fn test_first_selection_wins_under_locked() {
        let store = SessionStore::new(ModeChangePolicy::Locked);

        assert_eq!(store.select(1, Mode::Text).await, Selection::Accepted);
        assert_eq!(store.get(1).await, Some(Mode::Text));

        // Second attempt is rejected and does not overwrite.
        assert_eq!(
            store.select(1, Mode::Voice).await,
            Selection::AlreadySet(Mode::Text)
        );
        assert_eq!(store.get(1).await, Some(Mode::Text));
    }

    #[tokio::test]
    async fn test_reselection_replaces_under_allowed() {
        let store = SessionStore::new(ModeChangePolicy::Allowed);

        assert_eq!(store.select(7, Mode::Voice).await, Selection::Accepted);
        assert_eq!(
            store.select(7, Mode::Text).await,
            Selection::Replaced(Mode::Voice)
        );
        assert_eq!(store.get(7).await, Some(Mode::Text));
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = SessionStore::new(ModeChangePolicy::Locked);

        store.select(1, Mode::Text).await;
        store.select(2, Mode::Voice).await;

        assert_eq!(store.get(1).await, Some(Mode::Text));
        assert_eq!(store.get(2).await, Some(Mode::Voice));
        assert_eq!(store.get(3).await, None);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            ModeChangePolicy::from_env_value("locked"),
            Some(ModeChangePolicy::Locked)
        );
        assert_eq!(
            ModeChangePolicy::from_env_value("allowed"),
            Some(ModeChangePolicy::Allowed)
        );
        assert_eq!(ModeChangePolicy::from_env_value("maybe"), None);
    }
}
