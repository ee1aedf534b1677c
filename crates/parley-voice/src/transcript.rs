//! In-memory conversation transcript.
//!
//! The store always begins with the system turn. Runs only ever append to
//! it; a reset prunes it back to the system turn without replacing the
//! store itself, so every holder of the `Arc` sees the new conversation.

use parley_types::{LatestExchange, Role, Turn};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ordered conversation turns, starting with the system persona.
///
/// Uses `std::sync::RwLock`: every acquisition is a short `Vec` operation
/// that never spans an `.await`, and readers only hold the lock long enough
/// to clone what they need.
#[derive(Debug)]
pub struct TranscriptStore {
    turns: RwLock<Vec<Turn>>,
}

impl TranscriptStore {
    /// Creates a store holding only the system turn.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: RwLock::new(vec![Turn::system(system_prompt)]),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Turn>> {
        self.turns.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Turn>> {
        self.turns.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Truncates the transcript to its system turn.
    pub fn reset(&self) {
        let mut turns = self.write();
        let dropped = turns.len().saturating_sub(1);
        turns.truncate(1);
        tracing::debug!(dropped, "transcript reset to system turn");
    }

    /// Appends a user or assistant turn.
    ///
    /// The system turn is fixed at construction; appending another one is a
    /// programming error and the turn is discarded.
    pub fn append(&self, turn: Turn) {
        if turn.role() == Role::System {
            debug_assert!(false, "system turns cannot be appended");
            tracing::warn!("ignoring attempt to append a system turn");
            return;
        }
        self.write().push(turn);
    }

    /// Returns the most recent user and assistant texts.
    ///
    /// Empty until at least one full exchange exists. When a failed run has
    /// left an unanswered user turn, that turn is reported with the last
    /// assistant reply.
    pub fn latest_exchange(&self) -> LatestExchange {
        let turns = self.read();
        let latest = |role: Role| {
            turns
                .iter()
                .skip(1)
                .rev()
                .find(|t| t.role() == role)
                .map(|t| t.content().to_string())
        };
        // [system, user] has no reply yet, so it reports nothing rather
        // than pairing the prompt with the utterance.
        match (latest(Role::User), latest(Role::Assistant)) {
            (Some(user), Some(ai)) => LatestExchange { user, ai },
            _ => LatestExchange::empty(),
        }
    }

    /// Returns a copy of every turn, system turn first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.read().clone()
    }

    /// Number of turns including the system turn. Always at least 1.
    pub fn turn_count(&self) -> usize {
        self.read().len()
    }

    /// The persona turn the conversation was created with.
    pub fn system_turn(&self) -> Turn {
        self.read()[0].clone()
    }

    /// Drops turns past `len`. The system turn is always kept.
    pub(crate) fn truncate(&self, len: usize) {
        self.write().truncate(len.max(1));
    }
}
