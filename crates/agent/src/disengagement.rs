//! When to stop talking to a passenger who is not engaging.
//!
//! The policy counts consecutive non-substantive utterances (silence,
//! noise, a stray syllable). Any substantive utterance resets the count.

/// Spoken when the session ends for lack of engagement.
pub const FAREWELL: &str = "It sounds like now might not be a good time. \
    Please call back whenever you're ready to book a ride. Goodbye!";

/// Utterances shorter than this (after trimming) do not count as input.
const MIN_SUBSTANTIVE_CHARS: usize = 2;

#[derive(Debug, Clone)]
pub struct DisengagementPolicy {
    max_idle_utterances: u32,
    idle_streak: u32,
}

impl DisengagementPolicy {
    pub fn new(max_idle_utterances: u32) -> Self {
        Self {
            max_idle_utterances: max_idle_utterances.max(1),
            idle_streak: 0,
        }
    }

    pub fn is_substantive(text: &str) -> bool {
        text.trim().chars().count() >= MIN_SUBSTANTIVE_CHARS
    }

    /// Record a user utterance. Returns `true` once the idle limit is reached.
    pub fn observe(&mut self, text: &str) -> bool {
        if Self::is_substantive(text) {
            self.idle_streak = 0;
        } else {
            self.idle_streak += 1;
        }
        self.idle_streak >= self.max_idle_utterances
    }

    pub fn idle_streak(&self) -> u32 {
        self.idle_streak
    }
}

impl Default for DisengagementPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
