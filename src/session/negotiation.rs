//! Pending prompts that need a decision from the player.

use std::collections::VecDeque;

/// How important a user-facing notice is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// An opponent proposed by the matchmaker, with both readiness flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOffer {
    pub opponent: String,
    pub elo: i32,
    pub self_ready: bool,
    pub opponent_ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Matchmaking {
    #[default]
    Idle,
    Searching,
    Found(MatchOffer),
}

/// The prompt currently on top, highest priority first:
/// draw offer, then match found, then challenge, then plain notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay<'a> {
    DrawOffer { from: &'a str },
    MatchFound(&'a MatchOffer),
    Challenge { challenger: &'a str },
    Notice(&'a Notice),
}

#[derive(Debug, Clone, Default)]
pub struct Negotiations {
    challenges: VecDeque<String>,
    draw_offer: Option<String>,
    awaiting_draw_reply: bool,
    matchmaking: Matchmaking,
}

impl Negotiations {
    /// Queue a challenge. A challenger already waiting is not queued twice.
    pub fn push_challenge(&mut self, challenger: impl Into<String>) -> bool {
        let challenger = challenger.into();
        if self.challenges.contains(&challenger) {
            return false;
        }
        self.challenges.push_back(challenger);
        true
    }

    /// The challenge to answer next.
    pub fn front_challenge(&self) -> Option<&str> {
        self.challenges.front().map(String::as_str)
    }

    pub fn pop_challenge(&mut self) -> Option<String> {
        self.challenges.pop_front()
    }

    pub fn pending_challenges(&self) -> usize {
        self.challenges.len()
    }

    pub fn offer_draw(&mut self, from: impl Into<String>) {
        self.draw_offer = Some(from.into());
    }

    pub fn draw_offer(&self) -> Option<&str> {
        self.draw_offer.as_deref()
    }

    pub fn take_draw_offer(&mut self) -> Option<String> {
        self.draw_offer.take()
    }

    pub fn awaiting_draw_reply(&self) -> bool {
        self.awaiting_draw_reply
    }

    pub fn set_awaiting_draw_reply(&mut self, waiting: bool) {
        self.awaiting_draw_reply = waiting;
    }

    pub fn matchmaking(&self) -> &Matchmaking {
        &self.matchmaking
    }

    pub fn searching(&self) -> bool {
        self.matchmaking == Matchmaking::Searching
    }

    pub fn start_search(&mut self) {
        self.matchmaking = Matchmaking::Searching;
    }

    pub fn match_found(&mut self, opponent: impl Into<String>, elo: i32) {
        self.matchmaking = Matchmaking::Found(MatchOffer {
            opponent: opponent.into(),
            elo,
            self_ready: false,
            opponent_ready: false,
        });
    }

    pub fn match_offer(&self) -> Option<&MatchOffer> {
        match &self.matchmaking {
            Matchmaking::Found(offer) => Some(offer),
            _ => None,
        }
    }

    /// Mark our side ready. Returns false when no match is on offer.
    pub fn mark_self_ready(&mut self) -> bool {
        match &mut self.matchmaking {
            Matchmaking::Found(offer) => {
                offer.self_ready = true;
                true
            }
            _ => false,
        }
    }

    pub fn mark_opponent_ready(&mut self) -> bool {
        match &mut self.matchmaking {
            Matchmaking::Found(offer) => {
                offer.opponent_ready = true;
                true
            }
            _ => false,
        }
    }

    /// Drop the search and any match offer.
    pub fn clear_matchmaking(&mut self) {
        self.matchmaking = Matchmaking::Idle;
    }

    /// Forget every pending prompt.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Highest-priority prompt, falling back to the oldest notice.
    pub fn top<'a>(&'a self, notices: &'a VecDeque<Notice>) -> Option<Overlay<'a>> {
        if let Some(from) = self.draw_offer.as_deref() {
            return Some(Overlay::DrawOffer { from });
        }
        if let Some(offer) = self.match_offer() {
            return Some(Overlay::MatchFound(offer));
        }
        if let Some(challenger) = self.front_challenge() {
            return Some(Overlay::Challenge { challenger });
        }
        notices.front().map(Overlay::Notice)
    }
}
