//! Turn protocol state machine.
//!
//! A session alternates strictly between waiting for the human and waiting for
//! the gamemaster. The quit sentinel moves it to [`TurnPhase::Ended`], which is
//! terminal.

/// The only control input recognized by the session loop.
pub const QUIT_SENTINEL: &str = "quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingHuman,
    AwaitingAi,
    Ended,
}

impl TurnPhase {
    /// Phase after a human utterance has been accepted.
    pub fn after_human(self, utterance: &str) -> TurnPhase {
        match self {
            TurnPhase::Ended => TurnPhase::Ended,
            _ if is_quit(utterance) => TurnPhase::Ended,
            _ => TurnPhase::AwaitingAi,
        }
    }

    /// Phase after the gamemaster side of a turn finished, whether it produced
    /// a reply or failed.
    pub fn after_ai(self) -> TurnPhase {
        match self {
            TurnPhase::Ended => TurnPhase::Ended,
            _ => TurnPhase::AwaitingHuman,
        }
    }

    pub fn is_ended(self) -> bool {
        self == TurnPhase::Ended
    }
}

/// True when `utterance`, trimmed, equals the quit sentinel ignoring case.
pub fn is_quit(utterance: &str) -> bool {
    utterance.trim().eq_ignore_ascii_case(QUIT_SENTINEL)
}
