use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LockReason {
  #[error("the tournament has been finalized")]
  TournamentFinalized,
  #[error("the knockout stage has started")]
  KnockoutStarted,
  #[error("match {match_id} has already been completed with a player from this match")]
  ConsumedDownstream { match_id: String },
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EngineError {
  #[error("need at least {required} entrants, got {actual}")]
  InsufficientEntrants { required: usize, actual: usize },
  #[error("match {0} not found")]
  MatchNotFound(String),
  #[error("cannot update match {match_id}: {reason}")]
  MatchLocked { match_id: String, reason: LockReason },
  #[error("invalid result for match {match_id}: {reason}")]
  InvalidResult { match_id: String, reason: String },
  #[error("entrant {entrant_id} appears more than once in knockout round {round} (cleared from {match_id})")]
  StructuralViolation {
    round: u32,
    entrant_id: String,
    match_id: String,
  },
  #[error("cannot change group {group_id}: {reason}")]
  GroupLocked { group_id: String, reason: LockReason },
  #[error("group {0} not found")]
  GroupNotFound(String),
  #[error("entrant {0} is already in the tournament")]
  DuplicateEntrant(String),
  #[error("tournament is not ready: {0}")]
  NotReady(String),
  #[error("store: {0}")]
  Store(String),
  #[error("config: {0}")]
  Config(String),
}

/// A duplicate seat found and cleared by the integrity pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Violation {
  pub round: u32,
  pub entrant_id: String,
  pub match_id: String,
}

impl From<Violation> for EngineError {
  fn from(v: Violation) -> Self {
    EngineError::StructuralViolation {
      round: v.round,
      entrant_id: v.entrant_id,
      match_id: v.match_id,
    }
  }
}
