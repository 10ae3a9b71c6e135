use crate::advance::{advance, lock_reason, reverse_winner};
use crate::error::EngineError;
use crate::types::*;

/// Record (or correct) the result of one match and return the updated
/// bracket. Knockout results are propagated forward; a changed winner is
/// first swapped out of every match it had already reached.
pub fn record_result(
  bracket: &[Match],
  match_id: &str,
  winner_id: &str,
  points1: u32,
  points2: u32,
) -> Result<Vec<Match>, EngineError> {
  let idx = bracket
    .iter()
    .position(|m| m.id_str() == match_id)
    .ok_or_else(|| EngineError::MatchNotFound(match_id.to_string()))?;
  let target = &bracket[idx];

  if let Some(reason) = lock_reason(bracket, target) {
    return Err(EngineError::MatchLocked {
      match_id: match_id.to_string(),
      reason,
    });
  }

  let invalid = |reason: &str| EngineError::InvalidResult {
    match_id: match_id.to_string(),
    reason: reason.to_string(),
  };
  let (player1, player2) = match &target.state {
    MatchState::Pending { player1, player2 } | MatchState::Completed { player1, player2, .. } => {
      (player1.clone(), player2.clone())
    }
    MatchState::Bye { .. } => return Err(invalid("byes are decided automatically")),
    MatchState::Open { .. } => return Err(invalid("both entrants must be known first")),
  };
  let winner = if player1.id == winner_id {
    Side::Player1
  } else if player2.id == winner_id {
    Side::Player2
  } else {
    return Err(invalid(&format!("{winner_id} is not playing in this match")));
  };

  let previous = target.winner_id().map(str::to_string);
  let mut next = bracket.to_vec();
  next[idx].state = MatchState::Completed {
    player1,
    player2,
    winner,
    points: [points1, points2],
  };
  tracing::info!(match_id, winner_id, points1, points2, "recorded result");

  if !next[idx].is_knockout() {
    return Ok(next);
  }
  if let Some(previous) = previous.filter(|p| p != winner_id) {
    if let Some(new_winner) = next[idx].state.winner().cloned() {
      next = reverse_winner(&next, match_id, &previous, &new_winner);
    }
  }
  Ok(advance(&next))
}
