use crate::error::{EngineError, LockReason};
use crate::types::*;

/// Every pairing inside every group, one round each.
pub fn generate_group_matches(groups: &[Group]) -> Vec<Match> {
  let mut matches = Vec::new();
  for group in groups {
    let members = &group.entrants;
    let mut next = 1usize;
    for i in 0..members.len() {
      for j in (i + 1)..members.len() {
        matches.push(Match::group(
          group_match_id(&group.id, next),
          &group.id,
          members[i].clone(),
          members[j].clone(),
        ));
        next += 1;
      }
    }
  }
  matches
}

fn group_match_id(group_id: &str, n: usize) -> String {
  format!("{group_id}-m{n}")
}

/// Current members of a group, in the order they first appear in its matches.
pub fn group_members(bracket: &[Match], group_id: &str) -> Vec<Entrant> {
  let mut members: Vec<Entrant> = Vec::new();
  for m in bracket {
    if m.stage != Stage::Group || m.group_id.as_deref() != Some(group_id) {
      continue;
    }
    for entrant in m.state.slots().into_iter().flatten() {
      if !members.iter().any(|e| e.id == entrant.id) {
        members.push(entrant.clone());
      }
    }
  }
  members
}

/// Add a latecomer to an existing group by scheduling them against every
/// current member. Only allowed while the bracket has no knockout matches.
pub fn add_late_entrant(bracket: &[Match], group_id: &str, entrant: Entrant) -> Result<Vec<Match>, EngineError> {
  if bracket.iter().any(Match::is_knockout) {
    return Err(EngineError::GroupLocked {
      group_id: group_id.to_string(),
      reason: LockReason::KnockoutStarted,
    });
  }
  if bracket.iter().any(|m| m.contains(&entrant.id)) {
    return Err(EngineError::DuplicateEntrant(entrant.id));
  }
  let members = group_members(bracket, group_id);
  if members.is_empty() {
    return Err(EngineError::GroupNotFound(group_id.to_string()));
  }

  let existing = bracket
    .iter()
    .filter(|m| m.group_id.as_deref() == Some(group_id))
    .count();
  let mut next = bracket.to_vec();
  for (offset, member) in members.into_iter().enumerate() {
    next.push(Match::group(
      group_match_id(group_id, existing + offset + 1),
      group_id,
      member,
      entrant.clone(),
    ));
  }
  tracing::info!(group_id, entrant_id = %entrant.id, "added late entrant");
  Ok(next)
}
