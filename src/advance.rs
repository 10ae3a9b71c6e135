use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, LockReason, Violation};
use crate::types::*;

/// Push every decided knockout winner into the match it feeds, cascading
/// until nothing changes, then clear any duplicate seats.
///
/// Running it twice in a row gives the same bracket both times.
pub fn advance(bracket: &[Match]) -> Vec<Match> {
  let mut current = bracket.to_vec();
  let mut passes = 0usize;
  loop {
    let (next, changed) = forward_fill(&current);
    current = next;
    if !changed {
      break;
    }
    passes += 1;
    if passes >= MAX_ADVANCE_PASSES {
      tracing::warn!(passes, "advance hit the pass cap, returning partial bracket");
      break;
    }
  }
  let (repaired, _) = repair_rounds(&current);
  repaired
}

fn forward_fill(bracket: &[Match]) -> (Vec<Match>, bool) {
  let mut feeder_counts: HashMap<&str, usize> = HashMap::new();
  let mut fed: Vec<(&str, Vec<&Entrant>)> = Vec::new();
  for m in bracket.iter().filter(|m| m.is_knockout()) {
    let Some(target_id) = m.future_match_id.as_deref() else {
      continue;
    };
    *feeder_counts.entry(target_id).or_default() += 1;
    let Some(winner) = m.state.winner() else {
      continue;
    };
    match fed.iter_mut().find(|(id, _)| *id == target_id) {
      Some((_, winners)) => winners.push(winner),
      None => fed.push((target_id, vec![winner])),
    }
  }

  let mut next = bracket.to_vec();
  let mut changed = false;
  for (target_id, winners) in fed {
    let Some(target) = next.iter_mut().find(|m| m.id_str() == target_id) else {
      continue;
    };
    if target.is_complete() || target.state.slots().iter().all(Option::is_some) {
      continue;
    }

    let mut fill: [Option<Entrant>; 2] = [None, None];
    for winner in winners {
      if fill.iter().flatten().any(|e| e.id == winner.id) {
        continue;
      }
      if let Some(slot) = fill.iter_mut().find(|slot| slot.is_none()) {
        *slot = Some(winner.clone());
      }
    }

    let single_feeder = feeder_counts.get(target_id) == Some(&1);
    let state = match fill {
      [Some(player), None] if single_feeder => MatchState::Bye {
        player,
        points: BYE_POINTS,
      },
      [player1, player2] => MatchState::from_slots(player1, player2),
    };
    if state != target.state {
      let seated = state.slots().into_iter().flatten().map(|e| e.id.as_str()).collect::<Vec<_>>();
      tracing::debug!(match_id = target_id, ?seated, "advanced winners");
      target.state = state;
      changed = true;
    }
  }
  (next, changed)
}

/// Swap a corrected winner into the match fed by `match_id`. When that match
/// had already been played it is reset, and whoever it had advanced is pulled
/// back out of the match after it, all the way down the chain.
pub fn reverse_winner(bracket: &[Match], match_id: &str, old_winner_id: &str, new_winner: &Entrant) -> Vec<Match> {
  let mut next = bracket.to_vec();
  let mut target_id = next
    .iter()
    .find(|m| m.id_str() == match_id)
    .and_then(|m| m.future_match_id.clone());
  let mut stale = old_winner_id.to_string();
  let mut replacement = Some(new_winner.clone());

  while let Some(id) = target_id {
    let Some(target) = next.iter_mut().find(|m| m.id_str() == id) else {
      break;
    };
    if !target.contains(&stale) {
      break;
    }
    let was_complete = target.is_complete();
    let former_winner = target.winner_id().map(str::to_string);
    let state = std::mem::take(&mut target.state);
    target.state = match &replacement {
      Some(entrant) => state.replace(&stale, entrant),
      None => state.without(&stale),
    };
    tracing::info!(match_id = %id, removed = %stale, reset = was_complete, "corrected downstream winner");

    if !was_complete {
      break;
    }
    match former_winner {
      Some(former) => {
        stale = former;
        replacement = None;
        target_id = target.future_match_id.clone();
      }
      None => break,
    }
  }
  next
}

/// Make sure nobody sits in two matches of the same knockout round. The
/// first seat in bracket order wins; later ones are cleared and their match
/// goes back to waiting.
pub fn repair_rounds(bracket: &[Match]) -> (Vec<Match>, Vec<Violation>) {
  let mut next = bracket.to_vec();
  let mut seen: HashSet<(u32, String)> = HashSet::new();
  let mut violations = Vec::new();

  for m in next.iter_mut().filter(|m| m.is_knockout()) {
    let before = violations.len();
    let round = m.round;
    let match_id = m.id_str().to_string();
    let mut keep = |slot: Option<Entrant>| {
      slot.filter(|e| {
        if seen.insert((round, e.id.clone())) {
          return true;
        }
        violations.push(Violation {
          round,
          entrant_id: e.id.clone(),
          match_id: match_id.clone(),
        });
        false
      })
    };
    let [player1, player2] = m.state.clone().into_slots();
    let player1 = keep(player1);
    let player2 = keep(player2);
    if violations.len() > before {
      m.state = MatchState::from_slots(player1, player2);
    }
  }

  for v in &violations {
    let err = EngineError::from(v.clone());
    tracing::warn!(round = v.round, "cleared duplicate knockout seat: {err}");
  }
  (next, violations)
}

/// Why `m` can no longer take a result, if anything stops it. Automatic
/// byes downstream never lock anything.
pub fn lock_reason(bracket: &[Match], m: &Match) -> Option<LockReason> {
  if !m.is_knockout() {
    return bracket
      .iter()
      .any(Match::is_knockout)
      .then_some(LockReason::KnockoutStarted);
  }
  let ids = m.entrant_ids();
  bracket
    .iter()
    .filter(|later| later.is_knockout() && later.round > m.round && later.is_complete() && !later.is_bye())
    .find(|later| ids.iter().any(|id| later.contains(id)))
    .map(|later| LockReason::ConsumedDownstream {
      match_id: later.id_str().to_string(),
    })
}
