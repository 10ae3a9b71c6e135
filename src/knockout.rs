use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::error::EngineError;
use crate::types::*;

type Pairing = (Qualifier, Option<Qualifier>);

/// Number of single-elimination rounds needed for `entrants` players.
pub fn knockout_rounds(entrants: usize) -> u32 {
  let mut rounds = 0u32;
  let mut size = 1usize;
  while size < entrants {
    size *= 2;
    rounds += 1;
  }
  rounds
}

pub fn knockout_match_id(round: u32, index: usize) -> String {
  format!("ko-r{round}-m{index}")
}

/// Build the whole knockout tree: every round pre-allocated, forward links
/// wired, and round one seated. Byes in round one come back already won.
pub fn build_knockout_bracket(qualified: &[Qualifier]) -> Result<Vec<Match>, EngineError> {
  if qualified.len() < MIN_ENTRANTS {
    return Err(EngineError::InsufficientEntrants {
      required: MIN_ENTRANTS,
      actual: qualified.len(),
    });
  }

  let total_rounds = knockout_rounds(qualified.len());
  let mut rounds: Vec<Vec<Match>> = Vec::with_capacity(total_rounds as usize);
  let mut remaining = qualified.len();
  for round in 1..=total_rounds {
    let count = remaining.div_ceil(2);
    rounds.push(
      (0..count)
        .map(|idx| Match::knockout(knockout_match_id(round, idx + 1), round))
        .collect(),
    );
    remaining = count;
  }

  for r in 1..rounds.len() {
    let next_ids = rounds[r]
      .iter()
      .map(|m| m.id_str().to_string())
      .collect::<Vec<_>>();
    for (idx, m) in rounds[r - 1].iter_mut().enumerate() {
      m.future_match_id = next_ids.get(idx / 2).cloned();
    }
  }

  let pairs = seed_pairs(qualified);
  if let Some(first_round) = rounds.first_mut() {
    for (m, pair) in first_round.iter_mut().zip(pairs) {
      seat(m, pair);
    }
  }

  let matches = rounds.into_iter().flatten().collect::<Vec<_>>();
  tracing::info!(
    qualified = qualified.len(),
    rounds = total_rounds,
    matches = matches.len(),
    "built knockout bracket"
  );
  Ok(matches)
}

/// Round-one matches on their own, without the rest of the tree. A single
/// qualifier yields one bye that is already won.
pub fn seed_first_round(qualified: &[Qualifier]) -> Vec<Match> {
  seed_pairs(qualified)
    .into_iter()
    .enumerate()
    .map(|(idx, pair)| {
      let mut m = Match::knockout(knockout_match_id(1, idx + 1), 1);
      seat(&mut m, pair);
      m
    })
    .collect()
}

fn seat(m: &mut Match, (first, second): Pairing) {
  m.player1_origin = first.origin;
  match second {
    Some(second) => {
      m.player2_origin = second.origin;
      m.state = MatchState::Pending {
        player1: first.entrant,
        player2: second.entrant,
      };
    }
    None => {
      m.state = MatchState::Bye {
        player: first.entrant,
        points: BYE_POINTS,
      };
    }
  }
}

fn seed_pairs(qualified: &[Qualifier]) -> Vec<Pairing> {
  let mut pairs = if qualified.iter().all(|q| q.origin.is_some()) {
    world_cup_pairs(qualified)
  } else {
    availability_pairs(qualified)
  };
  pairs.sort_by_key(|(first, second)| match second {
    Some(second) => (false, Reverse(first.entrant.overlap(&second.entrant))),
    None => (true, Reverse(0)),
  });
  pairs
}

struct GroupSeats {
  group_id: String,
  first: Option<Qualifier>,
  second: Option<Qualifier>,
}

/// 1st of each full group meets the 2nd of the next full group (cyclic).
/// Groups that sent a single qualifier are paired among themselves and the
/// odd one out gets the bye.
fn world_cup_pairs(qualified: &[Qualifier]) -> Vec<Pairing> {
  let mut groups: Vec<GroupSeats> = Vec::new();
  let mut overflow: Vec<Qualifier> = Vec::new();
  for q in qualified {
    let Some(origin) = q.origin.as_ref() else {
      overflow.push(q.clone());
      continue;
    };
    let idx = match groups.iter().position(|g| g.group_id == origin.group_id) {
      Some(idx) => idx,
      None => {
        groups.push(GroupSeats {
          group_id: origin.group_id.clone(),
          first: None,
          second: None,
        });
        groups.len() - 1
      }
    };
    let seats = &mut groups[idx];
    let (preferred, fallback) = if origin.place <= 1 {
      (&mut seats.first, &mut seats.second)
    } else {
      (&mut seats.second, &mut seats.first)
    };
    if preferred.is_none() {
      *preferred = Some(q.clone());
    } else if fallback.is_none() {
      *fallback = Some(q.clone());
    } else {
      overflow.push(q.clone());
    }
  }

  let mut full: Vec<(Qualifier, Qualifier)> = Vec::new();
  let mut lone: Vec<Qualifier> = Vec::new();
  for g in groups {
    match (g.first, g.second) {
      (Some(first), Some(second)) => full.push((first, second)),
      (Some(only), None) | (None, Some(only)) => lone.push(only),
      (None, None) => {}
    }
  }
  lone.extend(overflow);

  let mut pairs = Vec::new();
  if full.len() == 1 {
    let (first, second) = full.remove(0);
    pairs.push((first, Some(second)));
  } else {
    for idx in 0..full.len() {
      let next = (idx + 1) % full.len();
      pairs.push((full[idx].0.clone(), Some(full[next].1.clone())));
    }
  }
  pairs.extend(pair_in_order(lone));
  pairs
}

/// Fallback when qualifiers carry no group info: entrants with identical
/// availability are paired by rank, the rest are paired in order.
fn availability_pairs(qualified: &[Qualifier]) -> Vec<Pairing> {
  let total = qualified.len();
  let mut buckets: Vec<(&BTreeSet<String>, Vec<Qualifier>)> = Vec::new();
  for q in qualified {
    match buckets.iter_mut().find(|(tags, _)| **tags == q.entrant.availability) {
      Some((_, members)) => members.push(q.clone()),
      None => buckets.push((&q.entrant.availability, vec![q.clone()])),
    }
  }

  let mut pairs = Vec::new();
  let mut leftovers = Vec::new();
  for (_, mut members) in buckets {
    members.sort_by_key(|q| q.entrant.rank_key(total));
    if members.len() % 2 == 1 {
      leftovers.extend(members.pop());
    }
    pairs.extend(pair_in_order(members));
  }
  pairs.extend(pair_in_order(leftovers));
  pairs
}

fn pair_in_order(entrants: Vec<Qualifier>) -> Vec<Pairing> {
  let mut pairs = Vec::new();
  let mut iter = entrants.into_iter();
  while let Some(first) = iter.next() {
    pairs.push((first, iter.next()));
  }
  pairs
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entrant(id: &str, tags: &[&str], seed: Option<u32>) -> Entrant {
    Entrant::new(id, id, tags.iter().copied(), seed)
  }

  fn from_group(id: &str, group: &str, place: u8) -> Qualifier {
    Qualifier {
      entrant: entrant(id, &["Mon"], None),
      origin: Some(GroupOrigin { group_id: group.to_string(), place }),
    }
  }

  fn bare(id: &str, tags: &[&str], seed: Option<u32>) -> Qualifier {
    Qualifier { entrant: entrant(id, tags, seed), origin: None }
  }

  fn ids(m: &Match) -> Vec<&str> {
    m.entrant_ids()
  }

  #[test]
  fn two_qualifiers_make_a_single_final() {
    let bracket = build_knockout_bracket(&[bare("a", &[], None), bare("b", &[], None)]).unwrap();
    assert_eq!(bracket.len(), 1);
    let m = &bracket[0];
    assert_eq!(m.round, 1);
    assert_eq!(m.stage, Stage::Knockout);
    assert!(m.future_match_id.is_none());
    assert_eq!(ids(m), vec!["a", "b"]);
    assert!(!m.is_complete());
  }

  #[test]
  fn refuses_fewer_than_two_qualifiers() {
    assert!(matches!(
      build_knockout_bracket(&[bare("a", &[], None)]),
      Err(EngineError::InsufficientEntrants { required: 2, actual: 1 })
    ));
    assert!(build_knockout_bracket(&[]).is_err());
  }

  #[test]
  fn single_qualifier_gets_a_won_bye() {
    let round = seed_first_round(&[from_group("solo", "group-1", 1)]);
    assert_eq!(round.len(), 1);
    let m = &round[0];
    assert_eq!(ids(m), vec!["solo"]);
    assert!(m.is_complete());
    assert_eq!(m.winner_id(), Some("solo"));
    assert_eq!(m.state.points(), [1, 0]);
  }

  #[test]
  fn round_structure_halves_and_links_forward() {
    for k in 2..=20usize {
      let qualified = (0..k).map(|i| bare(&format!("p{i}"), &[], None)).collect::<Vec<_>>();
      let bracket = build_knockout_bracket(&qualified).unwrap();
      let total = knockout_rounds(k);
      assert_eq!(total, (k as f64).log2().ceil() as u32, "k = {k}");

      let mut expected = k;
      for round in 1..=total {
        let in_round = bracket.iter().filter(|m| m.round == round).collect::<Vec<_>>();
        expected = expected.div_ceil(2);
        assert_eq!(in_round.len(), expected, "k = {k}, round = {round}");
        for (idx, m) in in_round.iter().enumerate() {
          if round == total {
            assert!(m.future_match_id.is_none());
          } else {
            assert_eq!(
              m.future_match_id.as_deref(),
              Some(knockout_match_id(round + 1, idx / 2 + 1).as_str())
            );
          }
        }
      }
      assert_eq!(bracket.iter().filter(|m| m.round == total).count(), 1);

      let seated: usize = bracket.iter().filter(|m| m.round == 1).map(|m| ids(m).len()).sum();
      assert_eq!(seated, k);
      assert!(bracket.iter().filter(|m| m.round > 1).all(|m| ids(m).is_empty()));
    }
  }

  #[test]
  fn world_cup_never_pairs_group_mates() {
    let qualified = vec![
      from_group("a1", "group-1", 1),
      from_group("a2", "group-1", 2),
      from_group("b1", "group-2", 1),
      from_group("b2", "group-2", 2),
      from_group("c1", "group-3", 1),
      from_group("c2", "group-3", 2),
    ];
    let round = seed_first_round(&qualified);
    let pairs = round.iter().map(ids).collect::<Vec<_>>();
    assert_eq!(pairs, vec![vec!["a1", "b2"], vec!["b1", "c2"], vec!["c1", "a2"]]);
    for m in &round {
      let g1 = m.player1_origin.as_ref().map(|o| o.group_id.clone());
      let g2 = m.player2_origin.as_ref().map(|o| o.group_id.clone());
      assert_ne!(g1, g2);
    }
  }

  #[test]
  fn lone_qualifier_takes_the_bye_last() {
    let qualified = vec![
      from_group("a1", "group-1", 1),
      from_group("a2", "group-1", 2),
      from_group("b1", "group-2", 1),
      from_group("b2", "group-2", 2),
      from_group("solo", "group-3", 1),
    ];
    let bracket = build_knockout_bracket(&qualified).unwrap();
    let first_round = bracket.iter().filter(|m| m.round == 1).collect::<Vec<_>>();
    assert_eq!(first_round.len(), 3);
    assert_eq!(ids(first_round[2]), vec!["solo"]);
    assert!(first_round[2].is_bye());
    assert_eq!(first_round[2].winner_id(), Some("solo"));
  }

  #[test]
  fn several_lone_qualifiers_are_all_seated() {
    let qualified = vec![
      from_group("a1", "group-1", 1),
      from_group("a2", "group-1", 2),
      from_group("b1", "group-2", 1),
      from_group("b2", "group-2", 2),
      from_group("c", "group-3", 1),
      from_group("d", "group-4", 1),
    ];
    let round = seed_first_round(&qualified);
    let mut seated = round.iter().flat_map(ids).collect::<Vec<_>>();
    seated.sort();
    assert_eq!(seated, vec!["a1", "a2", "b1", "b2", "c", "d"]);
    assert!(round.iter().all(|m| !m.is_bye()));
  }

  #[test]
  fn fallback_pairs_identical_availability_by_rank() {
    let qualified = vec![
      bare("mon3", &["Mon"], Some(3)),
      bare("fri", &["Fri"], Some(2)),
      bare("mon1", &["Mon"], Some(1)),
      bare("tue", &["Tue"], None),
    ];
    let round = seed_first_round(&qualified);
    let pairs = round.iter().map(ids).collect::<Vec<_>>();
    assert_eq!(pairs, vec![vec!["mon1", "mon3"], vec!["fri", "tue"]]);
  }

  #[test]
  fn higher_overlap_pairs_are_listed_first() {
    let qualified = vec![
      bare("x1", &["Thu"], Some(1)),
      bare("x2", &["Fri"], Some(2)),
      bare("y1", &["Mon", "Tue"], Some(3)),
      bare("y2", &["Mon", "Tue"], Some(4)),
    ];
    let round = seed_first_round(&qualified);
    assert_eq!(ids(&round[0]), vec!["y1", "y2"]);
    assert_eq!(ids(&round[1]), vec!["x1", "x2"]);
  }
}
