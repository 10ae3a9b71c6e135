use std::collections::HashMap;

use crate::standings::group_standings;
use crate::types::*;

// Index is rank - 1. Past the table both grow by two per tier.
const SEED_DELTAS: [i64; 7] = [-5, -2, 0, 2, 4, 6, 8];
const BASE_SEEDS: [u32; 7] = [1, 2, 3, 5, 7, 10, 12];
const TIER_STEP: u32 = 2;

pub fn seed_delta(rank: u32) -> i64 {
  let rank = rank.max(1);
  match SEED_DELTAS.get(rank as usize - 1) {
    Some(delta) => *delta,
    None => SEED_DELTAS[SEED_DELTAS.len() - 1] + i64::from(TIER_STEP) * i64::from(rank - SEED_DELTAS.len() as u32),
  }
}

pub fn base_seed(rank: u32) -> u32 {
  let rank = rank.max(1);
  match BASE_SEEDS.get(rank as usize - 1) {
    Some(seed) => *seed,
    None => TIER_STEP
      .saturating_mul(rank - BASE_SEEDS.len() as u32)
      .saturating_add(BASE_SEEDS[BASE_SEEDS.len() - 1]),
  }
}

/// New seed after finishing at `rank`. Seeded entrants move by the tier
/// delta (never above seed 1); unseeded ones get the tier's base seed.
pub fn adjusted_seed(seed: Option<u32>, rank: u32) -> u32 {
  match seed.filter(|s| *s > 0) {
    Some(seed) => u32::try_from((i64::from(seed) + seed_delta(rank)).max(1)).unwrap_or(u32::MAX),
    None => base_seed(rank),
  }
}

fn placement_points(placement: Placement, final_round: u32, group_points: u32) -> u32 {
  match placement {
    Placement::Champion => 100,
    Placement::RunnerUp => 75,
    Placement::Semifinalist => 50,
    Placement::EliminatedInRound(round) => 25u32.saturating_sub(5 * final_round.saturating_sub(round)).max(5),
    Placement::Qualified => 10,
    Placement::GroupThird | Placement::GroupFourth | Placement::GroupStage => group_points,
  }
}

#[derive(Default, Clone, Copy)]
struct GroupRecord {
  place: usize,
  points: u32,
  wins: u32,
}

/// Final placement of every tournament entrant, best first.
pub fn finalize_rankings(bracket: &[Match], entrants: &[Entrant]) -> Vec<RankingEntry> {
  let mut records: HashMap<String, GroupRecord> = HashMap::new();
  for group in group_standings(bracket) {
    for (place, standing) in group.standings.into_iter().enumerate() {
      records.insert(
        standing.entrant.id,
        GroupRecord {
          place,
          points: standing.points,
          wins: standing.wins,
        },
      );
    }
  }

  let knockout = bracket.iter().filter(|m| m.is_knockout()).collect::<Vec<_>>();
  let mut rows = if knockout.is_empty() {
    group_only_rows(bracket, entrants, &records)
  } else {
    knockout_rows(&knockout, entrants, &records)
  };

  rows.sort_by(|a, b| {
    let ra = records.get(&a.entrant.id).copied().unwrap_or_default();
    let rb = records.get(&b.entrant.id).copied().unwrap_or_default();
    a.rank
      .cmp(&b.rank)
      .then(seed_order(&a.entrant).cmp(&seed_order(&b.entrant)))
      .then(rb.points.cmp(&ra.points))
      .then(rb.wins.cmp(&ra.wins))
  });
  rows
}

fn seed_order(entrant: &Entrant) -> (bool, u32) {
  match entrant.seed() {
    Some(seed) => (false, seed),
    None => (true, 0),
  }
}

fn entry(entrant: &Entrant, rank: u32, points: u32, placement: Placement) -> RankingEntry {
  RankingEntry {
    entrant: entrant.clone(),
    rank,
    points,
    adjusted_seed: adjusted_seed(entrant.seed(), rank),
    placement,
  }
}

fn group_only_rows(bracket: &[Match], entrants: &[Entrant], records: &HashMap<String, GroupRecord>) -> Vec<RankingEntry> {
  let mut played = entrants
    .iter()
    .filter_map(|e| records.get(&e.id).map(|r| (e, *r)))
    .collect::<Vec<_>>();
  played.sort_by(|(_, a), (_, b)| b.points.cmp(&a.points).then(b.wins.cmp(&a.wins)));

  let mut rows = played
    .iter()
    .enumerate()
    .map(|(idx, (e, r))| entry(e, idx as u32 + 1, r.points, Placement::GroupStage))
    .collect::<Vec<_>>();
  let next_rank = rows.len() as u32 + 1;
  rows.extend(
    entrants
      .iter()
      .filter(|e| !bracket.iter().any(|m| m.contains(&e.id)))
      .map(|e| entry(e, next_rank, 0, Placement::GroupStage)),
  );
  rows
}

fn knockout_rows(knockout: &[&Match], entrants: &[Entrant], records: &HashMap<String, GroupRecord>) -> Vec<RankingEntry> {
  let final_round = knockout.iter().map(|m| m.round).max().unwrap_or(1);
  let qualified_tier = final_round + 2;

  let mut placements: HashMap<&str, (u32, Placement)> = HashMap::new();
  for m in knockout {
    if m.round == final_round {
      if let Some(champion) = m.winner_id() {
        placements.insert(champion, (1, Placement::Champion));
      }
    }
    let Some(loser) = m.loser_id() else {
      continue;
    };
    let tier = final_round - m.round + 2;
    let placement = match final_round - m.round {
      0 => Placement::RunnerUp,
      1 => Placement::Semifinalist,
      _ => Placement::EliminatedInRound(m.round),
    };
    placements.entry(loser).or_insert((tier, placement));
  }

  let mut rows = Vec::with_capacity(entrants.len());
  let mut unplaced = Vec::new();
  for e in entrants {
    let record = records.get(&e.id).copied();
    let group_points = record.map_or(0, |r| r.points);
    let (rank, placement) = if let Some(found) = placements.get(e.id.as_str()) {
      *found
    } else if knockout.iter().any(|m| m.contains(&e.id)) {
      (qualified_tier, Placement::Qualified)
    } else {
      match record.map(|r| r.place) {
        Some(place) if place < QUALIFIERS_PER_GROUP => (qualified_tier, Placement::Qualified),
        Some(place) if place == QUALIFIERS_PER_GROUP => (GROUP_THIRD_RANK, Placement::GroupThird),
        Some(_) => (GROUP_FOURTH_RANK, Placement::GroupFourth),
        None => {
          unplaced.push(e);
          continue;
        }
      }
    };
    rows.push(entry(e, rank, placement_points(placement, final_round, group_points), placement));
  }

  let last_rank = rows.iter().map(|r| r.rank).max().unwrap_or(0) + 1;
  rows.extend(unplaced.into_iter().map(|e| entry(e, last_rank, 0, Placement::GroupStage)));
  rows
}

/// Everything the store needs to write when a tournament is finalized.
pub fn plan_commit(
  tournament_id: &str,
  rankings: &[RankingEntry],
  roster: &[Entrant],
  policy: SeedMergePolicy,
) -> CommitPlan {
  let mut ordered = rankings.iter().collect::<Vec<_>>();
  ordered.sort_by_key(|r| (r.adjusted_seed, r.rank));
  let display_order = ordered.iter().map(|r| r.entrant.id.clone()).collect::<Vec<_>>();

  let previous_seed = |entrant: &Entrant| {
    roster
      .iter()
      .find(|p| p.id == entrant.id)
      .map_or(entrant.seed(), Entrant::seed)
  };

  let mut targets: Vec<(&Entrant, u32)> = Vec::new();
  match policy {
    SeedMergePolicy::ParticipantsOnly => {
      targets.extend(ordered.iter().map(|r| (&r.entrant, r.adjusted_seed)));
    }
    SeedMergePolicy::GlobalReorder => {
      targets.extend(ordered.iter().map(|r| &r.entrant).zip(1u32..));
      let mut others = roster
        .iter()
        .filter(|p| !rankings.iter().any(|r| r.entrant.id == p.id))
        .collect::<Vec<_>>();
      others.sort_by_key(|p| seed_order(p));
      let start = targets.len() as u32 + 1;
      targets.extend(others.into_iter().zip(start..));
    }
  }

  let seed_updates = targets
    .into_iter()
    .filter_map(|(entrant, seed)| {
      let previous = previous_seed(entrant);
      (previous != Some(seed)).then(|| SeedUpdate {
        entrant_id: entrant.id.clone(),
        previous,
        seed,
      })
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    tournament_id,
    ?policy,
    updates = seed_updates.len(),
    "planned seed commit"
  );
  CommitPlan {
    tournament_id: tournament_id.to_string(),
    rankings: rankings.to_vec(),
    display_order,
    seed_updates,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::knockout::build_knockout_bracket;
  use crate::results::record_result;
  use crate::round_robin::generate_group_matches;
  use crate::standings::qualified_entrants;

  fn seeded(id: &str, seed: Option<u32>) -> Entrant {
    Entrant::new(id, id.to_uppercase(), ["Wed"], seed)
  }

  fn rank_of(rows: &[RankingEntry], id: &str) -> RankingEntry {
    rows.iter().find(|r| r.entrant.id == id).cloned().unwrap()
  }

  /// Plays every group match with the alphabetically first entrant winning.
  fn play_groups(mut bracket: Vec<Match>) -> Vec<Match> {
    let ids = bracket
      .iter()
      .map(|m| (m.id_str().to_string(), m.entrant_ids().into_iter().min().unwrap().to_string()))
      .collect::<Vec<_>>();
    for (match_id, winner) in ids {
      bracket = record_result(&bracket, &match_id, &winner, 2, 1).unwrap();
    }
    bracket
  }

  fn two_group_cup() -> (Vec<Entrant>, Vec<Match>) {
    let entrants = ["a", "b", "c", "d", "e", "f", "g", "h"]
      .iter()
      .zip(1u32..)
      .map(|(id, seed)| seeded(id, Some(seed)))
      .collect::<Vec<_>>();
    let groups = vec![
      Group { id: "group-1".to_string(), entrants: entrants[..4].to_vec(), availability: vec![] },
      Group { id: "group-2".to_string(), entrants: entrants[4..].to_vec(), availability: vec![] },
    ];
    let mut bracket = play_groups(generate_group_matches(&groups));
    let qualified = qualified_entrants(&group_standings(&bracket));
    bracket.extend(build_knockout_bracket(&qualified).unwrap());
    (entrants, bracket)
  }

  #[test]
  fn seed_tables_extend_by_two_per_tier() {
    let deltas = (1..=9).map(seed_delta).collect::<Vec<_>>();
    assert_eq!(deltas, vec![-5, -2, 0, 2, 4, 6, 8, 10, 12]);
    let bases = (1..=9).map(base_seed).collect::<Vec<_>>();
    assert_eq!(bases, vec![1, 2, 3, 5, 7, 10, 12, 14, 16]);
  }

  #[test]
  fn adjusted_seed_never_drops_below_one() {
    assert_eq!(adjusted_seed(Some(2), 1), 1);
    assert_eq!(adjusted_seed(Some(10), 1), 5);
    assert_eq!(adjusted_seed(None, 4), 5);
    assert_eq!(adjusted_seed(Some(0), 2), 2);
  }

  #[test]
  fn adjusted_seed_saturates_at_the_top() {
    assert_eq!(adjusted_seed(Some(u32::MAX), 7), u32::MAX);
    assert_eq!(adjusted_seed(Some(u32::MAX), 1), u32::MAX - 5);
    assert_eq!(base_seed(u32::MAX), u32::MAX);
  }

  #[test]
  fn single_elimination_final_ranks_champion_runner_up_and_semis() {
    let entrants = vec![seeded("a", Some(10)), seeded("b", Some(11)), seeded("c", Some(12)), seeded("d", Some(13))];
    let qualified = entrants
      .iter()
      .map(|e| Qualifier { entrant: e.clone(), origin: None })
      .collect::<Vec<_>>();
    let bracket = build_knockout_bracket(&qualified).unwrap();
    let bracket = record_result(&bracket, "ko-r1-m1", "a", 2, 0).unwrap();
    let bracket = record_result(&bracket, "ko-r1-m2", "d", 1, 2).unwrap();
    let bracket = record_result(&bracket, "ko-r2-m1", "a", 3, 1).unwrap();

    let rows = finalize_rankings(&bracket, &entrants);
    let ranks = rows.iter().map(|r| (r.entrant.id.as_str(), r.rank)).collect::<Vec<_>>();
    assert_eq!(ranks, vec![("a", 1), ("d", 2), ("b", 3), ("c", 3)]);
    let deltas = rows
      .iter()
      .map(|r| i64::from(r.adjusted_seed) - i64::from(r.entrant.seed.unwrap()))
      .collect::<Vec<_>>();
    assert_eq!(deltas, vec![-5, -2, 0, 0]);
    assert_eq!(rows[0].placement, Placement::Champion);
    assert_eq!(rows[2].placement, Placement::Semifinalist);
    assert_eq!(rows[0].points, 100);
    assert_eq!(rows[1].points, 75);
  }

  #[test]
  fn group_finishers_get_fixed_tiers() {
    let (entrants, bracket) = two_group_cup();
    // Round one pairs a (1st group-1) with f (2nd group-2) and e with b.
    let bracket = record_result(&bracket, "ko-r1-m1", "a", 2, 0).unwrap();
    let bracket = record_result(&bracket, "ko-r1-m2", "e", 2, 1).unwrap();
    let bracket = record_result(&bracket, "ko-r2-m1", "a", 3, 2).unwrap();

    let rows = finalize_rankings(&bracket, &entrants);
    let order = rows.iter().map(|r| r.entrant.id.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["a", "e", "b", "f", "c", "g", "d", "h"]);

    assert_eq!(rank_of(&rows, "b").rank, 3);
    assert_eq!(rank_of(&rows, "f").rank, 3);
    let c = rank_of(&rows, "c");
    assert_eq!((c.rank, c.placement, c.points, c.adjusted_seed), (6, Placement::GroupThird, 3, 9));
    let h = rank_of(&rows, "h");
    assert_eq!((h.rank, h.placement, h.points, h.adjusted_seed), (7, Placement::GroupFourth, 0, 16));
    assert_eq!(rank_of(&rows, "a").adjusted_seed, 1);
  }

  #[test]
  fn undecided_finalists_share_the_trailing_knockout_tier() {
    let (entrants, bracket) = two_group_cup();
    let bracket = record_result(&bracket, "ko-r1-m1", "a", 2, 0).unwrap();
    let bracket = record_result(&bracket, "ko-r1-m2", "e", 2, 1).unwrap();

    let rows = finalize_rankings(&bracket, &entrants);
    let a = rank_of(&rows, "a");
    assert_eq!((a.rank, a.placement, a.points), (4, Placement::Qualified, 10));
    assert_eq!(rank_of(&rows, "e").rank, 4);
    assert_eq!(rank_of(&rows, "b").rank, 3);
  }

  #[test]
  fn group_only_tournament_ranks_by_points() {
    let entrants = vec![seeded("c", None), seeded("a", None), seeded("b", None), seeded("z", None)];
    let bracket = play_groups(generate_group_matches(&[Group {
      id: "group-1".to_string(),
      entrants: entrants[..3].to_vec(),
      availability: vec![],
    }]));
    let rows = finalize_rankings(&bracket, &entrants);
    let ranks = rows.iter().map(|r| (r.entrant.id.as_str(), r.rank, r.points)).collect::<Vec<_>>();
    assert_eq!(ranks, vec![("a", 1, 6), ("b", 2, 3), ("c", 3, 0), ("z", 4, 0)]);
    assert!(rows.iter().all(|r| r.placement == Placement::GroupStage));
    assert_eq!(rows[0].adjusted_seed, 1);
    assert_eq!(rows[3].adjusted_seed, 5);
  }

  #[test]
  fn participants_only_commit_touches_changed_seeds() {
    let rankings = vec![
      entry(&seeded("a", Some(6)), 1, 100, Placement::Champion),
      entry(&seeded("b", Some(4)), 2, 75, Placement::RunnerUp),
      entry(&seeded("c", Some(3)), 3, 50, Placement::Semifinalist),
    ];
    let roster = vec![seeded("a", Some(6)), seeded("b", Some(4)), seeded("c", Some(3)), seeded("x", Some(1))];
    let plan = plan_commit("t1", &rankings, &roster, SeedMergePolicy::ParticipantsOnly);

    assert_eq!(plan.display_order, vec!["a", "b", "c"]);
    assert_eq!(
      plan.seed_updates,
      vec![
        SeedUpdate { entrant_id: "a".to_string(), previous: Some(6), seed: 1 },
        SeedUpdate { entrant_id: "b".to_string(), previous: Some(4), seed: 2 },
      ]
    );
    assert_eq!(plan.rankings, rankings);
  }

  #[test]
  fn global_reorder_pushes_non_participants_below() {
    let rankings = vec![
      entry(&seeded("a", Some(4)), 1, 100, Placement::Champion),
      entry(&seeded("b", None), 2, 75, Placement::RunnerUp),
    ];
    let roster = vec![
      seeded("a", Some(4)),
      seeded("b", None),
      seeded("u", None),
      seeded("y", Some(9)),
      seeded("x", Some(1)),
    ];
    let plan = plan_commit("t1", &rankings, &roster, SeedMergePolicy::GlobalReorder);
    let seeds = plan
      .seed_updates
      .iter()
      .map(|u| (u.entrant_id.as_str(), u.seed))
      .collect::<Vec<_>>();
    assert_eq!(seeds, vec![("a", 1), ("b", 2), ("x", 3), ("y", 4), ("u", 5)]);
  }
}
