use crate::types::*;

/// Tally wins, losses and points for one group straight from the bracket.
/// Rows come back in order of first appearance; use [`rank_standings`] for
/// qualification order.
pub fn compute_standings(matches: &[Match], group_id: &str) -> Vec<Standing> {
  let mut rows: Vec<Standing> = Vec::new();
  for m in matches {
    if m.stage != Stage::Group || m.group_id.as_deref() != Some(group_id) {
      continue;
    }
    for entrant in m.state.slots().into_iter().flatten() {
      if !rows.iter().any(|row| row.entrant.id == entrant.id) {
        rows.push(Standing::new(entrant.clone()));
      }
    }
    // Byes never count towards the table.
    let (Some(winner), Some(loser)) = (m.state.winner(), m.state.loser()) else {
      continue;
    };
    if let Some(row) = rows.iter_mut().find(|row| row.entrant.id == winner.id) {
      row.wins += 1;
      row.points += WIN_POINTS;
    }
    if let Some(row) = rows.iter_mut().find(|row| row.entrant.id == loser.id) {
      row.losses += 1;
    }
  }
  rows
}

/// Points first, then wins. Stable, so equal rows keep their appearance order.
pub fn rank_standings(mut standings: Vec<Standing>) -> Vec<Standing> {
  standings.sort_by(|a, b| b.points.cmp(&a.points).then(b.wins.cmp(&a.wins)));
  standings
}

/// Ranked standings for every group in the bracket, groups in order of first appearance.
pub fn group_standings(bracket: &[Match]) -> Vec<GroupStandings> {
  let mut group_ids: Vec<&str> = Vec::new();
  for m in bracket {
    if m.stage != Stage::Group {
      continue;
    }
    if let Some(group_id) = m.group_id.as_deref() {
      if !group_ids.contains(&group_id) {
        group_ids.push(group_id);
      }
    }
  }
  group_ids
    .into_iter()
    .map(|group_id| GroupStandings {
      group_id: group_id.to_string(),
      standings: rank_standings(compute_standings(bracket, group_id)),
    })
    .collect()
}

/// Top two of each group (or the lone member of a one-entrant group), with
/// the group and place they qualified from.
pub fn qualified_entrants(all: &[GroupStandings]) -> Vec<Qualifier> {
  let mut qualified = Vec::new();
  for group in all {
    let ranked = rank_standings(group.standings.clone());
    for (idx, standing) in ranked.into_iter().take(QUALIFIERS_PER_GROUP).enumerate() {
      qualified.push(Qualifier {
        entrant: standing.entrant,
        origin: Some(GroupOrigin {
          group_id: group.group_id.clone(),
          place: idx as u8 + 1,
        }),
      });
    }
  }
  qualified
}

/// Whether every group match has a result.
pub fn group_stage_complete(bracket: &[Match]) -> bool {
  bracket
    .iter()
    .filter(|m| m.stage == Stage::Group)
    .all(Match::is_complete)
}
