use crate::error::EngineError;
use crate::types::*;

/// Partition entrants into round-robin groups of at most four.
///
/// Entrants are taken best rank first. Each new group is seeded with the
/// best remaining entrant and then filled with whoever shares the most
/// availability with the members already picked. When exactly five remain
/// the group closes at three, so the tail is always a group of two or three
/// and nobody is left over on their own.
pub fn form_groups(entrants: &[Entrant]) -> Result<Vec<Group>, EngineError> {
  if entrants.len() < MIN_ENTRANTS {
    return Err(EngineError::InsufficientEntrants {
      required: MIN_ENTRANTS,
      actual: entrants.len(),
    });
  }

  let total = entrants.len();
  let mut remaining = entrants.to_vec();
  remaining.sort_by_key(|e| e.rank_key(total));

  let mut formed: Vec<(Vec<Entrant>, usize)> = Vec::new();
  while remaining.len() >= MAX_GROUP_SIZE {
    let target = if remaining.len() == MAX_GROUP_SIZE + 1 {
      MAX_GROUP_SIZE - 1
    } else {
      MAX_GROUP_SIZE
    };
    let mut members = vec![remaining.remove(0)];
    while members.len() < target && !remaining.is_empty() {
      let pick = best_fit(&members, &remaining);
      members.push(remaining.remove(pick));
    }
    let cap = if members.len() == MAX_GROUP_SIZE {
      FULL_GROUP_TAG_CAP
    } else {
      SMALL_GROUP_TAG_CAP
    };
    formed.push((members, cap));
  }

  if !remaining.is_empty() {
    formed.push((remaining, SMALL_GROUP_TAG_CAP));
  }

  let groups = formed
    .into_iter()
    .enumerate()
    .map(|(idx, (members, cap))| Group {
      id: format!("group-{}", idx + 1),
      availability: representative_tags(&members, cap),
      entrants: members,
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    entrants = total,
    groups = groups.len(),
    "formed round robin groups"
  );
  Ok(groups)
}

/// Index of the candidate with the strictly greatest average overlap with
/// `members`; ties keep the earliest candidate.
fn best_fit(members: &[Entrant], candidates: &[Entrant]) -> usize {
  // Group size is fixed during one scan, so comparing totals orders the
  // same way as comparing averages.
  let mut best_idx = 0usize;
  let mut best_total: Option<usize> = None;
  for (idx, candidate) in candidates.iter().enumerate() {
    let total = members.iter().map(|m| candidate.overlap(m)).sum::<usize>();
    if best_total.map_or(true, |best| total > best) {
      best_idx = idx;
      best_total = Some(total);
    }
  }
  best_idx
}

/// Tags shared by every member, or the `cap` most frequent tags when the
/// members have nothing in common.
pub fn representative_tags(members: &[Entrant], cap: usize) -> Vec<String> {
  let Some(first) = members.first() else {
    return Vec::new();
  };
  let common = first
    .availability
    .iter()
    .filter(|tag| members.iter().all(|m| m.availability.contains(*tag)))
    .cloned()
    .collect::<Vec<_>>();
  if !common.is_empty() {
    return common;
  }

  let mut counts: Vec<(String, usize)> = Vec::new();
  for member in members {
    for tag in &member.availability {
      match counts.iter_mut().find(|(seen, _)| seen == tag) {
        Some((_, count)) => *count += 1,
        None => counts.push((tag.clone(), 1)),
      }
    }
  }
  counts.sort_by(|a, b| b.1.cmp(&a.1));
  counts.into_iter().take(cap).map(|(tag, _)| tag).collect()
}
