use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::advance::advance;
use crate::error::{EngineError, LockReason};
use crate::groups::{form_groups, representative_tags};
use crate::knockout::build_knockout_bracket;
use crate::ranking::{finalize_rankings, plan_commit};
use crate::results::record_result;
use crate::round_robin::{add_late_entrant, generate_group_matches};
use crate::standings::{group_stage_complete, group_standings, qualified_entrants};
use crate::types::*;

/// One tournament document: its entrants, groups and the full bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub entrants: Vec<Entrant>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub bracket: Bracket,
    #[serde(default)]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub final_rankings: Vec<RankingEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Tournament {
    pub fn create(id: impl Into<String>, name: impl Into<String>, entrants: Vec<Entrant>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for entrant in &entrants {
            if !seen.insert(entrant.id.as_str()) {
                return Err(EngineError::DuplicateEntrant(entrant.id.clone()));
            }
        }
        let groups = form_groups(&entrants)?;
        let bracket = generate_group_matches(&groups);
        let now = Utc::now();
        let tournament = Tournament {
            id: id.into(),
            name: name.into(),
            entrants,
            groups,
            bracket,
            complete: false,
            final_rankings: Vec::new(),
            created_at: now,
            updated_at: now,
            finalized_at: None,
        };
        tracing::info!(
            tournament_id = %tournament.id,
            entrants = tournament.entrants.len(),
            groups = tournament.groups.len(),
            matches = tournament.bracket.len(),
            "created tournament"
        );
        Ok(tournament)
    }

    pub fn has_knockout(&self) -> bool {
        self.bracket.iter().any(Match::is_knockout)
    }

    /// Ranked tables for every group. Members without a single match, such
    /// as the only entrant of a one-member group, still get an empty row.
    pub fn standings(&self) -> Vec<GroupStandings> {
        let mut tables = group_standings(&self.bracket);
        for group in &self.groups {
            let idx = match tables.iter().position(|t| t.group_id == group.id) {
                Some(idx) => idx,
                None => {
                    tables.push(GroupStandings {
                        group_id: group.id.clone(),
                        standings: Vec::new(),
                    });
                    tables.len() - 1
                }
            };
            let table = &mut tables[idx];
            for member in &group.entrants {
                if !table.standings.iter().any(|row| row.entrant.id == member.id) {
                    table.standings.push(Standing::new(member.clone()));
                }
            }
        }
        tables
    }

    pub fn final_match(&self) -> Option<&Match> {
        let last_round = self.bracket.iter().filter(|m| m.is_knockout()).map(|m| m.round).max()?;
        self.bracket
            .iter()
            .find(|m| m.is_knockout() && m.round == last_round)
    }

    pub fn champion(&self) -> Option<&Entrant> {
        self.final_match().and_then(|m| m.state.winner())
    }

    /// The last match that decides the tournament has been played: the
    /// final, or every group match when there is no knockout.
    pub fn is_finals_complete(&self) -> bool {
        match self.final_match() {
            Some(m) => m.is_complete(),
            None => !self.bracket.is_empty() && group_stage_complete(&self.bracket),
        }
    }

    /// Seed the knockout from the group tables. Nothing is written when the
    /// bracket cannot be built.
    pub fn start_knockout(&mut self) -> Result<(), EngineError> {
        if self.complete {
            return Err(EngineError::NotReady("the tournament is already finalized".to_string()));
        }
        if self.has_knockout() {
            return Err(EngineError::NotReady("the knockout stage already exists".to_string()));
        }
        if !group_stage_complete(&self.bracket) {
            return Err(EngineError::NotReady("group matches are still being played".to_string()));
        }
        let qualified = qualified_entrants(&self.standings());
        let knockout = build_knockout_bracket(&qualified)?;
        let mut bracket = self.bracket.clone();
        bracket.extend(knockout);
        self.bracket = advance(&bracket);
        self.touch();
        Ok(())
    }

    pub fn record_result(&mut self, match_id: &str, winner_id: &str, points1: u32, points2: u32) -> Result<(), EngineError> {
        if self.complete {
            return Err(EngineError::MatchLocked {
                match_id: match_id.to_string(),
                reason: LockReason::TournamentFinalized,
            });
        }
        self.bracket = record_result(&self.bracket, match_id, winner_id, points1, points2)?;
        self.touch();
        Ok(())
    }

    pub fn add_late_entrant(&mut self, group_id: &str, entrant: Entrant) -> Result<(), EngineError> {
        if self.complete {
            return Err(EngineError::GroupLocked {
                group_id: group_id.to_string(),
                reason: LockReason::TournamentFinalized,
            });
        }
        self.bracket = add_late_entrant(&self.bracket, group_id, entrant.clone())?;
        if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
            group.entrants.push(entrant.clone());
            let cap = if group.entrants.len() >= MAX_GROUP_SIZE {
                FULL_GROUP_TAG_CAP
            } else {
                SMALL_GROUP_TAG_CAP
            };
            group.availability = representative_tags(&group.entrants, cap);
        }
        self.entrants.push(entrant);
        self.touch();
        Ok(())
    }

    pub fn finalize(&self) -> Result<Vec<RankingEntry>, EngineError> {
        if !self.is_finals_complete() {
            let what = if self.has_knockout() { "the final" } else { "the group stage" };
            return Err(EngineError::NotReady(format!("{what} has not been completed")));
        }
        Ok(finalize_rankings(&self.bracket, &self.entrants))
    }

    pub fn plan_commit(&self, roster: &[Entrant], policy: SeedMergePolicy) -> Result<CommitPlan, EngineError> {
        let rankings = self.finalize()?;
        Ok(plan_commit(&self.id, &rankings, roster, policy))
    }

    /// Marks the tournament complete with the committed rankings.
    pub fn apply_commit(&mut self, plan: &CommitPlan) {
        let now = Utc::now();
        self.complete = true;
        self.final_rankings = plan.rankings.clone();
        self.finalized_at = Some(now);
        self.updated_at = now;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
