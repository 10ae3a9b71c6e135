use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Constants ──────────────────────────────────────────────────────────

pub const MIN_ENTRANTS: usize = 2;
pub const MAX_GROUP_SIZE: usize = 4;
pub const QUALIFIERS_PER_GROUP: usize = 2;
pub const WIN_POINTS: u32 = 3;
pub const BYE_POINTS: u32 = 1;
pub const MAX_ADVANCE_PASSES: usize = 1000;
pub const FULL_GROUP_TAG_CAP: usize = 3;
pub const SMALL_GROUP_TAG_CAP: usize = 2;
pub const GROUP_THIRD_RANK: u32 = 6;
pub const GROUP_FOURTH_RANK: u32 = 7;

pub type Bracket = Vec<Match>;

// ── Entrants ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrant {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "officeDays")]
    pub availability: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

impl Entrant {
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, tags: I, seed: Option<u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Entrant {
            id: id.into(),
            name: name.into(),
            availability: tags.into_iter().map(Into::into).collect(),
            seed,
        }
    }

    /// Seed, treating zero as unseeded.
    pub fn seed(&self) -> Option<u32> {
        self.seed.filter(|seed| *seed > 0)
    }

    /// Sort key used for grouping and pairing: unseeded entrants land
    /// just below the field (`total + 1`).
    pub fn rank_key(&self, total: usize) -> u32 {
        self.seed().unwrap_or(total as u32 + 1)
    }

    pub fn overlap(&self, other: &Entrant) -> usize {
        self.availability.intersection(&other.availability).count()
    }
}

// ── Matches ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Group,
    Knockout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Player1,
    Player2,
}

/// Where a knockout entrant came from, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOrigin {
    pub group_id: String,
    pub place: u8,
}

/// Every shape a match can be in. `Open` covers knockout slots that are
/// still waiting on feeders (either slot may be empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MatchState {
    Open {
        #[serde(default)]
        player1: Option<Entrant>,
        #[serde(default)]
        player2: Option<Entrant>,
    },
    Pending {
        player1: Entrant,
        player2: Entrant,
    },
    Bye {
        player: Entrant,
        points: u32,
    },
    Completed {
        player1: Entrant,
        player2: Entrant,
        winner: Side,
        points: [u32; 2],
    },
}

impl Default for MatchState {
    fn default() -> Self {
        MatchState::Open { player1: None, player2: None }
    }
}

impl MatchState {
    pub fn from_slots(player1: Option<Entrant>, player2: Option<Entrant>) -> Self {
        match (player1, player2) {
            (Some(player1), Some(player2)) => MatchState::Pending { player1, player2 },
            (player1, player2) => MatchState::Open { player1, player2 },
        }
    }

    pub fn slots(&self) -> [Option<&Entrant>; 2] {
        match self {
            MatchState::Open { player1, player2 } => [player1.as_ref(), player2.as_ref()],
            MatchState::Pending { player1, player2 } | MatchState::Completed { player1, player2, .. } => {
                [Some(player1), Some(player2)]
            }
            MatchState::Bye { player, .. } => [Some(player), None],
        }
    }

    pub fn into_slots(self) -> [Option<Entrant>; 2] {
        match self {
            MatchState::Open { player1, player2 } => [player1, player2],
            MatchState::Pending { player1, player2 } | MatchState::Completed { player1, player2, .. } => {
                [Some(player1), Some(player2)]
            }
            MatchState::Bye { player, .. } => [Some(player), None],
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, MatchState::Bye { .. } | MatchState::Completed { .. })
    }

    pub fn winner(&self) -> Option<&Entrant> {
        match self {
            MatchState::Bye { player, .. } => Some(player),
            MatchState::Completed { player1, player2, winner, .. } => match winner {
                Side::Player1 => Some(player1),
                Side::Player2 => Some(player2),
            },
            _ => None,
        }
    }

    pub fn loser(&self) -> Option<&Entrant> {
        match self {
            MatchState::Completed { player1, player2, winner, .. } => match winner {
                Side::Player1 => Some(player2),
                Side::Player2 => Some(player1),
            },
            _ => None,
        }
    }

    pub fn points(&self) -> [u32; 2] {
        match self {
            MatchState::Bye { points, .. } => [*points, 0],
            MatchState::Completed { points, .. } => *points,
            _ => [0, 0],
        }
    }

    /// Clears every slot holding `entrant_id` and drops completion.
    pub fn without(self, entrant_id: &str) -> Self {
        let [player1, player2] = self.into_slots();
        let keep = |slot: Option<Entrant>| slot.filter(|e| e.id != entrant_id);
        MatchState::from_slots(keep(player1), keep(player2))
    }

    /// Swaps `old_id` for `replacement` wherever it is seated and drops completion.
    pub fn replace(self, old_id: &str, replacement: &Entrant) -> Self {
        let [player1, player2] = self.into_slots();
        let swap = |slot: Option<Entrant>| match slot {
            Some(e) if e.id == old_id => Some(replacement.clone()),
            other => other,
        };
        MatchState::from_slots(swap(player1), swap(player2))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub stage: Stage,
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub future_match_id: Option<String>,
    #[serde(default)]
    pub state: MatchState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player1_origin: Option<GroupOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2_origin: Option<GroupOrigin>,
}

impl Match {
    pub fn group(id: String, group_id: &str, player1: Entrant, player2: Entrant) -> Self {
        Match {
            id: Some(id),
            stage: Stage::Group,
            round: 1,
            group_id: Some(group_id.to_string()),
            future_match_id: None,
            state: MatchState::Pending { player1, player2 },
            player1_origin: None,
            player2_origin: None,
        }
    }

    pub fn knockout(id: String, round: u32) -> Self {
        Match {
            id: Some(id),
            stage: Stage::Knockout,
            round,
            group_id: None,
            future_match_id: None,
            state: MatchState::default(),
            player1_origin: None,
            player2_origin: None,
        }
    }

    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    pub fn is_knockout(&self) -> bool {
        self.stage == Stage::Knockout
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn contains(&self, entrant_id: &str) -> bool {
        self.state.slots().iter().flatten().any(|e| e.id == entrant_id)
    }

    pub fn entrant_ids(&self) -> Vec<&str> {
        self.state.slots().into_iter().flatten().map(|e| e.id.as_str()).collect()
    }

    pub fn winner_id(&self) -> Option<&str> {
        self.state.winner().map(|e| e.id.as_str())
    }

    pub fn loser_id(&self) -> Option<&str> {
        self.state.loser().map(|e| e.id.as_str())
    }

    pub fn is_bye(&self) -> bool {
        matches!(self.state, MatchState::Bye { .. })
    }
}

// ── Groups and standings ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub entrants: Vec<Entrant>,
    pub availability: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub entrant: Entrant,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
}

impl Standing {
    pub fn new(entrant: Entrant) -> Self {
        Standing { entrant, wins: 0, losses: 0, points: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStandings {
    pub group_id: String,
    pub standings: Vec<Standing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualifier {
    pub entrant: Entrant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<GroupOrigin>,
}

// ── Rankings and commit ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "round", rename_all = "camelCase")]
pub enum Placement {
    Champion,
    RunnerUp,
    Semifinalist,
    EliminatedInRound(u32),
    Qualified,
    GroupThird,
    GroupFourth,
    GroupStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub entrant: Entrant,
    pub rank: u32,
    pub points: u32,
    pub adjusted_seed: u32,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedMergePolicy {
    /// Only tournament entrants get new seeds (their adjusted seed).
    #[default]
    ParticipantsOnly,
    /// Participants take seeds 1..n in finishing order, everyone else is
    /// pushed below them keeping their relative order.
    GlobalReorder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUpdate {
    pub entrant_id: String,
    pub previous: Option<u32>,
    pub seed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPlan {
    pub tournament_id: String,
    pub rankings: Vec<RankingEntry>,
    pub display_order: Vec<String>,
    pub seed_updates: Vec<SeedUpdate>,
}

// ── Config types ───────────────────────────────────────────────────────

pub const DEFAULT_DEMO_ENTRANTS: usize = 15;
pub const DEFAULT_DEMO_SEED: u64 = 0x5EED_CAFE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub data_dir: String,
    pub logs_dir: String,
    pub seed_merge_policy: Option<SeedMergePolicy>,
    pub demo: DemoConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            logs_dir: String::new(),
            seed_merge_policy: None,
            demo: DemoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DemoConfig {
    pub entrant_count: Option<usize>,
    pub rng_seed: Option<u64>,
    pub tag_pool: Vec<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            entrant_count: None,
            rng_seed: None,
            tag_pool: ["Mon", "Tue", "Wed", "Thu", "Fri"].iter().map(|d| d.to_string()).collect(),
        }
    }
}
