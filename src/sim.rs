use crate::error::EngineError;
use crate::tournament::Tournament;
use crate::types::*;

const SEED_CHANCE: f64 = 0.4;
const MAX_DUMMY_SEED: u32 = 8;
const UNSEEDED_WEIGHT_SEED: u32 = 999;
const GROUP_FIRST_TO: u32 = 2;
const KNOCKOUT_FIRST_TO: u32 = 3;
const SAFETY_LIMIT: usize = 10_000;

#[derive(Clone, Debug)]
struct SimRng {
  state: u64,
}

impl SimRng {
  fn new(seed: u64) -> Self {
    let mut state = seed;
    if state == 0 {
      state = 0x9E37_79B9_7F4A_7C15;
    }
    SimRng { state }
  }

  fn next_u64(&mut self) -> u64 {
    let mut x = self.state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    self.state = x;
    x
  }

  fn next_f64(&mut self) -> f64 {
    let v = self.next_u64() >> 11;
    (v as f64) / ((1u64 << 53) as f64)
  }

  fn gen_range_u32(&mut self, min: u32, max_inclusive: u32) -> u32 {
    if max_inclusive <= min {
      return min;
    }
    let span = (max_inclusive - min + 1) as u64;
    min + (self.next_u64() % span) as u32
  }
}

/// Plays whole tournaments with seed-weighted random winners. The same rng
/// seed always produces the same cup.
pub struct CupSimulator {
  rng: SimRng,
}

impl CupSimulator {
  pub fn new(seed: u64) -> Self {
    CupSimulator { rng: SimRng::new(seed) }
  }

  /// `Player N` entrants: four in ten get a seed from 1 to 8, everyone gets
  /// one to three distinct days from `tag_pool`.
  pub fn dummy_entrants(&mut self, count: usize, tag_pool: &[String]) -> Vec<Entrant> {
    (1..=count)
      .map(|n| {
        let seed = (self.rng.next_f64() < SEED_CHANCE).then(|| self.rng.gen_range_u32(1, MAX_DUMMY_SEED));
        let mut pool = tag_pool.to_vec();
        let wanted = self.rng.gen_range_u32(1, 3) as usize;
        let mut tags = Vec::new();
        while tags.len() < wanted && !pool.is_empty() {
          let idx = self.rng.gen_range_u32(0, pool.len() as u32 - 1) as usize;
          tags.push(pool.remove(idx));
        }
        Entrant::new(format!("player-{n}"), format!("Player {n}"), tags, seed)
      })
      .collect()
  }

  fn pick_winner(&mut self, a: &Entrant, b: &Entrant) -> usize {
    let seed_a = a.seed().unwrap_or(UNSEEDED_WEIGHT_SEED);
    let seed_b = b.seed().unwrap_or(UNSEEDED_WEIGHT_SEED);
    let weight_a = 1.0 / seed_a as f64;
    let weight_b = 1.0 / seed_b as f64;
    let roll = self.rng.next_f64() * (weight_a + weight_b);
    if roll < weight_a { 0 } else { 1 }
  }

  fn score(&mut self, first_to: u32, winner: usize) -> (u32, u32) {
    let loser_score = self.rng.gen_range_u32(0, first_to - 1);
    if winner == 0 {
      (first_to, loser_score)
    } else {
      (loser_score, first_to)
    }
  }

  /// Plays every ready match of one stage, including knockout matches that
  /// become ready along the way. Returns how many were played.
  pub fn play_stage(&mut self, tournament: &mut Tournament, stage: Stage) -> Result<usize, EngineError> {
    let first_to = match stage {
      Stage::Group => GROUP_FIRST_TO,
      Stage::Knockout => KNOCKOUT_FIRST_TO,
    };
    let mut played = 0usize;
    loop {
      if played > SAFETY_LIMIT {
        return Err(EngineError::NotReady("simulation exceeded safety limit".to_string()));
      }
      let next = tournament
        .bracket
        .iter()
        .filter(|m| m.stage == stage)
        .find_map(|m| match &m.state {
          MatchState::Pending { player1, player2 } => {
            Some((m.id_str().to_string(), player1.clone(), player2.clone()))
          }
          _ => None,
        });
      let Some((match_id, player1, player2)) = next else {
        break;
      };

      let winner = self.pick_winner(&player1, &player2);
      let (points1, points2) = self.score(first_to, winner);
      let winner_id = if winner == 0 { &player1.id } else { &player2.id };
      tournament.record_result(&match_id, winner_id, points1, points2)?;
      played += 1;
    }
    tracing::debug!(tournament_id = %tournament.id, ?stage, played, "simulated stage");
    Ok(played)
  }

  /// Group stage, knockout, everything up to a decided final.
  pub fn run(&mut self, tournament: &mut Tournament) -> Result<(), EngineError> {
    self.play_stage(tournament, Stage::Group)?;
    if !tournament.has_knockout() {
      tournament.start_knockout()?;
    }
    self.play_stage(tournament, Stage::Knockout)?;
    if !tournament.is_finals_complete() {
      return Err(EngineError::NotReady("the simulated final was never decided".to_string()));
    }
    tracing::info!(
      tournament_id = %tournament.id,
      champion = tournament.champion().map(|e| e.name.as_str()).unwrap_or(""),
      "simulated tournament"
    );
    Ok(())
  }
}
