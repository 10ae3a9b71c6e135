use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::error::EngineError;
use crate::tournament::Tournament;
use crate::types::*;

/// Durable home for tournaments and the global player roster.
///
/// `commit` is the only write that touches both at once and must land as a
/// unit: the tournament is marked complete with its rankings and every seed
/// update is applied to the roster, or nothing changes.
pub trait TournamentStore {
    fn load_tournament(&self, id: &str) -> Result<Tournament, EngineError>;
    fn save_tournament(&mut self, tournament: &Tournament) -> Result<(), EngineError>;
    fn load_roster(&self) -> Result<Vec<Entrant>, EngineError>;
    fn save_roster(&mut self, roster: &[Entrant]) -> Result<(), EngineError>;
    fn commit(&mut self, plan: &CommitPlan) -> Result<(), EngineError>;
}

/// Writes the new seeds into the roster. Participants missing from the
/// roster are added from the ranking entry.
pub fn apply_seed_updates(roster: &mut Vec<Entrant>, plan: &CommitPlan) {
    for update in &plan.seed_updates {
        if let Some(player) = roster.iter_mut().find(|p| p.id == update.entrant_id) {
            player.seed = Some(update.seed);
            continue;
        }
        if let Some(ranked) = plan.rankings.iter().find(|r| r.entrant.id == update.entrant_id) {
            let mut player = ranked.entrant.clone();
            player.seed = Some(update.seed);
            roster.push(player);
        }
    }
}

fn log_commit(plan: &CommitPlan) {
    tracing::info!(
        tournament_id = %plan.tournament_id,
        rankings = plan.rankings.len(),
        seed_updates = plan.seed_updates.len(),
        "committed tournament results"
    );
}

// ── In-memory ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tournaments: HashMap<String, Tournament>,
    roster: Vec<Entrant>,
}

impl MemoryStore {
    pub fn new(roster: Vec<Entrant>) -> Self {
        MemoryStore {
            tournaments: HashMap::new(),
            roster,
        }
    }
}

impl TournamentStore for MemoryStore {
    fn load_tournament(&self, id: &str) -> Result<Tournament, EngineError> {
        self.tournaments
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::Store(format!("tournament {id} not found")))
    }

    fn save_tournament(&mut self, tournament: &Tournament) -> Result<(), EngineError> {
        self.tournaments.insert(tournament.id.clone(), tournament.clone());
        Ok(())
    }

    fn load_roster(&self) -> Result<Vec<Entrant>, EngineError> {
        Ok(self.roster.clone())
    }

    fn save_roster(&mut self, roster: &[Entrant]) -> Result<(), EngineError> {
        self.roster = roster.to_vec();
        Ok(())
    }

    fn commit(&mut self, plan: &CommitPlan) -> Result<(), EngineError> {
        let mut tournament = self.load_tournament(&plan.tournament_id)?;
        let mut roster = self.roster.clone();
        tournament.apply_commit(plan);
        apply_seed_updates(&mut roster, plan);
        self.tournaments.insert(tournament.id.clone(), tournament);
        self.roster = roster;
        log_commit(plan);
        Ok(())
    }
}

// ── JSON files ─────────────────────────────────────────────────────────

/// `<root>/tournaments/<id>.json` plus `<root>/players.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonFileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tournaments_dir(&self) -> PathBuf {
        self.root.join("tournaments")
    }

    fn tournament_path(&self, id: &str) -> PathBuf {
        self.tournaments_dir().join(format!("{id}.json"))
    }

    fn roster_path(&self) -> PathBuf {
        self.root.join("players.json")
    }

    /// Ids of every stored tournament, sorted.
    pub fn list_tournaments(&self) -> Result<Vec<String>, EngineError> {
        let dir = self.tournaments_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| store_err("list tournaments", &dir, e))?;
        let mut ids = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().to_string()))
            .collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }
}

fn store_err(action: &str, path: &Path, err: impl std::fmt::Display) -> EngineError {
    EngineError::Store(format!("{action} {}: {err}", path.display()))
}

fn read_json<T: DeserializeOwned>(label: &str, path: &Path) -> Result<T, EngineError> {
    let data = fs::read_to_string(path).map_err(|e| store_err(&format!("read {label}"), path, e))?;
    serde_json::from_str::<T>(&data).map_err(|e| store_err(&format!("parse {label}"), path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `value` next to `path` and returns the staged file.
fn stage_json<T: Serialize>(label: &str, path: &Path, value: &T) -> Result<PathBuf, EngineError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| store_err(&format!("create {label} dir"), dir, e))?;
    }
    let payload = serde_json::to_string_pretty(value).map_err(|e| store_err(&format!("encode {label}"), path, e))?;
    let staged = tmp_path(path);
    fs::write(&staged, payload).map_err(|e| store_err(&format!("write {label}"), &staged, e))?;
    Ok(staged)
}

fn publish(staged: &Path, path: &Path) -> Result<(), EngineError> {
    fs::rename(staged, path).map_err(|e| store_err("publish", path, e))
}

fn write_json<T: Serialize>(label: &str, path: &Path, value: &T) -> Result<(), EngineError> {
    let staged = stage_json(label, path, value)?;
    publish(&staged, path)
}

impl TournamentStore for JsonFileStore {
    fn load_tournament(&self, id: &str) -> Result<Tournament, EngineError> {
        read_json("tournament", &self.tournament_path(id))
    }

    fn save_tournament(&mut self, tournament: &Tournament) -> Result<(), EngineError> {
        write_json("tournament", &self.tournament_path(&tournament.id), tournament)
    }

    fn load_roster(&self) -> Result<Vec<Entrant>, EngineError> {
        let path = self.roster_path();
        if !path.is_file() {
            return Ok(Vec::new());
        }
        read_json("roster", &path)
    }

    fn save_roster(&mut self, roster: &[Entrant]) -> Result<(), EngineError> {
        write_json("roster", &self.roster_path(), &roster)
    }

    fn commit(&mut self, plan: &CommitPlan) -> Result<(), EngineError> {
        let mut tournament = self.load_tournament(&plan.tournament_id)?;
        let mut roster = self.load_roster()?;
        tournament.apply_commit(plan);
        apply_seed_updates(&mut roster, plan);

        let tournament_path = self.tournament_path(&tournament.id);
        let roster_path = self.roster_path();
        let previous = fs::read(&tournament_path).map_err(|e| store_err("read tournament", &tournament_path, e))?;
        let staged_tournament = stage_json("tournament", &tournament_path, &tournament)?;
        let staged_roster = match stage_json("roster", &roster_path, &roster) {
            Ok(staged) => staged,
            Err(err) => {
                let _ = fs::remove_file(&staged_tournament);
                return Err(err);
            }
        };
        if let Err(err) = publish(&staged_tournament, &tournament_path) {
            let _ = fs::remove_file(&staged_tournament);
            let _ = fs::remove_file(&staged_roster);
            return Err(err);
        }
        if let Err(err) = publish(&staged_roster, &roster_path) {
            let _ = fs::remove_file(&staged_roster);
            if let Err(restore) = fs::write(&tournament_path, &previous) {
                tracing::error!(path = %tournament_path.display(), "restore tournament after failed commit: {restore}");
            }
            return Err(err);
        }
        log_commit(plan);
        Ok(())
    }
}
