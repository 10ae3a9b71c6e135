use crate::error::EngineError;
use crate::types::*;
use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  match env_default("TOURNAMENT_CONFIG") {
    Some(raw) => resolve_repo_path(&raw),
    None => repo_root().join("config.json"),
  }
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn parse_merge_policy(raw: &str) -> Option<SeedMergePolicy> {
  let key = raw.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
  match key.as_str() {
    "participantsonly" | "participants" => Some(SeedMergePolicy::ParticipantsOnly),
    "globalreorder" | "global" => Some(SeedMergePolicy::GlobalReorder),
    _ => None,
  }
}

pub fn apply_env_defaults(mut config: EngineConfig) -> EngineConfig {
  if config.data_dir.trim().is_empty() {
    if let Some(value) = env_default("TOURNAMENT_DATA_DIR") {
      config.data_dir = value;
    }
  }
  if config.logs_dir.trim().is_empty() {
    if let Some(value) = env_default("TOURNAMENT_LOGS_DIR") {
      config.logs_dir = value;
    }
  }
  if config.seed_merge_policy.is_none() {
    config.seed_merge_policy = env_default("TOURNAMENT_MERGE_POLICY").and_then(|raw| parse_merge_policy(&raw));
  }
  if config.demo.entrant_count.is_none() {
    config.demo.entrant_count = env_default("TOURNAMENT_DEMO_ENTRANTS").and_then(|raw| raw.parse().ok());
  }
  if config.demo.rng_seed.is_none() {
    config.demo.rng_seed = env_default("TOURNAMENT_DEMO_SEED").and_then(|raw| raw.parse().ok());
  }
  config
}

pub fn load_config_inner() -> Result<EngineConfig, EngineError> {
  load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig, EngineError> {
  if !path.is_file() {
    return Ok(apply_env_defaults(EngineConfig::default()));
  }
  let data = fs::read_to_string(path)
    .map_err(|e| EngineError::Config(format!("read config {}: {e}", path.display())))?;
  let config = serde_json::from_str::<EngineConfig>(&data)
    .map_err(|e| EngineError::Config(format!("parse config {}: {e}", path.display())))?;
  Ok(apply_env_defaults(config))
}

pub fn save_config_to(path: &Path, config: EngineConfig) -> Result<EngineConfig, EngineError> {
  let payload = serde_json::to_string_pretty(&config).map_err(|e| EngineError::Config(e.to_string()))?;
  fs::write(path, payload)
    .map_err(|e| EngineError::Config(format!("write config {}: {e}", path.display())))?;
  Ok(config)
}

pub fn data_dir(config: &EngineConfig) -> PathBuf {
  match config.data_dir.trim() {
    "" => repo_root().join("data"),
    raw => resolve_repo_path(raw),
  }
}

pub fn logs_dir(config: &EngineConfig) -> PathBuf {
  match config.logs_dir.trim() {
    "" => repo_root().join("logs"),
    raw => resolve_repo_path(raw),
  }
}

pub fn merge_policy(config: &EngineConfig) -> SeedMergePolicy {
  config.seed_merge_policy.unwrap_or_default()
}

pub fn demo_entrant_count(config: &EngineConfig) -> usize {
  config.demo.entrant_count.unwrap_or(DEFAULT_DEMO_ENTRANTS)
}

pub fn demo_rng_seed(config: &EngineConfig) -> u64 {
  config.demo.rng_seed.unwrap_or(DEFAULT_DEMO_SEED)
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  let quoted = value.len() >= 2
    && ((value.starts_with('"') && value.ends_with('"')) || (value.starts_with('\'') && value.ends_with('\'')));
  if quoted {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn log_env_warnings(config: &EngineConfig) {
  let mut warnings = Vec::new();

  if config.data_dir.trim().is_empty() {
    warnings.push(format!(
      "TOURNAMENT_DATA_DIR not set and no dataDir in config, using {}",
      data_dir(config).display()
    ));
  }
  if let Some(raw) = env_default("TOURNAMENT_MERGE_POLICY") {
    if parse_merge_policy(&raw).is_none() {
      warnings.push(format!("TOURNAMENT_MERGE_POLICY={raw} is not a known policy, using participantsOnly"));
    }
  }
  if demo_entrant_count(config) < MIN_ENTRANTS {
    warnings.push(format!(
      "demo entrant count {} is below {MIN_ENTRANTS}, the demo cup cannot start",
      demo_entrant_count(config)
    ));
  }
  if config.demo.tag_pool.is_empty() {
    warnings.push("demo tag pool is empty, every dummy entrant shares one empty availability".to_string());
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn env_lines_handle_quotes_comments_and_export() {
    assert_eq!(parse_env_line("# comment"), None);
    assert_eq!(parse_env_line("   "), None);
    assert_eq!(parse_env_line("=value"), None);
    assert_eq!(
      parse_env_line("export TOURNAMENT_DATA_DIR=\"/srv/cup data\""),
      Some(("TOURNAMENT_DATA_DIR".to_string(), "/srv/cup data".to_string()))
    );
    assert_eq!(
      parse_env_line("TOURNAMENT_DEMO_SEED=42 # fixed"),
      Some(("TOURNAMENT_DEMO_SEED".to_string(), "42".to_string()))
    );
    assert_eq!(
      parse_env_line("TOURNAMENT_MERGE_POLICY='global'"),
      Some(("TOURNAMENT_MERGE_POLICY".to_string(), "global".to_string()))
    );
  }

  #[test]
  fn merge_policy_names() {
    assert_eq!(parse_merge_policy("participantsOnly"), Some(SeedMergePolicy::ParticipantsOnly));
    assert_eq!(parse_merge_policy(" global-reorder "), Some(SeedMergePolicy::GlobalReorder));
    assert_eq!(parse_merge_policy("GLOBAL_REORDER"), Some(SeedMergePolicy::GlobalReorder));
    assert_eq!(parse_merge_policy("everyone"), None);
  }

  #[test]
  fn config_file_fields_and_fallbacks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
      &path,
      r#"{"dataDir":"/srv/cup","seedMergePolicy":"globalReorder","demo":{"entrantCount":9,"rngSeed":7}}"#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(data_dir(&config), PathBuf::from("/srv/cup"));
    assert_eq!(merge_policy(&config), SeedMergePolicy::GlobalReorder);
    assert_eq!(demo_entrant_count(&config), 9);
    assert_eq!(demo_rng_seed(&config), 7);
    assert_eq!(config.demo.tag_pool.len(), 5);

    let mut edited = config.clone();
    edited.logs_dir = "/srv/cup/logs".to_string();
    save_config_to(&path, edited.clone()).unwrap();
    assert_eq!(load_config_from(&path).unwrap(), edited);

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_config_from(&path), Err(EngineError::Config(msg)) if msg.starts_with("parse config")));
  }

  #[test]
  fn relative_dirs_resolve_under_the_repo() {
    let config = EngineConfig {
      data_dir: "var/cup".to_string(),
      ..EngineConfig::default()
    };
    assert_eq!(data_dir(&config), repo_root().join("var/cup"));
    assert!(logs_dir(&config).is_absolute());
  }
}
