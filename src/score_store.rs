use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SessionOutcome, SessionSummary};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredScoreEntry {
    name: String,
    sessions: u64,
    victories: u64,
    #[serde(rename = "bestScore", alias = "best_score")]
    best_score: i32,
    #[serde(rename = "totalCaptures", alias = "total_captures")]
    total_captures: f64,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms")]
    updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScoreStoreFile {
    version: u8,
    players: HashMap<String, StoredScoreEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct ScoreStoreFileRaw {
    version: u8,
    players: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardEntry {
    pub name: String,
    pub sessions: u64,
    pub victories: u64,
    #[serde(rename = "winRate")]
    pub win_rate: f64,
    #[serde(rename = "avgCaptures")]
    pub avg_captures: f64,
    #[serde(rename = "bestScore")]
    pub best_score: i32,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<ScoreboardEntry>,
}

/// JSON-file-backed best-result table, one entry per player name. Every
/// I/O failure degrades to an empty table or a skipped write; nothing here
/// can take the server down.
pub struct ScoreStore {
    file_path: PathBuf,
    players: HashMap<String, StoredScoreEntry>,
}

impl ScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let players = load_players(&file_path);
        Self { file_path, players }
    }

    /// Folds one finished session into the table. Sessions that never
    /// reached a terminal state are not recorded.
    pub fn record_session(&mut self, name: &str, summary: &SessionSummary) {
        if summary.outcome == SessionOutcome::Incomplete {
            return;
        }
        let key = score_key(name);
        if key.is_empty() {
            return;
        }
        let now_ms = now_ms();

        let entry = self.players.entry(key).or_insert_with(|| StoredScoreEntry {
            name: name.trim().to_string(),
            sessions: 0,
            victories: 0,
            best_score: 0,
            total_captures: 0.0,
            updated_at_ms: now_ms,
        });
        entry.name = name.trim().to_string();
        entry.sessions += 1;
        if summary.outcome == SessionOutcome::Victory {
            entry.victories += 1;
        }
        entry.best_score = entry.best_score.max(summary.score);
        entry.total_captures += summary.adversaries_captured as f64;
        entry.updated_at_ms = now_ms;

        self.save();
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> ScoreboardResponse {
        ScoreboardResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.get_top(requested_limit),
        }
    }

    fn get_top(&self, requested_limit: Option<usize>) -> Vec<ScoreboardEntry> {
        let normalized_limit = requested_limit.unwrap_or(10).clamp(1, 100);
        let mut entries: Vec<ScoreboardEntry> = self
            .players
            .values()
            .map(|entry| {
                let sessions = entry.sessions.max(1) as f64;
                ScoreboardEntry {
                    name: entry.name.clone(),
                    sessions: entry.sessions,
                    victories: entry.victories.min(entry.sessions),
                    win_rate: entry.victories as f64 / sessions,
                    avg_captures: entry.total_captures / sessions,
                    best_score: entry.best_score,
                    updated_at_ms: entry.updated_at_ms,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then_with(|| cmp_desc_f64(a.win_rate, b.win_rate))
                .then_with(|| cmp_desc_f64(a.avg_captures, b.avg_captures))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        entries.truncate(normalized_limit);
        entries
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                eprintln!(
                    "[score-store] failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }

        let payload = ScoreStoreFile {
            version: 1,
            players: self.players.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    eprintln!(
                        "[score-store] failed to write {}: {error}",
                        self.file_path.display()
                    );
                }
            }
            Err(error) => {
                eprintln!(
                    "[score-store] failed to serialize payload for {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }
}

fn cmp_desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn load_players(path: &Path) -> HashMap<String, StoredScoreEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                eprintln!("[score-store] failed to read {}: {error}", path.display());
            }
            return HashMap::new();
        }
    };
    let parsed: ScoreStoreFileRaw = match serde_json::from_str::<ScoreStoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            eprintln!(
                "[score-store] unsupported version {} at {}",
                value.version,
                path.display()
            );
            return HashMap::new();
        }
        Err(error) => {
            eprintln!("[score-store] failed to parse {}: {error}", path.display());
            return HashMap::new();
        }
    };

    let mut sanitized = HashMap::<String, StoredScoreEntry>::new();
    for (player_key, raw_value) in parsed.players {
        let value: StoredScoreEntry = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                eprintln!(
                    "[score-store] failed to parse player entry '{}' in {}: {error}",
                    player_key,
                    path.display()
                );
                continue;
            }
        };
        let Some(normalized) = sanitize_stored_entry(value) else {
            continue;
        };
        let key = score_key(&normalized.name);
        if key.is_empty() {
            continue;
        }

        match sanitized.get_mut(&key) {
            Some(current) => {
                current.name = normalized.name;
                current.sessions += normalized.sessions;
                current.victories += normalized.victories.min(normalized.sessions);
                current.best_score = current.best_score.max(normalized.best_score);
                current.total_captures += normalized.total_captures;
                current.updated_at_ms = current.updated_at_ms.max(normalized.updated_at_ms);
            }
            None => {
                sanitized.insert(key, normalized);
            }
        }
    }

    sanitized
}

fn sanitize_stored_entry(value: StoredScoreEntry) -> Option<StoredScoreEntry> {
    let normalized_name = value.name.trim().to_string();
    if normalized_name.is_empty() {
        return None;
    }
    if !value.total_captures.is_finite() || value.total_captures < 0.0 {
        return None;
    }
    Some(StoredScoreEntry {
        name: normalized_name,
        sessions: value.sessions,
        victories: value.victories.min(value.sessions),
        best_score: value.best_score.max(0),
        total_captures: value.total_captures,
        updated_at_ms: value.updated_at_ms,
    })
}

fn score_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_summary(outcome: SessionOutcome, score: i32, captures: i32) -> SessionSummary {
        SessionSummary {
            outcome,
            score,
            lives: 0,
            duration_ms: 60_000.0,
            collectibles_consumed: 100,
            adversaries_captured: captures,
            deaths: 3,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            now_ms().saturating_add(rand::random::<u32>() as u64)
        );
        std::env::temp_dir().join(unique).join("scores.json")
    }

    #[test]
    fn record_session_aggregates_completed_sessions() {
        let path = temp_file("score-store-record");
        let mut store = ScoreStore::new(path.clone());
        store.record_session("Alice", &make_summary(SessionOutcome::Victory, 2_500, 4));
        store.record_session("Alice", &make_summary(SessionOutcome::Defeat, 900, 1));
        store.record_session("Bob", &make_summary(SessionOutcome::Defeat, 1_200, 2));

        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 2);
        let alice = response
            .entries
            .iter()
            .find(|entry| entry.name == "Alice")
            .expect("alice exists");
        assert_eq!(alice.sessions, 2);
        assert_eq!(alice.victories, 1);
        assert_eq!(alice.best_score, 2_500);
        assert!((alice.avg_captures - 2.5).abs() < f64::EPSILON);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn incomplete_sessions_are_not_recorded() {
        let path = temp_file("score-store-incomplete");
        let mut store = ScoreStore::new(path.clone());
        store.record_session("Alice", &make_summary(SessionOutcome::Incomplete, 9_999, 0));

        assert!(store.build_response(Some(10)).entries.is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn entries_rank_by_best_score_first() {
        let path = temp_file("score-store-rank");
        let mut store = ScoreStore::new(path.clone());
        store.record_session("Low", &make_summary(SessionOutcome::Victory, 100, 0));
        store.record_session("High", &make_summary(SessionOutcome::Defeat, 3_000, 0));

        let response = store.build_response(Some(10));
        assert_eq!(response.entries[0].name, "High");
        assert_eq!(response.entries[1].name, "Low");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_merges_case_insensitive_names() {
        let path = temp_file("score-store-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "players": {
    "ALICE": {
      "name": "Alice",
      "sessions": 2,
      "victories": 1,
      "bestScore": 1200,
      "totalCaptures": 3.0,
      "updatedAtMs": 10
    },
    "alice_legacy": {
      "name": " alice ",
      "sessions": 1,
      "victories": 1,
      "bestScore": 800,
      "totalCaptures": 1.0,
      "updatedAtMs": 20
    }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = ScoreStore::new(path.clone());
        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 1);
        let entry = response.entries.first().expect("entry exists");
        assert_eq!(entry.name.to_lowercase(), "alice");
        assert_eq!(entry.sessions, 3);
        assert_eq!(entry.victories, 2);
        assert_eq!(entry.best_score, 1_200);

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn load_keeps_valid_entries_when_invalid_entries_exist() {
        let path = temp_file("score-store-partial-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "players": {
    "valid": {
      "name": "Alice",
      "sessions": 2,
      "victories": 1,
      "bestScore": 1200,
      "totalCaptures": 3.0,
      "updatedAtMs": 10
    },
    "invalid": {
      "name": "Broken",
      "sessions": -1
    }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = ScoreStore::new(path.clone());
        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].name, "Alice");

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn build_response_limits_range() {
        let path = temp_file("score-store-limit");
        let mut store = ScoreStore::new(path.clone());
        for idx in 0..3 {
            store.record_session(
                &format!("P{idx}"),
                &make_summary(SessionOutcome::Defeat, 100 * (idx + 1), 0),
            );
        }

        assert_eq!(store.build_response(Some(1)).entries.len(), 1);
        assert_eq!(store.build_response(Some(0)).entries.len(), 1);
        assert_eq!(store.build_response(Some(999)).entries.len(), 3);
        assert_eq!(store.build_response(None).entries.len(), 3);

        let _ = fs::remove_file(path);
    }
}
