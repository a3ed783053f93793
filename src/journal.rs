// Append-only JSONL journal, the durable source of truth for tasks

use crate::task::Task;
use eyre::{Context, Result};
use fs2::FileExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

/// Append one saved task to the journal
pub fn append_task(path: &Path, task: &Task) -> Result<()> {
    let json = serde_json::to_string(task).context("Failed to serialize task")?;
    append_line(path, &json)
}

/// Append a deletion marker for a task id
pub fn append_tombstone(path: &Path, id: i64, deleted_at: i64) -> Result<()> {
    let tombstone = serde_json::json!({
        "id": id,
        "deleted": true,
        "modification_date": deleted_at,
    });
    append_line(path, &tombstone.to_string())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open journal for appending")?;

    // Exclusive lock for the duration of the write; released on drop
    file.lock_exclusive().context("Failed to acquire journal lock")?;

    writeln!(file, "{}", line)?;
    file.sync_all()?;

    Ok(())
}

/// Read the journal, returning the latest entry per task id.
///
/// Entries are raw JSON values: live tasks or tombstones (`"deleted": true`).
/// For duplicate ids the entry with the highest modification date wins.
/// Unreadable or malformed lines are skipped with a warning.
pub fn read_latest(path: &Path) -> Result<HashMap<i64, Value>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file = File::open(path).context("Failed to open journal")?;
    let reader = BufReader::new(file);
    let mut entries: HashMap<i64, Value> = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let entry: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
                continue;
            }
        };

        let id = match entry.get("id").and_then(|v| v.as_i64()) {
            Some(id) => id,
            None => {
                warn!(file = ?path, line = line_num + 1, "Entry has no id, skipping");
                continue;
            }
        };

        let modified = modification_date(&entry);
        match entries.get(&id) {
            Some(existing) if modification_date(existing) > modified => {}
            _ => {
                entries.insert(id, entry);
            }
        }
    }

    info!(file = ?path, count = entries.len(), "Loaded latest entries from journal");

    Ok(entries)
}

fn modification_date(entry: &Value) -> i64 {
    entry
        .get("modification_date")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

pub fn is_tombstone(entry: &Value) -> bool {
    entry.get("deleted").and_then(|v| v.as_bool()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn task_with(id: i64, title: &str, modification_date: i64) -> Task {
        let mut task = Task::new();
        task.id = id;
        task.title = Some(title.to_string());
        task.modification_date = modification_date;
        task
    }

    #[test]
    fn test_append_task() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");

        append_task(&path, &task_with(1, "Buy milk", 1000)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"id\":1"));
        assert!(content.contains("\"title\":\"Buy milk\""));
    }

    #[test]
    fn test_read_latest_picks_newest_version() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");

        append_task(&path, &task_with(1, "Version 1", 1000)).unwrap();
        append_task(&path, &task_with(1, "Version 2", 2000)).unwrap();

        let entries = read_latest(&path).unwrap();
        assert_eq!(entries.len(), 1);
        let latest = entries.get(&1).unwrap();
        assert_eq!(latest.get("title").and_then(|v| v.as_str()), Some("Version 2"));
    }

    #[test]
    fn test_read_latest_nonexistent_file() {
        let temp = TempDir::new().unwrap();
        let entries = read_latest(&temp.path().join("missing.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_tombstone_shadows_earlier_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");

        append_task(&path, &task_with(1, "Doomed", 1000)).unwrap();
        append_tombstone(&path, 1, 2000).unwrap();

        let entries = read_latest(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(is_tombstone(entries.get(&1).unwrap()));
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");

        fs::write(
            &path,
            "{\"id\":1,\"title\":\"Valid\",\"modification_date\":1000}\n{malformed json}\n{\"id\":2,\"title\":\"Also valid\",\"modification_date\":1000}\n",
        )
        .unwrap();

        let entries = read_latest(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains_key(&1));
        assert!(entries.contains_key(&2));
    }
}
