//! Subcommand implementations. Each writes its report to `out`.

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempora_core::{EventId, Timestamp};
use tempora_log::{build_timeline, partition_by_entity, Event, LogFormat, LogReader, LogWriter};
use tempora_replay::{compute_diff, derive_history, derive_snapshot, validate_timeline, Snapshot};

/// One line of `tempora history`
#[derive(Debug, Serialize)]
struct HistoryEntry {
    event_id: EventId,
    timestamp: Timestamp,
    digest: String,
    snapshot: Snapshot,
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let events = LogReader::open(path)
        .and_then(LogReader::read_events)
        .wrap_err_with(|| format!("failed to read log {}", path.display()))?;
    tracing::debug!(path = %path.display(), events = events.len(), "loaded log");
    Ok(events)
}

/// Events of one entity. Without `entity` the log must hold at most one.
fn select_entity(events: &[Event], entity: Option<&str>) -> Result<Vec<Event>> {
    let mut partitions = partition_by_entity(events);
    match entity {
        Some(id) => match partitions.shift_remove(id) {
            Some(events) => Ok(events),
            None => bail!("entity {id} has no events in this log"),
        },
        None if partitions.len() > 1 => {
            bail!("log holds {} entities; choose one with --entity", partitions.len())
        }
        None => Ok(partitions.into_values().next().unwrap_or_default()),
    }
}

fn parse_time(raw: &str) -> Result<Timestamp> {
    Timestamp::parse(raw).wrap_err_with(|| format!("invalid point in time {raw:?}"))
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn validate<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    let records = LogReader::open(path)
        .and_then(LogReader::read_records)
        .wrap_err_with(|| format!("failed to read log {}", path.display()))?;

    // Records are grouped by their raw entity_id so a malformed record still
    // lands somewhere and gets its schema errors reported.
    let mut groups: IndexMap<&str, Vec<Value>> = IndexMap::new();
    for record in &records {
        let entity = record.get("entity_id").and_then(Value::as_str).unwrap_or("");
        groups.entry(entity).or_default().push(record.clone());
    }

    let mut failures = 0;
    for (entity, records) in &groups {
        for error in validate_timeline(records) {
            tracing::debug!(entity = %entity, event = error.event(), "validation failure");
            writeln!(out, "{error}")?;
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} validation error(s) in {}", path.display());
    }
    writeln!(out, "{} events across {} entities are valid", records.len(), groups.len())?;
    Ok(())
}

/// Ordered log to `output` (format from its extension), or JSON Lines to `out`
pub fn timeline<W: Write>(path: &Path, output: Option<&Path>, out: &mut W) -> Result<()> {
    let ordered = build_timeline(&read_events(path)?);
    match output {
        Some(target) => {
            let file = File::create(target)
                .wrap_err_with(|| format!("failed to create {}", target.display()))?;
            let mut writer = LogWriter::new(BufWriter::new(file), LogFormat::from_path(target));
            writer.write_events(&ordered)?;
            writer.flush()?;
            tracing::info!(path = %target.display(), events = ordered.len(), "wrote timeline");
        }
        None => {
            let mut writer = LogWriter::new(out, LogFormat::JsonLines);
            writer.write_events(&ordered)?;
            writer.flush()?;
        }
    }
    Ok(())
}

pub fn snapshot<W: Write>(path: &Path, as_of: &str, entity: Option<&str>, out: &mut W) -> Result<()> {
    let as_of = parse_time(as_of)?;
    let events = select_entity(&read_events(path)?, entity)?;
    let snapshot = derive_snapshot(&events, &as_of)?;
    tracing::info!(as_of = %as_of, exists = snapshot.is_some(), "derived snapshot");
    write_json(out, &snapshot)
}

pub fn diff<W: Write>(path: &Path, from: &str, to: &str, entity: Option<&str>, out: &mut W) -> Result<()> {
    let from = parse_time(from)?;
    let to = parse_time(to)?;
    if from > to {
        tracing::warn!(from = %from, to = %to, "diffing backwards in time");
    }
    let events = select_entity(&read_events(path)?, entity)?;
    let before = derive_snapshot(&events, &from)?;
    let after = derive_snapshot(&events, &to)?;
    let diff = compute_diff(before.as_ref(), after.as_ref());
    tracing::info!(changes = diff.changes.len(), "computed diff");
    write_json(out, &diff)
}

pub fn history<W: Write>(path: &Path, entity: Option<&str>, out: &mut W) -> Result<()> {
    let events = select_entity(&read_events(path)?, entity)?;
    for snapshot in derive_history(&events)? {
        let entry = HistoryEntry {
            event_id: snapshot.last_event_id.clone(),
            timestamp: snapshot.as_of.clone(),
            digest: snapshot.digest()?.to_hex(),
            snapshot,
        };
        serde_json::to_writer(&mut *out, &entry)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tempora_log::EventType;

    fn write_log(dir: &TempDir, events: &[Event]) -> std::path::PathBuf {
        let path = dir.path().join("log.jsonl");
        let mut writer = LogWriter::new(File::create(&path).unwrap(), LogFormat::JsonLines);
        writer.write_events(events).unwrap();
        writer.flush().unwrap();
        path
    }

    fn run<F>(f: F) -> (Result<()>, String)
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut out = Vec::new();
        let result = f(&mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn two_entities() -> Vec<Event> {
        vec![
            Event::new("a-2", "acme", EventType::Updated, "2024-02-01T00:00:00Z").with_field("status", json!("stable")),
            Event::new("b-1", "globex", EventType::Created, "2024-01-05T00:00:00Z").with_field("status", json!("new")),
            Event::new("a-1", "acme", EventType::Created, "2024-01-01T00:00:00Z").with_field("status", json!("active")),
        ]
    }

    #[test]
    fn test_validate_clean_log() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, output) = run(|out| validate(&path, out));
        result.unwrap();
        assert!(output.contains("3 events across 2 entities are valid"));
    }

    #[test]
    fn test_validate_reports_errors() {
        let dir = TempDir::new().unwrap();
        let mut events = two_entities();
        events.push(Event::new("a-0", "acme", EventType::Updated, "2023-12-01T00:00:00Z"));
        let path = write_log(&dir, &events);
        let (result, output) = run(|out| validate(&path, out));
        assert!(result.is_err());
        assert!(output.starts_with("Event a-0:"));
    }

    #[test]
    fn test_timeline_orders_log() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, output) = run(|out| timeline(&path, None, out));
        result.unwrap();
        let ids: Vec<String> = output
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a-1", "b-1", "a-2"]);
    }

    #[test]
    fn test_timeline_to_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let target = dir.path().join("ordered.json");
        let (result, output) = run(|out| timeline(&path, Some(target.as_path()), out));
        result.unwrap();
        assert!(output.is_empty());

        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.trim_start().starts_with('['));
        let events = LogReader::open(&target).unwrap().read_events().unwrap();
        assert_eq!(events, build_timeline(&two_entities()));
    }

    #[test]
    fn test_snapshot_requires_entity_for_mixed_log() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, _) = run(|out| snapshot(&path, "2024-03-01T00:00:00Z", None, out));
        assert!(result.is_err());

        let (result, output) = run(|out| snapshot(&path, "2024-03-01T00:00:00Z", Some("acme"), out));
        result.unwrap();
        let snap: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(snap["state"]["status"], json!("stable"));
        assert_eq!(snap["as_of"], json!("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_snapshot_rejects_bad_time() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, _) = run(|out| snapshot(&path, "yesterday", Some("acme"), out));
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_before_creation_is_null() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, output) = run(|out| snapshot(&path, "2023-01-01T00:00:00Z", Some("globex"), out));
        result.unwrap();
        assert_eq!(output.trim(), "null");
    }

    #[test]
    fn test_unknown_entity() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, _) = run(|out| history(&path, Some("initech"), out));
        assert!(result.is_err());
    }

    #[test]
    fn test_diff_command() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, output) = run(|out| {
            diff(&path, "2024-01-15T00:00:00Z", "2024-02-15T00:00:00Z", Some("acme"), out)
        });
        result.unwrap();
        let diff: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            diff["changes"],
            json!([{"field": "status", "before": "active", "after": "stable"}])
        );
    }

    #[test]
    fn test_history_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_log(&dir, &two_entities());
        let (result, output) = run(|out| history(&path, Some("acme"), out));
        result.unwrap();
        let entries: Vec<Value> = output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["event_id"], json!("a-1"));
        assert_eq!(entries[1]["snapshot"]["state"]["status"], json!("stable"));
        assert_eq!(entries[1]["digest"].as_str().map(str::len), Some(64));
    }
}
