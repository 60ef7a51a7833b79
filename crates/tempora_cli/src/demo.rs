//! Company lifecycle walk-through: a company is created, grows, hires,
//! stabilizes and is dissolved.

use color_eyre::Result;
use serde_json::{json, Value};
use std::io::Write;
use tempora_core::Timestamp;
use tempora_log::{Event, Timeline};
use tempora_replay::{compute_diff, derive_snapshot, validate_timeline};

const CHECKPOINTS: [(&str, &str); 4] = [
    ("2024-02-01T00:00:00Z", "after creation"),
    ("2024-04-01T00:00:00Z", "after growth and hiring"),
    ("2024-07-01T00:00:00Z", "after stabilization"),
    ("2025-01-01T00:00:00Z", "after deletion"),
];

pub fn company_records() -> Vec<Value> {
    vec![
        json!({
            "id": "evt-001",
            "entity_id": "company-123",
            "event_type": "created",
            "timestamp": "2024-01-01T00:00:00Z",
            "payload": {"name": "Acme Corp", "status": "active", "founded": "2024-01-01"}
        }),
        json!({
            "id": "evt-002",
            "entity_id": "company-123",
            "event_type": "updated",
            "timestamp": "2024-03-15T10:30:00Z",
            "payload": {"status": "expanding", "employee_count": 10}
        }),
        json!({
            "id": "evt-003",
            "entity_id": "company-123",
            "event_type": "relationship_added",
            "timestamp": "2024-03-20T14:00:00Z",
            "payload": {
                "relationship_type": "employs",
                "target_entity": "person-456",
                "properties": {"role": "engineer", "start_date": "2024-03-20"}
            }
        }),
        json!({
            "id": "evt-004",
            "entity_id": "company-123",
            "event_type": "updated",
            "timestamp": "2024-06-01T09:00:00Z",
            "payload": {"status": "stable", "employee_count": 25}
        }),
        json!({
            "id": "evt-005",
            "entity_id": "company-123",
            "event_type": "deleted",
            "timestamp": "2024-12-31T23:59:59Z",
            "payload": {}
        }),
    ]
}

fn show(value: Option<&Value>) -> String {
    value.map_or_else(|| "(absent)".to_string(), Value::to_string)
}

pub fn run<W: Write>(out: &mut W) -> Result<()> {
    let records = company_records();
    let rule = "=".repeat(60);
    writeln!(out, "{rule}\nTEMPORA - Company Lifecycle\n{rule}")?;

    writeln!(out, "\n1. Validating event timeline...")?;
    let errors = validate_timeline(&records);
    if !errors.is_empty() {
        writeln!(out, "   Validation errors:")?;
        for error in errors {
            writeln!(out, "   - {error}")?;
        }
        return Ok(());
    }
    writeln!(out, "   Timeline is valid.")?;

    writeln!(out, "\n2. Building timeline...")?;
    let events = records.iter().map(Event::from_record).collect::<Result<Vec<_>, _>>()?;
    let timeline = Timeline::build(&events);
    writeln!(out, "   {} events in chronological order", timeline.len())?;

    writeln!(out, "\n3. Deriving snapshots at different points in time...")?;
    let mut snapshots = Vec::with_capacity(CHECKPOINTS.len());
    for (at, label) in CHECKPOINTS {
        let as_of = Timestamp::new(at);
        let snapshot = derive_snapshot(timeline.events(), &as_of)?;
        let seen = timeline.up_to(&as_of).len();
        writeln!(out, "\n   As of {at} ({label}, {seen} events):")?;
        writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
        snapshots.push(snapshot);
    }

    writeln!(out, "\n4. Computing diffs between snapshots...")?;
    for (pair, window) in CHECKPOINTS.windows(2).zip(snapshots.windows(2)) {
        let diff = compute_diff(window[0].as_ref(), window[1].as_ref());
        writeln!(out, "\n   Diff from {} to {}:", pair[0].0, pair[1].0)?;
        if diff.is_empty() {
            writeln!(out, "   No changes")?;
        }
        for change in &diff.changes {
            writeln!(
                out,
                "   - {}: {} -> {}",
                change.field,
                show(change.before.as_ref()),
                show(change.after.as_ref())
            )?;
        }
    }

    writeln!(out, "\n{rule}\nDone.")?;
    Ok(())
}
