//! Explicit parsing of raw gateway rows
//!
//! The gateway hands back rows as raw JSON; nothing downstream trusts
//! their shape. Parsing here applies the defaulting rules:
//! - a missing or non-array list field normalizes to an empty list
//! - a missing title or note normalizes to an empty string
//! - an unknown owner or status string is a row error, never a panic

use crate::error::RowError;
use crate::types::{Task, TaskNote, Week};
use serde_json::Value;

/// Parse one `weeks` row
pub fn week_from_row(row: &Value) -> Result<Week, RowError> {
    serde_json::from_value(row.clone()).map_err(|e| RowError::malformed("weeks", e))
}

/// Parse a full `weeks` read
pub fn weeks_from_rows(rows: &[Value]) -> Result<Vec<Week>, RowError> {
    rows.iter().map(week_from_row).collect()
}

/// Parse one `tasks` row
pub fn task_from_row(row: &Value) -> Result<Task, RowError> {
    serde_json::from_value(row.clone()).map_err(|e| RowError::malformed("tasks", e))
}

/// Parse a full `tasks` read
pub fn tasks_from_rows(rows: &[Value]) -> Result<Vec<Task>, RowError> {
    rows.iter().map(task_from_row).collect()
}

/// Parse one `task_notes` row
pub fn note_from_row(row: &Value) -> Result<TaskNote, RowError> {
    serde_json::from_value(row.clone()).map_err(|e| RowError::malformed("task_notes", e))
}

/// Parse a full `task_notes` read
pub fn notes_from_rows(rows: &[Value]) -> Result<Vec<TaskNote>, RowError> {
    rows.iter().map(note_from_row).collect()
}

pub(crate) mod de {
    //! `deserialize_with` helpers for loosely-shaped rows

    use serde::de::{Deserialize, Deserializer, Error};
    use serde_json::Value;

    /// Accept an array of strings; normalize anything else to empty.
    pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(Error::custom(format!(
                        "expected string list item, got {other}"
                    ))),
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Owner, TaskStatus, WeekNumber};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn week_with_all_fields() {
        let row = json!({
            "week_number": 3,
            "title": "Launch prep",
            "objectives": ["ship"],
            "deliverables": ["demo"],
            "kpis": ["uptime"],
            "risks": ["scope creep"],
        });
        let week = week_from_row(&row).unwrap();
        assert_eq!(week.week_number, WeekNumber(3));
        assert_eq!(week.objectives, vec!["ship".to_string()]);
    }

    #[test]
    fn week_missing_lists_defaults_to_empty() {
        let row = json!({ "week_number": 1, "title": "Kickoff" });
        let week = week_from_row(&row).unwrap();
        assert!(week.objectives.is_empty());
        assert!(week.deliverables.is_empty());
        assert!(week.kpis.is_empty());
        assert!(week.risks.is_empty());
    }

    #[test]
    fn week_null_and_non_array_lists_default_to_empty() {
        let row = json!({
            "week_number": 2,
            "title": "",
            "objectives": null,
            "deliverables": "not a list",
            "kpis": 7,
            "risks": {},
        });
        let week = week_from_row(&row).unwrap();
        assert!(week.objectives.is_empty());
        assert!(week.deliverables.is_empty());
        assert!(week.kpis.is_empty());
        assert!(week.risks.is_empty());
    }

    #[test]
    fn week_list_with_non_string_item_is_malformed() {
        let row = json!({ "week_number": 2, "objectives": ["ok", 5] });
        let err = week_from_row(&row).unwrap_err();
        assert_eq!(err.table(), "weeks");
    }

    #[test]
    fn task_row_round_trip() {
        let row = json!({
            "id": "a9f6f3f4-52c8-4b41-a4a4-62d21b0b9a3c",
            "week_number": 3,
            "owner": "a",
            "description": "Call clinic",
            "status": "Pending",
            "created_at": "2026-01-05T09:30:00Z",
            "updated_at": "2026-01-05T09:30:00Z",
        });
        let task = task_from_row(&row).unwrap();
        assert_eq!(task.owner, Owner::A);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn task_unknown_status_is_malformed() {
        let row = json!({
            "id": "a9f6f3f4-52c8-4b41-a4a4-62d21b0b9a3c",
            "week_number": 3,
            "owner": "a",
            "description": "Call clinic",
            "status": "Done",
            "created_at": "2026-01-05T09:30:00Z",
            "updated_at": "2026-01-05T09:30:00Z",
        });
        let err = task_from_row(&row).unwrap_err();
        assert_eq!(err.table(), "tasks");
    }

    #[test]
    fn note_row_missing_text_defaults_to_empty() {
        let row = json!({
            "id": "0e2cf6b2-9f2e-4f8f-8c44-3f9f2f1c2d3e",
            "task_id": "a9f6f3f4-52c8-4b41-a4a4-62d21b0b9a3c",
            "owner": "b",
            "updated_at": "2026-01-05T10:00:00Z",
        });
        let note = note_from_row(&row).unwrap();
        assert_eq!(note.note, "");
        assert_eq!(note.owner, Owner::B);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        const LIST_FIELDS: [&str; 4] = ["objectives", "deliverables", "kpis", "risks"];

        proptest! {
            // Any subset of list fields present, any of them null: still a
            // valid week with every list materialized.
            #[test]
            fn week_parses_with_any_list_subset(present in proptest::collection::vec(any::<Option<bool>>(), 4)) {
                let mut row = serde_json::Map::new();
                row.insert("week_number".into(), json!(1));
                row.insert("title".into(), json!("t"));
                for (field, state) in LIST_FIELDS.iter().zip(&present) {
                    match state {
                        None => {}
                        Some(false) => { row.insert((*field).into(), json!(null)); }
                        Some(true) => { row.insert((*field).into(), json!(["x", "y"])); }
                    }
                }
                let week = week_from_row(&Value::Object(row)).unwrap();
                for (field, state) in LIST_FIELDS.iter().zip(&present) {
                    let list = match *field {
                        "objectives" => &week.objectives,
                        "deliverables" => &week.deliverables,
                        "kpis" => &week.kpis,
                        _ => &week.risks,
                    };
                    match state {
                        Some(true) => prop_assert_eq!(list.len(), 2),
                        _ => prop_assert!(list.is_empty()),
                    }
                }
            }
        }
    }
}
