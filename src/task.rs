// Task record: the fixed schema for one to-do item

use crate::preferences::Preferences;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel id for a record that has never been saved
pub const NO_ID: i64 = 0;

/// Named fields of the task schema, used for set-vs-unset queries
/// and the default-value mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    DueDate,
    HideUntil,
    CreationDate,
    CompletionDate,
    Importance,
}

impl std::fmt::Display for TaskField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskField::Title => "title",
            TaskField::DueDate => "due_date",
            TaskField::HideUntil => "hide_until",
            TaskField::CreationDate => "creation_date",
            TaskField::CompletionDate => "completion_date",
            TaskField::Importance => "importance",
        };
        write!(f, "{}", name)
    }
}

/// Priority of a task, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
    None,
}

impl Importance {
    pub fn as_i64(self) -> i64 {
        match self {
            Importance::High => 0,
            Importance::Medium => 1,
            Importance::Low => 2,
            Importance::None => 3,
        }
    }

    /// Out-of-range values clamp to the nearest priority
    pub fn from_i64(value: i64) -> Self {
        match value {
            i64::MIN..=0 => Importance::High,
            1 => Importance::Medium,
            2 => Importance::Low,
            _ => Importance::None,
        }
    }
}

/// Default value for one schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Timestamp(i64),
    Priority(Importance),
}

/// One to-do item
///
/// Optional fields stay unset until the caller assigns them or the store
/// populates them from the default-value mapping on save. Timestamps are
/// milliseconds since the Unix epoch; 0 means "no date" once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: i64,
    /// Remote identifier, assigned at first save
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub importance: Option<Importance>,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub hide_until: Option<i64>,
    #[serde(default)]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub completion_date: Option<i64>,
    /// Stamped on every save; orders journal replay
    #[serde(default)]
    pub modification_date: i64,
}

impl Task {
    /// A blank record: unset id, every optional field absent
    pub fn new() -> Self {
        Self {
            id: NO_ID,
            uuid: String::new(),
            title: None,
            importance: None,
            due_date: None,
            hide_until: None,
            creation_date: None,
            completion_date: None,
            modification_date: 0,
        }
    }

    /// Whether `field` has been explicitly set (as opposed to schema default)
    pub fn contains_value(&self, field: TaskField) -> bool {
        match field {
            TaskField::Title => self.title.is_some(),
            TaskField::DueDate => self.due_date.is_some(),
            TaskField::HideUntil => self.hide_until.is_some(),
            TaskField::CreationDate => self.creation_date.is_some(),
            TaskField::CompletionDate => self.completion_date.is_some(),
            TaskField::Importance => self.importance.is_some(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id != NO_ID
    }

    /// A task is completed iff its completion date is a real timestamp
    pub fn is_completed(&self) -> bool {
        self.completion_date.unwrap_or(0) > 0
    }

    /// Schema default for every field the caller may leave unset.
    ///
    /// Always contains entries for title, due date, hide-until, completion
    /// date, and importance. The creation date is never here: the store
    /// stamps it from the clock.
    pub fn default_values(preferences: &Preferences) -> HashMap<TaskField, FieldValue> {
        let mut defaults = HashMap::new();
        defaults.insert(TaskField::Title, FieldValue::Text(String::new()));
        defaults.insert(
            TaskField::DueDate,
            FieldValue::Timestamp(preferences.default_due_date),
        );
        defaults.insert(
            TaskField::HideUntil,
            FieldValue::Timestamp(preferences.default_hide_until),
        );
        defaults.insert(TaskField::CompletionDate, FieldValue::Timestamp(0));
        defaults.insert(
            TaskField::Importance,
            FieldValue::Priority(preferences.default_importance),
        );
        defaults
    }

    /// Fill every unset field from the default-value mapping.
    /// Fields the caller already set are left alone.
    pub fn apply_defaults(&mut self, defaults: &HashMap<TaskField, FieldValue>) {
        for (field, value) in defaults {
            if self.contains_value(*field) {
                continue;
            }
            match (field, value) {
                (TaskField::Title, FieldValue::Text(text)) => self.title = Some(text.clone()),
                (TaskField::DueDate, FieldValue::Timestamp(ts)) => self.due_date = Some(*ts),
                (TaskField::HideUntil, FieldValue::Timestamp(ts)) => self.hide_until = Some(*ts),
                (TaskField::CompletionDate, FieldValue::Timestamp(ts)) => {
                    self.completion_date = Some(*ts)
                }
                (TaskField::Importance, FieldValue::Priority(priority)) => {
                    self.importance = Some(*priority)
                }
                _ => {}
            }
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_has_no_creation_date() {
        assert!(!Task::new().contains_value(TaskField::CreationDate));
    }

    #[test]
    fn test_new_task_has_no_optional_fields() {
        let task = Task::new();
        assert_eq!(task.id, NO_ID);
        assert!(!task.is_saved());
        assert!(!task.contains_value(TaskField::Title));
        assert!(!task.contains_value(TaskField::DueDate));
        assert!(!task.contains_value(TaskField::HideUntil));
        assert!(!task.contains_value(TaskField::CompletionDate));
        assert!(!task.contains_value(TaskField::Importance));
    }

    #[test]
    fn test_defaults_contain_all_schema_fields() {
        let preferences = Preferences::default();
        let defaults = Task::default_values(&preferences);
        assert!(defaults.contains_key(&TaskField::Title));
        assert!(defaults.contains_key(&TaskField::DueDate));
        assert!(defaults.contains_key(&TaskField::HideUntil));
        assert!(defaults.contains_key(&TaskField::CompletionDate));
        assert!(defaults.contains_key(&TaskField::Importance));
    }

    #[test]
    fn test_apply_defaults_fills_unset_fields_only() {
        let preferences = Preferences::default();
        let defaults = Task::default_values(&preferences);

        let mut task = Task::new();
        task.title = Some("Buy milk".to_string());
        task.apply_defaults(&defaults);

        assert_eq!(task.title.as_deref(), Some("Buy milk"));
        assert_eq!(task.due_date, Some(preferences.default_due_date));
        assert_eq!(task.hide_until, Some(preferences.default_hide_until));
        assert_eq!(task.completion_date, Some(0));
        assert_eq!(task.importance, Some(preferences.default_importance));
        // Creation date is stamped by the store, never by defaults
        assert!(!task.contains_value(TaskField::CreationDate));
    }

    #[test]
    fn test_set_field_is_retrievable_unchanged() {
        let mut task = Task::new();
        task.due_date = Some(1_700_000_000_000);
        assert!(task.contains_value(TaskField::DueDate));
        assert_eq!(task.due_date, Some(1_700_000_000_000));
    }

    #[test]
    fn test_value_equality() {
        let mut a = Task::new();
        let mut b = Task::new();
        assert_eq!(a, b);

        a.title = Some("Water plants".to_string());
        assert_ne!(a, b);
        b.title = Some("Water plants".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_is_completed() {
        let mut task = Task::new();
        assert!(!task.is_completed());
        task.completion_date = Some(0);
        assert!(!task.is_completed());
        task.completion_date = Some(1_700_000_000_000);
        assert!(task.is_completed());
    }

    #[test]
    fn test_importance_roundtrip() {
        for importance in [
            Importance::High,
            Importance::Medium,
            Importance::Low,
            Importance::None,
        ] {
            assert_eq!(Importance::from_i64(importance.as_i64()), importance);
        }
        // Out-of-range clamps
        assert_eq!(Importance::from_i64(-5), Importance::High);
        assert_eq!(Importance::from_i64(99), Importance::None);
    }

    #[test]
    fn test_importance_serialization() {
        let json = serde_json::to_string(&Importance::High).unwrap();
        assert_eq!(json, "\"high\"");
        let json = serde_json::to_string(&Importance::None).unwrap();
        assert_eq!(json, "\"none\"");
    }

    #[test]
    fn test_task_serialization_roundtrip() {
        let mut task = Task::new();
        task.id = 7;
        task.title = Some("Call plumber".to_string());
        task.importance = Some(Importance::Medium);
        task.creation_date = Some(1000);
        task.modification_date = 2000;

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }
}
