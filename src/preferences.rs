// User preferences backing the task schema defaults

use crate::task::Importance;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Defaults applied to fields the caller leaves unset on save.
///
/// Persisted as YAML next to the database so the same defaults apply
/// across processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "schema_default_importance")]
    pub default_importance: Importance,
    /// 0 means "no due date"
    #[serde(default)]
    pub default_due_date: i64,
    /// 0 means "not hidden"
    #[serde(default)]
    pub default_hide_until: i64,
}

fn schema_default_importance() -> Importance {
    Importance::None
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_importance: schema_default_importance(),
            default_due_date: 0,
            default_hide_until: 0,
        }
    }
}

impl Preferences {
    /// Load preferences from a YAML file, falling back to schema defaults
    /// when the file does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = ?path, "No preferences file, using schema defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).context("Failed to read preferences file")?;
        serde_yaml::from_str(&content).context("Failed to parse preferences file")
    }

    /// Write preferences to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize preferences")?;
        fs::write(path.as_ref(), yaml).context("Failed to write preferences file")?;
        Ok(())
    }

    /// Reset every entry to its schema default value
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }
}
