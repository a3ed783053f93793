// todostore - Task record persistence with a JSONL journal and SQLite cache

pub mod clock;
pub mod journal;
pub mod preferences;
pub mod query;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock, now_ms};
pub use preferences::Preferences;
pub use query::TaskFilter;
pub use store::Store;
pub use task::{FieldValue, Importance, NO_ID, Task, TaskField};

// Re-export rusqlite for CLI use
pub use rusqlite;
