// Typed filters for listing tasks

use crate::task::Importance;

/// Predicate over the task schema, combined with AND by `Store::list`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskFilter {
    /// Completion date is a real timestamp
    Completed,
    /// Not yet completed
    Active,
    /// At least this important
    AtLeastImportance(Importance),
    /// Has a due date strictly before the given instant
    DueBefore(i64),
    /// Not hidden at the given instant (hide-until has passed)
    VisibleAt(i64),
}

impl TaskFilter {
    /// SQL fragment plus its positional parameters
    pub(crate) fn to_sql(self) -> (&'static str, Vec<i64>) {
        match self {
            TaskFilter::Completed => ("completion_date > 0", vec![]),
            TaskFilter::Active => ("completion_date = 0", vec![]),
            TaskFilter::AtLeastImportance(importance) => {
                ("importance <= ?", vec![importance.as_i64()])
            }
            TaskFilter::DueBefore(instant) => ("(due_date > 0 AND due_date < ?)", vec![instant]),
            TaskFilter::VisibleAt(instant) => ("hide_until <= ?", vec![instant]),
        }
    }
}
