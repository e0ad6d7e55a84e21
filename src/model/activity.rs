//! # Global activity indicator.
//!
//! A single rolled-up view of everything currently running:
//! ```text
//! running = 0  → { percent: None,    in_progress_count: 0 }
//! running = 1  → { percent: its own, in_progress_count: 1 }
//! running = N  → { percent: None,    in_progress_count: N }
//! ```
//! Percentages of unrelated operations are never averaged.

use crate::model::snapshot::OperationSnapshot;

/// Aggregate progress across all running operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalActivity {
    /// Percent of the single running operation; `None` when idle, indeterminate, or 2+.
    pub percent: Option<u8>,
    /// Number of running operations.
    pub in_progress_count: usize,
}

impl GlobalActivity {
    /// Nothing running.
    pub const IDLE: GlobalActivity = GlobalActivity {
        percent: None,
        in_progress_count: 0,
    };

    /// Folds a set of `Running` snapshots into one indicator.
    pub fn from_running<'a, I>(running: I) -> Self
    where
        I: IntoIterator<Item = &'a OperationSnapshot>,
    {
        let mut iter = running.into_iter();
        let Some(first) = iter.next() else {
            return Self::IDLE;
        };
        let rest = iter.count();
        if rest == 0 {
            GlobalActivity {
                percent: first.properties().effective_percent(),
                in_progress_count: 1,
            }
        } else {
            GlobalActivity {
                percent: None,
                in_progress_count: rest + 1,
            }
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.in_progress_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OperationProperties, OperationStatus};
    use uuid::Uuid;

    fn running(percent: Option<u8>) -> OperationSnapshot {
        OperationSnapshot::initial(
            Uuid::new_v4(),
            OperationProperties::new()
                .with_status(OperationStatus::Running)
                .with_percent(percent),
        )
    }

    #[test]
    fn test_idle() {
        let none: Vec<&OperationSnapshot> = Vec::new();
        assert_eq!(GlobalActivity::from_running(none), GlobalActivity::IDLE);
        assert!(GlobalActivity::IDLE.is_idle());
    }

    #[test]
    fn test_single_reports_own_percent() {
        let a = running(Some(42));
        assert_eq!(
            GlobalActivity::from_running([&a]),
            GlobalActivity {
                percent: Some(42),
                in_progress_count: 1
            }
        );
    }

    #[test]
    fn test_many_is_indeterminate() {
        let snaps = [running(Some(10)), running(Some(90)), running(None)];
        assert_eq!(
            GlobalActivity::from_running(snaps.iter()),
            GlobalActivity {
                percent: None,
                in_progress_count: 3
            }
        );
    }
}
