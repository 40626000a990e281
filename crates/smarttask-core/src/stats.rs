use chrono::{DateTime, Duration, Utc};

use crate::task::{DUE_SOON_DAYS, Task};

/// Counters for the stats bar. Always computed over the whole collection, never
/// over a filtered view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub due_soon: usize,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        Self::compute_within(tasks, now, Duration::days(DUE_SOON_DAYS))
    }

    pub fn compute_within(tasks: &[Task], now: DateTime<Utc>, due_soon_window: Duration) -> Self {
        let mut stats = Self {
            total: tasks.len(),
            ..Self::default()
        };
        for task in tasks {
            if task.completed {
                stats.completed += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            if task.is_due_soon_within(now, due_soon_window) {
                stats.due_soon += 1;
            }
        }
        stats.pending = stats.total - stats.completed;
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::task::Priority;

    fn task(id: u32, deadline_hours: Option<i64>, completed: bool, now: DateTime<Utc>) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            category: None,
            priority: Priority::Low,
            deadline: deadline_hours.map(|h| now + Duration::hours(h)),
            completed,
            created_at: now,
        }
    }

    #[test]
    fn empty_collection_is_all_zero() {
        assert_eq!(TaskStats::compute(&[], Utc::now()), TaskStats::default());
    }

    #[test]
    fn counts_whole_collection() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let tasks = vec![
            task(1, Some(-24), false, now),
            task(2, Some(-24), true, now),
            task(3, Some(12), false, now),
            task(4, None, false, now),
            task(5, Some(24 * 10), true, now),
        ];

        let stats = TaskStats::compute(&tasks, now);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.due_soon, 1);
        assert_eq!(stats.total, stats.completed + stats.pending);
    }
}
