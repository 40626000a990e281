use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::trace;

use crate::task::{
  Category,
  Task
};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Category)
}

impl CategoryFilter {
  pub fn matches(
    self,
    category: Option<Category>
  ) -> bool {
    match self {
      | CategoryFilter::All => true,
      | CategoryFilter::Only(wanted) => {
        category == Some(wanted)
      }
    }
  }
}

impl FromStr for CategoryFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(CategoryFilter::All);
    }
    s.parse().map(CategoryFilter::Only)
  }
}

impl fmt::Display for CategoryFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | CategoryFilter::All => {
        f.write_str("all")
      }
      | CategoryFilter::Only(c) => {
        fmt::Display::fmt(c, f)
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Completed,
  Pending
}

impl StatusFilter {
  pub fn matches(
    self,
    completed: bool
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Completed => {
        completed
      }
      | StatusFilter::Pending => {
        !completed
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "completed" | "done" => {
        Ok(StatusFilter::Completed)
      }
      | "pending" => {
        Ok(StatusFilter::Pending)
      }
      | other => Err(anyhow!(
        "unknown status filter: {other}"
      ))
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | StatusFilter::All => "all",
      | StatusFilter::Completed => {
        "completed"
      }
      | StatusFilter::Pending => "pending"
    })
  }
}

/// Search box plus the two selectors.
/// All three must match.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct TaskQuery {
  pub search:   String,
  pub category: CategoryFilter,
  pub status:   StatusFilter
}

impl TaskQuery {
  pub fn is_unfiltered(&self) -> bool {
    self.search.is_empty()
      && self.category
        == CategoryFilter::All
      && self.status == StatusFilter::All
  }

  /// Subset of `tasks` in input
  /// order.
  #[tracing::instrument(skip_all, fields(query = ?self, total = tasks.len()))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    let needle =
      self.search.to_lowercase();
    let visible: Vec<&Task> = tasks
      .iter()
      .filter(|task| {
        self.matches_lowered(
          task, &needle
        )
      })
      .collect();
    trace!(
      visible = visible.len(),
      "applied task query"
    );
    visible
  }

  fn matches_lowered(
    &self,
    task: &Task,
    needle: &str
  ) -> bool {
    let text_match = needle.is_empty()
      || task
        .title
        .to_lowercase()
        .contains(needle)
      || task
        .description
        .to_lowercase()
        .contains(needle);

    text_match
      && self
        .category
        .matches(task.category)
      && self
        .status
        .matches(task.completed)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::task::Priority;

  fn task(
    id: &str,
    title: &str,
    description: &str,
    category: Option<Category>,
    completed: bool
  ) -> Task {
    Task {
      id: id.to_string(),
      title: title.to_string(),
      description: description
        .to_string(),
      category,
      priority: Priority::Medium,
      deadline: None,
      completed,
      created_at: Utc::now()
    }
  }

  fn sample() -> Vec<Task> {
    vec![
      task(
        "1",
        "Pay rent",
        "before the 5th",
        Some(Category::Finance),
        false
      ),
      task(
        "2",
        "Morning run",
        "",
        Some(Category::Health),
        true
      ),
      task(
        "3",
        "Ship release",
        "Tag and PAY the CI bill",
        Some(Category::Work),
        false
      ),
      task(
        "4", "Groceries", "", None, true
      ),
    ]
  }

  fn ids(found: &[&Task]) -> Vec<String> {
    found
      .iter()
      .map(|t| t.id.clone())
      .collect()
  }

  #[test]
  fn unfiltered_query_returns_everything_in_order()
   {
    let tasks = sample();
    let query = TaskQuery::default();
    assert!(query.is_unfiltered());
    assert_eq!(
      ids(&query.apply(&tasks)),
      vec!["1", "2", "3", "4"]
    );
  }

  #[test]
  fn search_hits_title_or_description_case_insensitively()
   {
    let tasks = sample();
    let query = TaskQuery {
      search: "pAy".to_string(),
      ..TaskQuery::default()
    };
    assert_eq!(
      ids(&query.apply(&tasks)),
      vec!["1", "3"]
    );
  }

  #[test]
  fn predicates_are_conjunctive() {
    let tasks = sample();
    let query = TaskQuery {
      search:   "pay".to_string(),
      category: CategoryFilter::Only(
        Category::Work
      ),
      status:   StatusFilter::Pending
    };
    assert_eq!(
      ids(&query.apply(&tasks)),
      vec!["3"]
    );

    let query = TaskQuery {
      status: StatusFilter::Completed,
      ..query
    };
    assert!(query.apply(&tasks).is_empty());
  }

  #[test]
  fn status_and_category_selectors() {
    let tasks = sample();
    let done = TaskQuery {
      status: StatusFilter::Completed,
      ..TaskQuery::default()
    };
    assert_eq!(
      ids(&done.apply(&tasks)),
      vec!["2", "4"]
    );

    let health = TaskQuery {
      category: "health".parse().unwrap(),
      ..TaskQuery::default()
    };
    assert_eq!(
      ids(&health.apply(&tasks)),
      vec!["2"]
    );
  }

  #[test]
  fn selector_spellings_parse() {
    assert_eq!(
      "ALL"
        .parse::<CategoryFilter>()
        .unwrap(),
      CategoryFilter::All
    );
    assert_eq!(
      "pending"
        .parse::<StatusFilter>()
        .unwrap(),
      StatusFilter::Pending
    );
    assert!(
      "someday"
        .parse::<StatusFilter>()
        .is_err()
    );
    assert!(
      "Hobby"
        .parse::<CategoryFilter>()
        .is_err()
    );
  }
}
