use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::auth::FieldErrors;
use crate::board::TaskView;
use crate::config::Config;
use crate::datetime::{format_deadline, format_timestamp};
use crate::notify::{Notification, Notifier, Severity, TracingNotifier};
use crate::stats::TaskStats;
use crate::task::{Category, Priority, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.get_bool("color")?.unwrap_or(true),
        })
    }

    #[tracing::instrument(skip(self, views))]
    pub fn print_task_cards(&self, views: &[TaskView<'_>]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_cards(&mut out, views)
    }

    fn write_task_cards<W: Write>(&self, out: W, views: &[TaskView<'_>]) -> anyhow::Result<()> {
        let rows: Vec<Vec<Cell>> = views
            .iter()
            .map(|view| {
                let task = view.task;
                let deadline = match task.deadline {
                    Some(at) if view.overdue => {
                        Cell::painted(format!("{} overdue", format_deadline(at)), "31")
                    }
                    Some(at) if view.due_soon => {
                        Cell::painted(format!("{} due soon", format_deadline(at)), "33")
                    }
                    Some(at) => Cell::plain(format_deadline(at)),
                    None => Cell::plain(""),
                };

                vec![
                    Cell::painted(task.id.as_str(), "2"),
                    Cell::plain(if task.completed { "[x]" } else { "[ ]" }),
                    Cell::painted(task.priority.as_str(), priority_code(task.priority)),
                    Cell::plain(task.category.map(Category::as_str).unwrap_or_default()),
                    deadline,
                    if task.completed {
                        Cell::painted(task.title.as_str(), "9")
                    } else {
                        Cell::plain(task.title.as_str())
                    },
                ]
            })
            .collect();

        self.write_table(out, &CARD_HEADERS, &rows)
    }

    /// Columns are sized on the unpainted text so color codes never skew
    /// the alignment.
    fn write_table<W: Write>(
        &self,
        mut out: W,
        headers: &[&str],
        rows: &[Vec<Cell>],
    ) -> anyhow::Result<()> {
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                rows.iter()
                    .map(|row| row[col].width())
                    .fold(header.width(), usize::max)
            })
            .collect();

        let head: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(header, &width)| padded(header, header.width(), width))
            .collect();
        writeln!(out, "{}", head.join(" ").trim_end())?;

        let rule: Vec<String> = widths.iter().map(|&width| "-".repeat(width)).collect();
        writeln!(out, "{}", rule.join(" "))?;

        for row in rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| {
                    let shown = match cell.code {
                        Some(code) => self.paint(&cell.text, code),
                        None => cell.text.clone(),
                    };
                    padded(&shown, cell.width(), width)
                })
                .collect();
            writeln!(out, "{}", line.join(" ").trim_end())?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(out, "description {}", task.description)?;
        writeln!(
            out,
            "category    {}",
            task.category.map(Category::as_str).unwrap_or_default()
        )?;
        writeln!(out, "priority    {}", task.priority)?;
        writeln!(
            out,
            "status      {}",
            if task.completed { "completed" } else { "pending" }
        )?;
        if let Some(deadline) = task.deadline {
            writeln!(out, "deadline    {}", format_timestamp(deadline))?;
        }
        writeln!(out, "created     {}", format_timestamp(task.created_at))?;

        Ok(())
    }

    pub fn print_stats(&self, stats: &TaskStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Total {}  Completed {}  Pending {}  Overdue {}  Due soon {}",
            stats.total,
            self.paint(&stats.completed.to_string(), "32"),
            stats.pending,
            self.paint(&stats.overdue.to_string(), "31"),
            self.paint(&stats.due_soon.to_string(), "33"),
        )?;
        Ok(())
    }

    pub fn print_categories(&self) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for category in Category::ALL {
            writeln!(out, "{category}")?;
        }
        Ok(())
    }

    pub fn print_hint(&self, hint: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", self.paint(hint, "2"))?;
        Ok(())
    }

    pub fn print_field_errors(&self, errors: &FieldErrors) -> anyhow::Result<()> {
        let mut out = io::stderr().lock();
        for (field, message) in errors.iter() {
            writeln!(out, "{}: {message}", self.paint(field.as_str(), "31"))?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Prints notifications to stdout as `title: description`.
#[derive(Debug, Clone)]
pub struct ConsoleNotifier {
    renderer: Renderer,
}

impl ConsoleNotifier {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notification: Notification) {
        let code = match notification.severity {
            Severity::Normal => "32",
            Severity::Destructive => "31",
        };
        println!(
            "{}: {}",
            self.renderer.paint(&notification.title, code),
            notification.description
        );
        TracingNotifier.notify(notification);
    }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

const CARD_HEADERS: [&str; 6] = ["ID", "Done", "Pri", "Category", "Deadline", "Title"];

/// One table cell; `code` is the ANSI color applied on output.
struct Cell {
    text: String,
    code: Option<&'static str>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    fn painted(text: impl Into<String>, code: &'static str) -> Self {
        Self {
            text: text.into(),
            code: Some(code),
        }
    }

    fn width(&self) -> usize {
        self.text.width()
    }
}

fn padded(shown: &str, visible: usize, width: usize) -> String {
    format!("{shown}{}", " ".repeat(width.saturating_sub(visible)))
}
