use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::{CategoryFilter, StatusFilter};
use crate::task::{Category, Priority};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "smarttask",
    version,
    about = "Smart Task Manager: tasks with categories, priorities and deadlines",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rcfile", global = true)]
    pub rcfile: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task
    Add(AddArgs),
    /// Edit fields of an existing task; omitted fields stay as they are
    Edit(EditArgs),
    /// Flip a task between pending and completed
    #[command(alias = "done")]
    Toggle { id: String },
    /// Remove a task
    Delete { id: String },
    /// Show tasks matching the search and selectors, plus the stats bar
    List(ListArgs),
    /// Show every field of one task
    Info { id: String },
    /// Show the stats bar only
    Stats,
    /// List the available categories
    Categories,
    /// Sign in (simulated)
    Login(LoginArgs),
    /// Create an account (simulated)
    Signup(SignupArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(short = 'c', long, value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Category>()))]
    pub category: Option<Category>,

    #[arg(short = 'p', long, value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Priority>()))]
    pub priority: Option<Priority>,

    /// RFC 3339, YYYY-MM-DDTHH:MM, YYYY-MM-DD, today, tomorrow or +Nd/+Nh/+Nm
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(short = 't', long)]
    pub title: Option<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(
        short = 'c',
        long,
        conflicts_with = "clear_category",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Category>())
    )]
    pub category: Option<Category>,

    #[arg(long)]
    pub clear_category: bool,

    #[arg(short = 'p', long, value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Priority>()))]
    pub priority: Option<Priority>,

    #[arg(long, conflicts_with = "clear_deadline")]
    pub deadline: Option<String>,

    #[arg(long)]
    pub clear_deadline: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short = 's', long, default_value = "")]
    pub search: String,

    /// "all" or a category name
    #[arg(
        short = 'c',
        long,
        default_value = "all",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<CategoryFilter>())
    )]
    pub category: CategoryFilter,

    /// all, completed or pending
    #[arg(
        long,
        default_value = "all",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<StatusFilter>())
    )]
    pub status: StatusFilter,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct SignupArgs {
    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub phone: String,

    #[arg(long, default_value = "")]
    pub password: String,

    #[arg(long = "confirm-password", default_value = "")]
    pub confirm_password: String,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_list_selectors() {
        let cli = GlobalCli::parse_from([
            "smarttask",
            "list",
            "--search",
            "rent",
            "--category",
            "finance",
            "--status",
            "pending",
        ]);
        let Some(Command::List(args)) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.search, "rent");
        assert_eq!(args.category, CategoryFilter::Only(Category::Finance));
        assert_eq!(args.status, StatusFilter::Pending);
    }

    #[test]
    fn done_is_an_alias_for_toggle() {
        let cli = GlobalCli::parse_from(["smarttask", "done", "1700000000000"]);
        assert!(matches!(cli.command, Some(Command::Toggle { ref id }) if id == "1700000000000"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = GlobalCli::parse_from(["smarttask", "stats", "-vv", "--rc", "color=off"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(cli.rc_overrides[0].value, "off");
    }

    #[test]
    fn edit_rejects_conflicting_category_flags() {
        let res = GlobalCli::try_parse_from([
            "smarttask",
            "edit",
            "1",
            "--category",
            "Work",
            "--clear-category",
        ]);
        assert!(res.is_err());
    }
}
