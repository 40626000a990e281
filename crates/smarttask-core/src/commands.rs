use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::auth::{AuthError, AuthForm, LoginDraft, SignupDraft, SimulatedAuthenticator};
use crate::board::TaskBoard;
use crate::cli::{AddArgs, Command, EditArgs, ListArgs, LoginArgs, SignupArgs};
use crate::config::Config;
use crate::datastore::Slot;
use crate::datetime::parse_deadline;
use crate::filter::TaskQuery;
use crate::form::TaskForm;
use crate::render::{ConsoleNotifier, Renderer};

pub type ConsoleBoard<S> = TaskBoard<S, ConsoleNotifier>;

#[instrument(skip(board, cfg, renderer, command))]
pub fn dispatch<S: Slot>(
    board: &mut ConsoleBoard<S>,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let now = Utc::now();
    debug!(?command, "dispatching command");

    match command {
        Command::Add(args) => cmd_add(board, args, now),
        Command::Edit(args) => cmd_edit(board, args, now),
        Command::Toggle { id } => cmd_toggle(board, &id),
        Command::Delete { id } => cmd_delete(board, &id),
        Command::List(args) => cmd_list(board, renderer, args, now),
        Command::Info { id } => cmd_info(board, renderer, &id),
        Command::Stats => renderer.print_stats(&board.stats(now)),
        Command::Categories => renderer.print_categories(),
        Command::Login(args) => cmd_login(cfg, renderer, args),
        Command::Signup(args) => cmd_signup(cfg, renderer, args),
    }
}

#[instrument(skip(board, args, now))]
fn cmd_add<S: Slot>(
    board: &mut ConsoleBoard<S>,
    args: AddArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let mut form = TaskForm::create();
    form.draft.title = args.title;
    form.draft.description = args.description.unwrap_or_default();
    form.draft.category = args.category;
    form.draft.priority = args.priority.unwrap_or_default();
    form.draft.deadline = args
        .deadline
        .as_deref()
        .map(|raw| parse_deadline(raw, now))
        .transpose()
        .context("invalid --deadline")?;

    submit_form(board, &form, now)
}

#[instrument(skip(board, args, now), fields(id = %args.id))]
fn cmd_edit<S: Slot>(
    board: &mut ConsoleBoard<S>,
    args: EditArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command edit");

    let task = board
        .store()
        .get(&args.id)
        .ok_or_else(|| anyhow!("task not found: {}", args.id))?;
    let mut form = TaskForm::edit(task);

    if let Some(title) = args.title {
        form.draft.title = title;
    }
    if let Some(description) = args.description {
        form.draft.description = description;
    }
    if args.clear_category {
        form.draft.category = None;
    } else if let Some(category) = args.category {
        form.draft.category = Some(category);
    }
    if let Some(priority) = args.priority {
        form.draft.priority = priority;
    }
    if args.clear_deadline {
        form.draft.deadline = None;
    } else if let Some(raw) = args.deadline.as_deref() {
        form.draft.deadline = Some(parse_deadline(raw, now).context("invalid --deadline")?);
    }

    submit_form(board, &form, now)
}

fn submit_form<S: Slot>(
    board: &mut ConsoleBoard<S>,
    form: &TaskForm,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    match board.submit(form, now)? {
        Some(task) => {
            debug!(id = %task.id, heading = form.heading(), "form applied");
            println!("{} {}", form.heading(), task.id);
            Ok(())
        }
        None => Err(anyhow!("task title cannot be empty")),
    }
}

#[instrument(skip(board))]
fn cmd_toggle<S: Slot>(board: &mut ConsoleBoard<S>, id: &str) -> anyhow::Result<()> {
    let task = board.toggle(id)?;
    println!(
        "Task {} is now {}.",
        task.id,
        if task.completed { "completed" } else { "pending" }
    );
    Ok(())
}

#[instrument(skip(board))]
fn cmd_delete<S: Slot>(board: &mut ConsoleBoard<S>, id: &str) -> anyhow::Result<()> {
    let removed = board.delete(id)?;
    debug!(title = %removed.title, "removed task");
    Ok(())
}

#[instrument(skip(board, renderer, args, now))]
fn cmd_list<S: Slot>(
    board: &mut ConsoleBoard<S>,
    renderer: &Renderer,
    args: ListArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    board.query = TaskQuery {
        search: args.search,
        category: args.category,
        status: args.status,
    };

    renderer.print_stats(&board.stats(now))?;
    if let Some(hint) = board.empty_hint(now) {
        return renderer.print_hint(hint);
    }
    renderer.print_task_cards(&board.visible(now))
}

#[instrument(skip(board, renderer))]
fn cmd_info<S: Slot>(
    board: &ConsoleBoard<S>,
    renderer: &Renderer,
    id: &str,
) -> anyhow::Result<()> {
    let task = board
        .store()
        .get(id)
        .ok_or_else(|| anyhow!("task not found: {id}"))?;
    renderer.print_task_info(task)
}

fn auth_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")
}

fn auth_form(
    cfg: &Config,
    renderer: &Renderer,
) -> anyhow::Result<AuthForm<SimulatedAuthenticator, ConsoleNotifier>> {
    let authenticator = SimulatedAuthenticator::new(cfg.auth_delay()?);
    Ok(AuthForm::new(
        authenticator,
        ConsoleNotifier::new(renderer.clone()),
    ))
}

fn report_auth_error(renderer: &Renderer, err: AuthError) -> anyhow::Result<()> {
    if let AuthError::Invalid(errors) = &err {
        renderer.print_field_errors(errors)?;
    }
    warn!(error = %err, "authentication did not succeed");
    Err(err.into())
}

#[instrument(skip(cfg, renderer, args))]
fn cmd_login(cfg: &Config, renderer: &Renderer, args: LoginArgs) -> anyhow::Result<()> {
    let draft = LoginDraft {
        email: args.email,
        password: args.password,
    };
    let mut form = auth_form(cfg, renderer)?;

    match auth_runtime()?.block_on(form.submit_login(&draft)) {
        Ok(route) => {
            println!("-> {route}");
            Ok(())
        }
        Err(err) => report_auth_error(renderer, err),
    }
}

#[instrument(skip(cfg, renderer, args))]
fn cmd_signup(cfg: &Config, renderer: &Renderer, args: SignupArgs) -> anyhow::Result<()> {
    let draft = SignupDraft {
        name: args.name,
        email: args.email,
        phone: args.phone,
        password: args.password,
        confirm_password: args.confirm_password,
    };
    let mut form = auth_form(cfg, renderer)?;

    match auth_runtime()?.block_on(form.submit_signup(&draft)) {
        Ok(route) => {
            println!("-> {route}");
            Ok(())
        }
        Err(err) => report_auth_error(renderer, err),
    }
}
