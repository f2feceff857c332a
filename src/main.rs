mod app;
mod auth;
mod calendar;
mod cli;
mod db;
mod entities;
mod error;
mod migrate;
mod model;
mod order;
mod prefs;
mod store;
mod util;
mod view;

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::app::{App, MoveOutcome};
use crate::auth::{AuthEvent, Session};
use crate::cli::{
    AuthCommand, AuthLogin, CalendarArgs, Cli, Command, DbCommand, GoalAdd, GoalCommand,
    GoalEdit, GoalKindArg, GoalList, LocaleArg, PrefCommand, PriorityArg, TaskAdd, TaskCommand,
    TaskEdit, TaskPriority, ThemeArg, WeekStartArg,
};
use crate::entities::{goal, task};
use crate::error::AppError;
use crate::model::{GoalKind, Priority, SyncStatus};
use crate::prefs::{Locale, PreferenceBus, PreferenceChange, Preferences, Theme, WeekStart};
use crate::store::Store;
use crate::util::{format_goal_line, format_session, format_task_line};

const HOME_ENV: &str = "DONO_HOME";
const PREFERENCE_BUS_CAPACITY: usize = 16;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let Cli {
        data_dir,
        date,
        command,
    } = Cli::parse();
    let data_dir = resolve_data_dir(data_dir)?;
    let today = Local::now().date_naive();
    let day = calendar::resolve_date(date.as_deref(), today);

    match command {
        Command::Pref(command) => handle_pref(&data_dir, command),
        Command::Auth(command) => handle_auth(&data_dir, command),
        command => {
            let db_path = db::resolve_db_path(&data_dir);
            db::ensure_parent_dir(&db_path)?;
            let mut lock = db::open_lock(&db_path)?;
            let _guard = lock.write()?;

            if let Command::Db(command) = command {
                return handle_db(&db_path, command).await;
            }

            let (conn, _) = db::open(&db_path).await?;
            let mut app = App::new(Store::new(conn));
            let session = auth::load_session(&db::resolve_session_path(&data_dir))?;

            match command {
                Command::Task(command) => {
                    sign_in(&mut app, session).await?;
                    handle_task(&mut app, command, day).await
                }
                Command::Goal(command) => {
                    sign_in(&mut app, session).await?;
                    handle_goal(&mut app, command).await
                }
                Command::Calendar(args) => {
                    let event = match session {
                        Some(session) => AuthEvent::SignedIn(session),
                        None => AuthEvent::SignedOut,
                    };
                    app.apply_auth(event).await?;
                    let prefs = Preferences::load(
                        &db::resolve_preferences_path(&data_dir),
                        PreferenceBus::new(PREFERENCE_BUS_CAPACITY),
                    )?;
                    handle_calendar(&app, args, day, today, prefs.week_start())
                }
                Command::Pref(_) | Command::Auth(_) | Command::Db(_) => Ok(()),
            }
        }
    }
}

async fn sign_in(app: &mut App, session: Option<Session>) -> Result<(), AppError> {
    let session = session.ok_or(AppError::Unauthenticated)?;
    app.apply_auth(AuthEvent::SignedIn(session)).await
}

async fn handle_task(app: &mut App, command: TaskCommand, day: NaiveDate) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(app, args, day).await,
        TaskCommand::List => {
            print_day(app, day);
            Ok(())
        }
        TaskCommand::Toggle(args) => {
            let task = app.toggle_task(args.id).await?;
            report_task_write(&task, if task.is_complete { "completed" } else { "reopened" });
            Ok(())
        }
        TaskCommand::Edit(args) => handle_task_edit(app, args).await,
        TaskCommand::Priority(args) => handle_task_priority(app, args).await,
        TaskCommand::Move(args) => {
            let outcome = app.move_task(args.id, args.onto).await?;
            report_move("task", &outcome);
            if let Some(day) = app
                .tasks()
                .iter()
                .find(|task| task.id == args.id)
                .and_then(|task| util::timestamp_day(&task.inserted_at))
            {
                print_day(app, day);
            }
            Ok(())
        }
        TaskCommand::Remove(args) => {
            if app.delete_task(args.id).await? {
                println!("Task ID: {} removed.", args.id);
            } else {
                eprintln!(
                    "Task ID: {} could not be removed; run the command again to retry.",
                    args.id
                );
            }
            Ok(())
        }
    }
}

async fn handle_task_add(app: &mut App, args: TaskAdd, day: NaiveDate) -> Result<(), AppError> {
    let text = args.text.join(" ");
    let task = app.add_task(&text, day).await?;
    println!(
        "Created task ID: {} on {}: {}",
        task.id,
        calendar::format_date_param(day),
        task.text
    );
    Ok(())
}

async fn handle_task_edit(app: &mut App, args: TaskEdit) -> Result<(), AppError> {
    let text = args.text.join(" ");
    let task = app.edit_task(args.id, &text).await?;
    report_task_write(&task, "updated");
    Ok(())
}

async fn handle_task_priority(app: &mut App, args: TaskPriority) -> Result<(), AppError> {
    let task = app
        .set_priority(args.id, priority_from_arg(args.priority))
        .await?;
    report_task_write(&task, "reprioritized");
    Ok(())
}

async fn handle_goal(app: &mut App, command: GoalCommand) -> Result<(), AppError> {
    match command {
        GoalCommand::Add(args) => handle_goal_add(app, args).await,
        GoalCommand::List(args) => handle_goal_list(app, args),
        GoalCommand::Toggle(args) => {
            let goal = app.toggle_goal(args.id).await?;
            println!(
                "Goal ID: {} is now {}.",
                goal.id,
                goal.status.as_deref().unwrap_or("active")
            );
            Ok(())
        }
        GoalCommand::Edit(args) => handle_goal_edit(app, args).await,
        GoalCommand::Move(args) => {
            let outcome = app.move_goal(args.id, args.onto).await?;
            report_move("goal", &outcome);
            Ok(())
        }
        GoalCommand::Remove(args) => {
            app.delete_goal(args.id).await?;
            println!("Goal ID: {} removed.", args.id);
            Ok(())
        }
    }
}

async fn handle_goal_add(app: &mut App, args: GoalAdd) -> Result<(), AppError> {
    let title = args.title.join(" ");
    let goal = app.add_goal(&title, goal_kind_from_arg(args.kind)).await?;
    println!("Created {} goal ID: {}: {}", goal.kind, goal.id, goal.title);
    Ok(())
}

fn handle_goal_list(app: &App, args: GoalList) -> Result<(), AppError> {
    let view = app.goal_view(goal_kind_from_arg(args.kind))?;
    if view.active.is_empty() && view.completed.is_empty() {
        println!("No goals.");
        return Ok(());
    }
    print_goal_list(&view.active);
    if !view.completed.is_empty() {
        println!();
        println!("Completed:");
        print_goal_list(&view.completed);
    }
    Ok(())
}

async fn handle_goal_edit(app: &mut App, args: GoalEdit) -> Result<(), AppError> {
    let title = args.title.join(" ");
    let goal = app.edit_goal(args.id, &title).await?;
    println!("Updated goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

fn handle_calendar(
    app: &App,
    args: CalendarArgs,
    day: NaiveDate,
    today: NaiveDate,
    week_start: WeekStart,
) -> Result<(), AppError> {
    let (year, month) = calendar::shift_month(day.year(), day.month(), args.shift)
        .ok_or_else(|| AppError::Validation(format!("cannot shift {} months", args.shift)))?;
    let grid = calendar::month_grid(year, month, week_start)
        .ok_or_else(|| AppError::Validation(format!("invalid month {year}-{month:02}")))?;
    let marked = view::days_with_tasks(app.tasks(), year, month);

    println!("{year}-{month:02}");
    let header: Vec<String> = calendar::weekday_order(week_start)
        .iter()
        .map(|weekday| format!("{:>4}", &weekday.to_string()[..2]))
        .collect();
    println!("{}", header.concat());
    for week in grid {
        let mut line = String::new();
        for cell in week {
            let text = match cell {
                Some(num) => {
                    let selected = year == day.year() && month == day.month() && num == day.day();
                    let mark = if marked.contains(&num) { "*" } else { "" };
                    if selected {
                        format!("[{num}{mark}]")
                    } else {
                        format!("{num}{mark}")
                    }
                }
                None => String::new(),
            };
            line.push_str(&format!("{text:>4}"));
        }
        println!("{}", line.trim_end());
    }
    if year == today.year() && month == today.month() {
        println!(
            "Today: {:.0}% of the day elapsed",
            calendar::day_progress(Local::now().naive_local())
        );
    }
    Ok(())
}

fn handle_pref(data_dir: &Path, command: PrefCommand) -> Result<(), AppError> {
    let bus = PreferenceBus::new(PREFERENCE_BUS_CAPACITY);
    let mut changes = bus.subscribe();
    let mut prefs = Preferences::load(&db::resolve_preferences_path(data_dir), bus)?;
    match command {
        PrefCommand::Show => {
            println!("Theme: {}", prefs.theme().as_str());
            println!("Locale: {}", prefs.locale().as_str());
            println!("Week start: {}", prefs.week_start().as_str());
            return Ok(());
        }
        PrefCommand::SetTheme(args) => {
            let theme = match args.theme {
                ThemeArg::Light => Theme::Light,
                ThemeArg::Dark => Theme::Dark,
                ThemeArg::Toggle => prefs.theme().toggled(),
            };
            prefs.set_theme(theme)?;
        }
        PrefCommand::SetWeekStart(args) => {
            prefs.set_week_start(week_start_from_arg(args.week_start))?;
        }
        PrefCommand::SetLocale(args) => {
            prefs.set_locale(locale_from_arg(args.locale))?;
        }
    }
    print_preference_changes(&mut changes);
    Ok(())
}

fn handle_auth(data_dir: &Path, command: AuthCommand) -> Result<(), AppError> {
    let path = db::resolve_session_path(data_dir);
    match command {
        AuthCommand::Login(args) => {
            let session = session_from_args(args);
            auth::save_session(&path, &session)?;
            println!("Signed in as {}.", session.user_id);
        }
        AuthCommand::Logout => {
            if auth::clear_session(&path)? {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }
        AuthCommand::Whoami => {
            let session = auth::load_session(&path)?.ok_or(AppError::Unauthenticated)?;
            println!("{}", format_session(&session));
        }
    }
    Ok(())
}

async fn handle_db(db_path: &Path, command: DbCommand) -> Result<(), AppError> {
    match command {
        DbCommand::Status => {
            let conn = db::connect(db_path).await?;
            let status = migrate::status(&conn).await?;
            println!(
                "Schema version: {} (latest {})",
                status.current, status.latest
            );
            if status.current < status.latest {
                println!("Pending migrations: run `dono db migrate`.");
            }
        }
        DbCommand::Migrate => {
            let (_, report) = db::open(db_path).await?;
            if report.applied.is_empty() {
                println!("Schema is up to date at version {}.", report.to);
            } else {
                println!(
                    "Migrated schema from version {} to {}.",
                    report.from, report.to
                );
            }
        }
    }
    Ok(())
}

fn session_from_args(args: AuthLogin) -> Session {
    let now = util::now_timestamp();
    Session {
        user_id: args.user_id,
        email: args.email,
        created_at: args.created_at.or_else(|| Some(now.clone())),
        last_sign_in_at: Some(now),
        provider: args.provider,
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home).join(".dono"));
    }
    Err(AppError::Validation(format!(
        "unable to resolve data directory; set {HOME_ENV} or pass --data-dir"
    )))
}

fn priority_from_arg(arg: PriorityArg) -> Priority {
    match arg {
        PriorityArg::Low => Priority::Low,
        PriorityArg::Medium => Priority::Medium,
        PriorityArg::High => Priority::High,
    }
}

fn goal_kind_from_arg(arg: GoalKindArg) -> GoalKind {
    match arg {
        GoalKindArg::Short => GoalKind::Short,
        GoalKindArg::Long => GoalKind::Long,
    }
}

fn week_start_from_arg(arg: WeekStartArg) -> WeekStart {
    match arg {
        WeekStartArg::Sunday => WeekStart::Sunday,
        WeekStartArg::Monday => WeekStart::Monday,
    }
}

fn locale_from_arg(arg: LocaleArg) -> Locale {
    match arg {
        LocaleArg::En => Locale::En,
        LocaleArg::Ko => Locale::Ko,
    }
}

fn report_task_write(task: &task::Model, verb: &str) {
    if task.status.as_deref() == Some(SyncStatus::Failed.as_str()) {
        eprintln!(
            "Task ID: {} could not be saved; run the command again to retry.",
            task.id
        );
    } else {
        println!("Task ID: {} {verb}.", task.id);
    }
}

fn report_move(kind: &str, outcome: &MoveOutcome) {
    if outcome.is_noop() {
        println!("Nothing to reorder.");
        return;
    }
    println!(
        "Reordered {} {kind}s ({} updated).",
        outcome.sequence.len(),
        outcome.applied.len()
    );
    for change in &outcome.failed {
        eprintln!(
            "Order for {kind} ID: {} was not saved (wanted {}).",
            change.id, change.order
        );
    }
}

fn print_preference_changes(changes: &mut broadcast::Receiver<PreferenceChange>) {
    while let Ok(change) = changes.try_recv() {
        match change {
            PreferenceChange::Theme(theme) => println!("theme -> {}", theme.as_str()),
            PreferenceChange::WeekStart(week_start) => {
                println!("weekStart -> {}", week_start.as_str())
            }
            PreferenceChange::Locale(locale) => println!("locale -> {}", locale.as_str()),
        }
    }
}

fn print_day(app: &App, day: NaiveDate) {
    let tasks = app.day_view(day);
    println!(
        "{} (prev {}, next {})",
        calendar::format_date_param(day),
        calendar::format_date_param(calendar::previous_day(day)),
        calendar::format_date_param(calendar::next_day(day))
    );
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    print_task_list(&tasks);
}

fn print_task_list(tasks: &[task::Model]) {
    println!("{:<4} {:<3} {:<6} {:<5} {}", "ID", "", "PRIO", "ORDER", "TEXT");
    for task in tasks {
        println!("{}", format_task_line(task));
    }
}

fn print_goal_list(goals: &[goal::Model]) {
    println!("{:<4} {:<9} {:<5} {}", "ID", "STAT", "ORDER", "TITLE");
    for goal in goals {
        println!("{}", format_goal_line(goal));
    }
}
