use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "dono",
    version,
    about = "Daily tasks and goals kept in a local SQLite database"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $DONO_HOME, then ~/.dono)"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "YYYY-MM-DD",
        help = "Day to work on; malformed values fall back to today"
    )]
    pub date: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Goal(GoalCommand),
    Calendar(CalendarArgs),
    #[command(subcommand)]
    Pref(PrefCommand),
    #[command(subcommand)]
    Auth(AuthCommand),
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    List,
    Toggle(IdArgs),
    Edit(TaskEdit),
    Priority(TaskPriority),
    Move(MoveArgs),
    Remove(IdArgs),
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAdd),
    List(GoalList),
    Toggle(IdArgs),
    Edit(GoalEdit),
    Move(MoveArgs),
    Remove(IdArgs),
}

#[derive(Subcommand, Debug)]
pub enum PrefCommand {
    Show,
    #[command(name = "set-theme")]
    SetTheme(SetTheme),
    #[command(name = "set-week-start")]
    SetWeekStart(SetWeekStart),
    #[command(name = "set-locale")]
    SetLocale(SetLocale),
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    Login(AuthLogin),
    Logout,
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    Status,
    Migrate,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    #[arg(value_name = "TEXT", num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TaskEdit {
    pub id: i64,
    #[arg(value_name = "TEXT", num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TaskPriority {
    pub id: i64,
    #[arg(value_enum)]
    pub priority: PriorityArg,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[arg(help = "Record being dragged")]
    pub id: i64,
    #[arg(long, value_name = "ID", help = "Record whose slot it takes")]
    pub onto: i64,
}

#[derive(Args, Debug)]
pub struct GoalAdd {
    #[arg(long = "type", value_enum, default_value = "short")]
    pub kind: GoalKindArg,
    #[arg(value_name = "TITLE", num_args = 1..)]
    pub title: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GoalList {
    #[arg(long = "type", value_enum, default_value = "short")]
    pub kind: GoalKindArg,
}

#[derive(Args, Debug)]
pub struct GoalEdit {
    pub id: i64,
    #[arg(value_name = "TITLE", num_args = 1..)]
    pub title: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CalendarArgs {
    #[arg(long, value_name = "N", allow_hyphen_values = true, default_value_t = 0)]
    pub shift: i32,
}

#[derive(Args, Debug)]
pub struct SetTheme {
    #[arg(value_enum)]
    pub theme: ThemeArg,
}

#[derive(Args, Debug)]
pub struct SetWeekStart {
    #[arg(value_enum)]
    pub week_start: WeekStartArg,
}

#[derive(Args, Debug)]
pub struct SetLocale {
    #[arg(value_enum)]
    pub locale: LocaleArg,
}

#[derive(Args, Debug)]
pub struct AuthLogin {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long, value_name = "TIMESTAMP")]
    pub created_at: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalKindArg {
    Short,
    Long,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum WeekStartArg {
    Sunday,
    Monday,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LocaleArg {
    En,
    Ko,
}
