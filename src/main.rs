use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use todostore::{Importance, Store, Task, TaskFilter, now_ms};

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "todostore CLI - Task persistence with a JSONL journal and SQLite cache")]
#[command(version)]
struct Cli {
    /// Path to the store directory (default: home directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        title: String,

        /// Due date: YYYY-MM-DD or "YYYY-MM-DD HH:MM"
        #[arg(long)]
        due: Option<String>,

        /// Hide the task until this date
        #[arg(long)]
        hide_until: Option<String>,

        #[arg(long)]
        importance: Option<Priority>,
    },

    /// List tasks (active and visible unless told otherwise)
    List {
        /// Include completed and hidden tasks
        #[arg(long)]
        all: bool,

        /// Only completed tasks
        #[arg(long, conflicts_with = "all")]
        completed: bool,

        /// Only tasks due before this date
        #[arg(long)]
        due_before: Option<String>,
    },

    /// Show one task in full
    Show { id: i64 },

    /// Mark a task completed
    Done { id: i64 },

    /// Clear a task's completion date
    Reopen { id: i64 },

    /// Delete a task
    Delete { id: i64 },

    /// Rebuild the SQLite cache from the journal
    Sync,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Priority {
    High,
    Medium,
    Low,
    None,
}

impl From<Priority> for Importance {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => Importance::High,
            Priority::Medium => Importance::Medium,
            Priority::Low => Importance::Low,
            Priority::None => Importance::None,
        }
    }
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let store_path = cli
        .store_path
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut store = Store::open(&store_path)?;

    match cli.command {
        Commands::Add {
            title,
            due,
            hide_until,
            importance,
        } => {
            let mut task = Task::new();
            task.title = Some(title);
            if let Some(due) = due {
                task.due_date = Some(parse_date(&due)?);
            }
            if let Some(hide_until) = hide_until {
                task.hide_until = Some(parse_date(&hide_until)?);
            }
            task.importance = importance.map(Into::into);

            let id = store.save(&mut task)?;
            println!("Created task {}", id);
        }
        Commands::List {
            all,
            completed,
            due_before,
        } => {
            let mut filters = Vec::new();
            if completed {
                filters.push(TaskFilter::Completed);
            } else if !all {
                filters.push(TaskFilter::Active);
                filters.push(TaskFilter::VisibleAt(now_ms()));
            }
            if let Some(due_before) = due_before {
                filters.push(TaskFilter::DueBefore(parse_date(&due_before)?));
            }

            let tasks = store.list(&filters)?;
            if tasks.is_empty() {
                println!("No tasks");
            }
            for task in tasks {
                println!("{}", format_line(&task));
            }
        }
        Commands::Show { id } => {
            let task = store
                .fetch(id)?
                .ok_or_else(|| eyre!("No task with id {}", id))?;
            print_task(&task);
        }
        Commands::Done { id } => {
            let task = store
                .complete(id)?
                .ok_or_else(|| eyre!("No task with id {}", id))?;
            println!("Completed task {}", task.id);
        }
        Commands::Reopen { id } => {
            let task = store
                .reopen(id)?
                .ok_or_else(|| eyre!("No task with id {}", id))?;
            println!("Reopened task {}", task.id);
        }
        Commands::Delete { id } => {
            store.delete(id)?;
            println!("Deleted task {}", id);
        }
        Commands::Sync => {
            println!("Syncing database from journal...");
            store.sync()?;
            println!("Sync complete");
        }
    }

    Ok(())
}

/// Parse a due/hide-until date. Bare dates land at noon so "due today"
/// sorts before evening appointments.
fn parse_date(input: &str) -> Result<i64> {
    let naive = if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        dt
    } else {
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(|_| eyre!("Invalid date: {} (expected YYYY-MM-DD or \"YYYY-MM-DD HH:MM\")", input))?;
        date.and_hms_opt(12, 0, 0)
            .ok_or_else(|| eyre!("Invalid date: {}", input))?
    };

    let local = Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| eyre!("Ambiguous local time: {}", input))?;

    Ok(local.timestamp_millis())
}

fn format_date(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => ms.to_string(),
    }
}

fn format_line(task: &Task) -> String {
    let id = format!("#{}", task.id).dimmed();

    let title = task.title.as_deref().unwrap_or("");
    let title = if task.is_completed() {
        title.strikethrough().dimmed().to_string()
    } else {
        match task.importance {
            Some(Importance::High) => title.red().bold().to_string(),
            Some(Importance::Medium) => title.yellow().to_string(),
            _ => title.to_string(),
        }
    };

    let due = match task.due_date {
        Some(due) if due > 0 => format!(" (due {})", format_date(due)).cyan().to_string(),
        _ => String::new(),
    };

    format!("{} {}{}", id, title, due)
}

fn print_task(task: &Task) {
    println!("Task #{}", task.id);
    println!("  uuid:        {}", task.uuid);
    println!("  title:       {}", task.title.as_deref().unwrap_or(""));
    println!("  importance:  {:?}", task.importance);
    for (label, value) in [
        ("created", task.creation_date),
        ("due", task.due_date),
        ("hidden until", task.hide_until),
        ("completed", task.completion_date),
    ] {
        match value {
            Some(ms) if ms > 0 => println!("  {}: {}", label, format_date(ms)),
            _ => println!("  {}: -", label),
        }
    }
}
