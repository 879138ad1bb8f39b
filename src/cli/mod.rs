//! Command-line interface for taskmirror
//!
//! This module defines the CLI structure using clap derive macros.
//! Task commands live in `task`, filter management in `filter`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::notify::ReminderScheduler;
use crate::output::OutputOptions;
use crate::remote::TaskwarriorCommand;
use crate::repository::FileTaskRepository;
use crate::session::TaskSession;
use crate::storage::{self, Storage};

mod filter;
mod task;

/// taskmirror - keep a local task list in step with a taskwarrior store
#[derive(Parser, Debug)]
#[command(name = "taskmirror")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKMIRROR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to taskmirror.toml
    #[arg(long, global = true, env = "TASKMIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tasks (visible ones unless --all)
    List {
        /// Include completed, deleted, waiting and filtered-out tasks
        #[arg(long)]
        all: bool,
    },

    /// Add a task
    Add {
        /// Task description
        name: String,

        #[arg(long)]
        project: Option<String>,

        /// Comma separated tags
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        /// Due date, e.g. "2025-01-05 15:30" or "Jan 05, 2025 03:30 PM"
        #[arg(long)]
        due: Option<String>,

        /// Hide until this date
        #[arg(long)]
        wait: Option<String>,
    },

    /// Show one task
    Show {
        /// Task uuid or unique prefix
        id: String,
    },

    /// Change fields of a task
    Modify {
        /// Task uuid or unique prefix
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// Project (empty string clears)
        #[arg(long)]
        project: Option<String>,

        /// Comma separated tags (replaces existing)
        #[arg(long)]
        tags: Option<String>,

        /// Priority (empty string clears)
        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        wait: Option<String>,
    },

    /// Mark a task completed
    Done {
        /// Task uuid or unique prefix
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task uuid or unique prefix
        id: String,
    },

    /// Push local changes and adopt the store's task list
    Sync,

    /// Import tasks from a store export (JSON array or one record per line)
    Import {
        file: PathBuf,
    },

    /// Print the local task list as store records
    Export,

    /// Suggest values for a filter type
    Autocomplete {
        /// Filter type: project, tag, priority, status
        kind: String,

        #[arg(default_value = "")]
        prefix: String,
    },

    /// Task filter management
    #[command(subcommand)]
    Filter(FilterCommands),
}

/// Filter subcommands
#[derive(Subcommand, Debug)]
pub enum FilterCommands {
    /// Add a filter
    Add {
        /// project, tag, priority, status, has-due, overdue, name-contains
        kind: String,

        /// Value to match (not needed for has-due / overdue)
        #[arg(default_value = "")]
        parameter: String,

        /// Hide matching tasks instead of keeping only them
        #[arg(long)]
        exclude: bool,
    },

    /// List filters
    List,

    /// Remove a filter by its list index
    Remove { index: usize },

    /// Enable or disable a filter by its list index
    Toggle { index: usize },
}

pub(crate) type Session = TaskSession<FileTaskRepository, ReminderScheduler>;

/// Global flags shared by every command
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Build a loaded session from config and flags.
pub(crate) async fn load_session(global: &GlobalOptions) -> Result<Session> {
    let config_path = global.config.clone().or_else(Config::default_path);
    let config = Config::load_or_default(config_path.as_deref())?;

    let data_dir = match global.data_dir.clone().or_else(|| config.data_dir.clone()) {
        Some(dir) => dir,
        None => storage::default_data_dir()?,
    };

    let storage = Storage::new(data_dir);
    let remote = Arc::new(TaskwarriorCommand::new(config.sync.clone()));
    let repository = FileTaskRepository::new(storage, remote);
    let notifier = ReminderScheduler::new(&config.notifications);

    let mut session = TaskSession::new(repository, notifier);
    session.load().await?;
    Ok(session)
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let global = GlobalOptions {
            data_dir: self.data_dir,
            config: self.config,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        };

        match self.command {
            Commands::List { all } => task::run_list(&global, all).await,
            Commands::Add {
                name,
                project,
                tags,
                priority,
                due,
                wait,
            } => {
                task::run_add(
                    &global,
                    task::EditOptions {
                        name: Some(name),
                        project,
                        tags,
                        priority,
                        due,
                        wait,
                    },
                )
                .await
            }
            Commands::Show { id } => task::run_show(&global, &id).await,
            Commands::Modify {
                id,
                name,
                project,
                tags,
                priority,
                due,
                wait,
            } => {
                task::run_modify(
                    &global,
                    &id,
                    task::EditOptions {
                        name,
                        project,
                        tags,
                        priority,
                        due,
                        wait,
                    },
                )
                .await
            }
            Commands::Done { id } => task::run_done(&global, &id).await,
            Commands::Delete { id } => task::run_delete(&global, &id).await,
            Commands::Sync => task::run_sync(&global).await,
            Commands::Import { file } => task::run_import(&global, &file).await,
            Commands::Export => task::run_export(&global).await,
            Commands::Autocomplete { kind, prefix } => {
                task::run_autocomplete(&global, &kind, &prefix).await
            }
            Commands::Filter(cmd) => match cmd {
                FilterCommands::Add {
                    kind,
                    parameter,
                    exclude,
                } => filter::run_add(&global, &kind, &parameter, !exclude).await,
                FilterCommands::List => filter::run_list(&global).await,
                FilterCommands::Remove { index } => filter::run_remove(&global, index).await,
                FilterCommands::Toggle { index } => filter::run_toggle(&global, index).await,
            },
        }
    }
}
