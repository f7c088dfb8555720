//! Command-line interface for tasklink
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in the submodules.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind};
use crate::identity::{self, Identity};
use crate::output::OutputOptions;

mod page;
mod session;
mod task;

/// tasklink - shared task board
///
/// Private dashboards of short tasks, public task pages with comment
/// threads, and share links for public tasks.
#[derive(Parser, Debug)]
#[command(name = "tasklink")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKLINK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Caller email (overrides the persisted sign-in)
    #[arg(long, global = true, env = "TASKLINK_EMAIL")]
    pub email: Option<String>,

    /// Caller display name (paired with --email)
    #[arg(long, global = true, env = "TASKLINK_NAME")]
    pub name: Option<String>,

    /// Emit integration events to "-" (stdout) or a file path
    #[arg(long, global = true, env = "TASKLINK_EVENTS")]
    pub events: Option<String>,

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
    /// Sign in with an email and display name
    Signin {
        /// Email address
        #[arg(value_name = "EMAIL")]
        signin_email: String,

        /// Display name shown on comments
        #[arg(value_name = "NAME")]
        signin_name: String,
    },

    /// Remove the persisted sign-in
    Signout,

    /// Show the resolved identity
    Whoami,

    /// Register a task on your dashboard
    Add {
        /// Task text
        text: String,

        /// Make the task publicly visible and commentable
        #[arg(long)]
        public: bool,
    },

    /// List your tasks, newest first
    List,

    /// Delete one of your tasks
    Rm {
        /// Task id
        id: String,
    },

    /// View a public task page with its comment thread
    View {
        /// Task id
        id: String,
    },

    /// Comment on a public task
    Comment {
        /// Task id
        task_id: String,

        /// Comment text
        text: String,
    },

    /// Delete one of your comments
    Uncomment {
        /// Comment id
        id: String,
    },

    /// Print the share link for a task
    Share {
        /// Task id
        id: String,
    },

    /// Show board totals: task and comment counts
    Stats,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        // Events on stdout own the stream: command output steps aside so
        // every stdout line stays parseable as one event.
        let events_to_stdout = self
            .events
            .as_deref()
            .map(|value| value.trim() == "-")
            .unwrap_or(false);

        let globals = Globals {
            data_dir: resolve_data_dir(self.data_dir),
            email: self.email,
            name: self.name,
            events: self.events,
            json: self.json && !events_to_stdout,
            quiet: self.quiet || events_to_stdout,
        };

        match self.command {
            Commands::Signin {
                signin_email,
                signin_name,
            } => session::run_signin(&globals, &signin_email, &signin_name),
            Commands::Signout => session::run_signout(&globals),
            Commands::Whoami => session::run_whoami(&globals),
            Commands::Add { text, public } => task::run_add(&globals, &text, public),
            Commands::List => task::run_list(&globals),
            Commands::Rm { id } => task::run_rm(&globals, &id),
            Commands::View { id } => page::run_view(&globals, &id),
            Commands::Comment { task_id, text } => page::run_comment(&globals, &task_id, &text),
            Commands::Uncomment { id } => page::run_uncomment(&globals, &id),
            Commands::Share { id } => task::run_share(&globals, &id),
            Commands::Stats => task::run_stats(&globals),
        }
    }
}

/// Global flags shared by every command.
pub(crate) struct Globals {
    pub data_dir: PathBuf,
    pub email: Option<String>,
    pub name: Option<String>,
    pub events: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl Globals {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn config(&self) -> Config {
        Config::load_from_dir(&self.data_dir)
    }

    /// Resolve the caller identity, or None when unauthenticated.
    pub fn identity(&self, config: &Config) -> Result<Option<Identity>> {
        identity::resolve(
            &self.data_dir,
            self.email.as_deref(),
            self.name.as_deref(),
            config,
        )
    }

    /// Resolve the caller identity, failing when unauthenticated. The
    /// CLI analogue of the dashboard's redirect-to-home.
    pub fn require_identity(&self, config: &Config) -> Result<Identity> {
        self.identity(config)?.ok_or(Error::NotSignedIn)
    }

    /// Best-effort integration event emission; failures never abort the
    /// command that already succeeded.
    pub fn emit_event(&self, kind: EventKind, actor: Option<&str>, data: serde_json::Value) {
        let Some(destination) = EventDestination::parse(self.events.as_deref()) else {
            return;
        };

        let result = Event::new(kind, actor.map(str::to_string))
            .with_data(data)
            .and_then(|event| destination.open()?.emit(&event));
        if let Err(err) = result {
            tracing::warn!(error = %err, "event emission failed");
        }
    }
}

fn resolve_data_dir(cli: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = cli {
        return dir;
    }

    directories::ProjectDirs::from("", "", "tasklink")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tasklink"))
}
