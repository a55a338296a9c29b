//! CLI command definitions for the `chatrelay` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Chat sessions relayed to an OpenAI-compatible model server.
#[derive(Parser)]
#[command(name = "chatrelay", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (default from config.toml, else 8000).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default from config.toml, else 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
    },

    /// Manage chat sessions.
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Send a message to a session and stream the reply.
    Chat {
        /// Session ID.
        session: Uuid,

        /// The message to send.
        message: String,
    },

    /// Replace the last assistant reply in a session.
    Regenerate {
        /// Session ID.
        session: Uuid,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List sessions, newest first.
    #[command(alias = "ls")]
    List,

    /// Create a session.
    Create {
        /// System prompt; defaults to the first configured persona.
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Show a session's messages.
    Show {
        /// Session ID.
        id: Uuid,
    },

    /// Rename a session.
    Rename {
        /// Session ID.
        id: Uuid,

        /// New title.
        title: String,
    },

    /// Delete a session and its messages.
    #[command(alias = "rm")]
    Delete {
        /// Session ID.
        id: Uuid,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}
