//! CLI module for memchat
//!
//! Provides command-line interface parsing and handling for the memchat-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;
pub mod repl;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// memchat - memory-augmented chat server
///
/// An LLM chat that remembers what users tell it about themselves, backed by
/// Mem0 with a keyword or classifier write gate.
#[derive(Parser, Debug)]
#[command(
    name = "memchat-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "memchat - memory-augmented chat server",
    long_about = "An LLM chat server with long-term user memory backed by Mem0.\n\
                  Each turn recalls relevant facts about the user and decides, with a keyword\n\
                  or classifier gate, whether the message is worth remembering.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  memchat-server init                    # Scaffold memchat.toml and .env.example\n    \
                  memchat-server init --gate classifier  # Use the LLM classifier gate\n    \
                  memchat-server                         # Start the server (requires memchat.toml)\n    \
                  memchat-server chat --user Alex        # Chat from the terminal\n    \
                  memchat-server --config my.toml        # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "memchat.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Initialize a new memchat project
    ///
    /// Creates memchat.toml, .env.example and a .gitignore.
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// Leave out the example personas
        #[arg(short, long)]
        minimal: bool,

        /// Completion provider to configure (groq, openai or gemini)
        #[arg(long, default_value = "groq")]
        provider: String,

        /// Memory write gate (keyword or classifier)
        #[arg(long, default_value = "keyword")]
        gate: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Show the full configuration
        #[arg(short = 'f', long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Chat from the terminal
    Chat {
        /// Display name, used as the memory partition key
        #[arg(short, long)]
        user: String,

        /// Start with a persona selected
        #[arg(short, long)]
        persona: Option<String>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
