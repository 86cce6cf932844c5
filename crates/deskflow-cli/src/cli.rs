//! CLI argument definitions for Deskflow.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Deskflow -- natural-language commands for your desktop.
#[derive(Parser)]
#[command(
    name = "deskflow",
    version,
    about = "Deskflow -- natural-language desktop assistant",
    long_about = "Turns short English commands into actions: summarize email, open \
                  applications, type text, drive the mouse and run shell commands."
)]
pub struct Cli {
    /// Configuration file (defaults to config/default.toml when present).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Read commands from stdin, one per line.
    Run,

    /// Dispatch a single command and print the result.
    Dispatch {
        /// The command text; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// List registered actions and their parameters.
    Actions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_joins_words() {
        let cli = Cli::parse_from(["deskflow", "dispatch", "open", "notepad"]);
        match cli.command {
            Commands::Dispatch { command } => assert_eq!(command.join(" "), "open notepad"),
            _ => panic!("expected dispatch"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["deskflow", "serve", "--port", "9000", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Commands::Serve { bind, port } => {
                assert_eq!(bind, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn dispatch_requires_a_command() {
        assert!(Cli::try_parse_from(["deskflow", "dispatch"]).is_err());
    }
}
