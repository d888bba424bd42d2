//! CLI module for Team Hub
//!
//! Provides the `serve` subcommand running the HTTP API.

pub mod serve;

use clap::{Parser, Subcommand};

/// Team Hub - hackathon team creation and membership API
#[derive(Parser)]
#[command(name = "team-hub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve(serve::ServeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["team-hub", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve(_)));
    }

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["team-hub", "serve", "--port", "9090"]).unwrap();
        let Command::Serve(args) = cli.command;
        assert_eq!(args.port, Some(9090));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["team-hub"]).is_err());
    }
}
