//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ServiceDesk Plus admin CLI
///
/// Bulk CMDB field updates and user-to-technician conversions driven by a
/// JSON configuration file.
#[derive(Parser, Debug)]
#[command(name = "sdp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON config file (falls back to the built-in default configuration)
    #[arg(short, long, global = true, env = "SDP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update CI fields for every entry in `ci_updates`
    UpdateCi(BulkArgs),

    /// Convert every user in `user_conversions` to a technician
    ConvertUsers(BulkArgs),

    /// Inspect CMDB configuration items
    Ci(CiCommand),

    /// Inspect users
    User(UserCommand),

    /// Inspect technicians
    Technician(TechnicianCommand),

    /// List sites, groups, or roles
    List {
        /// Collection to list
        #[arg(value_enum)]
        collection: Collection,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Bulk Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Config file for this run (takes precedence over --config)
    pub config_file: Option<PathBuf>,

    /// Print the batch report as JSON
    #[arg(long)]
    pub json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookup Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct CiCommand {
    #[command(subcommand)]
    pub action: CiAction,
}

#[derive(Subcommand, Debug)]
pub enum CiAction {
    /// Show a configuration item
    Show {
        /// CI ID
        ci_id: String,
    },

    /// Search configuration items
    Search {
        /// Search criteria as key=value (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
}

#[derive(Args, Debug)]
pub struct UserCommand {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Show a user
    Show {
        /// User ID
        user_id: String,
    },

    /// Search users
    Search {
        /// Search criteria as key=value (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
}

#[derive(Args, Debug)]
pub struct TechnicianCommand {
    #[command(subcommand)]
    pub action: TechnicianAction,
}

#[derive(Subcommand, Debug)]
pub enum TechnicianAction {
    /// Show a technician
    Show {
        /// Technician ID
        technician_id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Sites,
    Groups,
    Roles,
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{}`", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter("name=Server*").unwrap(), ("name".into(), "Server*".into()));
        assert_eq!(parse_filter("q=a=b").unwrap(), ("q".into(), "a=b".into()));
        assert!(parse_filter("novalue").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_bulk_positional_config() {
        let cli = Cli::try_parse_from(["sdp", "update-ci", "cis.json", "--json"]).unwrap();
        match cli.command {
            Commands::UpdateCi(args) => {
                assert_eq!(args.config_file, Some(PathBuf::from("cis.json")));
                assert!(args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_search_filters() {
        let cli = Cli::try_parse_from(["sdp", "user", "search", "-f", "email_id=a@b.c", "--filter", "status=active"])
            .unwrap();
        match cli.command {
            Commands::User(UserCommand {
                action: UserAction::Search { filters },
            }) => assert_eq!(filters.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
