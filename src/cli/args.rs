//! CLI argument definitions using clap
//!
//! Commands:
//! - finvault backup
//! - finvault restore [SELECTOR] [--yes] [--non-interactive]

use clap::{Parser, Subcommand};

/// finvault - snapshot backup and restore for the personal finance app
#[derive(Parser, Debug)]
#[command(name = "finvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a snapshot of the live database and uploads tree
    ///
    /// Configuration comes from FINVAULT_* environment variables. Exits 0
    /// when the local backup succeeds, even if remote mirroring fails.
    Backup,

    /// List snapshots, or restore one over the live state
    Restore {
        /// "latest", a number from the listing, or a snapshot name.
        /// Omit to list available snapshots.
        selector: Option<String>,

        /// Proceed without asking for confirmation
        #[arg(long)]
        yes: bool,

        /// No terminal is attached (scripted invocation); restoring then
        /// requires --yes
        #[arg(long)]
        non_interactive: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_has_no_arguments() {
        let cli = Cli::try_parse_from(["finvault", "backup"]).unwrap();
        assert!(matches!(cli.command, Command::Backup));
    }

    #[test]
    fn test_restore_selector_optional() {
        let cli = Cli::try_parse_from(["finvault", "restore"]).unwrap();
        match cli.command {
            Command::Restore {
                selector,
                yes,
                non_interactive,
            } => {
                assert!(selector.is_none());
                assert!(!yes);
                assert!(!non_interactive);
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn test_restore_with_selector_and_flags() {
        let cli =
            Cli::try_parse_from(["finvault", "restore", "latest", "--yes", "--non-interactive"])
                .unwrap();
        match cli.command {
            Command::Restore {
                selector,
                yes,
                non_interactive,
            } => {
                assert_eq!(selector.as_deref(), Some("latest"));
                assert!(yes);
                assert!(non_interactive);
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["finvault", "panic"]).is_err());
    }
}
