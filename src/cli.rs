//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use rotten_checker::{CheckResult, CheckType, StorageType};
use std::path::PathBuf;

/// Check whether IDs appear in a moderation export, and fetch new exports.
#[derive(Parser)]
#[command(name = "rotten", version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML); defaults to the platform config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Find export directories below a root
    Scan {
        /// Directory to search (defaults to the configured search root)
        root: Option<PathBuf>,
    },

    /// Print the number of records in an export
    Count {
        #[command(flatten)]
        export: ExportArgs,
    },

    /// Look up one or more IDs
    Check {
        #[command(flatten)]
        export: ExportArgs,

        /// Raw user or group IDs
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// List releases compatible with this engine
    Releases,

    /// Download and install a release
    Download {
        /// Release tag
        tag: String,

        /// Install location (defaults to the configured download directory)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Export directory
    #[arg(long)]
    pub dir: PathBuf,

    /// Storage encoding (sqlite, binary, csv)
    #[arg(long, value_parser = parse_storage_type)]
    pub storage: StorageType,

    /// Record set to consult (user, group, friends)
    #[arg(long = "type", value_parser = parse_check_type, default_value = "user")]
    pub check_type: CheckType,
}

fn parse_storage_type(value: &str) -> Result<StorageType, String> {
    value.parse().map_err(|err: rotten_checker::error::Error| (*err).to_string())
}

fn parse_check_type(value: &str) -> Result<CheckType, String> {
    value.parse().map_err(|err: rotten_checker::error::Error| (*err).to_string())
}

/// One tab-separated output line per looked-up ID.
pub fn describe(id: u64, result: &CheckResult) -> String {
    match result.found {
        true => format!("{id}\tfound\t{}\t{}\t{:.2}", result.status, result.reason, result.confidence),
        false => format!("{id}\tnot found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let args = ["rotten", "-v", "check", "--dir", "out", "--storage", "binary", "--type", "friends", "1", "2"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        let Command::Check { export, ids } = cli.command else {
            panic!("expected the check command");
        };
        assert_eq!(export.dir, PathBuf::from("out"));
        assert_eq!(export.storage, StorageType::Binary);
        assert_eq!(export.check_type, CheckType::Friends);
        assert_eq!(ids, vec![1, 2]);
    }

    #[rstest]
    #[case::unknown_storage(&["rotten", "count", "--dir", "out", "--storage", "parquet"])]
    #[case::unknown_type(&["rotten", "count", "--dir", "out", "--storage", "csv", "--type", "channel"])]
    #[case::no_ids(&["rotten", "check", "--dir", "out", "--storage", "csv"])]
    #[case::negative_id(&["rotten", "check", "--dir", "out", "--storage", "csv", "-5"])]
    fn test_parse_rejects(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[rstest]
    #[case(CheckResult::found("flagged", "spam", 0.5), "7\tfound\tflagged\tspam\t0.50")]
    #[case(CheckResult::not_found(), "7\tnot found")]
    fn test_describe(#[case] result: CheckResult, #[case] expected: &str) {
        assert_eq!(describe(7, &result), expected);
    }
}
