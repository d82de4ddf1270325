//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AttendCommand, BackupCommand, BandArg, ClassCommand, ClearCommand, ConfigCommand,
    FacultyCommand, MethodArg, OutputFormat, ReportCommand, RestoreCommand, SearchCommand,
    SessionCommand, SettingsCommand, SettingsUpdate, StatusArg, StatusCommand, StudentCommand,
    SummaryCommand,
};

use crate::logging::Verbosity;

/// rollcall - Attendance records and reports
///
/// Keeps a registry of students and faculty, marks attendance once per
/// student, class and day, and reports on it.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database file (overrides configuration)
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),

    /// Manage faculty
    #[command(subcommand)]
    Faculty(FacultyCommand),

    /// Manage class sections
    #[command(subcommand)]
    Class(ClassCommand),

    /// Mark, delete and list attendance
    #[command(subcommand)]
    Attend(AttendCommand),

    /// Filtered attendance report
    Report(ReportCommand),

    /// Search students
    Search(SearchCommand),

    /// Daily summary and dashboard figures
    Summary(SummaryCommand),

    /// Run a simulated capture session
    Session(SessionCommand),

    /// View or change attendance settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Export all data as a JSON backup
    Backup(BackupCommand),

    /// Replace all data with a JSON backup
    Restore(RestoreCommand),

    /// Delete all data
    Clear(ClearCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "rollcall");
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["rollcall", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["rollcall", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["rollcall", "-vv", "status"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["rollcall", "-q", "status"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_student_add() {
        let cli = parse(&[
            "rollcall", "student", "add", "Ada Lovelace", "CS-001", "-d", "CS", "-C", "CS-A",
            "--email", "ada@example.com",
        ]);
        match cli.command {
            Command::Student(StudentCommand::Add {
                name,
                roll_number,
                class_section,
                email,
                ..
            }) => {
                assert_eq!(name, "Ada Lovelace");
                assert_eq!(roll_number, "CS-001");
                assert_eq!(class_section, "CS-A");
                assert_eq!(email.as_deref(), Some("ada@example.com"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_attend_mark() {
        let cli = parse(&[
            "rollcall", "attend", "mark", "CS-001", "--class", "CS-A", "--at",
            "2024-01-15 09:20", "--method", "face", "--confidence", "92",
        ]);
        match cli.command {
            Command::Attend(AttendCommand::Mark {
                at,
                method,
                confidence,
                ..
            }) => {
                assert_eq!(at.map(|t| t.to_string()).as_deref(), Some("2024-01-15 09:20:00"));
                assert_eq!(method, MethodArg::Face);
                assert_eq!(confidence, Some(92));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_attend_mark_rejects_confidence_over_100() {
        assert!(Cli::try_parse_from([
            "rollcall", "attend", "mark", "R1", "-C", "A", "--confidence", "150"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_report_filters() {
        let cli = parse(&[
            "rollcall", "report", "--from", "2024-01-01", "--to", "2024-01-31", "--status",
            "late", "--format", "csv",
        ]);
        match cli.command {
            Command::Report(report) => {
                assert_eq!(report.from.map(|d| d.to_string()).as_deref(), Some("2024-01-01"));
                assert_eq!(report.status, Some(StatusArg::Late));
                assert_eq!(report.format, OutputFormat::Csv);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_report_days_conflicts_with_range() {
        assert!(Cli::try_parse_from(["rollcall", "report", "--days", "7", "--from", "2024-01-01"])
            .is_err());
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = parse(&[
            "rollcall", "settings", "set", "--late-threshold", "10", "--sound-notifications",
            "false",
        ]);
        match cli.command {
            Command::Settings(SettingsCommand::Set(update)) => {
                assert_eq!(update.late_threshold, Some(10));
                assert_eq!(update.sound_notifications, Some(false));
                assert!(update.attendance_threshold.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config_and_database() {
        let cli = parse(&[
            "rollcall", "-c", "/custom/config.toml", "--database", "/tmp/r.db", "status",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/r.db")));
    }

    #[test]
    fn test_parse_status_json() {
        match parse(&["rollcall", "status", "--json"]).command {
            Command::Status(status) => assert!(status.json),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_clear_requires_flag_to_be_explicit() {
        match parse(&["rollcall", "clear"]).command {
            Command::Clear(clear) => assert!(!clear.yes),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
