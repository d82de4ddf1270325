//! CLI command definitions.
//!
//! Students are addressed by roll number and faculty by faculty code; record
//! ids are only needed to delete a single attendance record.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::model::{AttendanceMethod, AttendanceStatus};
use crate::report::AttendanceBand;
use crate::settings::Settings;

/// Student registry commands.
#[derive(Debug, Subcommand)]
pub enum StudentCommand {
    /// Register a student
    Add {
        /// Full name
        name: String,
        /// Unique roll number
        roll_number: String,
        /// Department
        #[arg(short, long)]
        department: String,
        /// Class section
        #[arg(short = 'C', long = "class")]
        class_section: String,
        /// Contact email
        #[arg(long)]
        email: Option<String>,
        /// Contact phone
        #[arg(long)]
        phone: Option<String>,
    },

    /// List registered students
    List {
        /// Only this class section
        #[arg(short = 'C', long = "class")]
        class_section: Option<String>,
        /// Only this department
        #[arg(short, long)]
        department: Option<String>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show a student's attendance profile
    Show {
        /// Roll number
        roll_number: String,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a student and all of their attendance records
    Delete {
        /// Roll number
        roll_number: String,
    },
}

/// Faculty registry commands.
#[derive(Debug, Subcommand)]
pub enum FacultyCommand {
    /// Add a faculty member
    Add {
        /// Full name
        name: String,
        /// Unique faculty code
        faculty_code: String,
        /// Department
        #[arg(short, long)]
        department: String,
        /// Contact email
        #[arg(long)]
        email: Option<String>,
        /// Subject taught (repeatable)
        #[arg(short, long = "subject")]
        subjects: Vec<String>,
    },

    /// List faculty
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a faculty member
    Delete {
        /// Faculty code
        faculty_code: String,
    },
}

/// Class section commands.
#[derive(Debug, Subcommand)]
pub enum ClassCommand {
    /// Create a class section
    Add {
        /// Class section name
        name: String,
    },

    /// List class sections and departments
    List,
}

/// Attendance commands.
#[derive(Debug, Subcommand)]
pub enum AttendCommand {
    /// Mark a student's attendance
    Mark {
        /// Roll number
        roll_number: String,
        /// Class section
        #[arg(short = 'C', long = "class")]
        class_section: String,
        /// Detection time, e.g. "2024-01-15 09:05" (defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        at: Option<NaiveDateTime>,
        /// Capture method
        #[arg(short, long, value_enum, default_value_t = MethodArg::Manual)]
        method: MethodArg,
        /// Recognition confidence in percent
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        confidence: Option<u8>,
    },

    /// Delete one attendance record
    Delete {
        /// Record id
        id: Uuid,
    },

    /// Show today's attendance
    Today {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// First date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Report on the last N days (default from configuration)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub days: Option<u32>,

    /// Report on all records regardless of date
    #[arg(long, conflicts_with_all = ["from", "to", "days"])]
    pub all: bool,

    /// Only this class section
    #[arg(short = 'C', long = "class")]
    pub class_section: Option<String>,

    /// Student name or roll number substring
    #[arg(short, long)]
    pub student: Option<String>,

    /// Only this status
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Matches name, roll number, department or email
    pub query: Option<String>,

    /// Only this department
    #[arg(short, long)]
    pub department: Option<String>,

    /// Only this class section
    #[arg(short = 'C', long = "class")]
    pub class_section: Option<String>,

    /// Only this attendance band
    #[arg(short, long, value_enum)]
    pub band: Option<BandArg>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Summary command arguments.
#[derive(Debug, Args)]
pub struct SummaryCommand {
    /// Date to summarize (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Capture session arguments.
#[derive(Debug, Args)]
pub struct SessionCommand {
    /// Class section to record against
    #[arg(short = 'C', long = "class")]
    pub class_section: String,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Stop after this many detections
    #[arg(long)]
    pub max_detections: Option<usize>,

    /// Chance of a detection per poll, between 0 and 1
    #[arg(long)]
    pub probability: Option<f64>,

    /// Seed for a reproducible simulation
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change one or more settings
    Set(SettingsUpdate),

    /// Restore default settings
    Reset,
}

/// Fields to change in the settings record.
#[derive(Debug, Default, Args)]
pub struct SettingsUpdate {
    /// Minimum acceptable attendance rate in percent
    #[arg(long)]
    pub attendance_threshold: Option<u8>,

    /// Minutes past 09:00 after which arrivals are late
    #[arg(long)]
    pub late_threshold: Option<u32>,

    /// Minutes after which unmarked students count as absent
    #[arg(long)]
    pub auto_mark_absent: Option<u32>,

    /// Recognition model tag
    #[arg(long)]
    pub recognition_model: Option<String>,

    /// Minimum detection confidence in percent
    #[arg(long)]
    pub confidence_threshold: Option<u8>,

    /// Allow several faces per frame
    #[arg(long)]
    pub multiple_faces: Option<bool>,

    /// Email notifications
    #[arg(long)]
    pub email_notifications: Option<bool>,

    /// Sound notifications
    #[arg(long)]
    pub sound_notifications: Option<bool>,

    /// Low attendance alerts
    #[arg(long)]
    pub low_attendance_alerts: Option<bool>,

    /// Backup frequency tag
    #[arg(long)]
    pub backup_frequency: Option<String>,
}

impl SettingsUpdate {
    /// Whether no field was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attendance_threshold.is_none()
            && self.late_threshold.is_none()
            && self.auto_mark_absent.is_none()
            && self.recognition_model.is_none()
            && self.confidence_threshold.is_none()
            && self.multiple_faces.is_none()
            && self.email_notifications.is_none()
            && self.sound_notifications.is_none()
            && self.low_attendance_alerts.is_none()
            && self.backup_frequency.is_none()
    }

    /// `base` with the given fields replaced.
    #[must_use]
    pub fn apply_to(self, base: Settings) -> Settings {
        Settings {
            attendance_threshold: self.attendance_threshold.unwrap_or(base.attendance_threshold),
            late_threshold: self.late_threshold.unwrap_or(base.late_threshold),
            auto_mark_absent: self.auto_mark_absent.unwrap_or(base.auto_mark_absent),
            recognition_model: self.recognition_model.unwrap_or(base.recognition_model),
            confidence_threshold: self.confidence_threshold.unwrap_or(base.confidence_threshold),
            multiple_faces: self.multiple_faces.unwrap_or(base.multiple_faces),
            email_notifications: self.email_notifications.unwrap_or(base.email_notifications),
            sound_notifications: self.sound_notifications.unwrap_or(base.sound_notifications),
            low_attendance_alerts: self
                .low_attendance_alerts
                .unwrap_or(base.low_attendance_alerts),
            backup_frequency: self.backup_frequency.unwrap_or(base.backup_frequency),
        }
    }
}

/// Backup command arguments.
#[derive(Debug, Args)]
pub struct BackupCommand {
    /// Write to this file; a dated file name in the current directory if
    /// omitted
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print to stdout instead of writing a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

/// Restore command arguments.
#[derive(Debug, Args)]
pub struct RestoreCommand {
    /// Backup file to restore
    pub file: PathBuf,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Confirm deletion of all data
    #[arg(long)]
    pub yes: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration management commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file (uses default if not specified)
        file: Option<PathBuf>,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    Table,
    /// Comma-separated values
    Csv,
    /// JSON array
    Json,
}

/// Capture method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    /// Entered by an operator
    Manual,
    /// From face recognition
    Face,
}

impl From<MethodArg> for AttendanceMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Manual => Self::Manual,
            MethodArg::Face => Self::FaceRecognition,
        }
    }
}

/// Status filter argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// On time
    Present,
    /// After the late cutoff
    Late,
    /// Absent
    Absent,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Present => Self::Present,
            StatusArg::Late => Self::Late,
            StatusArg::Absent => Self::Absent,
        }
    }
}

/// Attendance band argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BandArg {
    /// 80% and above
    High,
    /// 60% to 79%
    Medium,
    /// Below 60%, or no records
    Low,
}

impl From<BandArg> for AttendanceBand {
    fn from(arg: BandArg) -> Self {
        match arg {
            BandArg::High => Self::High,
            BandArg::Medium => Self::Medium,
            BandArg::Low => Self::Low,
        }
    }
}

/// Parse `YYYY-MM-DD HH:MM[:SS]`, with a space or `T` separator.
fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM[:SS], got '{value}'"))
}
