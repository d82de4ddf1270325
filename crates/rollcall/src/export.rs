//! CSV reports and JSON backups.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{AttendanceRecord, Faculty, Student};
use crate::settings::Settings;

/// Version tag written into every backup.
pub const BACKUP_VERSION: &str = "1.0";

/// Render rows of `(column, value)` pairs as CSV.
///
/// The header is taken from the first row's columns. A value containing a
/// comma is wrapped in double quotes, with embedded quotes doubled. An empty
/// input renders as an empty string.
#[must_use]
pub fn to_csv<K, V>(rows: &[Vec<(K, V)>]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        first
            .iter()
            .map(|(key, _)| csv_field(key.as_ref()))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            row.iter()
                .map(|(_, value)| csv_field(value.as_ref()))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// The report columns for one attendance record.
#[must_use]
pub fn attendance_row(record: &AttendanceRecord) -> Vec<(&'static str, String)> {
    vec![
        ("Date", record.date.format("%Y-%m-%d").to_string()),
        ("Time", record.time.format("%H:%M:%S").to_string()),
        ("Student Name", record.student_name.clone()),
        ("Roll Number", record.roll_number.clone()),
        ("Class", record.class_section.clone()),
        ("Department", record.department.clone()),
        ("Status", record.status.to_string()),
        ("Method", record.method.to_string()),
        (
            "Confidence",
            record
                .confidence
                .map_or_else(|| "N/A".to_string(), |c| format!("{c}%")),
        ),
    ]
}

/// Render attendance records as a CSV report.
#[must_use]
pub fn attendance_csv<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> String {
    let rows: Vec<_> = records.into_iter().map(attendance_row).collect();
    to_csv(&rows)
}

/// A complete snapshot of the persisted collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    /// Student registry.
    pub students: Vec<Student>,
    /// Faculty registry.
    pub faculty: Vec<Faculty>,
    /// Attendance records.
    pub attendance: Vec<AttendanceRecord>,
    /// Explicitly created class sections.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Settings record; defaults when absent.
    #[serde(default)]
    pub settings: Settings,
    /// When the backup was taken.
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    /// Backup format version.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    BACKUP_VERSION.to_string()
}

impl BackupDocument {
    /// Parse and validate a backup. Either the whole document is usable or an
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackup`] if the text is not a backup document,
    /// lacks the students, faculty or attendance collections, or breaks a
    /// uniqueness or reference rule.
    pub fn parse(text: &str) -> Result<Self> {
        let document: Self =
            serde_json::from_str(text).map_err(|e| Error::invalid_backup(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Check the registry invariants over the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackup`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let mut student_ids = HashSet::new();
        let mut rolls = HashSet::new();
        for student in &self.students {
            if !student_ids.insert(student.id) {
                return Err(Error::invalid_backup(format!(
                    "duplicate student id {}",
                    student.id
                )));
            }
            if !rolls.insert(student.roll_number.as_str()) {
                return Err(Error::invalid_backup(format!(
                    "duplicate roll number '{}'",
                    student.roll_number
                )));
            }
        }

        let mut codes = HashSet::new();
        for member in &self.faculty {
            if !codes.insert(member.faculty_code.as_str()) {
                return Err(Error::invalid_backup(format!(
                    "duplicate faculty code '{}'",
                    member.faculty_code
                )));
            }
        }

        let mut slots = HashSet::new();
        for record in &self.attendance {
            if !student_ids.contains(&record.student_id) {
                return Err(Error::invalid_backup(format!(
                    "attendance record {} refers to unknown student {}",
                    record.id, record.student_id
                )));
            }
            if !slots.insert((record.student_id, record.class_section.as_str(), record.date)) {
                return Err(Error::invalid_backup(format!(
                    "more than one record for {} in {} on {}",
                    record.roll_number, record.class_section, record.date
                )));
            }
        }

        self.settings
            .validate()
            .map_err(|e| Error::invalid_backup(e.to_string()))
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested file name, e.g. `attendance_backup_2024-01-15.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self.timestamp {
            Some(ts) => format!("attendance_backup_{}.json", ts.format("%Y-%m-%d")),
            None => "attendance_backup.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceMethod, AttendanceStatus, NewFaculty, NewStudent};
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn student(name: &str, roll: &str) -> Student {
        NewStudent::new(name, roll, "CS", "A")
            .into_student(at(1, 8, 0))
            .unwrap()
    }

    fn sample() -> BackupDocument {
        let ada = student("Ada", "R1");
        let record = AttendanceRecord::snapshot(
            &ada,
            "A",
            at(15, 9, 5),
            AttendanceStatus::Present,
            AttendanceMethod::FaceRecognition,
            Some(92),
        );
        BackupDocument {
            students: vec![ada],
            faculty: vec![NewFaculty::new("Grace", "F-1", "CS")
                .into_faculty(at(1, 8, 0))
                .unwrap()],
            attendance: vec![record],
            classes: vec!["A".to_string()],
            settings: Settings::default(),
            timestamp: Some(at(15, 12, 0)),
            version: BACKUP_VERSION.to_string(),
        }
    }

    #[test]
    fn test_csv_header_from_first_row() {
        let rows = vec![
            vec![("Name", "Ada"), ("Class", "A")],
            vec![("Name", "Bob"), ("Class", "B")],
        ];
        assert_eq!(to_csv(&rows), "Name,Class\nAda,A\nBob,B");
    }

    #[test]
    fn test_csv_quotes_values_with_commas() {
        let rows = vec![vec![("Name", "Lovelace, Ada"), ("Note", "said \"hi\", left")]];
        assert_eq!(
            to_csv(&rows),
            "Name,Note\n\"Lovelace, Ada\",\"said \"\"hi\"\", left\""
        );
    }

    #[test]
    fn test_csv_empty_input() {
        let rows: Vec<Vec<(&str, &str)>> = Vec::new();
        assert_eq!(to_csv(&rows), "");
    }

    #[test]
    fn test_attendance_csv_columns() {
        let doc = sample();
        let csv = attendance_csv(&doc.attendance);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Time,Student Name,Roll Number,Class,Department,Status,Method,Confidence")
        );
        assert_eq!(
            lines.next(),
            Some("2024-01-15,09:05:00,Ada,R1,A,CS,Present,Face Recognition,92%")
        );
    }

    #[test]
    fn test_confidence_defaults_to_na() {
        let mut doc = sample();
        doc.attendance[0].confidence = None;
        let row = attendance_row(&doc.attendance[0]);
        assert_eq!(row.last().unwrap().1, "N/A");
    }

    #[test]
    fn test_backup_roundtrip() {
        let doc = sample();
        let text = doc.to_pretty_json().unwrap();
        assert!(text.contains("\"version\": \"1.0\""));
        let parsed = BackupDocument::parse(&text).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_backup_requires_core_collections() {
        let err = BackupDocument::parse(r#"{"students": [], "faculty": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidBackup { .. }));
        assert!(err.to_string().contains("attendance"));
    }

    #[test]
    fn test_backup_optional_sections_default() {
        let doc =
            BackupDocument::parse(r#"{"students": [], "faculty": [], "attendance": []}"#).unwrap();
        assert!(doc.classes.is_empty());
        assert_eq!(doc.settings, Settings::default());
        assert_eq!(doc.version, BACKUP_VERSION);
    }

    #[test]
    fn test_backup_rejects_malformed_json() {
        assert!(matches!(
            BackupDocument::parse("{not json"),
            Err(Error::InvalidBackup { .. })
        ));
    }

    #[test]
    fn test_backup_rejects_duplicate_roll() {
        let mut doc = sample();
        doc.students.push(student("Imposter", "R1"));
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate roll number"));
    }

    #[test]
    fn test_backup_rejects_orphan_record() {
        let mut doc = sample();
        doc.students.clear();
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("unknown student"));
    }

    #[test]
    fn test_backup_rejects_duplicate_slot() {
        let mut doc = sample();
        let mut again = doc.attendance[0].clone();
        again.id = uuid::Uuid::new_v4();
        doc.attendance.push(again);
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(sample().file_name(), "attendance_backup_2024-01-15.json");
    }
}
