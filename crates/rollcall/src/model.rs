//! Core record types for rollcall.
//!
//! Students and faculty are registry entries; an [`AttendanceRecord`] is an
//! immutable fact written once by the classifier or by manual entry.
//!
//! Attendance records carry a snapshot of the student's name, roll number and
//! department taken when the record was written. Later edits to the student do
//! not flow into existing records; reports show what was true at marking time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::whole_seconds;
use crate::error::{Error, Result};

/// Identifier of a [`Student`].
pub type StudentId = Uuid;

/// Identifier of a [`Faculty`] member.
pub type FacultyId = Uuid;

/// Identifier of an [`AttendanceRecord`].
pub type RecordId = Uuid;

/// A registered student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Generated at creation, never reused.
    pub id: StudentId,
    /// Display name.
    pub name: String,
    /// Unique roll number.
    pub roll_number: String,
    /// Department name.
    pub department: String,
    /// Class section the student is enrolled in.
    #[serde(rename = "class")]
    pub class_section: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Opaque reference to a photo (path or data URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// When the student was registered.
    pub registered_at: NaiveDateTime,
}

/// Input for registering a student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    /// Display name.
    pub name: String,
    /// Roll number; must be unique.
    pub roll_number: String,
    /// Department name.
    pub department: String,
    /// Class section.
    pub class_section: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Photo reference.
    pub photo: Option<String>,
}

impl NewStudent {
    /// Create input with the required fields set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        roll_number: impl Into<String>,
        department: impl Into<String>,
        class_section: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            roll_number: roll_number.into(),
            department: department.into(),
            class_section: class_section.into(),
            ..Self::default()
        }
    }

    /// Set the contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the contact phone.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Build the stored student, trimming fields and dropping blank optionals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a required field is empty.
    pub fn into_student(self, registered_at: NaiveDateTime) -> Result<Student> {
        Ok(Student {
            id: Uuid::new_v4(),
            name: required("name", &self.name)?,
            roll_number: required("roll number", &self.roll_number)?,
            department: required("department", &self.department)?,
            class_section: required("class", &self.class_section)?,
            email: optional(self.email),
            phone: optional(self.phone),
            photo: optional(self.photo),
            registered_at: whole_seconds(registered_at),
        })
    }
}

/// A faculty member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    /// Generated at creation, never reused.
    pub id: FacultyId,
    /// Display name.
    pub name: String,
    /// Unique staff code.
    pub faculty_code: String,
    /// Department name.
    pub department: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Subjects taught.
    #[serde(default)]
    pub subjects: Vec<String>,
    /// When the faculty member was added.
    pub added_at: NaiveDateTime,
}

/// Input for adding a faculty member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFaculty {
    /// Display name.
    pub name: String,
    /// Staff code; must be unique.
    pub faculty_code: String,
    /// Department name.
    pub department: String,
    /// Contact email.
    pub email: Option<String>,
    /// Subjects taught.
    pub subjects: Vec<String>,
}

impl NewFaculty {
    /// Create input with the required fields set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        faculty_code: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            faculty_code: faculty_code.into(),
            department: department.into(),
            ..Self::default()
        }
    }

    /// Set the contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the subjects from newline-separated text.
    #[must_use]
    pub fn with_subjects_text(mut self, text: &str) -> Self {
        self.subjects = parse_subjects(text);
        self
    }

    /// Build the stored faculty member.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a required field is empty.
    pub fn into_faculty(self, added_at: NaiveDateTime) -> Result<Faculty> {
        Ok(Faculty {
            id: Uuid::new_v4(),
            name: required("name", &self.name)?,
            faculty_code: required("faculty code", &self.faculty_code)?,
            department: required("department", &self.department)?,
            email: optional(self.email),
            subjects: self
                .subjects
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            added_at: whole_seconds(added_at),
        })
    }
}

/// Split newline-separated subject text, dropping blank lines.
#[must_use]
pub fn parse_subjects(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Attendance outcome.
///
/// `Absent` is never written by the classifier. It exists so reports and
/// imported data can name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// Arrived on time.
    Present,
    /// Arrived after the late cutoff.
    Late,
    /// Did not attend.
    Absent,
}

impl AttendanceStatus {
    /// Parse a status name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Some(Self::Present),
            "late" => Some(Self::Late),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "Present"),
            Self::Late => write!(f, "Late"),
            Self::Absent => write!(f, "Absent"),
        }
    }
}

/// How an attendance record was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttendanceMethod {
    /// From a detection event.
    #[serde(rename = "Face Recognition")]
    FaceRecognition,
    /// Entered by an operator.
    #[default]
    Manual,
}

impl std::fmt::Display for AttendanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FaceRecognition => write!(f, "Face Recognition"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// One attendance fact for a student in a class on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Generated at creation.
    pub id: RecordId,
    /// The student this record belongs to.
    pub student_id: StudentId,
    /// Student name at marking time.
    pub student_name: String,
    /// Student roll number at marking time.
    pub roll_number: String,
    /// Student department at marking time.
    pub department: String,
    /// Class section attended.
    #[serde(rename = "class")]
    pub class_section: String,
    /// Calendar date of the detection.
    pub date: NaiveDate,
    /// Time of day of the detection.
    pub time: NaiveTime,
    /// Present or Late when written by the classifier.
    pub status: AttendanceStatus,
    /// Capture method.
    #[serde(default)]
    pub method: AttendanceMethod,
    /// Recognition confidence in percent, display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

impl AttendanceRecord {
    /// Build a record with the student's fields snapshotted now.
    #[must_use]
    pub fn snapshot(
        student: &Student,
        class_section: impl Into<String>,
        at: NaiveDateTime,
        status: AttendanceStatus,
        method: AttendanceMethod,
        confidence: Option<u8>,
    ) -> Self {
        let at = whole_seconds(at);
        Self {
            id: Uuid::new_v4(),
            student_id: student.id,
            student_name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            department: student.department.clone(),
            class_section: class_section.into(),
            date: at.date(),
            time: at.time(),
            status,
            method,
            confidence,
        }
    }

    /// Date and time combined, for ordering.
    #[must_use]
    pub fn marked_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Whether this record occupies the given (student, class, date) slot.
    #[must_use]
    pub fn occupies(&self, student_id: StudentId, class_section: &str, date: NaiveDate) -> bool {
        self.student_id == student_id && self.date == date && self.class_section == class_section
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_input(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
