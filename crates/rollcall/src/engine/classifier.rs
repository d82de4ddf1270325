//! Attendance classification.
//!
//! A detection at `HH:MM` is late when the hour is past
//! [`REFERENCE_HOUR`](crate::settings::REFERENCE_HOUR), or when it is the
//! reference hour and the minute is past the configured late threshold. The
//! threshold minute itself is still on time.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tracing::{info, warn};

use super::AttendanceEngine;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::feed::FeedCategory;
use crate::model::{AttendanceMethod, AttendanceRecord, AttendanceStatus, RecordId, StudentId};
use crate::settings::REFERENCE_HOUR;
use crate::storage::KeyValueStore;

/// Whether a detection at `time` is late.
#[must_use]
pub fn is_late(time: NaiveTime, late_threshold: u32) -> bool {
    let (hour, minute) = (time.hour(), time.minute());
    hour > REFERENCE_HOUR || (hour == REFERENCE_HOUR && minute > late_threshold)
}

/// Present or Late for a detection at `time`. Never Absent.
#[must_use]
pub fn classify(time: NaiveTime, late_threshold: u32) -> AttendanceStatus {
    if is_late(time, late_threshold) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

impl<S: KeyValueStore, C: Clock> AttendanceEngine<S, C> {
    /// Record attendance for a detection at `detected_at`.
    ///
    /// At most one record exists per student, class and calendar date; a
    /// second attempt is rejected whatever the first record's status.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `class_section` is blank.
    /// - [`Error::StudentNotFound`] for an unknown student.
    /// - [`Error::DuplicateForDay`] if the slot is taken.
    /// - A persistence error, in which case the record is kept in memory.
    pub fn mark_attendance(
        &mut self,
        student_id: StudentId,
        class_section: &str,
        detected_at: NaiveDateTime,
        method: AttendanceMethod,
        confidence: Option<u8>,
    ) -> Result<AttendanceRecord> {
        let class_section = class_section.trim();
        if class_section.is_empty() {
            return Err(Error::invalid_input("class section is required"));
        }
        let student = self
            .student(student_id)
            .ok_or(Error::StudentNotFound(student_id))?;

        let date = detected_at.date();
        if let Some(existing) = self
            .attendance
            .iter()
            .find(|r| r.occupies(student_id, class_section, date))
        {
            warn!(
                student = %student_id,
                "{} already marked for {} on {}", student.roll_number, class_section, date
            );
            return Err(Error::DuplicateForDay {
                student_name: existing.student_name.clone(),
                class_section: class_section.to_string(),
                date,
                status: existing.status.to_string(),
            });
        }

        let status = classify(detected_at.time(), self.settings.late_threshold);
        let record = AttendanceRecord::snapshot(
            student,
            class_section,
            detected_at,
            status,
            method,
            confidence,
        );
        info!(
            student = %student_id,
            status = %status,
            "Marked {} for {}", record.roll_number, class_section
        );

        self.attendance.push(record.clone());
        let persisted = self.persist();
        self.announce(
            format!(
                "Attendance marked: {} ({}) - {status} in {class_section}",
                record.student_name, record.roll_number
            ),
            FeedCategory::AttendanceMarked,
        );
        persisted.map(|()| record)
    }

    /// [`mark_attendance`](Self::mark_attendance) at the clock's current time.
    ///
    /// # Errors
    ///
    /// As for [`mark_attendance`](Self::mark_attendance).
    pub fn mark_attendance_now(
        &mut self,
        student_id: StudentId,
        class_section: &str,
        method: AttendanceMethod,
        confidence: Option<u8>,
    ) -> Result<AttendanceRecord> {
        let now = self.now();
        self.mark_attendance(student_id, class_section, now, method, confidence)
    }

    /// Delete one attendance record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] for an unknown id.
    pub fn delete_attendance_record(&mut self, id: RecordId) -> Result<AttendanceRecord> {
        let index = self
            .attendance
            .iter()
            .position(|r| r.id == id)
            .ok_or(Error::RecordNotFound(id))?;

        let record = self.attendance.remove(index);
        info!(id = %id, "Deleted attendance record for {}", record.roll_number);
        let persisted = self.persist();
        self.announce(
            format!(
                "Attendance record deleted: {} on {}",
                record.student_name, record.date
            ),
            FeedCategory::System,
        );
        persisted.map(|()| record)
    }
}
