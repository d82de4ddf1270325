//! Persisted attendance settings.
//!
//! One instance exists per engine. It is replaced wholesale on save, reset and
//! restore; individual fields are never patched in place by the engine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hour of day against which lateness is measured.
pub const REFERENCE_HOUR: u32 = 9;

/// User-editable attendance configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Minimum acceptable attendance rate, in percent.
    pub attendance_threshold: u8,
    /// Minutes past [`REFERENCE_HOUR`] after which an arrival is late.
    pub late_threshold: u32,
    /// Minutes after which unmarked students are considered absent.
    pub auto_mark_absent: u32,
    /// Recognition model tag.
    pub recognition_model: String,
    /// Minimum detection confidence, in percent.
    pub confidence_threshold: u8,
    /// Allow several faces per frame.
    pub multiple_faces: bool,
    /// Send email notifications.
    pub email_notifications: bool,
    /// Play a sound when attendance is marked.
    pub sound_notifications: bool,
    /// Alert on low attendance.
    pub low_attendance_alerts: bool,
    /// Backup frequency tag.
    pub backup_frequency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attendance_threshold: 75,
            late_threshold: 15,
            auto_mark_absent: 0,
            recognition_model: "advanced".to_string(),
            confidence_threshold: 85,
            multiple_faces: false,
            email_notifications: true,
            sound_notifications: true,
            low_attendance_alerts: false,
            backup_frequency: "weekly".to_string(),
        }
    }
}

impl Settings {
    /// Validate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a percentage exceeds 100 or the late
    /// threshold does not fit within the reference hour.
    pub fn validate(&self) -> Result<()> {
        if self.attendance_threshold > 100 {
            return Err(Error::invalid_input(format!(
                "attendance threshold must be at most 100, got {}",
                self.attendance_threshold
            )));
        }
        if self.confidence_threshold > 100 {
            return Err(Error::invalid_input(format!(
                "confidence threshold must be at most 100, got {}",
                self.confidence_threshold
            )));
        }
        if self.late_threshold >= 60 {
            return Err(Error::invalid_input(format!(
                "late threshold must be below 60 minutes, got {}",
                self.late_threshold
            )));
        }
        if self.recognition_model.trim().is_empty() {
            return Err(Error::invalid_input("recognition model is required"));
        }
        Ok(())
    }
}
