//! Settings, backup, restore and clear.

use tracing::{info, warn};

use super::AttendanceEngine;
use crate::clock::Clock;
use crate::error::Result;
use crate::export::{BackupDocument, BACKUP_VERSION};
use crate::feed::FeedCategory;
use crate::settings::Settings;
use crate::storage::KeyValueStore;

impl<S: KeyValueStore, C: Clock> AttendanceEngine<S, C> {
    /// Replace the settings wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) if a value
    /// is out of range; the old settings stay.
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        info!("Settings updated");
        let persisted = self.persist();
        self.announce("System settings updated", FeedCategory::System);
        persisted
    }

    /// Restore default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn reset_settings(&mut self) -> Result<()> {
        self.settings = Settings::default();
        info!("Settings reset to defaults");
        let persisted = self.persist();
        self.announce("Settings reset to defaults", FeedCategory::System);
        persisted
    }

    /// Snapshot every collection, stamped with the current time.
    #[must_use]
    pub fn backup(&self) -> BackupDocument {
        BackupDocument {
            students: self.students.clone(),
            faculty: self.faculty.clone(),
            attendance: self.attendance.clone(),
            classes: self.classes.clone(),
            settings: self.settings.clone(),
            timestamp: Some(self.now()),
            version: BACKUP_VERSION.to_string(),
        }
    }

    /// Replace every collection with the contents of a backup document.
    ///
    /// Either the document is applied in full or nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackup`](crate::Error::InvalidBackup) for a
    /// document that does not parse or validate, or a persistence error after
    /// the document has been applied in memory.
    pub fn restore(&mut self, text: &str) -> Result<()> {
        let document = BackupDocument::parse(text).map_err(|e| {
            warn!("Rejected backup document: {}", e);
            e
        })?;
        self.apply(document)
    }

    /// Replace every collection with an already validated document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackup`](crate::Error::InvalidBackup) if the
    /// document breaks a registry rule, otherwise only persistence errors.
    pub fn apply(&mut self, document: BackupDocument) -> Result<()> {
        document.validate()?;
        info!(
            students = document.students.len(),
            faculty = document.faculty.len(),
            records = document.attendance.len(),
            version = %document.version,
            "Restoring backup"
        );

        self.students = document.students;
        self.faculty = document.faculty;
        self.attendance = document.attendance;
        self.classes = document.classes;
        self.settings = document.settings;

        let persisted = self.persist();
        self.announce("Data restored from backup", FeedCategory::System);
        persisted
    }

    /// Empty every collection, reset settings and clear the feed.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn clear_all(&mut self) -> Result<()> {
        self.students.clear();
        self.faculty.clear();
        self.attendance.clear();
        self.classes.clear();
        self.settings = Settings::default();
        self.feed.clear();
        warn!("All system data cleared");

        let persisted = self.persist();
        self.announce("All system data cleared", FeedCategory::Warning);
        persisted
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::engine::AttendanceEngine;
    use crate::error::Error;
    use crate::model::{AttendanceMethod, NewFaculty, NewStudent};
    use crate::settings::Settings;
    use crate::storage::{KeyValueStore, MemoryStore, StoreKey};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn populated() -> AttendanceEngine<MemoryStore, FixedClock> {
        let mut engine =
            AttendanceEngine::load(MemoryStore::new(), FixedClock::new(at(8, 0))).unwrap();
        let ada = engine
            .add_student(NewStudent::new("Ada", "R1", "CS", "A"))
            .unwrap()
            .id;
        engine
            .add_faculty(NewFaculty::new("Grace", "F-1", "CS"))
            .unwrap();
        engine.add_class("Z").unwrap();
        engine
            .mark_attendance(ada, "A", at(9, 30), AttendanceMethod::Manual, None)
            .unwrap();
        engine
    }

    #[test]
    fn test_save_settings_validates() {
        let mut engine = populated();
        let mut bad = Settings::default();
        bad.attendance_threshold = 150;
        assert!(matches!(
            engine.save_settings(bad),
            Err(Error::InvalidInput { .. })
        ));
        assert_eq!(engine.settings(), &Settings::default());

        let mut good = Settings::default();
        good.late_threshold = 0;
        engine.save_settings(good.clone()).unwrap();
        assert_eq!(engine.settings(), &good);
        assert_eq!(engine.recent_feed(1)[0].message, "System settings updated");

        engine.reset_settings().unwrap();
        assert_eq!(engine.settings(), &Settings::default());
    }

    #[test]
    fn test_backup_restore_into_empty_engine() {
        let source = populated();
        let text = source.backup().to_pretty_json().unwrap();

        let mut target =
            AttendanceEngine::load(MemoryStore::new(), FixedClock::new(at(12, 0))).unwrap();
        target.restore(&text).unwrap();

        assert_eq!(target.students(), source.students());
        assert_eq!(target.faculty(), source.faculty());
        assert_eq!(target.attendance(), source.attendance());
        assert_eq!(target.class_sections(), source.class_sections());
        assert!(target.store().get(StoreKey::Attendance).unwrap().is_some());
    }

    #[test]
    fn test_restore_is_all_or_nothing() {
        let mut engine = populated();
        let before = engine.backup();

        let err = engine
            .restore(r#"{"students": [], "faculty": []}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBackup { .. }));
        assert_eq!(engine.students(), before.students.as_slice());
        assert_eq!(engine.attendance(), before.attendance.as_slice());
    }

    #[test]
    fn test_backup_is_stamped_by_clock() {
        let engine = populated();
        let doc = engine.backup();
        assert_eq!(doc.timestamp, Some(at(8, 0)));
        assert_eq!(doc.version, "1.0");
    }

    #[test]
    fn test_clear_all() {
        let mut engine = populated();
        let mut settings = Settings::default();
        settings.late_threshold = 30;
        engine.save_settings(settings).unwrap();

        engine.clear_all().unwrap();
        assert!(engine.students().is_empty());
        assert!(engine.faculty().is_empty());
        assert!(engine.attendance().is_empty());
        assert!(engine.class_sections().is_empty());
        assert_eq!(engine.settings(), &Settings::default());
        assert_eq!(engine.feed().len(), 1);
        assert_eq!(
            engine.store().get(StoreKey::Students).unwrap(),
            Some(serde_json::json!([]))
        );
    }
}
