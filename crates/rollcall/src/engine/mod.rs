//! The attendance engine.
//!
//! [`AttendanceEngine`] owns every collection. It is built once per process
//! from a [`KeyValueStore`] and a [`Clock`]; all mutation goes through its
//! methods, and each successful mutation writes all five collections back to
//! the store.
//!
//! Persistence is not transactional. If the store rejects a write the
//! in-memory change is kept, the error is returned, and the next successful
//! persist catches the store up.

mod admin;
pub mod classifier;
mod registry;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{whole_seconds, Clock};
use crate::error::{Error, Result};
use crate::feed::{FeedCategory, LiveFeed, LiveFeedEntry, Notifier, SilentNotifier};
use crate::model::{AttendanceRecord, Faculty, Student, StudentId};
use crate::report::{self, AttendanceFilter, Dashboard, DailySummary, StudentRate, StudentSearch};
use crate::settings::Settings;
use crate::storage::{KeyValueStore, StoreKey};

/// Default number of records shown in a student profile.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A student together with their attendance figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    /// The student.
    pub student: Student,
    /// Rounded attendance rate in percent.
    pub rate: u32,
    /// Number of records for the student.
    pub record_count: usize,
    /// Most recent records, most recent first.
    pub recent: Vec<AttendanceRecord>,
}

/// Record store, classifier and report front-end.
#[derive(Debug)]
pub struct AttendanceEngine<S, C> {
    store: S,
    clock: C,
    notifier: Box<dyn Notifier>,
    students: Vec<Student>,
    faculty: Vec<Faculty>,
    attendance: Vec<AttendanceRecord>,
    classes: Vec<String>,
    settings: Settings,
    feed: LiveFeed,
    history_limit: usize,
}

impl<S: KeyValueStore, C: Clock> AttendanceEngine<S, C> {
    /// Load every collection from `store`. Missing keys start empty, or with
    /// default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a stored collection
    /// does not have the expected shape.
    pub fn load(store: S, clock: C) -> Result<Self> {
        let students: Vec<Student> = read(&store, StoreKey::Students)?;
        let faculty: Vec<Faculty> = read(&store, StoreKey::Faculty)?;
        let attendance: Vec<AttendanceRecord> = read(&store, StoreKey::Attendance)?;
        let classes: Vec<String> = read(&store, StoreKey::Classes)?;
        let settings: Settings = read(&store, StoreKey::Settings)?;

        info!(
            students = students.len(),
            faculty = faculty.len(),
            records = attendance.len(),
            "Loaded attendance data"
        );

        Ok(Self {
            store,
            clock,
            notifier: Box::new(SilentNotifier),
            students,
            faculty,
            attendance,
            classes,
            settings,
            feed: LiveFeed::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    /// Use `notifier` for attendance chimes.
    #[must_use]
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Replace the live feed with an empty one of the given capacity.
    #[must_use]
    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed = LiveFeed::with_capacity(capacity);
        self
    }

    /// Number of records returned in a student profile.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Registered students, in registration order.
    #[must_use]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// Registered faculty, in registration order.
    #[must_use]
    pub fn faculty(&self) -> &[Faculty] {
        &self.faculty
    }

    /// All attendance records, in insertion order.
    #[must_use]
    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The live feed.
    #[must_use]
    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }

    /// The engine's clock.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The clock's current time, to the second.
    pub(crate) fn now(&self) -> chrono::NaiveDateTime {
        whole_seconds(self.clock.now())
    }

    /// Write all five collections to the store.
    ///
    /// Every key is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub fn persist(&mut self) -> Result<()> {
        let documents = [
            (StoreKey::Students, serde_json::to_value(&self.students)?),
            (StoreKey::Faculty, serde_json::to_value(&self.faculty)?),
            (StoreKey::Attendance, serde_json::to_value(&self.attendance)?),
            (StoreKey::Classes, serde_json::to_value(&self.classes)?),
            (StoreKey::Settings, serde_json::to_value(&self.settings)?),
        ];

        let mut first_error = None;
        for (key, value) in &documents {
            if let Err(e) = self.store.set(*key, value) {
                warn!("Failed to persist {}: {}", key, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Persisted all collections");
                Ok(())
            }
        }
    }

    /// Append a feed entry stamped with the current time.
    ///
    /// Attendance entries also reach the notifier while sound notifications
    /// are enabled.
    pub fn announce(&mut self, message: impl Into<String>, category: FeedCategory) -> &LiveFeedEntry {
        let now = self.now();
        let sound = self.settings.sound_notifications;
        let entry = self.feed.append(message, category, now);
        if category == FeedCategory::AttendanceMarked && sound {
            self.notifier.attendance_marked(entry);
        }
        entry
    }

    /// The last `n` feed entries, most recent first.
    #[must_use]
    pub fn recent_feed(&self, n: usize) -> Vec<&LiveFeedEntry> {
        self.feed.recent_entries(n)
    }

    /// Records matching `filter`, most recent first.
    #[must_use]
    pub fn filter_attendance(&self, filter: &AttendanceFilter) -> Vec<&AttendanceRecord> {
        report::filter_attendance(&self.attendance, filter)
    }

    /// The filter the report screen opens with: the last `days` days.
    #[must_use]
    pub fn default_report_filter(&self, days: u32) -> AttendanceFilter {
        AttendanceFilter::last_days(self.clock.today(), days)
    }

    /// Present share of a student's records, rounded; 0 without records.
    #[must_use]
    pub fn attendance_rate(&self, student_id: StudentId) -> u32 {
        report::attendance_rate(&self.attendance, student_id)
    }

    /// Cohort counts for today.
    #[must_use]
    pub fn todays_summary(&self) -> DailySummary {
        self.summary_for(self.clock.today())
    }

    /// Cohort counts for `date`.
    #[must_use]
    pub fn summary_for(&self, date: chrono::NaiveDate) -> DailySummary {
        report::daily_summary(&self.students, &self.attendance, date)
    }

    /// Today's records, most recent first.
    #[must_use]
    pub fn todays_attendance(&self) -> Vec<&AttendanceRecord> {
        let today = self.clock.today();
        let mut records: Vec<_> = self.attendance.iter().filter(|r| r.date == today).collect();
        report::sort_newest_first(&mut records);
        records
    }

    /// Headline numbers for today.
    #[must_use]
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::from_summary(&self.todays_summary(), self.faculty.len())
    }

    /// Students matching `search`.
    #[must_use]
    pub fn search_students(&self, search: &StudentSearch) -> Vec<&Student> {
        report::search_students(&self.students, &self.attendance, search)
    }

    /// Students under the configured attendance threshold, lowest first.
    #[must_use]
    pub fn below_threshold(&self) -> Vec<StudentRate> {
        report::below_threshold(
            &self.students,
            &self.attendance,
            self.settings.attendance_threshold,
        )
    }

    /// A student's rate, record count and recent history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudentNotFound`] for an unknown id.
    pub fn student_profile(&self, student_id: StudentId) -> Result<StudentProfile> {
        let student = self
            .student(student_id)
            .ok_or(Error::StudentNotFound(student_id))?;
        let tally = report::tally(&self.attendance, student_id);
        Ok(StudentProfile {
            student: student.clone(),
            rate: tally.rate(),
            record_count: tally.total,
            recent: report::recent_history(&self.attendance, student_id, self.history_limit)
                .into_iter()
                .cloned()
                .collect(),
        })
    }
}

fn read<T, S>(store: &S, key: StoreKey) -> Result<T>
where
    T: DeserializeOwned + Default,
    S: KeyValueStore,
{
    match store.get(key)? {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| Error::persistence(key, format!("unexpected shape: {e}"))),
    }
}
