//! `rollcall` - attendance record lifecycle and reporting
//!
//! This library keeps a registry of students and faculty, classifies
//! detections into Present or Late attendance records (at most one per
//! student, class and day), and answers filter, rate and summary queries over
//! them. State lives in an [`AttendanceEngine`] that persists to a
//! [`KeyValueStore`] after every mutation.
//!
//! ```no_run
//! use rollcall::{AttendanceEngine, NewStudent, SqliteStore, SystemClock};
//! use rollcall::model::AttendanceMethod;
//!
//! # fn main() -> rollcall::Result<()> {
//! let store = SqliteStore::open("rollcall.db")?;
//! let mut engine = AttendanceEngine::load(store, SystemClock)?;
//! let ada = engine.add_student(NewStudent::new("Ada", "CS-001", "CS", "CS-A"))?;
//! engine.mark_attendance_now(ada.id, "CS-A", AttendanceMethod::Manual, None)?;
//! println!("{}%", engine.attendance_rate(ada.id));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod export;
pub mod feed;
pub mod logging;
pub mod model;
pub mod report;
pub mod session;
pub mod settings;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use engine::{AttendanceEngine, StudentProfile};
pub use error::{Error, ErrorKind, Result};
pub use export::BackupDocument;
pub use feed::{FeedCategory, LiveFeed, LiveFeedEntry, Notifier};
pub use logging::init_logging;
pub use model::{AttendanceRecord, Faculty, NewFaculty, NewStudent, Student};
pub use report::AttendanceFilter;
pub use settings::Settings;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageStats, StoreKey};
