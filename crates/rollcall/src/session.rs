//! Timer-driven capture sessions.
//!
//! A session polls a [`DetectionSource`] on a fixed interval from its own
//! task and forwards detections over a channel. The calling task owns the
//! engine and is the only writer: detections are applied one at a time, in
//! arrival order, so the once-per-day rule holds without locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::detection::{Detection, DetectionSource};
use crate::engine::AttendanceEngine;
use crate::error::{Error, Result};
use crate::feed::FeedCategory;
use crate::model::{AttendanceMethod, StudentId};
use crate::storage::KeyValueStore;

/// Detections buffered between the poller and the engine.
const CHANNEL_CAPACITY: usize = 32;

/// How a session runs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Class section detections are recorded against.
    pub class_section: String,
    /// Time between polls.
    pub interval: Duration,
    /// Stop after this many detections; 0 runs until stopped.
    pub max_detections: usize,
}

impl SessionOptions {
    /// Options for `class_section` with the default 2 s poll interval.
    #[must_use]
    pub fn new(class_section: impl Into<String>) -> Self {
        Self {
            class_section: class_section.into(),
            interval: Duration::from_millis(2000),
            max_detections: 0,
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the detection limit.
    #[must_use]
    pub fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = max_detections;
        self
    }
}

/// Cloneable stop switch for a running session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    stop_signal: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Create a handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the session to stop. No further polls are issued.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// What happened during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Detections received from the source.
    pub detections: usize,
    /// Records written.
    pub marked: usize,
    /// Detections for a student already marked today.
    pub duplicates: usize,
    /// Detections under the confidence threshold.
    pub low_confidence: usize,
    /// Detections for a student no longer registered.
    pub unknown: usize,
    /// Detections that failed for any other reason.
    pub failures: usize,
}

/// Run a capture session until the handle is stopped, the detection limit is
/// reached, or the source is exhausted.
///
/// The roster is taken when the session starts.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a blank class section or a zero
/// interval. Failures on individual detections are counted in the report.
pub async fn run_session<S, C, D>(
    engine: &mut AttendanceEngine<S, C>,
    detector: D,
    options: SessionOptions,
    handle: SessionHandle,
) -> Result<SessionReport>
where
    S: KeyValueStore,
    C: Clock,
    D: DetectionSource + 'static,
{
    let class_section = options.class_section.trim().to_string();
    if class_section.is_empty() {
        return Err(Error::invalid_input("select a class before starting capture"));
    }
    if options.interval.is_zero() {
        return Err(Error::invalid_input("detection interval must be greater than 0"));
    }

    let roster: Vec<StudentId> = engine.students().iter().map(|s| s.id).collect();
    if roster.is_empty() {
        engine.announce("No students registered for recognition", FeedCategory::Warning);
    }

    info!(class = %class_section, students = roster.len(), "Starting capture session");
    engine.announce(
        format!("Camera started for attendance in {class_section}"),
        FeedCategory::System,
    );

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let poller = tokio::spawn(poll_detections(
        detector,
        roster,
        options.interval,
        handle.clone(),
        tx,
    ));

    let mut report = SessionReport::default();
    while let Some(detection) = rx.recv().await {
        if handle.should_stop() {
            break;
        }
        report.detections += 1;
        apply_detection(engine, &class_section, detection, &mut report);

        if options.max_detections > 0 && report.detections >= options.max_detections {
            debug!("Detection limit reached");
            break;
        }
    }

    handle.stop();
    drop(rx);
    if let Err(e) = poller.await {
        warn!("Detection task ended abnormally: {}", e);
    }

    info!(
        detections = report.detections,
        marked = report.marked,
        "Capture session ended"
    );
    engine.announce("Camera stopped", FeedCategory::System);
    Ok(report)
}

async fn poll_detections<D: DetectionSource>(
    mut detector: D,
    roster: Vec<StudentId>,
    interval: Duration,
    handle: SessionHandle,
    tx: mpsc::Sender<Detection>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if handle.should_stop() || detector.is_exhausted() {
            break;
        }
        if let Some(detection) = detector.next_detection(&roster) {
            if tx.send(detection).await.is_err() {
                break;
            }
        }
    }
}

fn apply_detection<S: KeyValueStore, C: Clock>(
    engine: &mut AttendanceEngine<S, C>,
    class_section: &str,
    detection: Detection,
    report: &mut SessionReport,
) {
    let threshold = engine.settings().confidence_threshold;
    if !detection.meets(threshold) {
        report.low_confidence += 1;
        engine.announce(
            format!(
                "Face detected but confidence too low: {}%",
                detection.confidence
            ),
            FeedCategory::Warning,
        );
        return;
    }

    match engine.mark_attendance_now(
        detection.student_id,
        class_section,
        AttendanceMethod::FaceRecognition,
        Some(detection.confidence),
    ) {
        Ok(_) => report.marked += 1,
        Err(Error::DuplicateForDay { .. }) => report.duplicates += 1,
        Err(Error::StudentNotFound(_)) => report.unknown += 1,
        Err(e) => {
            report.failures += 1;
            engine.announce(format!("Failed to mark attendance: {e}"), FeedCategory::Warning);
        }
    }
}
