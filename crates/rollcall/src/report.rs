//! Query and reporting over attendance collections.
//!
//! Everything here is a pure function of the slices it is given. The engine
//! passes its own collections in; tests pass hand-built ones.
//!
//! Absent is never stored by the classifier. A student without a record on a
//! date counts as absent only inside [`DailySummary`].

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::{AttendanceRecord, AttendanceStatus, Student, StudentId};

/// Criteria for [`filter_attendance`]. Every field is optional and the set
/// fields are AND-combined. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    /// Earliest date, inclusive.
    pub date_from: Option<NaiveDate>,
    /// Latest date, inclusive.
    pub date_to: Option<NaiveDate>,
    /// Exact class section.
    pub class_section: Option<String>,
    /// Case-insensitive substring of student name or roll number.
    pub student_query: Option<String>,
    /// Exact status.
    pub status: Option<AttendanceStatus>,
}

impl AttendanceFilter {
    /// The window covering the `days` days before `today`, through `today`.
    /// A window reaching past the earliest representable date starts there.
    #[must_use]
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let from = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            date_from: Some(from),
            date_to: Some(today),
            ..Self::default()
        }
    }

    /// Whether a record satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if self.date_from.is_some_and(|from| record.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| record.date > to) {
            return false;
        }
        if let Some(class) = non_blank(self.class_section.as_deref()) {
            if record.class_section != class {
                return false;
            }
        }
        if let Some(query) = non_blank(self.student_query.as_deref()) {
            let query = query.to_lowercase();
            if !contains_ci(&record.student_name, &query) && !contains_ci(&record.roll_number, &query)
            {
                return false;
            }
        }
        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }
        true
    }
}

/// Records matching `filter`, most recent first.
#[must_use]
pub fn filter_attendance<'a>(
    records: &'a [AttendanceRecord],
    filter: &AttendanceFilter,
) -> Vec<&'a AttendanceRecord> {
    let mut matched: Vec<_> = records.iter().filter(|r| filter.matches(r)).collect();
    sort_newest_first(&mut matched);
    matched
}

/// Sort by (date, time) descending. Ties keep insertion order.
pub fn sort_newest_first(records: &mut [&AttendanceRecord]) {
    records.sort_by(|a, b| b.marked_at().cmp(&a.marked_at()));
}

/// Every record of one student, oldest first.
#[must_use]
pub fn student_history(records: &[AttendanceRecord], student_id: StudentId) -> Vec<&AttendanceRecord> {
    let mut history: Vec<_> = records
        .iter()
        .filter(|r| r.student_id == student_id)
        .collect();
    history.sort_by_key(|r| r.marked_at());
    history
}

/// The most recent `limit` records of one student, most recent first.
#[must_use]
pub fn recent_history(
    records: &[AttendanceRecord],
    student_id: StudentId,
    limit: usize,
) -> Vec<&AttendanceRecord> {
    let history = student_history(records, student_id);
    let skip = history.len().saturating_sub(limit);
    history.into_iter().skip(skip).rev().collect()
}

/// Present and total record counts for one student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Records with status Present.
    pub present: usize,
    /// All records.
    pub total: usize,
}

impl Tally {
    fn add(&mut self, record: &AttendanceRecord) {
        self.total += 1;
        if record.status == AttendanceStatus::Present {
            self.present += 1;
        }
    }

    /// Present share in percent, unrounded. `None` without records.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.present as f64 / self.total as f64 * 100.0)
    }

    /// Present share in percent, rounded half up. 0 without records.
    #[must_use]
    pub fn rate(&self) -> u32 {
        rounded_percent(self.present, self.total)
    }
}

/// Tally of one student's records.
#[must_use]
pub fn tally(records: &[AttendanceRecord], student_id: StudentId) -> Tally {
    let mut tally = Tally::default();
    for record in records.iter().filter(|r| r.student_id == student_id) {
        tally.add(record);
    }
    tally
}

/// Tallies for every student that has records.
#[must_use]
pub fn tally_all(records: &[AttendanceRecord]) -> HashMap<StudentId, Tally> {
    let mut tallies: HashMap<StudentId, Tally> = HashMap::new();
    for record in records {
        tallies.entry(record.student_id).or_default().add(record);
    }
    tallies
}

/// Share of Present records for a student, in whole percent.
///
/// Late records count against the rate. Returns 0 when the student has no
/// records.
#[must_use]
pub fn attendance_rate(records: &[AttendanceRecord], student_id: StudentId) -> u32 {
    tally(records, student_id).rate()
}

/// Attendance band used by student search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    /// Rate of 80% or more.
    High,
    /// Rate from 60% up to 80%.
    Medium,
    /// Rate under 60%, or no records.
    Low,
}

impl AttendanceBand {
    /// Band for a tally. Uses the unrounded rate.
    #[must_use]
    pub fn of(tally: Tally) -> Self {
        match tally.ratio() {
            Some(rate) if rate >= 80.0 => Self::High,
            Some(rate) if rate >= 60.0 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Parse a band name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Criteria for [`search_students`]. Set fields are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentSearch {
    /// Case-insensitive substring of name, roll number, department or email.
    pub query: Option<String>,
    /// Exact department.
    pub department: Option<String>,
    /// Exact class section.
    pub class_section: Option<String>,
    /// Attendance band.
    pub band: Option<AttendanceBand>,
}

/// Students matching `search`, in registry order.
#[must_use]
pub fn search_students<'a>(
    students: &'a [Student],
    records: &[AttendanceRecord],
    search: &StudentSearch,
) -> Vec<&'a Student> {
    let query = non_blank(search.query.as_deref()).map(str::to_lowercase);
    let department = non_blank(search.department.as_deref());
    let class_section = non_blank(search.class_section.as_deref());
    let tallies = search.band.map(|_| tally_all(records));

    students
        .iter()
        .filter(|student| {
            query.as_deref().map_or(true, |q| {
                contains_ci(&student.name, q)
                    || contains_ci(&student.roll_number, q)
                    || contains_ci(&student.department, q)
                    || student.email.as_deref().is_some_and(|e| contains_ci(e, q))
            })
        })
        .filter(|student| department.map_or(true, |d| student.department == d))
        .filter(|student| class_section.map_or(true, |c| student.class_section == c))
        .filter(|student| match (search.band, &tallies) {
            (Some(band), Some(tallies)) => {
                let tally = tallies.get(&student.id).copied().unwrap_or_default();
                AttendanceBand::of(tally) == band
            }
            _ => true,
        })
        .collect()
}

/// Per-date cohort counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// The summarized date.
    pub date: NaiveDate,
    /// Registered students.
    pub total_students: usize,
    /// Records marked on the date, any status.
    pub marked: usize,
    /// Present records on the date.
    pub present_count: usize,
    /// Late records on the date.
    pub late_count: usize,
    /// `total_students - present - late`, floored at 0.
    ///
    /// Counts records, not students: a student marked in two classes on one
    /// day is counted twice, which can push this below the true figure.
    pub absent_count: usize,
}

/// Cohort counts for `date`.
#[must_use]
pub fn daily_summary(
    students: &[Student],
    records: &[AttendanceRecord],
    date: NaiveDate,
) -> DailySummary {
    let on_date = records.iter().filter(|r| r.date == date);
    let (mut marked, mut present, mut late) = (0, 0, 0);
    for record in on_date {
        marked += 1;
        match record.status {
            AttendanceStatus::Present => present += 1,
            AttendanceStatus::Late => late += 1,
            AttendanceStatus::Absent => {}
        }
    }

    DailySummary {
        date,
        total_students: students.len(),
        marked,
        present_count: present,
        late_count: late,
        absent_count: students.len().saturating_sub(present + late),
    }
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Registered students.
    pub total_students: usize,
    /// Registered faculty.
    pub total_faculty: usize,
    /// Records marked today.
    pub marked_today: usize,
    /// `marked_today / total_students` in whole percent, 0 without students.
    pub attendance_rate_today: u32,
}

impl Dashboard {
    /// Build from today's summary and the faculty count.
    #[must_use]
    pub fn from_summary(summary: &DailySummary, total_faculty: usize) -> Self {
        Self {
            total_students: summary.total_students,
            total_faculty,
            marked_today: summary.marked,
            attendance_rate_today: rounded_percent(summary.marked, summary.total_students),
        }
    }
}

/// A student with their current rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRate {
    /// The student.
    pub student: Student,
    /// Rounded rate in percent.
    pub rate: u32,
    /// Number of records.
    pub records: usize,
}

/// Students with records whose rounded rate is under `threshold` percent,
/// lowest first.
#[must_use]
pub fn below_threshold(
    students: &[Student],
    records: &[AttendanceRecord],
    threshold: u8,
) -> Vec<StudentRate> {
    let tallies = tally_all(records);
    let mut flagged: Vec<_> = students
        .iter()
        .filter_map(|student| {
            let tally = tallies.get(&student.id)?;
            let rate = tally.rate();
            (rate < u32::from(threshold)).then(|| StudentRate {
                student: student.clone(),
                rate,
                records: tally.total,
            })
        })
        .collect();
    flagged.sort_by_key(|s| s.rate);
    flagged
}

/// `part / whole * 100`, rounded half up; 0 when `whole` is 0.
fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let value = (200 * part + whole) / (2 * whole);
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `needle` must already be lowercase.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceMethod, NewStudent};
    use chrono::NaiveDateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        d.and_hms_opt(h, min, 0).unwrap()
    }

    fn student(name: &str, roll: &str, dept: &str, class: &str) -> Student {
        NewStudent::new(name, roll, dept, class)
            .into_student(at(date(2024, 1, 1), 8, 0))
            .unwrap()
    }

    fn record(s: &Student, class: &str, when: NaiveDateTime, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord::snapshot(s, class, when, status, AttendanceMethod::Manual, None)
    }

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let ada = student("Ada", "R1", "CS", "A");
        let records = vec![
            record(&ada, "A", at(date(2024, 1, 15), 9, 0), AttendanceStatus::Present),
            record(&ada, "A", at(date(2024, 2, 1), 9, 0), AttendanceStatus::Present),
            record(&ada, "A", at(date(2024, 1, 31), 9, 0), AttendanceStatus::Late),
        ];
        let filter = AttendanceFilter {
            date_from: Some(date(2024, 1, 1)),
            date_to: Some(date(2024, 1, 31)),
            ..AttendanceFilter::default()
        };

        let matched = filter_attendance(&records, &filter);
        let dates: Vec<_> = matched.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 1, 15)]);
    }

    #[test]
    fn test_filter_predicates_are_anded() {
        let ada = student("Ada Lovelace", "CS-001", "CS", "A");
        let bob = student("Bob", "ME-002", "ME", "B");
        let day = date(2024, 1, 15);
        let records = vec![
            record(&ada, "A", at(day, 9, 0), AttendanceStatus::Present),
            record(&ada, "B", at(day, 10, 0), AttendanceStatus::Late),
            record(&bob, "B", at(day, 9, 30), AttendanceStatus::Late),
        ];

        let filter = AttendanceFilter {
            class_section: Some("B".to_string()),
            student_query: Some("LOVE".to_string()),
            status: Some(AttendanceStatus::Late),
            ..AttendanceFilter::default()
        };
        let matched = filter_attendance(&records, &filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].student_name, "Ada Lovelace");

        let by_roll = AttendanceFilter {
            student_query: Some("me-0".to_string()),
            ..AttendanceFilter::default()
        };
        assert_eq!(filter_attendance(&records, &by_roll).len(), 1);
    }

    #[test]
    fn test_blank_filter_fields_are_ignored() {
        let ada = student("Ada", "R1", "CS", "A");
        let records = vec![record(&ada, "A", at(date(2024, 1, 15), 9, 0), AttendanceStatus::Present)];
        let filter = AttendanceFilter {
            class_section: Some("  ".to_string()),
            student_query: Some(String::new()),
            ..AttendanceFilter::default()
        };
        assert_eq!(filter_attendance(&records, &filter).len(), 1);
    }

    #[test]
    fn test_filter_sorts_newest_first_across_dates_and_times() {
        let ada = student("Ada", "R1", "CS", "A");
        let records = vec![
            record(&ada, "A", at(date(2024, 1, 14), 11, 0), AttendanceStatus::Late),
            record(&ada, "B", at(date(2024, 1, 15), 8, 0), AttendanceStatus::Present),
            record(&ada, "C", at(date(2024, 1, 15), 10, 0), AttendanceStatus::Late),
        ];
        let matched = filter_attendance(&records, &AttendanceFilter::default());
        let classes: Vec<_> = matched.iter().map(|r| r.class_section.as_str()).collect();
        assert_eq!(classes, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_last_days_window() {
        let filter = AttendanceFilter::last_days(date(2024, 3, 1), 30);
        assert_eq!(filter.date_from, Some(date(2024, 1, 31)));
        assert_eq!(filter.date_to, Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_last_days_huge_window_starts_at_earliest_date() {
        let filter = AttendanceFilter::last_days(date(2024, 1, 15), 4_000_000_000);
        assert_eq!(filter.date_from, Some(NaiveDate::MIN));
        assert_eq!(filter.date_to, Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_attendance_rate() {
        let ada = student("Ada", "R1", "CS", "A");
        let bob = student("Bob", "R2", "CS", "A");
        let mut records = Vec::new();
        for day in 1..=3 {
            records.push(record(&ada, "A", at(date(2024, 1, day), 9, 0), AttendanceStatus::Present));
        }
        records.push(record(&ada, "A", at(date(2024, 1, 4), 9, 30), AttendanceStatus::Late));

        assert_eq!(attendance_rate(&records, ada.id), 75);
        assert_eq!(attendance_rate(&records, bob.id), 0);
    }

    #[test]
    fn test_rate_rounds_half_up() {
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(0, 0), 0);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(AttendanceBand::of(Tally { present: 4, total: 5 }), AttendanceBand::High);
        assert_eq!(AttendanceBand::of(Tally { present: 3, total: 5 }), AttendanceBand::Medium);
        assert_eq!(AttendanceBand::of(Tally { present: 1, total: 2 }), AttendanceBand::Low);
        assert_eq!(AttendanceBand::of(Tally::default()), AttendanceBand::Low);
    }

    #[test]
    fn test_band_uses_unrounded_rate() {
        // 79.6% rounds to 80 but is still medium.
        let tally = Tally { present: 199, total: 250 };
        assert_eq!(tally.rate(), 80);
        assert_eq!(AttendanceBand::of(tally), AttendanceBand::Medium);
    }

    #[test]
    fn test_search_text_matches_any_field() {
        let ada = student("Ada", "CS-001", "Computing", "A");
        let mut bob = student("Bob", "ME-002", "Mechanical", "B");
        bob.email = Some("bob@COMP.example".to_string());
        let students = vec![ada, bob];

        let search = StudentSearch {
            query: Some("comp".to_string()),
            ..StudentSearch::default()
        };
        assert_eq!(search_students(&students, &[], &search).len(), 2);

        let search = StudentSearch {
            query: Some("me-00".to_string()),
            ..StudentSearch::default()
        };
        let found = search_students(&students, &[], &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bob");
    }

    #[test]
    fn test_search_by_department_and_class() {
        let students = vec![
            student("Ada", "R1", "CS", "A"),
            student("Bob", "R2", "CS", "B"),
            student("Cy", "R3", "ME", "A"),
        ];
        let search = StudentSearch {
            department: Some("CS".to_string()),
            class_section: Some("A".to_string()),
            ..StudentSearch::default()
        };
        let found = search_students(&students, &[], &search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ada");
    }

    #[test]
    fn test_search_by_band_treats_no_records_as_low() {
        let ada = student("Ada", "R1", "CS", "A");
        let bob = student("Bob", "R2", "CS", "A");
        let records = vec![record(&ada, "A", at(date(2024, 1, 2), 9, 0), AttendanceStatus::Present)];
        let students = vec![ada, bob];

        let low = StudentSearch {
            band: Some(AttendanceBand::Low),
            ..StudentSearch::default()
        };
        let found = search_students(&students, &records, &low);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bob");

        let high = StudentSearch {
            band: Some(AttendanceBand::High),
            ..StudentSearch::default()
        };
        assert_eq!(search_students(&students, &records, &high)[0].name, "Ada");
    }

    #[test]
    fn test_daily_summary_floors_absent() {
        let ada = student("Ada", "R1", "CS", "A");
        let day = date(2024, 1, 15);
        let records = vec![
            record(&ada, "A", at(day, 9, 0), AttendanceStatus::Present),
            record(&ada, "B", at(day, 10, 0), AttendanceStatus::Late),
            record(&ada, "C", at(date(2024, 1, 16), 9, 0), AttendanceStatus::Present),
        ];
        let summary = daily_summary(&[ada], &records, day);

        assert_eq!(summary.marked, 2);
        assert_eq!(summary.present_count, 1);
        assert_eq!(summary.late_count, 1);
        assert_eq!(summary.absent_count, 0);
    }

    #[test]
    fn test_daily_summary_counts_unmarked_as_absent() {
        let students = vec![
            student("Ada", "R1", "CS", "A"),
            student("Bob", "R2", "CS", "A"),
            student("Cy", "R3", "CS", "A"),
        ];
        let day = date(2024, 1, 15);
        let records = vec![record(&students[0], "A", at(day, 9, 0), AttendanceStatus::Present)];
        let summary = daily_summary(&students, &records, day);
        assert_eq!(summary.absent_count, 2);

        let dashboard = Dashboard::from_summary(&summary, 4);
        assert_eq!(dashboard.attendance_rate_today, 33);
        assert_eq!(dashboard.total_faculty, 4);
    }

    #[test]
    fn test_recent_history_is_last_n_reversed() {
        let ada = student("Ada", "R1", "CS", "A");
        let records: Vec<_> = (1..=12)
            .map(|day| record(&ada, "A", at(date(2024, 1, day), 9, 0), AttendanceStatus::Present))
            .collect();

        let history = student_history(&records, ada.id);
        assert_eq!(history.first().unwrap().date, date(2024, 1, 1));

        let recent = recent_history(&records, ada.id, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().date, date(2024, 1, 12));
        assert_eq!(recent.last().unwrap().date, date(2024, 1, 3));
    }

    #[test]
    fn test_below_threshold_skips_students_without_records() {
        let ada = student("Ada", "R1", "CS", "A");
        let bob = student("Bob", "R2", "CS", "A");
        let records = vec![
            record(&ada, "A", at(date(2024, 1, 1), 9, 0), AttendanceStatus::Present),
            record(&ada, "A", at(date(2024, 1, 2), 9, 30), AttendanceStatus::Late),
        ];
        let flagged = below_threshold(&[ada, bob], &records, 75);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].rate, 50);
        assert_eq!(flagged[0].records, 2);
    }
}
