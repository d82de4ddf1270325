//! `rollcall` - CLI for the attendance engine
//!
//! Opens the configured database, runs one command against the engine and
//! exits. `rollcall session` keeps running until interrupted.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use rollcall::cli::{
    AttendCommand, BackupCommand, ClassCommand, ClearCommand, Cli, Command, ConfigCommand,
    FacultyCommand, OutputFormat, ReportCommand, SearchCommand, SessionCommand, SettingsCommand,
    StudentCommand, SummaryCommand,
};
use rollcall::detection::RandomDetector;
use rollcall::engine::AttendanceEngine;
use rollcall::export;
use rollcall::feed::LogNotifier;
use rollcall::model::{AttendanceRecord, Student};
use rollcall::report::{AttendanceFilter, StudentSearch};
use rollcall::session::{run_session, SessionHandle, SessionOptions};
use rollcall::{init_logging, Config, NewFaculty, NewStudent, SqliteStore, SystemClock};

type Engine = AttendanceEngine<SqliteStore, SystemClock>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    if let Command::Config(cmd) = &cli.command {
        return handle_config(&config, cmd);
    }

    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database_path());
    let store = SqliteStore::open(&database)?;
    let mut engine = AttendanceEngine::load(store, SystemClock)?
        .with_feed_capacity(config.feed.capacity)
        .with_history_limit(config.report.history_limit)
        .with_notifier(LogNotifier);

    match cli.command {
        Command::Student(cmd) => handle_student(&mut engine, cmd),
        Command::Faculty(cmd) => handle_faculty(&mut engine, cmd),
        Command::Class(cmd) => handle_class(&mut engine, cmd),
        Command::Attend(cmd) => handle_attend(&mut engine, cmd),
        Command::Report(cmd) => handle_report(&engine, &config, &cmd),
        Command::Search(cmd) => handle_search(&engine, cmd),
        Command::Summary(cmd) => handle_summary(&engine, &cmd),
        Command::Session(cmd) => handle_session(&mut engine, &config, &cmd).await,
        Command::Settings(cmd) => handle_settings(&mut engine, cmd),
        Command::Backup(cmd) => handle_backup(&engine, &cmd),
        Command::Restore(cmd) => {
            let text = std::fs::read_to_string(&cmd.file)
                .with_context(|| format!("reading {}", cmd.file.display()))?;
            engine.restore(&text)?;
            println!(
                "Restored {} students, {} faculty, {} records from {}",
                engine.students().len(),
                engine.faculty().len(),
                engine.attendance().len(),
                cmd.file.display()
            );
            Ok(())
        }
        Command::Clear(cmd) => handle_clear(&mut engine, &cmd),
        Command::Status(cmd) => handle_status(&engine, cmd.json),
        Command::Config(_) => Ok(()),
    }
}

fn find_student<'a>(engine: &'a Engine, roll_number: &str) -> anyhow::Result<&'a Student> {
    engine
        .student_by_roll(roll_number)
        .with_context(|| format!("no student with roll number '{roll_number}'"))
}

fn handle_student(engine: &mut Engine, cmd: StudentCommand) -> anyhow::Result<()> {
    match cmd {
        StudentCommand::Add {
            name,
            roll_number,
            department,
            class_section,
            email,
            phone,
        } => {
            let mut input = NewStudent::new(name, roll_number, department, class_section);
            if let Some(email) = email {
                input = input.with_email(email);
            }
            if let Some(phone) = phone {
                input = input.with_phone(phone);
            }
            let student = engine.add_student(input)?;
            println!(
                "Registered {} ({}) in {}",
                student.name, student.roll_number, student.class_section
            );
        }
        StudentCommand::List {
            class_section,
            department,
            json,
        } => {
            let search = StudentSearch {
                department,
                class_section,
                ..StudentSearch::default()
            };
            print_students(engine, &engine.search_students(&search), json)?;
        }
        StudentCommand::Show { roll_number, json } => {
            let id = find_student(engine, &roll_number)?.id;
            let profile = engine.student_profile(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                return Ok(());
            }
            let s = &profile.student;
            println!("{} ({})", s.name, s.roll_number);
            println!("-----------------");
            println!("Department:  {}", s.department);
            println!("Class:       {}", s.class_section);
            if let Some(email) = &s.email {
                println!("Email:       {email}");
            }
            if let Some(phone) = &s.phone {
                println!("Phone:       {phone}");
            }
            println!("Registered:  {}", s.registered_at.format("%Y-%m-%d"));
            println!("Attendance:  {}% of {} records", profile.rate, profile.record_count);
            if !profile.recent.is_empty() {
                println!();
                println!("Recent attendance");
                let recent: Vec<_> = profile.recent.iter().collect();
                print_records(&recent);
            }
        }
        StudentCommand::Delete { roll_number } => {
            let id = find_student(engine, &roll_number)?.id;
            let before = engine.attendance().len();
            if let Some(student) = engine.delete_student(id)? {
                println!(
                    "Deleted {} ({}) and {} attendance records",
                    student.name,
                    student.roll_number,
                    before - engine.attendance().len()
                );
            }
        }
    }
    Ok(())
}

fn handle_faculty(engine: &mut Engine, cmd: FacultyCommand) -> anyhow::Result<()> {
    match cmd {
        FacultyCommand::Add {
            name,
            faculty_code,
            department,
            email,
            subjects,
        } => {
            let mut input = NewFaculty::new(name, faculty_code, department);
            input.subjects = subjects;
            if let Some(email) = email {
                input = input.with_email(email);
            }
            let member = engine.add_faculty(input)?;
            println!("Added {} ({})", member.name, member.faculty_code);
        }
        FacultyCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(engine.faculty())?);
                return Ok(());
            }
            if engine.faculty().is_empty() {
                println!("No faculty registered.");
                return Ok(());
            }
            println!("{:<10} {:<24} {:<16} Subjects", "Code", "Name", "Department");
            for f in engine.faculty() {
                println!(
                    "{:<10} {:<24} {:<16} {}",
                    f.faculty_code,
                    f.name,
                    f.department,
                    f.subjects.join(", ")
                );
            }
        }
        FacultyCommand::Delete { faculty_code } => {
            let id = engine
                .faculty()
                .iter()
                .find(|f| f.faculty_code == faculty_code.trim())
                .map(|f| f.id)
                .with_context(|| format!("no faculty with code '{faculty_code}'"))?;
            if let Some(member) = engine.delete_faculty(id)? {
                println!("Deleted {} ({})", member.name, member.faculty_code);
            }
        }
    }
    Ok(())
}

fn handle_class(engine: &mut Engine, cmd: ClassCommand) -> anyhow::Result<()> {
    match cmd {
        ClassCommand::Add { name } => {
            if engine.add_class(&name)? {
                println!("Created class {}", name.trim());
            } else {
                println!("Class {} already exists", name.trim());
            }
        }
        ClassCommand::List => {
            println!("Classes:     {}", engine.class_sections().join(", "));
            println!("Departments: {}", engine.departments().join(", "));
        }
    }
    Ok(())
}

fn handle_attend(engine: &mut Engine, cmd: AttendCommand) -> anyhow::Result<()> {
    match cmd {
        AttendCommand::Mark {
            roll_number,
            class_section,
            at,
            method,
            confidence,
        } => {
            let id = find_student(engine, &roll_number)?.id;
            let record = match at {
                Some(at) => {
                    engine.mark_attendance(id, &class_section, at, method.into(), confidence)?
                }
                None => engine.mark_attendance_now(id, &class_section, method.into(), confidence)?,
            };
            println!(
                "{} marked {} for {} at {} (record {})",
                record.student_name, record.status, record.class_section, record.time, record.id
            );
        }
        AttendCommand::Delete { id } => {
            let record = engine.delete_attendance_record(id)?;
            println!(
                "Deleted {} record for {} on {}",
                record.status, record.student_name, record.date
            );
        }
        AttendCommand::Today { json } => {
            let records = engine.todays_attendance();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No attendance marked today.");
            } else {
                print_records(&records);
            }
        }
    }
    Ok(())
}

fn handle_report(engine: &Engine, config: &Config, cmd: &ReportCommand) -> anyhow::Result<()> {
    let mut filter = if cmd.all || cmd.from.is_some() || cmd.to.is_some() {
        AttendanceFilter {
            date_from: cmd.from,
            date_to: cmd.to,
            ..AttendanceFilter::default()
        }
    } else {
        engine.default_report_filter(cmd.days.unwrap_or(config.report.default_window_days))
    };
    filter.class_section.clone_from(&cmd.class_section);
    filter.student_query.clone_from(&cmd.student);
    filter.status = cmd.status.map(Into::into);

    let records = engine.filter_attendance(&filter);
    info!(records = records.len(), "Generated report");

    let rendered = match cmd.format {
        OutputFormat::Csv => export::attendance_csv(records.iter().copied()),
        OutputFormat::Json => serde_json::to_string_pretty(&records)?,
        OutputFormat::Table => {
            if cmd.output.is_some() {
                bail!("table output can only be printed; use --format csv or json with --output");
            }
            if records.is_empty() {
                println!("No records match.");
            } else {
                print_records(&records);
                println!();
                println!("{} records", records.len());
            }
            return Ok(());
        }
    };

    match &cmd.output {
        Some(path) => {
            write_file(path, &rendered)?;
            println!("Wrote {} records to {}", records.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn handle_search(engine: &Engine, cmd: SearchCommand) -> anyhow::Result<()> {
    let search = StudentSearch {
        query: cmd.query,
        department: cmd.department,
        class_section: cmd.class_section,
        band: cmd.band.map(Into::into),
    };
    print_students(engine, &engine.search_students(&search), cmd.json)
}

fn handle_summary(engine: &Engine, cmd: &SummaryCommand) -> anyhow::Result<()> {
    let summary = match cmd.date {
        Some(date) => engine.summary_for(date),
        None => engine.todays_summary(),
    };
    let dashboard = engine.dashboard();
    let low = engine.below_threshold();

    if cmd.json {
        let value = serde_json::json!({
            "summary": summary,
            "dashboard": dashboard,
            "belowThreshold": low,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Attendance summary for {}", summary.date);
    println!("-----------------------------");
    println!("Students:      {}", summary.total_students);
    println!("Marked:        {}", summary.marked);
    println!("Present:       {}", summary.present_count);
    println!("Late:          {}", summary.late_count);
    println!("Absent:        {}", summary.absent_count);
    println!();
    println!("Today");
    println!("  Faculty:         {}", dashboard.total_faculty);
    println!("  Marked today:    {}", dashboard.marked_today);
    println!("  Attendance rate: {}%", dashboard.attendance_rate_today);

    if !low.is_empty() {
        println!();
        println!(
            "Below {}% attendance",
            engine.settings().attendance_threshold
        );
        for entry in &low {
            println!(
                "  {:<12} {:<24} {:>3}% of {}",
                entry.student.roll_number, entry.student.name, entry.rate, entry.records
            );
        }
    }
    Ok(())
}

async fn handle_session(
    engine: &mut Engine,
    config: &Config,
    cmd: &SessionCommand,
) -> anyhow::Result<()> {
    let probability = cmd
        .probability
        .unwrap_or(config.session.detection_probability);
    if !(0.0..=1.0).contains(&probability) {
        bail!("probability must be between 0 and 1, got {probability}");
    }
    let detector = match cmd.seed {
        Some(seed) => RandomDetector::seeded(probability, seed),
        None => RandomDetector::new(probability),
    };
    let interval = cmd
        .interval_ms
        .map_or_else(|| config.detection_interval(), Duration::from_millis);
    let options = SessionOptions::new(cmd.class_section.clone())
        .with_interval(interval)
        .with_max_detections(cmd.max_detections.unwrap_or(config.session.max_detections));

    let handle = SessionHandle::new();
    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.stop();
        }
    });

    println!(
        "Capturing attendance for {} (Ctrl-C to stop)...",
        cmd.class_section.trim()
    );
    let report = run_session(engine, detector, options, handle).await?;

    println!();
    for entry in engine.recent_feed(config.feed.display_count).iter().rev() {
        println!(
            "[{}] {:<18} {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.category.to_string(),
            entry.message
        );
    }
    println!();
    println!(
        "Detections: {}  marked: {}  already marked: {}  low confidence: {}  unknown: {}  failed: {}",
        report.detections,
        report.marked,
        report.duplicates,
        report.low_confidence,
        report.unknown,
        report.failures
    );
    Ok(())
}

fn handle_settings(engine: &mut Engine, cmd: SettingsCommand) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::Show { json } => {
            let s = engine.settings();
            if json {
                println!("{}", serde_json::to_string_pretty(s)?);
                return Ok(());
            }
            println!("Attendance Settings");
            println!("===================");
            println!("  Attendance threshold:  {}%", s.attendance_threshold);
            println!("  Late threshold:        {} min past 09:00", s.late_threshold);
            println!("  Auto-mark absent:      {} min", s.auto_mark_absent);
            println!("  Recognition model:     {}", s.recognition_model);
            println!("  Confidence threshold:  {}%", s.confidence_threshold);
            println!("  Multiple faces:        {}", s.multiple_faces);
            println!("  Email notifications:   {}", s.email_notifications);
            println!("  Sound notifications:   {}", s.sound_notifications);
            println!("  Low attendance alerts: {}", s.low_attendance_alerts);
            println!("  Backup frequency:      {}", s.backup_frequency);
        }
        SettingsCommand::Set(update) => {
            if update.is_empty() {
                bail!("no settings given; see `rollcall settings set --help`");
            }
            let settings = update.apply_to(engine.settings().clone());
            engine.save_settings(settings)?;
            println!("Settings saved.");
        }
        SettingsCommand::Reset => {
            engine.reset_settings()?;
            println!("Settings reset to defaults.");
        }
    }
    Ok(())
}

fn handle_backup(engine: &Engine, cmd: &BackupCommand) -> anyhow::Result<()> {
    let document = engine.backup();
    let text = document.to_pretty_json()?;
    if cmd.stdout {
        println!("{text}");
        return Ok(());
    }
    let path = cmd
        .output
        .clone()
        .unwrap_or_else(|| document.file_name().into());
    write_file(&path, &text)?;
    println!("Backup written to {}", path.display());
    Ok(())
}

fn handle_clear(engine: &mut Engine, cmd: &ClearCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will delete all students, faculty, classes and attendance records");
        println!("and reset settings to defaults. Use --yes to confirm.");
        return Ok(());
    }
    engine.clear_all()?;
    println!("All data cleared.");
    Ok(())
}

fn handle_status(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let stats = engine.store().stats()?;
    let dashboard = engine.dashboard();
    if json {
        let status = serde_json::json!({
            "databasePath": engine.store().path(),
            "storedKeys": stats.stored_keys,
            "payloadBytes": stats.payload_bytes,
            "databaseBytes": stats.db_size_bytes,
            "lastWrite": stats.last_write,
            "students": dashboard.total_students,
            "faculty": dashboard.total_faculty,
            "records": engine.attendance().len(),
            "markedToday": dashboard.marked_today,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("rollcall status");
        println!("---------------");
        println!("Database:      {}", engine.store().path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Collections:   {} stored", stats.stored_keys);
        println!(
            "Last write:    {}",
            stats.last_write.as_deref().unwrap_or("never")
        );
        println!("Students:      {}", dashboard.total_students);
        println!("Faculty:       {}", dashboard.total_faculty);
        println!("Records:       {}", engine.attendance().len());
        println!("Marked today:  {}", dashboard.marked_today);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Feed]");
                println!("  Capacity:           {}", config.feed.capacity);
                println!("  Display count:      {}", config.feed.display_count);
                println!();
                println!("[Session]");
                println!("  Interval (ms):      {}", config.session.detection_interval_ms);
                println!("  Probability:        {}", config.session.detection_probability);
                println!("  Max detections:     {}", config.session.max_detections);
                println!();
                println!("[Report]");
                println!("  Window (days):      {}", config.report.default_window_days);
                println!("  History limit:      {}", config.report.history_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_students(engine: &Engine, students: &[&Student], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(students)?);
        return Ok(());
    }
    if students.is_empty() {
        println!("No students found.");
        return Ok(());
    }
    println!(
        "{:<12} {:<24} {:<16} {:<10} {:>5}",
        "Roll", "Name", "Department", "Class", "Rate"
    );
    for s in students {
        println!(
            "{:<12} {:<24} {:<16} {:<10} {:>4}%",
            s.roll_number,
            s.name,
            s.department,
            s.class_section,
            engine.attendance_rate(s.id)
        );
    }
    Ok(())
}

fn print_records(records: &[&AttendanceRecord]) {
    println!(
        "{:<10} {:<8} {:<24} {:<12} {:<10} {:<8} {:<16} {:>5}",
        "Date", "Time", "Student", "Roll", "Class", "Status", "Method", "Conf"
    );
    for r in records {
        let confidence = r
            .confidence
            .map_or_else(|| "N/A".to_string(), |c| format!("{c}%"));
        println!(
            "{:<10} {:<8} {:<24} {:<12} {:<10} {:<8} {:<16} {:>5}",
            r.date.to_string(),
            r.time.format("%H:%M:%S").to_string(),
            r.student_name,
            r.roll_number,
            r.class_section,
            r.status.to_string(),
            r.method.to_string(),
            confidence
        );
    }
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
