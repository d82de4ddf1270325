//! Student, faculty and class registries.

use tracing::{info, warn};

use super::AttendanceEngine;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::feed::FeedCategory;
use crate::model::{Faculty, FacultyId, NewFaculty, NewStudent, Student, StudentId};
use crate::storage::KeyValueStore;

impl<S: KeyValueStore, C: Clock> AttendanceEngine<S, C> {
    /// Look up a student.
    #[must_use]
    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Look up a student by roll number.
    #[must_use]
    pub fn student_by_roll(&self, roll_number: &str) -> Option<&Student> {
        let roll_number = roll_number.trim();
        self.students.iter().find(|s| s.roll_number == roll_number)
    }

    /// Register a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank required field and
    /// [`Error::DuplicateRoll`] if the roll number is taken; in both cases
    /// nothing changes. A persistence error leaves the student registered.
    pub fn add_student(&mut self, input: NewStudent) -> Result<Student> {
        let student = input.into_student(self.now())?;
        if self.student_by_roll(&student.roll_number).is_some() {
            warn!("Rejected duplicate roll number {}", student.roll_number);
            return Err(Error::DuplicateRoll {
                roll_number: student.roll_number,
            });
        }

        info!(id = %student.id, "Registered student {}", student.roll_number);
        self.students.push(student.clone());
        let persisted = self.persist();
        self.announce(
            format!(
                "New student registered: {} ({})",
                student.name, student.roll_number
            ),
            FeedCategory::System,
        );
        persisted.map(|()| student)
    }

    /// Remove a student and every attendance record that refers to them.
    ///
    /// Returns the removed student, or `None` if the id was unknown, in which
    /// case nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting the removal fails.
    pub fn delete_student(&mut self, id: StudentId) -> Result<Option<Student>> {
        let Some(index) = self.students.iter().position(|s| s.id == id) else {
            return Ok(None);
        };

        let student = self.students.remove(index);
        let before = self.attendance.len();
        self.attendance.retain(|r| r.student_id != id);
        let cascaded = before - self.attendance.len();
        info!(
            id = %id,
            records = cascaded,
            "Deleted student {}", student.roll_number
        );

        let persisted = self.persist();
        self.announce(
            format!("Student deleted: {} ({})", student.name, student.roll_number),
            FeedCategory::System,
        );
        persisted.map(|()| Some(student))
    }

    /// Look up a faculty member.
    #[must_use]
    pub fn faculty_member(&self, id: FacultyId) -> Option<&Faculty> {
        self.faculty.iter().find(|f| f.id == id)
    }

    /// Register a faculty member.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank required field and
    /// [`Error::DuplicateFacultyCode`] if the code is taken.
    pub fn add_faculty(&mut self, input: NewFaculty) -> Result<Faculty> {
        let member = input.into_faculty(self.now())?;
        if self
            .faculty
            .iter()
            .any(|f| f.faculty_code == member.faculty_code)
        {
            warn!("Rejected duplicate faculty code {}", member.faculty_code);
            return Err(Error::DuplicateFacultyCode {
                faculty_code: member.faculty_code,
            });
        }

        info!(id = %member.id, "Registered faculty {}", member.faculty_code);
        self.faculty.push(member.clone());
        let persisted = self.persist();
        self.announce(
            format!("New faculty added: {}", member.name),
            FeedCategory::System,
        );
        persisted.map(|()| member)
    }

    /// Remove a faculty member. Unknown ids are a no-op returning `None`.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting the removal fails.
    pub fn delete_faculty(&mut self, id: FacultyId) -> Result<Option<Faculty>> {
        let Some(index) = self.faculty.iter().position(|f| f.id == id) else {
            return Ok(None);
        };

        let member = self.faculty.remove(index);
        info!(id = %id, "Deleted faculty {}", member.faculty_code);
        let persisted = self.persist();
        self.announce(
            format!("Faculty deleted: {}", member.name),
            FeedCategory::System,
        );
        persisted.map(|()| Some(member))
    }

    /// Create a class section. Returns `false` if it was already known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name.
    pub fn add_class(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_input("class name is required"));
        }
        if self.class_sections().iter().any(|c| c == name) {
            return Ok(false);
        }

        self.classes.push(name.to_string());
        let persisted = self.persist();
        self.announce(format!("New class created: {name}"), FeedCategory::System);
        persisted.map(|()| true)
    }

    /// Created classes, then any other class a student is enrolled in, in
    /// first-seen order.
    #[must_use]
    pub fn class_sections(&self) -> Vec<String> {
        let mut sections: Vec<String> = Vec::new();
        let enrolled = self.students.iter().map(|s| &s.class_section);
        for name in self.classes.iter().chain(enrolled) {
            if !sections.contains(name) {
                sections.push(name.clone());
            }
        }
        sections
    }

    /// Distinct student departments, in first-seen order.
    #[must_use]
    pub fn departments(&self) -> Vec<String> {
        let mut departments: Vec<String> = Vec::new();
        for student in &self.students {
            if !departments.contains(&student.department) {
                departments.push(student.department.clone());
            }
        }
        departments
    }
}
