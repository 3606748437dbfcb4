//! Entity records. Relationship collections hold identifiers; the
//! [`Registry`](crate::registry::Registry) resolves them to live entities.

use crate::validate::{validate_age, validate_email, validate_name, ValidationError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Instructor,
    Course,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Course => "course",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything stored in a registry collection.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// Fields shared by students and instructors. Email is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    name: String,
    age: u32,
    email: String,
}

impl Person {
    pub fn new(name: &str, age: i64, email: &str) -> Result<Self, ValidationError> {
        validate_name(name)?;
        let age = validate_age(age)?;
        validate_email(email)?;
        Ok(Self {
            name: name.trim().to_string(),
            age,
            email: email.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ValidationError> {
        validate_name(name)?;
        self.name = name.trim().to_string();
        Ok(())
    }

    pub fn set_age(&mut self, age: i64) -> Result<(), ValidationError> {
        self.age = validate_age(age)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub person: Person,
    pub student_id: String,
    pub registered_courses: Vec<String>,
}

impl Student {
    pub fn new(
        name: &str,
        age: i64,
        email: &str,
        student_id: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            person: Person::new(name, age, email)?,
            student_id: student_id.to_string(),
            registered_courses: Vec::new(),
        })
    }

    pub fn is_registered(&self, course_id: &str) -> bool {
        self.registered_courses.iter().any(|c| c == course_id)
    }
}

impl Entity for Student {
    const KIND: EntityKind = EntityKind::Student;

    fn id(&self) -> &str {
        &self.student_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructor {
    pub person: Person,
    pub instructor_id: String,
    pub assigned_courses: Vec<String>,
}

impl Instructor {
    pub fn new(
        name: &str,
        age: i64,
        email: &str,
        instructor_id: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            person: Person::new(name, age, email)?,
            instructor_id: instructor_id.to_string(),
            assigned_courses: Vec::new(),
        })
    }

    pub fn is_assigned(&self, course_id: &str) -> bool {
        self.assigned_courses.iter().any(|c| c == course_id)
    }
}

impl Entity for Instructor {
    const KIND: EntityKind = EntityKind::Instructor;

    fn id(&self) -> &str {
        &self.instructor_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    pub instructor: Option<String>,
    pub enrolled_students: Vec<String>,
}

impl Course {
    pub fn new(course_id: &str, course_name: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            course_name: course_name.trim().to_string(),
            instructor: None,
            enrolled_students: Vec::new(),
        }
    }

    pub fn is_enrolled(&self, student_id: &str) -> bool {
        self.enrolled_students.iter().any(|s| s == student_id)
    }
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;

    fn id(&self) -> &str {
        &self.course_id
    }
}
