//! JSON snapshot of the whole registry.
//!
//! Cross references are written as ids. Reading is two-phase: every entity is
//! rebuilt with empty links first, then the stored ids are resolved against
//! what was rebuilt. Ids that resolve to nothing are dropped.

use crate::error::{RecordsError, Result};
use crate::model::{Course, Instructor, Student};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub students: Vec<StudentRecord>,
    pub instructors: Vec<InstructorRecord>,
    pub courses: Vec<CourseRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    pub age: i64,
    pub email: String,
    #[serde(default)]
    pub registered_courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorRecord {
    pub instructor_id: String,
    pub name: String,
    pub age: i64,
    pub email: String,
    #[serde(default)]
    pub assigned_courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_id: String,
    pub course_name: String,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub enrolled_students: Vec<String>,
}

pub fn encode(reg: &Registry) -> Snapshot {
    Snapshot {
        students: reg
            .students()
            .iter()
            .map(|s| StudentRecord {
                student_id: s.student_id.clone(),
                name: s.person.name().to_string(),
                age: i64::from(s.person.age()),
                email: s.person.email().to_string(),
                registered_courses: s.registered_courses.clone(),
            })
            .collect(),
        instructors: reg
            .instructors()
            .iter()
            .map(|i| InstructorRecord {
                instructor_id: i.instructor_id.clone(),
                name: i.person.name().to_string(),
                age: i64::from(i.person.age()),
                email: i.person.email().to_string(),
                assigned_courses: i.assigned_courses.clone(),
            })
            .collect(),
        courses: reg
            .courses()
            .iter()
            .map(|c| CourseRecord {
                course_id: c.course_id.clone(),
                course_name: c.course_name.clone(),
                instructor: c.instructor.clone(),
                enrolled_students: c.enrolled_students.clone(),
            })
            .collect(),
    }
}

/// Rebuilds a registry from a snapshot. Fails only when an entity record is
/// itself unusable (invalid fields, duplicate id); dangling references are
/// dropped.
pub fn decode(snapshot: &Snapshot) -> Result<Registry> {
    let mut reg = Registry::new();

    for rec in &snapshot.students {
        let student = Student::new(&rec.name, rec.age, &rec.email, &rec.student_id)
            .map_err(|e| malformed("student", &rec.student_id, e))?;
        reg.add_student(student)
            .map_err(|e| malformed("student", &rec.student_id, e))?;
    }
    for rec in &snapshot.instructors {
        let instructor = Instructor::new(&rec.name, rec.age, &rec.email, &rec.instructor_id)
            .map_err(|e| malformed("instructor", &rec.instructor_id, e))?;
        reg.add_instructor(instructor)
            .map_err(|e| malformed("instructor", &rec.instructor_id, e))?;
    }
    for rec in &snapshot.courses {
        reg.add_course(Course::new(&rec.course_id, &rec.course_name))
            .map_err(|e| malformed("course", &rec.course_id, e))?;
    }

    relink(&mut reg, snapshot);
    Ok(reg)
}

fn malformed(kind: &str, id: &str, e: impl std::fmt::Display) -> RecordsError {
    RecordsError::MalformedDocument(format!("{kind} {id:?}: {e}"))
}

fn relink(reg: &mut Registry, snapshot: &Snapshot) {
    let (students, instructors, courses) = reg.collections_mut();

    // Stored order is kept for each side; whatever only one side recorded is
    // appended to the other afterwards.
    for rec in &snapshot.students {
        let Some(student) = students.find_mut(&rec.student_id) else {
            continue;
        };
        for cid in &rec.registered_courses {
            if !courses.contains(cid) {
                tracing::debug!(student_id = %rec.student_id, course_id = %cid, "dropping dangling registration");
                continue;
            }
            if !student.is_registered(cid) {
                student.registered_courses.push(cid.clone());
            }
        }
    }
    for rec in &snapshot.courses {
        let Some(course) = courses.find_mut(&rec.course_id) else {
            continue;
        };
        for sid in &rec.enrolled_students {
            if !students.contains(sid) {
                tracing::debug!(course_id = %rec.course_id, student_id = %sid, "dropping dangling enrolment");
                continue;
            }
            if !course.is_enrolled(sid) {
                course.enrolled_students.push(sid.clone());
            }
        }
    }
    for course in courses.iter() {
        for sid in &course.enrolled_students {
            if let Some(student) = students.find_mut(sid) {
                if !student.is_registered(&course.course_id) {
                    student.registered_courses.push(course.course_id.clone());
                }
            }
        }
    }
    for student in students.iter() {
        for cid in &student.registered_courses {
            if let Some(course) = courses.find_mut(cid) {
                if !course.is_enrolled(&student.student_id) {
                    course.enrolled_students.push(student.student_id.clone());
                }
            }
        }
    }

    // The course's own instructor field wins; an instructor may only claim a
    // course that names nobody.
    for rec in &snapshot.courses {
        let Some(iid) = rec.instructor.as_deref() else {
            continue;
        };
        if !instructors.contains(iid) {
            tracing::debug!(course_id = %rec.course_id, instructor_id = %iid, "dropping dangling instructor");
            continue;
        }
        if let Some(course) = courses.find_mut(&rec.course_id) {
            course.instructor = Some(iid.to_string());
        }
    }
    for rec in &snapshot.instructors {
        let Some(instructor) = instructors.find_mut(&rec.instructor_id) else {
            continue;
        };
        for cid in &rec.assigned_courses {
            let Some(course) = courses.find_mut(cid) else {
                tracing::debug!(instructor_id = %rec.instructor_id, course_id = %cid, "dropping dangling assignment");
                continue;
            };
            let owner = course.instructor.clone();
            match owner.as_deref() {
                None => course.instructor = Some(rec.instructor_id.clone()),
                Some(owner) if owner == rec.instructor_id => {}
                Some(owner) => {
                    tracing::debug!(
                        instructor_id = %rec.instructor_id,
                        course_id = %cid,
                        owner,
                        "dropping stale assignment"
                    );
                    continue;
                }
            }
            if !instructor.is_assigned(cid) {
                instructor.assigned_courses.push(cid.clone());
            }
        }
    }
    for course in courses.iter() {
        let Some(iid) = course.instructor.as_deref() else {
            continue;
        };
        if let Some(instructor) = instructors.find_mut(iid) {
            if !instructor.is_assigned(&course.course_id) {
                instructor.assigned_courses.push(course.course_id.clone());
            }
        }
    }
}

pub fn to_json(reg: &Registry) -> Result<String> {
    serde_json::to_string_pretty(&encode(reg))
        .map_err(|e| RecordsError::MalformedDocument(e.to_string()))
}

pub fn from_json(text: &str) -> Result<Registry> {
    let snapshot: Snapshot =
        serde_json::from_str(text).map_err(|e| RecordsError::MalformedDocument(e.to_string()))?;
    decode(&snapshot)
}

pub fn save(path: &Path, reg: &Registry) -> Result<()> {
    let text = to_json(reg)?;
    write_atomic(path, text.as_bytes())?;
    tracing::info!(
        path = %path.display(),
        students = reg.students().len(),
        instructors = reg.instructors().len(),
        courses = reg.courses().len(),
        "snapshot saved"
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<Registry> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RecordsError::FileNotFound(path.to_path_buf()),
        _ => RecordsError::MalformedDocument(format!("failed to read {}: {e}", path.display())),
    })?;
    let reg = from_json(&text)?;
    tracing::info!(
        path = %path.display(),
        students = reg.students().len(),
        instructors = reg.instructors().len(),
        courses = reg.courses().len(),
        "snapshot loaded"
    );
    Ok(reg)
}

/// Writes `bytes` to a temporary sibling of `path`, then renames it over
/// `path`. The temporary file is removed if any step fails.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| RecordsError::write(path, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    let written = File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(RecordsError::write(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_relationship_arrays_default_to_empty() {
        let reg = from_json(
            r#"{
                "students": [{"student_id": "S1", "name": "Alice", "age": 20, "email": "alice@example.com"}],
                "instructors": [],
                "courses": [{"course_id": "C1", "course_name": "Algorithms"}]
            }"#,
        )
        .unwrap();
        assert!(reg.student("S1").unwrap().registered_courses.is_empty());
        assert!(reg.course("C1").unwrap().instructor.is_none());
    }

    #[test]
    fn legacy_type_tag_is_ignored() {
        let reg = from_json(
            r#"{
                "students": [{"type": "student", "student_id": "S1", "name": "Alice", "age": 20,
                              "email": "alice@example.com", "registered_courses": ["C1"]}],
                "instructors": [{"type": "instructor", "instructor_id": "I1", "name": "Grace", "age": 50,
                                 "email": "grace@example.com", "assigned_courses": ["C1"]}],
                "courses": [{"course_id": "C1", "course_name": "Algorithms", "instructor": "I1",
                             "enrolled_students": ["S1"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(reg.course("C1").unwrap().instructor.as_deref(), Some("I1"));
        assert_eq!(reg.instructor("I1").unwrap().assigned_courses, ["C1"]);
    }

    #[test]
    fn one_sided_links_are_completed() {
        let reg = from_json(
            r#"{
                "students": [{"student_id": "S1", "name": "Alice", "age": 20, "email": "alice@example.com"}],
                "instructors": [{"instructor_id": "I1", "name": "Grace", "age": 50,
                                 "email": "grace@example.com", "assigned_courses": ["C1"]}],
                "courses": [{"course_id": "C1", "course_name": "Algorithms", "enrolled_students": ["S1"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(reg.student("S1").unwrap().registered_courses, ["C1"]);
        assert_eq!(reg.course("C1").unwrap().instructor.as_deref(), Some("I1"));
    }

    #[test]
    fn course_instructor_field_beats_stale_assignment() {
        let reg = from_json(
            r#"{
                "students": [],
                "instructors": [
                    {"instructor_id": "I1", "name": "Grace", "age": 50, "email": "grace@example.com",
                     "assigned_courses": ["C1"]},
                    {"instructor_id": "I2", "name": "Alan", "age": 41, "email": "alan@example.com",
                     "assigned_courses": ["C1"]}
                ],
                "courses": [{"course_id": "C1", "course_name": "Algorithms", "instructor": "I2"}]
            }"#,
        )
        .unwrap();
        assert!(reg.instructor("I1").unwrap().assigned_courses.is_empty());
        assert_eq!(reg.instructor("I2").unwrap().assigned_courses, ["C1"]);
    }

    #[test]
    fn invalid_records_are_malformed() {
        let err = from_json(
            r#"{"students": [{"student_id": "S1", "name": "A", "age": -4, "email": "a@b.co"}],
                "instructors": [], "courses": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecordsError::MalformedDocument(_)));

        let err = from_json(
            r#"{"students": [], "instructors": [],
                "courses": [{"course_id": "C1", "course_name": "A"}, {"course_id": "C1", "course_name": "B"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecordsError::MalformedDocument(_)));
    }
}
