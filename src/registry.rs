//! In-memory record store.
//!
//! Each collection keeps insertion order and is searched linearly. Links
//! between entities are stored as identifiers on both sides; every mutation
//! here keeps the two sides in agreement:
//!
//! - a student lists a course iff the course lists the student;
//! - a course names an instructor iff that instructor lists the course.
//!
//! Removing an entity strips its id from every other entity's links.

use crate::error::{RecordsError, Result};
use crate::model::{Course, Entity, Instructor, Student};
use crate::validate::validate_name;

#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// First entity whose id equals `id`.
    pub fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|e| e.id() == id)
    }

    fn get(&self, id: &str) -> Result<&T> {
        self.find(id)
            .ok_or_else(|| RecordsError::not_found(T::KIND, id))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut T> {
        self.find_mut(id)
            .ok_or_else(|| RecordsError::not_found(T::KIND, id))
    }

    fn insert(&mut self, item: T) -> Result<()> {
        if self.contains(item.id()) {
            return Err(RecordsError::DuplicateIdentifier {
                kind: T::KIND,
                id: item.id().to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    fn take(&mut self, id: &str) -> Result<T> {
        let idx = self
            .items
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| RecordsError::not_found(T::KIND, id))?;
        Ok(self.items.remove(idx))
    }

    fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<'a, T: Entity> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Entities matching a [`Registry::search`] query, in collection order.
#[derive(Debug, Default)]
pub struct SearchResults<'a> {
    pub students: Vec<&'a Student>,
    pub instructors: Vec<&'a Instructor>,
    pub courses: Vec<&'a Course>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    students: Collection<Student>,
    instructors: Collection<Instructor>,
    courses: Collection<Course>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(&self) -> &Collection<Student> {
        &self.students
    }

    pub fn instructors(&self) -> &Collection<Instructor> {
        &self.instructors
    }

    pub fn courses(&self) -> &Collection<Course> {
        &self.courses
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty() && self.instructors.is_empty() && self.courses.is_empty()
    }

    pub(crate) fn collections_mut(
        &mut self,
    ) -> (
        &mut Collection<Student>,
        &mut Collection<Instructor>,
        &mut Collection<Course>,
    ) {
        (&mut self.students, &mut self.instructors, &mut self.courses)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
        tracing::info!("registry cleared");
    }

    pub fn student(&self, id: &str) -> Result<&Student> {
        self.students.get(id)
    }

    pub fn instructor(&self, id: &str) -> Result<&Instructor> {
        self.instructors.get(id)
    }

    pub fn course(&self, id: &str) -> Result<&Course> {
        self.courses.get(id)
    }

    /// Adds a new student. Links on the incoming value are discarded; use
    /// [`Registry::register_course`] to create them.
    pub fn add_student(&mut self, mut student: Student) -> Result<()> {
        student.registered_courses.clear();
        let id = student.student_id.clone();
        self.students.insert(student)?;
        tracing::info!(student_id = %id, "student added");
        Ok(())
    }

    pub fn add_instructor(&mut self, mut instructor: Instructor) -> Result<()> {
        instructor.assigned_courses.clear();
        let id = instructor.instructor_id.clone();
        self.instructors.insert(instructor)?;
        tracing::info!(instructor_id = %id, "instructor added");
        Ok(())
    }

    pub fn add_course(&mut self, mut course: Course) -> Result<()> {
        course.instructor = None;
        course.enrolled_students.clear();
        let id = course.course_id.clone();
        self.courses.insert(course)?;
        tracing::info!(course_id = %id, "course added");
        Ok(())
    }

    pub fn remove_student(&mut self, student_id: &str) -> Result<Student> {
        let student = self.students.take(student_id)?;
        for course in self.courses.iter_mut() {
            course.enrolled_students.retain(|s| s != student_id);
        }
        tracing::info!(student_id, "student removed");
        Ok(student)
    }

    pub fn remove_instructor(&mut self, instructor_id: &str) -> Result<Instructor> {
        let instructor = self.instructors.take(instructor_id)?;
        for course in self.courses.iter_mut() {
            if course.instructor.as_deref() == Some(instructor_id) {
                course.instructor = None;
            }
        }
        tracing::info!(instructor_id, "instructor removed");
        Ok(instructor)
    }

    pub fn remove_course(&mut self, course_id: &str) -> Result<Course> {
        let course = self.courses.take(course_id)?;
        for student in self.students.iter_mut() {
            student.registered_courses.retain(|c| c != course_id);
        }
        for instructor in self.instructors.iter_mut() {
            instructor.assigned_courses.retain(|c| c != course_id);
        }
        tracing::info!(course_id, "course removed");
        Ok(course)
    }

    /// Links a student and a course on both sides. Returns `false` when the
    /// student was already registered.
    pub fn register_course(&mut self, student_id: &str, course_id: &str) -> Result<bool> {
        self.courses.get(course_id)?;
        let student = self.students.get_mut(student_id)?;
        if student.is_registered(course_id) {
            return Ok(false);
        }
        student.registered_courses.push(course_id.to_string());

        let course = self.courses.get_mut(course_id)?;
        if !course.is_enrolled(student_id) {
            course.enrolled_students.push(student_id.to_string());
        }
        tracing::info!(student_id, course_id, "student registered");
        Ok(true)
    }

    /// Makes `instructor_id` the instructor of `course_id`. A previous
    /// instructor loses the course from its assigned list.
    pub fn assign_course(&mut self, instructor_id: &str, course_id: &str) -> Result<()> {
        self.instructors.get(instructor_id)?;
        let course = self.courses.get_mut(course_id)?;
        let previous = course.instructor.replace(instructor_id.to_string());

        if let Some(prev) = previous.as_deref().filter(|p| *p != instructor_id) {
            if let Some(old) = self.instructors.find_mut(prev) {
                old.assigned_courses.retain(|c| c != course_id);
            }
            tracing::info!(course_id, from = prev, to = instructor_id, "instructor reassigned");
        }

        let instructor = self.instructors.get_mut(instructor_id)?;
        if !instructor.is_assigned(course_id) {
            instructor.assigned_courses.push(course_id.to_string());
            tracing::info!(instructor_id, course_id, "instructor assigned");
        }
        Ok(())
    }

    /// Updates name and/or age. Both values are checked before either is applied.
    pub fn update_student(
        &mut self,
        student_id: &str,
        name: Option<&str>,
        age: Option<i64>,
    ) -> Result<&Student> {
        let student = self.students.get_mut(student_id)?;
        let mut person = student.person.clone();
        if let Some(name) = name {
            person.set_name(name)?;
        }
        if let Some(age) = age {
            person.set_age(age)?;
        }
        student.person = person;
        tracing::info!(student_id, "student updated");
        Ok(&*student)
    }

    pub fn update_instructor(
        &mut self,
        instructor_id: &str,
        name: Option<&str>,
        age: Option<i64>,
    ) -> Result<&Instructor> {
        let instructor = self.instructors.get_mut(instructor_id)?;
        let mut person = instructor.person.clone();
        if let Some(name) = name {
            person.set_name(name)?;
        }
        if let Some(age) = age {
            person.set_age(age)?;
        }
        instructor.person = person;
        tracing::info!(instructor_id, "instructor updated");
        Ok(&*instructor)
    }

    pub fn update_course(&mut self, course_id: &str, course_name: &str) -> Result<&Course> {
        validate_name(course_name)?;
        let course = self.courses.get_mut(course_id)?;
        course.course_name = course_name.trim().to_string();
        tracing::info!(course_id, "course updated");
        Ok(&*course)
    }

    pub fn courses_of_student<'a>(&'a self, student: &'a Student) -> impl Iterator<Item = &'a Course> {
        student
            .registered_courses
            .iter()
            .filter_map(|id| self.courses.find(id))
    }

    pub fn courses_of_instructor<'a>(
        &'a self,
        instructor: &'a Instructor,
    ) -> impl Iterator<Item = &'a Course> {
        instructor
            .assigned_courses
            .iter()
            .filter_map(|id| self.courses.find(id))
    }

    pub fn students_of_course<'a>(&'a self, course: &'a Course) -> impl Iterator<Item = &'a Student> {
        course
            .enrolled_students
            .iter()
            .filter_map(|id| self.students.find(id))
    }

    pub fn instructor_of_course(&self, course: &Course) -> Option<&Instructor> {
        course
            .instructor
            .as_deref()
            .and_then(|id| self.instructors.find(id))
    }

    /// Case-insensitive substring search. People match on id, name or email;
    /// courses on id, name, or the id/name of their instructor.
    pub fn search(&self, query: &str) -> SearchResults<'_> {
        let needle = query.trim().to_lowercase();
        let hit = |s: &str| s.to_lowercase().contains(&needle);

        SearchResults {
            students: self
                .students
                .iter()
                .filter(|s| {
                    hit(&s.student_id) || hit(s.person.name()) || hit(s.person.email())
                })
                .collect(),
            instructors: self
                .instructors
                .iter()
                .filter(|i| {
                    hit(&i.instructor_id) || hit(i.person.name()) || hit(i.person.email())
                })
                .collect(),
            courses: self
                .courses
                .iter()
                .filter(|c| {
                    hit(&c.course_id)
                        || hit(&c.course_name)
                        || self
                            .instructor_of_course(c)
                            .is_some_and(|i| hit(&i.instructor_id) || hit(i.person.name()))
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    fn sample() -> Registry {
        let mut reg = Registry::new();
        reg.add_student(Student::new("Alice Smith", 20, "alice@example.com", "S1").unwrap())
            .unwrap();
        reg.add_instructor(Instructor::new("Grace Hopper", 50, "grace@example.com", "I1").unwrap())
            .unwrap();
        reg.add_course(Course::new("C1", "Algorithms")).unwrap();
        reg
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = sample();
        assert!(reg.register_course("S1", "C1").unwrap());
        assert!(!reg.register_course("S1", "C1").unwrap());
        assert_eq!(reg.student("S1").unwrap().registered_courses, ["C1"]);
        assert_eq!(reg.course("C1").unwrap().enrolled_students, ["S1"]);
    }

    #[test]
    fn register_with_unknown_ids_changes_nothing() {
        let mut reg = sample();
        let err = reg.register_course("S1", "C404").unwrap_err();
        assert!(matches!(err, RecordsError::NotFound { kind: EntityKind::Course, .. }));
        assert!(reg.student("S1").unwrap().registered_courses.is_empty());

        let err = reg.register_course("S404", "C1").unwrap_err();
        assert!(matches!(err, RecordsError::NotFound { kind: EntityKind::Student, .. }));
        assert!(reg.course("C1").unwrap().enrolled_students.is_empty());
    }

    #[test]
    fn add_discards_incoming_links() {
        let mut reg = Registry::new();
        let mut s = Student::new("Bob", 19, "bob@example.com", "S2").unwrap();
        s.registered_courses.push("C9".into());
        reg.add_student(s).unwrap();
        assert!(reg.student("S2").unwrap().registered_courses.is_empty());
    }

    #[test]
    fn search_matches_instructor_name_on_courses() {
        let mut reg = sample();
        reg.add_course(Course::new("C2", "Databases")).unwrap();
        reg.assign_course("I1", "C2").unwrap();

        let hits = reg.search("hopper");
        assert!(hits.students.is_empty());
        assert_eq!(hits.instructors.len(), 1);
        assert_eq!(hits.courses.len(), 1);
        assert_eq!(hits.courses[0].course_id, "C2");

        let all = reg.search("");
        assert_eq!(all.students.len(), 1);
        assert_eq!(all.courses.len(), 2);
    }

    #[test]
    fn update_rejects_invalid_values_atomically() {
        let mut reg = sample();
        let err = reg.update_student("S1", Some("Alicia"), Some(-2)).unwrap_err();
        assert!(matches!(err, RecordsError::Validation(_)));
        let s = reg.student("S1").unwrap();
        assert_eq!(s.person.name(), "Alice Smith");
        assert_eq!(s.person.age(), 20);

        reg.update_instructor("I1", None, Some(51)).unwrap();
        assert_eq!(reg.instructor("I1").unwrap().person.age(), 51);
    }
}
