use crate::model::{Course, Instructor, Student};
use crate::registry::Registry;
use serde_json::json;

pub fn student_json(s: &Student) -> serde_json::Value {
    json!({
        "studentId": s.student_id,
        "name": s.person.name(),
        "age": s.person.age(),
        "email": s.person.email(),
        "registeredCourses": s.registered_courses,
    })
}

pub fn instructor_json(i: &Instructor) -> serde_json::Value {
    json!({
        "instructorId": i.instructor_id,
        "name": i.person.name(),
        "age": i.person.age(),
        "email": i.person.email(),
        "assignedCourses": i.assigned_courses,
    })
}

pub fn course_json(c: &Course) -> serde_json::Value {
    json!({
        "courseId": c.course_id,
        "courseName": c.course_name,
        "instructorId": c.instructor,
        "enrolledStudents": c.enrolled_students,
    })
}

/// Student plus the names of the courses it links to.
pub fn student_detail(reg: &Registry, s: &Student) -> serde_json::Value {
    let mut v = student_json(s);
    v["courses"] = reg
        .courses_of_student(s)
        .map(|c| json!({ "courseId": c.course_id, "courseName": c.course_name }))
        .collect();
    v
}

pub fn instructor_detail(reg: &Registry, i: &Instructor) -> serde_json::Value {
    let mut v = instructor_json(i);
    v["courses"] = reg
        .courses_of_instructor(i)
        .map(|c| json!({ "courseId": c.course_id, "courseName": c.course_name }))
        .collect();
    v
}

pub fn course_detail(reg: &Registry, c: &Course) -> serde_json::Value {
    let mut v = course_json(c);
    v["instructorName"] = json!(reg.instructor_of_course(c).map(|i| i.person.name()));
    v["students"] = reg
        .students_of_course(c)
        .map(|s| json!({ "studentId": s.student_id, "name": s.person.name() }))
        .collect();
    v
}

pub fn counts_json(reg: &Registry) -> serde_json::Value {
    json!({
        "students": reg.students().len(),
        "instructors": reg.instructors().len(),
        "courses": reg.courses().len(),
    })
}
