use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_i64, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{course_json, student_detail, student_json};
use crate::model::Student;
use crate::validate::validate_identifier;
use serde_json::json;

fn handle_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let students: Vec<_> = state.registry.students().iter().map(student_json).collect();
    Ok(json!({ "students": students }))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(req, "studentId")?;
    let student = state.registry.student(&student_id)?;
    Ok(json!({ "student": student_detail(&state.registry, student) }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(req, "studentId")?;
    let name = required_str(req, "name")?;
    let age = required_i64(req, "age")?;
    let email = required_str(req, "email")?;

    validate_identifier(&student_id).map_err(crate::RecordsError::from)?;
    let student = Student::new(&name, age, &email, &student_id).map_err(crate::RecordsError::from)?;
    state.registry.add_student(student)?;

    Ok(json!({ "studentId": student_id }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(req, "studentId")?;
    let name = optional_str(req, "name")?;
    let age = optional_i64(req, "age")?;
    if req.params.get("email").is_some() {
        return Err(HandlerErr::new("bad_params", "email cannot be changed"));
    }
    if name.is_none() && age.is_none() {
        return Err(HandlerErr::new("bad_params", "nothing to update: pass name and/or age"));
    }

    let student = state
        .registry
        .update_student(&student_id, name.as_deref(), age)?;
    Ok(json!({ "student": student_json(student) }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(req, "studentId")?;
    let removed = state.registry.remove_student(&student_id)?;
    Ok(json!({ "studentId": removed.student_id }))
}

fn handle_register_course(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(req, "studentId")?;
    let course_id = required_str(req, "courseId")?;

    let added = state.registry.register_course(&student_id, &course_id)?;
    let student = state.registry.student(&student_id)?;
    let course = state.registry.course(&course_id)?;
    Ok(json!({
        "alreadyRegistered": !added,
        "student": student_json(student),
        "course": course_json(course),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_list(state, req),
        "students.get" => handle_get(state, req),
        "students.create" => handle_create(state, req),
        "students.update" => handle_update(state, req),
        "students.delete" => handle_delete(state, req),
        "students.registerCourse" => handle_register_course(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
