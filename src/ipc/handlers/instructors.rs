use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_i64, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{course_json, instructor_detail, instructor_json};
use crate::model::Instructor;
use crate::validate::validate_identifier;
use serde_json::json;

fn handle_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let instructors: Vec<_> = state
        .registry
        .instructors()
        .iter()
        .map(instructor_json)
        .collect();
    Ok(json!({ "instructors": instructors }))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = required_str(req, "instructorId")?;
    let instructor = state.registry.instructor(&instructor_id)?;
    Ok(json!({ "instructor": instructor_detail(&state.registry, instructor) }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = required_str(req, "instructorId")?;
    let name = required_str(req, "name")?;
    let age = required_i64(req, "age")?;
    let email = required_str(req, "email")?;

    validate_identifier(&instructor_id).map_err(crate::RecordsError::from)?;
    let instructor =
        Instructor::new(&name, age, &email, &instructor_id).map_err(crate::RecordsError::from)?;
    state.registry.add_instructor(instructor)?;

    Ok(json!({ "instructorId": instructor_id }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = required_str(req, "instructorId")?;
    let name = optional_str(req, "name")?;
    let age = optional_i64(req, "age")?;
    if req.params.get("email").is_some() {
        return Err(HandlerErr::new("bad_params", "email cannot be changed"));
    }
    if name.is_none() && age.is_none() {
        return Err(HandlerErr::new("bad_params", "nothing to update: pass name and/or age"));
    }

    let instructor = state
        .registry
        .update_instructor(&instructor_id, name.as_deref(), age)?;
    Ok(json!({ "instructor": instructor_json(instructor) }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = required_str(req, "instructorId")?;
    let removed = state.registry.remove_instructor(&instructor_id)?;
    Ok(json!({ "instructorId": removed.instructor_id }))
}

fn handle_assign_course(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = required_str(req, "instructorId")?;
    let course_id = required_str(req, "courseId")?;

    let previous = state.registry.course(&course_id)?.instructor.clone();
    state.registry.assign_course(&instructor_id, &course_id)?;
    let instructor = state.registry.instructor(&instructor_id)?;
    let course = state.registry.course(&course_id)?;
    Ok(json!({
        "previousInstructorId": previous,
        "instructor": instructor_json(instructor),
        "course": course_json(course),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "instructors.list" => handle_list(state, req),
        "instructors.get" => handle_get(state, req),
        "instructors.create" => handle_create(state, req),
        "instructors.update" => handle_update(state, req),
        "instructors.delete" => handle_delete(state, req),
        "instructors.assignCourse" => handle_assign_course(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
