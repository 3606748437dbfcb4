use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{course_detail, course_json};
use crate::model::Course;
use crate::validate::{validate_identifier, validate_name};
use crate::RecordsError;
use serde_json::json;

fn handle_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let courses: Vec<_> = state.registry.courses().iter().map(course_json).collect();
    Ok(json!({ "courses": courses }))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let course_id = required_str(req, "courseId")?;
    let course = state.registry.course(&course_id)?;
    Ok(json!({ "course": course_detail(&state.registry, course) }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let course_id = required_str(req, "courseId")?;
    let course_name = required_str(req, "courseName")?;
    let instructor_id = optional_str(req, "instructorId")?.filter(|s| !s.is_empty());

    validate_identifier(&course_id).map_err(RecordsError::from)?;
    validate_name(&course_name).map_err(RecordsError::from)?;
    // Check the instructor up front so a bad id leaves no half-created course.
    if let Some(iid) = instructor_id.as_deref() {
        state.registry.instructor(iid)?;
    }

    state
        .registry
        .add_course(Course::new(&course_id, &course_name))?;
    if let Some(iid) = instructor_id.as_deref() {
        state.registry.assign_course(iid, &course_id)?;
    }

    Ok(json!({ "courseId": course_id, "instructorId": instructor_id }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let course_id = required_str(req, "courseId")?;
    let course_name = required_str(req, "courseName")?;
    let course = state.registry.update_course(&course_id, &course_name)?;
    Ok(json!({ "course": course_json(course) }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let course_id = required_str(req, "courseId")?;
    let removed = state.registry.remove_course(&course_id)?;
    Ok(json!({ "courseId": removed.course_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "courses.list" => handle_list(state, req),
        "courses.get" => handle_get(state, req),
        "courses.create" => handle_create(state, req),
        "courses.update" => handle_update(state, req),
        "courses.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
