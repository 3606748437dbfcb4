use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::optional_str;
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::{counts_json, course_json, instructor_json, student_json};
use serde_json::json;

fn handle_search(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let query = optional_str(req, "query")?.unwrap_or_default();
    let hits = state.registry.search(&query);
    Ok(json!({
        "query": query,
        "students": hits.students.into_iter().map(student_json).collect::<Vec<_>>(),
        "instructors": hits.instructors.into_iter().map(instructor_json).collect::<Vec<_>>(),
        "courses": hits.courses.into_iter().map(course_json).collect::<Vec<_>>(),
    }))
}

fn handle_reset(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    state.registry.reset();
    Ok(json!({ "counts": counts_json(&state.registry) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "records.search" => handle_search(state, req),
        "records.reset" => handle_reset(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
