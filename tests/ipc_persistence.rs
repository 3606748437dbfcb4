mod test_support;

use schoold::{snapshot, Course, Instructor, Registry, Student};
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, spawn_sidecar_with_env, temp_dir};

fn seed_workspace(ws: &std::path::Path) {
    let mut reg = Registry::new();
    reg.add_student(Student::new("Alice Smith", 20, "alice@example.com", "S1").unwrap())
        .unwrap();
    reg.add_instructor(Instructor::new("Grace Hopper", 50, "grace@example.com", "I1").unwrap())
        .unwrap();
    reg.add_course(Course::new("C1", "Algorithms")).unwrap();
    reg.register_course("S1", "C1").unwrap();
    reg.assign_course("I1", "C1").unwrap();
    snapshot::save(&ws.join("school.json"), &reg).unwrap();
}

#[test]
fn workspace_from_env_is_loaded_at_startup() {
    let workspace = temp_dir("schoold-env-ws");
    seed_workspace(workspace.path());

    let (mut child, mut stdin, mut reader) =
        spawn_sidecar_with_env(&[("SCHOOLD_WORKSPACE", workspace.path().to_path_buf())]);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health["workspacePath"],
        workspace.path().to_string_lossy().to_string()
    );
    assert_eq!(health["counts"], json!({ "students": 1, "instructors": 1, "courses": 1 }));

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.get",
        json!({ "studentId": "S1" }),
    );
    assert_eq!(student["student"]["courses"][0]["courseName"], "Algorithms");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn selecting_a_workspace_loads_its_snapshot() {
    let workspace = temp_dir("schoold-select-ws");
    seed_workspace(workspace.path());

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    assert_eq!(selected["loaded"], true);
    assert_eq!(selected["counts"]["courses"], 1);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn failed_load_keeps_current_records() {
    let workspace = temp_dir("schoold-bad-load");
    let ws = workspace.path();
    std::fs::write(ws.join("broken.json"), "{ not json").unwrap();

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": ws.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "courseId": "C1", "courseName": "Algorithms" }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "data.loadJson",
        json!({ "path": ws.join("broken.json").to_string_lossy() }),
    );
    assert_eq!(code, "malformed_document");
    let code = request_err(&mut stdin, &mut reader, "4", "data.loadJson", json!({}));
    assert_eq!(code, "file_not_found");
    let code = request_err(&mut stdin, &mut reader, "5", "data.loadDb", json!({}));
    assert_eq!(code, "file_not_found");

    let courses = request_ok(&mut stdin, &mut reader, "6", "courses.list", json!({}));
    assert_eq!(courses["courses"][0]["courseId"], "C1");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "backup.importBundle",
        json!({ "inPath": ws.join("missing.zip").to_string_lossy() }),
    );
    assert_eq!(code, "file_not_found");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn reassigning_a_course_reports_the_previous_instructor() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    for (i, iid) in ["I1", "I2"].into_iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("i{i}"),
            "instructors.create",
            json!({ "instructorId": iid, "name": "Teacher", "age": 40, "email": "t@example.com" }),
        );
    }
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "courses.create",
        json!({ "courseId": "C1", "courseName": "Algorithms", "instructorId": "I1" }),
    );

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "instructors.assignCourse",
        json!({ "instructorId": "I2", "courseId": "C1" }),
    );
    assert_eq!(moved["previousInstructorId"], "I1");
    assert_eq!(moved["course"]["instructorId"], "I2");
    assert_eq!(moved["instructor"]["assignedCourses"], json!(["C1"]));

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "instructors.get",
        json!({ "instructorId": "I1" }),
    );
    assert_eq!(first["instructor"]["assignedCourses"], json!([]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn saved_json_is_readable_by_a_fresh_sidecar() {
    let workspace = temp_dir("schoold-save-json");
    let ws = workspace.path();

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": ws.to_string_lossy() }),
        );
        request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "students.create",
            json!({ "studentId": "S7", "name": "Ada", "age": 36, "email": "ada@example.com" }),
        );
        request_ok(&mut stdin, &mut reader, "3", "data.saveJson", json!({}));
        drop(stdin);
        let _ = child.wait();
    }

    let reg = snapshot::load(&ws.join("school.json")).expect("load saved snapshot");
    assert_eq!(reg.student("S7").unwrap().person.name(), "Ada");
}

#[test]
fn rejected_import_keeps_workspace_files_and_records() {
    let workspace = temp_dir("schoold-bad-import");
    let ws = workspace.path();
    let notes = ws.join("notes.txt");
    std::fs::write(&notes, "these are lecture notes, not a database at all").unwrap();

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": ws.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "courseId": "C1", "courseName": "Algorithms" }),
    );
    request_ok(&mut stdin, &mut reader, "3", "data.saveDb", json!({}));
    let db_before = std::fs::read(ws.join("school.sqlite3")).unwrap();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "backup.importBundle",
        json!({ "inPath": notes.to_string_lossy() }),
    );
    assert_eq!(code, "malformed_document");
    assert_eq!(std::fs::read(ws.join("school.sqlite3")).unwrap(), db_before);
    assert!(!ws.join("school.sqlite3.importing").exists());

    let courses = request_ok(&mut stdin, &mut reader, "5", "courses.list", json!({}));
    assert_eq!(courses["courses"][0]["courseId"], "C1");
    let loaded = request_ok(&mut stdin, &mut reader, "6", "data.loadDb", json!({}));
    assert_eq!(loaded["counts"]["courses"], 1);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn copy_file_onto_its_source_is_refused() {
    let workspace = temp_dir("schoold-self-copy");
    let ws = workspace.path();

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": ws.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "courseId": "C1", "courseName": "Algorithms" }),
    );
    request_ok(&mut stdin, &mut reader, "3", "data.saveDb", json!({}));
    let db_path = ws.join("school.sqlite3");
    let before = std::fs::read(&db_path).unwrap();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "backup.copyFile",
        json!({ "outPath": db_path.to_string_lossy() }),
    );
    assert_eq!(code, "write_failed");
    assert_eq!(std::fs::read(&db_path).unwrap(), before);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn selecting_a_fresh_workspace_starts_empty() {
    let first = temp_dir("schoold-first-ws");
    let second = temp_dir("schoold-second-ws");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": first.path().to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "studentId": "S1", "name": "Alice", "age": 20, "email": "alice@example.com" }),
    );

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": second.path().to_string_lossy() }),
    );
    assert_eq!(selected["loaded"], false);
    assert_eq!(selected["counts"], json!({ "students": 0, "instructors": 0, "courses": 0 }));

    request_ok(&mut stdin, &mut reader, "4", "data.saveJson", json!({}));
    let saved = snapshot::load(&second.path().join("school.json")).unwrap();
    assert!(saved.is_empty());

    drop(stdin);
    let _ = child.wait();
}
