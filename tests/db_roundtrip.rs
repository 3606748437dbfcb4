use rusqlite::Connection;
use schoold::{db, snapshot};
use schoold::{Course, Instructor, RecordsError, Registry, Student};

fn populated() -> Registry {
    let mut reg = Registry::new();
    reg.add_student(Student::new("Zed", 22, "zed@example.com", "S9").unwrap())
        .unwrap();
    reg.add_student(Student::new("Alice Smith", 20, "alice@example.com", "S1").unwrap())
        .unwrap();
    reg.add_instructor(Instructor::new("Grace Hopper", 50, "grace@example.com", "I1").unwrap())
        .unwrap();
    reg.add_instructor(Instructor::new("Alan Turing", 41, "alan@example.com", "I2").unwrap())
        .unwrap();
    reg.add_course(Course::new("C3", "Compilers")).unwrap();
    reg.add_course(Course::new("C1", "Algorithms")).unwrap();
    reg.add_course(Course::new("C2", "Databases")).unwrap();
    reg.register_course("S1", "C2").unwrap();
    reg.register_course("S1", "C3").unwrap();
    reg.register_course("S9", "C3").unwrap();
    reg.register_course("S9", "C1").unwrap();
    reg.assign_course("I2", "C2").unwrap();
    reg.assign_course("I2", "C3").unwrap();
    reg.assign_course("I1", "C1").unwrap();
    reg
}

#[test]
fn save_then_load_keeps_order_and_links() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.sqlite3");
    let original = populated();

    db::save_db(&path, &original).expect("save");
    let loaded = db::load_db(&path).expect("load");

    assert_eq!(snapshot::encode(&loaded), snapshot::encode(&original));
    assert_eq!(loaded.student("S9").unwrap().registered_courses, ["C3", "C1"]);
    assert_eq!(loaded.course("C3").unwrap().enrolled_students, ["S1", "S9"]);
    assert_eq!(loaded.instructor("I2").unwrap().assigned_courses, ["C2", "C3"]);
}

#[test]
fn saving_replaces_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.sqlite3");

    db::save_db(&path, &populated()).unwrap();
    let mut smaller = Registry::new();
    smaller
        .add_course(Course::new("C5", "Networks"))
        .unwrap();
    db::save_db(&path, &smaller).unwrap();

    let loaded = db::load_db(&path).unwrap();
    assert!(loaded.students().is_empty());
    assert!(loaded.instructors().is_empty());
    let ids: Vec<_> = loaded.courses().iter().map(|c| c.course_id.as_str()).collect();
    assert_eq!(ids, ["C5"]);
}

#[test]
fn reads_the_plain_four_table_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.db");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE students (id TEXT PRIMARY KEY, name TEXT NOT NULL,
                                    age INTEGER NOT NULL, email TEXT NOT NULL);
             CREATE TABLE instructors (id TEXT PRIMARY KEY, name TEXT NOT NULL,
                                       age INTEGER NOT NULL, email TEXT NOT NULL);
             CREATE TABLE courses (id TEXT PRIMARY KEY, name TEXT NOT NULL, instructor_id TEXT,
                                   FOREIGN KEY (instructor_id) REFERENCES instructors(id));
             CREATE TABLE registrations (student_id TEXT, course_id TEXT,
                                         PRIMARY KEY (student_id, course_id));
             INSERT INTO students VALUES ('S1', 'Alice', 20, 'alice@example.com');
             INSERT INTO instructors VALUES ('I1', 'Grace', 50, 'grace@example.com');
             INSERT INTO courses VALUES ('C2', 'Databases', NULL);
             INSERT INTO courses VALUES ('C1', 'Algorithms', 'I1');
             INSERT INTO registrations VALUES ('S1', 'C2');
             INSERT INTO registrations VALUES ('S1', 'C1');
             INSERT INTO registrations VALUES ('S404', 'C1');",
        )
        .unwrap();
    }

    let reg = db::load_db(&path).expect("load legacy layout");
    let ids: Vec<_> = reg.courses().iter().map(|c| c.course_id.as_str()).collect();
    assert_eq!(ids, ["C2", "C1"]);
    assert_eq!(reg.student("S1").unwrap().registered_courses, ["C2", "C1"]);
    assert_eq!(reg.course("C1").unwrap().enrolled_students, ["S1"]);
    assert_eq!(reg.instructor("I1").unwrap().assigned_courses, ["C1"]);

    // Saving upgrades the same file in place.
    db::save_db(&path, &reg).unwrap();
    let again = db::load_db(&path).unwrap();
    assert_eq!(snapshot::encode(&again), snapshot::encode(&reg));
}

#[test]
fn missing_database_is_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sqlite3");
    let err = db::load_db(&path).unwrap_err();
    assert!(matches!(err, RecordsError::FileNotFound(_)), "{err:?}");
    assert!(!path.exists());
}

#[test]
fn non_database_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.sqlite3");
    std::fs::write(&path, "this is not sqlite, just some text that is long enough").unwrap();

    let err = db::load_db(&path).unwrap_err();
    assert!(matches!(err, RecordsError::MalformedDocument(_)), "{err:?}");
}
