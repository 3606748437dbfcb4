//! SQLite store: the same graph as the JSON snapshot, laid out as
//! `students`, `instructors`, `courses` and the `registrations` join table.
//! Order columns keep collection and link order across a round trip.

use crate::error::{RecordsError, Result};
use crate::registry::Registry;
use crate::snapshot::{self, CourseRecord, InstructorRecord, Snapshot, StudentRecord};
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::io;
use std::path::Path;

pub fn open_db(db_path: &Path) -> rusqlite::Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // Surfaces as a failed open below if this doesn't work.
        let _ = std::fs::create_dir_all(parent);
    }
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            email TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructors(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            email TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            instructor_id TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            instructor_order INTEGER,
            FOREIGN KEY(instructor_id) REFERENCES instructors(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS registrations(
            student_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            student_order INTEGER NOT NULL DEFAULT 0,
            course_order INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY(student_id, course_id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;

    // Databases written by the plain four-table layout have no order columns.
    ensure_column(&conn, "students", "sort_order", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(&conn, "instructors", "sort_order", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(&conn, "courses", "sort_order", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(&conn, "courses", "instructor_order", "INTEGER")?;
    ensure_column(&conn, "registrations", "student_order", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(&conn, "registrations", "course_order", "INTEGER NOT NULL DEFAULT 0")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_instructor ON courses(instructor_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_registrations_course ON registrations(course_id)",
        [],
    )?;

    Ok(conn)
}

fn ensure_column(conn: &Connection, table: &str, column: &str, decl: &str) -> rusqlite::Result<()> {
    if table_has_column(conn, table, column)? {
        return Ok(());
    }
    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl),
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Replaces every row with the current registry contents in one transaction.
pub fn save_db(db_path: &Path, reg: &Registry) -> Result<()> {
    let write_err = |e: rusqlite::Error| RecordsError::write(db_path, io::Error::other(e));

    let mut conn = open_db(db_path).map_err(write_err)?;
    write_snapshot(&mut conn, &snapshot::encode(reg)).map_err(write_err)?;

    tracing::info!(
        path = %db_path.display(),
        students = reg.students().len(),
        instructors = reg.instructors().len(),
        courses = reg.courses().len(),
        "database saved"
    );
    Ok(())
}

fn write_snapshot(conn: &mut Connection, snap: &Snapshot) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM registrations", [])?;
    tx.execute("DELETE FROM courses", [])?;
    tx.execute("DELETE FROM students", [])?;
    tx.execute("DELETE FROM instructors", [])?;

    for (i, rec) in snap.instructors.iter().enumerate() {
        tx.execute(
            "INSERT INTO instructors(id, name, age, email, sort_order) VALUES(?, ?, ?, ?, ?)",
            (&rec.instructor_id, &rec.name, rec.age, &rec.email, i as i64),
        )?;
    }
    for (i, rec) in snap.students.iter().enumerate() {
        tx.execute(
            "INSERT INTO students(id, name, age, email, sort_order) VALUES(?, ?, ?, ?, ?)",
            (&rec.student_id, &rec.name, rec.age, &rec.email, i as i64),
        )?;
    }

    let instructor_order: HashMap<&str, i64> = snap
        .instructors
        .iter()
        .flat_map(|rec| {
            rec.assigned_courses
                .iter()
                .enumerate()
                .map(|(pos, cid)| (cid.as_str(), pos as i64))
        })
        .collect();
    for (i, rec) in snap.courses.iter().enumerate() {
        tx.execute(
            "INSERT INTO courses(id, name, instructor_id, sort_order, instructor_order)
             VALUES(?, ?, ?, ?, ?)",
            (
                &rec.course_id,
                &rec.course_name,
                rec.instructor.as_deref(),
                i as i64,
                instructor_order.get(rec.course_id.as_str()).copied(),
            ),
        )?;
    }

    let course_order: HashMap<(&str, &str), i64> = snap
        .courses
        .iter()
        .flat_map(|rec| {
            rec.enrolled_students
                .iter()
                .enumerate()
                .map(move |(pos, sid)| ((sid.as_str(), rec.course_id.as_str()), pos as i64))
        })
        .collect();
    for rec in &snap.students {
        for (pos, cid) in rec.registered_courses.iter().enumerate() {
            let key = (rec.student_id.as_str(), cid.as_str());
            tx.execute(
                "INSERT INTO registrations(student_id, course_id, student_order, course_order)
                 VALUES(?, ?, ?, ?)",
                (
                    &rec.student_id,
                    cid,
                    pos as i64,
                    course_order.get(&key).copied().unwrap_or(pos as i64),
                ),
            )?;
        }
    }

    tx.commit()
}

/// Reads a database written by [`save_db`] (or the plain four-table layout)
/// back into a fresh registry.
pub fn load_db(db_path: &Path) -> Result<Registry> {
    if !db_path.is_file() {
        return Err(RecordsError::FileNotFound(db_path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| RecordsError::MalformedDocument(e.to_string()))?;
    let snap =
        read_snapshot(&conn).map_err(|e| RecordsError::MalformedDocument(e.to_string()))?;
    let reg = snapshot::decode(&snap)?;

    tracing::info!(
        path = %db_path.display(),
        students = reg.students().len(),
        instructors = reg.instructors().len(),
        courses = reg.courses().len(),
        "database loaded"
    );
    Ok(reg)
}

fn order_by(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<String> {
    Ok(if table_has_column(conn, table, column)? {
        format!("{column}, rowid")
    } else {
        "rowid".to_string()
    })
}

fn read_snapshot(conn: &Connection) -> rusqlite::Result<Snapshot> {
    let mut registered: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT student_id, course_id FROM registrations ORDER BY {}",
        order_by(conn, "registrations", "student_order")?
    ))?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (sid, cid) in rows {
        registered.entry(sid).or_default().push(cid);
    }

    let mut enrolled: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT student_id, course_id FROM registrations ORDER BY {}",
        order_by(conn, "registrations", "course_order")?
    ))?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (sid, cid) in rows {
        enrolled.entry(cid).or_default().push(sid);
    }

    let mut assigned: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT id, instructor_id FROM courses WHERE instructor_id IS NOT NULL ORDER BY {}",
        order_by(conn, "courses", "instructor_order")?
    ))?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (cid, iid) in rows {
        assigned.entry(iid).or_default().push(cid);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, age, email FROM students ORDER BY {}",
        order_by(conn, "students", "sort_order")?
    ))?;
    let students = stmt
        .query_map([], |r| {
            let student_id: String = r.get(0)?;
            Ok(StudentRecord {
                registered_courses: registered.remove(&student_id).unwrap_or_default(),
                student_id,
                name: r.get(1)?,
                age: r.get(2)?,
                email: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, age, email FROM instructors ORDER BY {}",
        order_by(conn, "instructors", "sort_order")?
    ))?;
    let instructors = stmt
        .query_map([], |r| {
            let instructor_id: String = r.get(0)?;
            Ok(InstructorRecord {
                assigned_courses: assigned.remove(&instructor_id).unwrap_or_default(),
                instructor_id,
                name: r.get(1)?,
                age: r.get(2)?,
                email: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, instructor_id FROM courses ORDER BY {}",
        order_by(conn, "courses", "sort_order")?
    ))?;
    let courses = stmt
        .query_map([], |r| {
            let course_id: String = r.get(0)?;
            Ok(CourseRecord {
                enrolled_students: enrolled.remove(&course_id).unwrap_or_default(),
                course_id,
                course_name: r.get(1)?,
                instructor: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        students,
        instructors,
        courses,
    })
}
