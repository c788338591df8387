use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::model::{AttendanceRecord, AttendanceStatus, Class, Student};
use crate::roster::Roster;

pub const DB_FILE: &str = "rollcall.sqlite3";

/// Durable home of the roster. Sessions are never stored.
pub trait RosterStore {
    /// `None` when the store holds no data yet.
    fn load(&self) -> anyhow::Result<Option<Roster>>;
    fn save(&self, roster: &Roster) -> anyhow::Result<()>;
    /// RFC 3339 time of the last successful save, if any.
    fn last_saved(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = open_db(workspace)?;
        Ok(Self {
            conn,
            path: workspace.join(DB_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            external_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'unknown',
            score REAL NOT NULL DEFAULT 0,
            total_calls INTEGER NOT NULL DEFAULT 0,
            present_count INTEGER NOT NULL DEFAULT 0,
            late_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class_sort ON students(class_id, sort_order)",
        [],
    )?;

    // No foreign keys: the log outlives deleted students.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_records(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            status TEXT NOT NULL,
            date TEXT NOT NULL,
            timestamp TEXT,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_records_student ON attendance_records(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

fn meta_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?", [key], |r| r.get(0))
        .optional()?)
}

fn parse_status(raw: &str) -> AttendanceStatus {
    AttendanceStatus::parse(raw).unwrap_or_default()
}

impl RosterStore for SqliteStore {
    fn load(&self) -> anyhow::Result<Option<Roster>> {
        let conn = &self.conn;

        let mut stmt =
            conn.prepare("SELECT id, name, description FROM classes ORDER BY sort_order")?;
        let classes = stmt
            .query_map([], |r| {
                Ok(Class {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    description: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read classes")?;

        let mut stmt = conn.prepare(
            "SELECT id, external_id, name, class_id, status, score,
                    total_calls, present_count, late_count, absent_count
             FROM students
             ORDER BY sort_order",
        )?;
        let students = stmt
            .query_map([], |r| {
                let status: String = r.get(4)?;
                Ok(Student {
                    id: r.get(0)?,
                    external_id: r.get(1)?,
                    name: r.get(2)?,
                    class_id: r.get(3)?,
                    status: parse_status(&status),
                    score: r.get(5)?,
                    total_calls: r.get(6)?,
                    present_count: r.get(7)?,
                    late_count: r.get(8)?,
                    absent_count: r.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read students")?;

        let mut stmt = conn.prepare(
            "SELECT id, student_id, class_id, status, date, timestamp
             FROM attendance_records
             ORDER BY sort_order",
        )?;
        let attendance_records = stmt
            .query_map([], |r| {
                let status: String = r.get(3)?;
                Ok(AttendanceRecord {
                    id: r.get(0)?,
                    student_id: r.get(1)?,
                    class_id: r.get(2)?,
                    status: parse_status(&status),
                    date: r.get(4)?,
                    timestamp: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read attendance records")?;

        let roster = Roster {
            classes,
            students,
            attendance_records,
        };
        if roster.is_empty() {
            return Ok(None);
        }
        Ok(Some(roster))
    }

    /// Full rewrite inside one transaction; a failure leaves the old data.
    fn save(&self, roster: &Roster) -> anyhow::Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin save transaction")?;

        tx.execute("DELETE FROM attendance_records", [])?;
        tx.execute("DELETE FROM students", [])?;
        tx.execute("DELETE FROM classes", [])?;

        {
            let mut ins = tx.prepare(
                "INSERT INTO classes(id, name, description, sort_order) VALUES(?, ?, ?, ?)",
            )?;
            for (i, c) in roster.classes.iter().enumerate() {
                ins.execute((&c.id, &c.name, &c.description, i as i64))
                    .with_context(|| format!("failed to save class {}", c.id))?;
            }

            let mut ins = tx.prepare(
                "INSERT INTO students(
                    id, class_id, external_id, name, status, score,
                    total_calls, present_count, late_count, absent_count, sort_order
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (i, s) in roster.students.iter().enumerate() {
                ins.execute(rusqlite::params![
                    s.id,
                    s.class_id,
                    s.external_id,
                    s.name,
                    s.status.as_str(),
                    s.score,
                    s.total_calls,
                    s.present_count,
                    s.late_count,
                    s.absent_count,
                    i as i64,
                ])
                .with_context(|| format!("failed to save student {}", s.id))?;
            }

            let mut ins = tx.prepare(
                "INSERT INTO attendance_records(
                    id, student_id, class_id, status, date, timestamp, sort_order
                 ) VALUES(?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (i, r) in roster.attendance_records.iter().enumerate() {
                ins.execute(rusqlite::params![
                    r.id,
                    r.student_id,
                    r.class_id,
                    r.status.as_str(),
                    r.date,
                    r.timestamp,
                    i as i64,
                ])
                .with_context(|| format!("failed to save attendance record {}", r.id))?;
            }
        }

        tx.execute(
            "INSERT INTO meta(key, value) VALUES('last_saved', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [chrono::Local::now().to_rfc3339()],
        )?;
        tx.commit().context("failed to commit save")?;
        Ok(())
    }

    fn last_saved(&self) -> anyhow::Result<Option<String>> {
        meta_get(&self.conn, "last_saved")
    }
}
