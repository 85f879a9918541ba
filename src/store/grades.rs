use log::debug;
use rusqlite::params;
use super::GradeStore;
use crate::error::Result;
use crate::models::{Grade, GradeSet};

impl GradeStore {
    // Grades last stored for `username`; empty when nothing was stored yet.
    pub fn load(&self, username: &str) -> Result<GradeSet> {
        let mut stmt = self.connection().prepare(
            "SELECT unid, course, type, lecturer, assessment FROM grades \
             WHERE username = ?1 ORDER BY rowid",
        )?;

        let grades = stmt
            .query_map(params![username], |row| {
                Ok(Grade {
                    identity: row.get(0)?,
                    course: row.get(1)?,
                    assessment_type: row.get(2)?,
                    lecturer: row.get(3)?,
                    assessment: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<GradeSet>>()?;
        Ok(grades)
    }

    // Grades of `current` whose identity is not stored for `username`, in `current`'s order.
    pub fn diff(&self, current: &GradeSet, username: &str) -> Result<GradeSet> {
        let stored = self.load(username)?;
        Ok(current.difference(&stored))
    }

    // Swaps the stored listing of `username` for `current` in one transaction.
    pub fn replace(&mut self, username: &str, current: &GradeSet) -> Result<()> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM grades WHERE username = ?1", params![username])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO grades (username, unid, course, type, lecturer, assessment) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for grade in current {
                insert.execute(params![
                    username,
                    grade.identity,
                    grade.course,
                    grade.assessment_type,
                    grade.lecturer,
                    grade.assessment
                ])?;
            }
        }
        tx.commit()?;
        debug!(
            "Replaced {} stored grades of {} with {}",
            removed,
            username,
            current.len()
        );
        Ok(())
    }
}
