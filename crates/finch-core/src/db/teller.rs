//! Stored Teller enrollments

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::TellerEnrollment;

impl Database {
    /// Store (or replace the token of) an enrollment returned by Teller Connect
    pub fn save_enrollment(
        &self,
        user_id: i64,
        enrollment_id: &str,
        institution: &str,
        access_token: &str,
    ) -> Result<i64> {
        if enrollment_id.trim().is_empty() || access_token.trim().is_empty() {
            return Err(Error::InvalidData(
                "Enrollment id and access token are required".into(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO teller_enrollments (user_id, enrollment_id, institution, access_token)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, enrollment_id)
            DO UPDATE SET access_token = excluded.access_token, institution = excluded.institution
            "#,
            params![user_id, enrollment_id.trim(), institution.trim(), access_token.trim()],
        )?;

        let id = conn.query_row(
            "SELECT id FROM teller_enrollments WHERE user_id = ? AND enrollment_id = ?",
            params![user_id, enrollment_id.trim()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn list_enrollments(&self, user_id: i64) -> Result<Vec<TellerEnrollment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, enrollment_id, institution, access_token, created_at FROM teller_enrollments WHERE user_id = ? ORDER BY id",
        )?;

        let enrollments = stmt
            .query_map(params![user_id], |row| {
                let created_at: String = row.get(5)?;
                Ok(TellerEnrollment {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    enrollment_id: row.get(2)?,
                    institution: row.get(3)?,
                    access_token: row.get(4)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(enrollments)
    }
}
