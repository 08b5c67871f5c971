//! User and session operations

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewUser, User};

/// How long a bearer token stays valid
pub const SESSION_TTL_DAYS: i64 = 30;

/// User that owns data when the server runs without authentication
const LOCAL_USER_EMAIL: &str = "local@finch.dev";

fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::Auth(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Register a new user
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        new_user.validate()?;

        let email = new_user.email.trim().to_lowercase();
        if self.get_user_by_email(&email)?.is_some() {
            return Err(Error::Conflict(format!("Email already registered: {}", email)));
        }

        let password_hash = hash_password(&new_user.password)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (email, name, password_hash) VALUES (?, ?, ?)",
            params![email, new_user.name.trim(), password_hash],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        info!(user_id = id, "Registered user");
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, name, created_at FROM users WHERE id = ?",
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, name, created_at FROM users WHERE email = ?",
                params![email.trim()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Check credentials, returning the user on success
    pub fn verify_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE email = ?",
                params![email.trim().to_lowercase()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        let Some((id, stored)) = row else {
            return Ok(None);
        };

        let parsed = PasswordHash::new(&stored)
            .map_err(|e| Error::Auth(format!("Corrupt password hash: {}", e)))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            debug!(user_id = id, "Password mismatch");
            return Ok(None);
        }

        self.get_user(id)
    }

    /// Get or create the user that owns data when auth is disabled
    pub fn ensure_local_user(&self) -> Result<User> {
        if let Some(user) = self.get_user_by_email(LOCAL_USER_EMAIL)? {
            return Ok(user);
        }

        // Random password: the local user can't log in through /auth/login
        let password = hex::encode(rand::random::<[u8; 16]>());
        self.create_user(&NewUser {
            email: LOCAL_USER_EMAIL.to_string(),
            name: "Local User".to_string(),
            password,
        })
    }

    /// Create a session and return its bearer token
    pub fn create_session(&self, user_id: i64) -> Result<String> {
        let token = hex::encode(rand::random::<[u8; 32]>());
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)",
            params![token_digest(&token), user_id, format_datetime(&expires_at)],
        )?;

        Ok(token)
    }

    /// Resolve a bearer token to its user, ignoring expired sessions
    pub fn user_for_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                r#"
                SELECT u.id, u.email, u.name, u.created_at
                FROM sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.token_hash = ? AND s.expires_at > ?
                "#,
                params![token_digest(token), format_datetime(&Utc::now())],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Revoke a token. Returns false if it didn't exist.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?",
            params![token_digest(token)],
        )?;
        Ok(deleted > 0)
    }

    /// Remove sessions past their expiry
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(deleted)
    }
}
