//! User Storage
//! Mission: Hold admin console accounts in SQLite and answer credential checks

use crate::auth::models::{User, UserRole};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::{info, warn};
use uuid::Uuid;

/// Anything that can check a username/password pair and report the role.
///
/// Implementations may block (disk, network); callers run them off the
/// async workers.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Result<UserRole, CredentialError>;
}

#[derive(Debug)]
pub enum CredentialError {
    /// Unknown user and wrong password are deliberately the same variant
    InvalidCredentials,
    Unavailable(anyhow::Error),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::InvalidCredentials => write!(f, "Invalid credentials"),
            CredentialError::Unavailable(e) => write!(f, "Credential store unavailable: {e}"),
        }
    }
}

impl std::error::Error for CredentialError {}

// Only rows with a role the token layer understands are visible
const USER_COLUMNS: &str = "SELECT id, username, password_hash, role, created_at FROM users";
const KNOWN_ROLES: &str = "role IN ('admin', 'staff')";

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
    cost: u32,
    dummy_hash: String, // verified against on unknown usernames
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        Self::with_cost(db_path, DEFAULT_COST)
    }

    /// Same as `new` with an explicit bcrypt cost (tests use the minimum)
    pub fn with_cost(db_path: &str, cost: u32) -> Result<Self> {
        // Hashed up front so the first unknown-user login costs the same as the rest
        let dummy_hash =
            hash(Uuid::new_v4().to_string(), cost).context("Failed to hash dummy password")?;
        let store = Self {
            db_path: db_path.to_string(),
            cost,
            dummy_hash,
        };
        store.init_db()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open user database at {}", self.db_path))
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Create the configured admin account if no admin exists yet.
    /// Returns true when an account was created.
    pub fn ensure_admin(&self, username: &str, password: &str) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count > 0 {
            return Ok(false);
        }

        self.create_user(username, password, UserRole::Admin)?;
        info!(username, "Seeded admin account");
        Ok(true)
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(&format!(
            "{USER_COLUMNS} WHERE username = ?1 AND {KNOWN_ROLES}"
        ))?;

        let user_result = stmt.query_row(params![username], user_from_row);

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a new user
    pub fn create_user(&self, username: &str, password: &str, role: UserRole) -> Result<User> {
        let password_hash = hash(password, self.cost).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (id, username, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.created_at,
            ],
        )
        .context("Failed to insert user")?;

        info!(username = %user.username, role = user.role.as_str(), "Created user");

        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(&format!("{USER_COLUMNS} WHERE {KNOWN_ROLES}"))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Delete a user by ID
    pub fn delete_user(&self, user_id: &Uuid) -> Result<()> {
        let conn = self.connect()?;

        let rows_affected = conn.execute(
            "DELETE FROM users WHERE id = ?1",
            params![user_id.to_string()],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        info!(%user_id, "Deleted user");
        Ok(())
    }

}

impl CredentialStore for UserStore {
    fn verify(&self, username: &str, password: &str) -> Result<UserRole, CredentialError> {
        let user = self
            .get_user_by_username(username)
            .map_err(CredentialError::Unavailable)?;

        match user {
            Some(user) => match verify(password, &user.password_hash) {
                Ok(true) => Ok(user.role),
                Ok(false) => Err(CredentialError::InvalidCredentials),
                Err(e) => {
                    warn!(username, error = %e, "Stored password hash is unreadable");
                    Err(CredentialError::InvalidCredentials)
                }
            },
            None => {
                // burn the same bcrypt work so response time does not reveal the miss
                let _ = verify(password, &self.dummy_hash);
                Err(CredentialError::InvalidCredentials)
            }
        }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(3)?;
    Ok(User {
        id: Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: UserRole::parse(&role).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(3, "role".to_string(), rusqlite::types::Type::Text)
        })?,
        created_at: row.get(4)?,
    })
}
