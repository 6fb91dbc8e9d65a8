use std::sync::Arc;

use board_types::api::{CreateUserRequest, UpdateUserRequest};
use board_types::models::{MessageContent, User};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::models::NewContent;
use crate::pool::Pool;

const USER_COLUMNS: &str = "id, name, email, age, created_at, updated_at";
const CONTENT_COLUMNS: &str = "msg_id, user_id, user_ip, content, created_at";

// -- Users --

pub struct UserRepo {
    pool: Arc<Pool>,
}

impl UserRepo {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }

    pub fn create(&self, req: &CreateUserRequest) -> DbResult<User> {
        let now = Utc::now();
        self.pool.with_conn(|conn| {
            let user = conn.query_row(
                &format!(
                    "INSERT INTO users (name, email, age, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {USER_COLUMNS}"
                ),
                rusqlite::params![req.name, req.email, req.age, now],
                user_from_row,
            )?;
            debug!("Created user {}", user.id);
            Ok(user)
        })
    }

    /// All users in primary key order.
    pub fn list(&self) -> DbResult<Vec<User>> {
        self.pool.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get(&self, id: i64) -> DbResult<User> {
        self.pool.with_conn(|conn| query_user(conn, id))
    }

    /// Apply only the fields present in `patch`, returning the merged record.
    pub fn update(&self, id: i64, patch: &UpdateUserRequest) -> DbResult<User> {
        self.pool.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut user = query_user(&tx, id)?;

            if let Some(name) = &patch.name {
                user.name = name.clone();
            }
            if let Some(email) = &patch.email {
                user.email = Some(email.clone());
            }
            if let Some(age) = patch.age {
                user.age = age;
            }

            let user = tx.query_row(
                &format!(
                    "UPDATE users SET name = ?1, email = ?2, age = ?3, updated_at = ?4
                     WHERE id = ?5 RETURNING {USER_COLUMNS}"
                ),
                rusqlite::params![user.name, user.email, user.age, Utc::now(), id],
                user_from_row,
            )?;
            tx.commit()?;

            debug!("Updated user {}", id);
            Ok(user)
        })
    }

    /// Delete by primary key. Deleting an id that doesn't exist is not an error.
    pub fn delete(&self, id: i64) -> DbResult<()> {
        self.pool.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            debug!("Deleted user {} ({} rows)", id, removed);
            Ok(())
        })
    }
}

// -- Message board --

pub struct ContentRepo {
    pool: Arc<Pool>,
}

impl ContentRepo {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }

    pub fn create(&self, new: &NewContent) -> DbResult<MessageContent> {
        self.pool.with_conn(|conn| {
            let content = conn.query_row(
                &format!(
                    "INSERT INTO msg_contents (user_id, user_ip, content, created_at)
                     VALUES (?1, ?2, ?3, ?4) RETURNING {CONTENT_COLUMNS}"
                ),
                rusqlite::params![new.user_id, new.user_ip, new.content, Utc::now()],
                content_from_row,
            )?;
            debug!("Posted message {} from {}", content.msg_id, content.user_ip);
            Ok(content)
        })
    }

    pub fn list(&self) -> DbResult<Vec<MessageContent>> {
        self.pool.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {CONTENT_COLUMNS} FROM msg_contents ORDER BY msg_id"))?;
            let rows = stmt
                .query_map([], content_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete(&self, msg_id: i64) -> DbResult<()> {
        self.pool.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM msg_contents WHERE msg_id = ?1", [msg_id])?;
            debug!("Deleted message {} ({} rows)", msg_id, removed);
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, id: i64) -> DbResult<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )
    .optional()?
    .ok_or(DbError::NotFound { entity: "user", id })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        age: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn content_from_row(row: &Row<'_>) -> rusqlite::Result<MessageContent> {
    Ok(MessageContent {
        msg_id: row.get(0)?,
        user_id: row.get(1)?,
        user_ip: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
