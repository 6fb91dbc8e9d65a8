use std::fmt;

use serde::{Deserialize, Serialize};

// -- Envelope --

/// Uniform response wrapper returned by every `/api` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response without a payload.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

// -- Database admin --

/// Connection parameters supplied per admin request. Never persisted.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub dbname: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Unreachable,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub open_connections: usize,
    pub in_use: usize,
    pub idle: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub status: ConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub pool: Option<PoolStats>,
}

impl DatabaseStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            status: ConnectionState::Disconnected,
            database: None,
            error: None,
            pool: None,
        }
    }
}

// -- Users --

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: i32,
}

/// Partial update. Absent fields are left untouched; `Some(0)` for `age`
/// is a real value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }
}

// -- Message board --

/// Body of `POST /api/addContent`. A `user_ip` sent by the client is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentRequest {
    #[serde(default)]
    pub user_id: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_missing_data() {
        let body = serde_json::to_value(ApiResponse::done("user deleted")).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "user deleted" }));

        let body = serde_json::to_value(ApiResponse::ok("query succeeded", vec![1, 2])).unwrap();
        assert_eq!(body["data"], json!([1, 2]));
    }

    #[test]
    fn connected_status_flattens_pool_metrics() {
        let status = DatabaseStatus {
            connected: true,
            status: ConnectionState::Connected,
            database: Some("board".into()),
            error: None,
            pool: Some(PoolStats { open_connections: 2, in_use: 1, idle: 1 }),
        };
        let body = serde_json::to_value(status).unwrap();
        assert_eq!(
            body,
            json!({
                "connected": true,
                "status": "connected",
                "database": "board",
                "open_connections": 2,
                "in_use": 1,
                "idle": 1,
            })
        );
    }

    #[test]
    fn disconnected_status_has_no_pool_fields() {
        let body = serde_json::to_value(DatabaseStatus::disconnected()).unwrap();
        assert_eq!(body, json!({ "connected": false, "status": "disconnected" }));
    }

    #[test]
    fn database_config_debug_hides_password() {
        let config: DatabaseConfig =
            serde_json::from_value(json!({ "password": "hunter2", "dbname": "board" })).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert_eq!(config.port, 0);
    }

    #[test]
    fn update_request_distinguishes_zero_from_absent() {
        let patch: UpdateUserRequest = serde_json::from_value(json!({ "age": 0 })).unwrap();
        assert_eq!(patch.age, Some(0));
        assert!(patch.name.is_none());
        assert!(!patch.is_empty());
        assert!(UpdateUserRequest::default().is_empty());
    }
}
