//! User and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::role::{Capability, Role};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Get the role as a Role enum. Unknown roles collapse to the least privileged one.
    pub fn role_enum(&self) -> Role {
        self.role.parse().unwrap_or(Role::Executor)
    }

    pub fn can_access(&self, capability: Capability) -> bool {
        self.role_enum().can_access(capability)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Request to create a staff user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub role: String,
}

/// Landing page payload: who is logged in and what they may open
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub user: UserResponse,
    pub capabilities: Vec<Capability>,
    pub notification_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> User {
        User {
            id: 1,
            username: "u".to_string(),
            password_hash: String::new(),
            full_name: String::new(),
            role: role.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_role_enum_parses_stored_role() {
        assert_eq!(user_with_role("design_chief").role_enum(), Role::DesignChief);
        assert_eq!(user_with_role("admin").role_enum(), Role::Admin);
    }

    #[test]
    fn test_unknown_role_is_least_privileged() {
        let user = user_with_role("superuser");
        assert_eq!(user.role_enum(), Role::Executor);
        assert!(!user.can_access(Capability::ClientRequests));
    }
}
