//! User Model
//!
//! Core user data structures and the closed set of platform roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Platform role consulted by authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular learner
    #[default]
    User,
    /// May author courses and lessons
    Instructor,
    /// Full administrative access
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Whether the role may create, edit or delete courses and lessons
    pub fn can_manage_catalog(&self) -> bool {
        matches!(self, Role::Admin | Role::Instructor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User representation for external API responses
///
/// Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,

    /// User's email address (unique, normalized)
    pub email: String,

    /// User's display name
    pub full_name: String,

    /// Platform role
    pub role: Role,

    /// Optional URL to user's profile picture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    /// Timestamp when the user account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the user profile was last modified
    pub updated_at: DateTime<Utc>,
}

/// Internal user representation including password hash
///
/// Used by the stores and the session manager. Deliberately not `Serialize`.
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash of the user's password
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserWithPassword> for User {
    /// Strips the password hash
    fn from(user: UserWithPassword) -> Self {
        User {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<&UserWithPassword> for User {
    fn from(user: &UserWithPassword) -> Self {
        user.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserWithPassword {
        UserWithPassword {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "hashed_password".to_string(),
            full_name: "Test User".to_string(),
            role: Role::Instructor,
            profile_picture: Some("https://example.com/avatar.jpg".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_with_password_conversion() {
        let user: User = sample_user().into();

        assert_eq!(user.full_name, "Test User");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.role, Role::Instructor);
    }

    #[test]
    fn test_public_user_never_serializes_hash() {
        let user: User = sample_user().into();
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"role\":\"instructor\""));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" User ".parse::<Role>().unwrap(), Role::User);
        assert_eq!("instructor".parse::<Role>().unwrap(), Role::Instructor);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Instructor.is_admin());
        assert!(Role::Instructor.can_manage_catalog());
        assert!(!Role::User.can_manage_catalog());
    }
}
