//! Domain model shared by the stores, the orchestrator, and the API layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Help-desk roles. Manager, HelpDesk and Hr gate the administrative
/// endpoints; Employee is the default for ticket-filing accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Manager,
    HelpDesk,
    Hr,
    Employee,
}

impl Role {
    /// Roles allowed to manage other accounts.
    pub const ADMIN: [Role; 3] = [Role::Manager, Role::HelpDesk, Role::Hr];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::HelpDesk => "help-desk",
            Role::Hr => "hr",
            Role::Employee => "employee",
        }
    }

    /// Parse a role name, tolerating case and surrounding whitespace.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "manager" => Some(Role::Manager),
            "help-desk" => Some(Role::HelpDesk),
            "hr" => Some(Role::Hr),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status. Inactive users keep their row but cannot log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pending action token is allowed to do when redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    PasswordReset,
    EmailChange,
    EmailConfirm,
}

impl TokenPurpose {
    /// Matches the `token_purpose` enum in the schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::PasswordReset => "password_reset",
            TokenPurpose::EmailChange => "email_change",
            TokenPurpose::EmailConfirm => "email_confirm",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full account record as the stores see it. Never serialized to clients;
/// the API returns [`UserProfile`] instead.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub status: UserStatus,
    pub roles: Vec<Role>,
    pub email_confirmed: bool,
}

impl User {
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.roles.iter().any(|role| roles.contains(role))
    }
}

/// Client-facing account shape. Excludes the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: UserStatus,
    pub roles: Vec<Role>,
    pub email_confirmed: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            status: user.status,
            roles: user.roles,
            email_confirmed: user.email_confirmed,
        }
    }
}

/// Insert shape for registration. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Allow-listed profile update. Email and password changes go through their
/// token flows instead.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub roles: Option<Vec<Role>>,
}

/// Mutation applied atomically together with a token consumption.
#[derive(Debug, Clone)]
pub enum UserMutation {
    SetPasswordHash(String),
    SetEmail(String),
    ConfirmEmail,
}
