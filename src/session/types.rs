use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::api::{ApiError, FieldErrors};

/// Portal roles. Anything the backend sends that we don't know becomes
/// `Unknown` instead of failing the whole profile decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Teacher,
  Student,
  Parent,
  Staff,
  Accountant,
  Hr,
  Admission,
  #[serde(other)]
  Unknown,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Teacher => "teacher",
      Role::Student => "student",
      Role::Parent => "parent",
      Role::Staff => "staff",
      Role::Accountant => "accountant",
      Role::Hr => "hr",
      Role::Admission => "admission",
      Role::Unknown => "unknown",
    }
  }

  /// Dashboard for this role, or `None` when the role has no area.
  pub fn landing_path(&self) -> Option<String> {
    match self {
      Role::Unknown => None,
      role => Some(format!("/{}/dashboard", role.as_str())),
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The authenticated user's profile (`/auth/profile/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  pub role: Role,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_login: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

fn default_true() -> bool {
  true
}

impl User {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
  #[validate(email(message = "Please enter a valid email address"))]
  pub email: String,
  #[validate(length(min = 1, message = "Password is required"))]
  pub password: String,
}

impl LoginRequest {
  pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      email: email.into(),
      password: password.into(),
    }
  }
}

/// Login/registration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
  pub user: User,
  #[serde(default)]
  pub access_token: String,
  #[serde(default)]
  pub refresh_token: String,
  #[serde(default)]
  pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
  #[validate(email(message = "Please enter a valid email address"))]
  pub email: String,
  #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
  pub password: String,
  pub password_confirm: String,
  #[validate(length(min = 1, message = "First name is required"))]
  pub first_name: String,
  #[validate(length(min = 1, message = "Last name is required"))]
  pub last_name: String,
  pub role: Role,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

/// Partial profile update; unset fields are left out of the PATCH body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordChange {
  #[validate(length(min = 1, message = "Current password is required"))]
  pub current_password: String,
  #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
  pub new_password: String,
  pub new_password_confirm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordResetRequest {
  #[validate(email(message = "Please enter a valid email address"))]
  pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordResetConfirm {
  #[validate(length(min = 1, message = "Reset token is required"))]
  pub token: String,
  #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
  pub new_password: String,
  pub new_password_confirm: String,
}

/// `{ "message": ... }` acknowledgement bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
  #[serde(default)]
  pub message: String,
}

/// Field rules plus the "confirm" check that spans two fields.
pub trait CheckedRequest: Validate {
  fn confirmation(&self) -> Option<(&str, &str, &'static str)> {
    None
  }

  fn check(&self) -> Result<(), ApiError> {
    let mut fields = match self.validate() {
      Ok(()) => FieldErrors::new(),
      Err(errors) => FieldErrors::from(errors),
    };
    if let Some((password, confirm, field)) = self.confirmation() {
      if password != confirm {
        fields.add(field, "Passwords don't match");
      }
    }
    if fields.is_empty() {
      Ok(())
    } else {
      Err(ApiError::Validation(fields))
    }
  }
}

impl CheckedRequest for LoginRequest {}

impl CheckedRequest for PasswordResetRequest {}

impl CheckedRequest for RegisterRequest {
  fn confirmation(&self) -> Option<(&str, &str, &'static str)> {
    Some((&self.password, &self.password_confirm, "password_confirm"))
  }
}

impl CheckedRequest for PasswordChange {
  fn confirmation(&self) -> Option<(&str, &str, &'static str)> {
    Some((&self.new_password, &self.new_password_confirm, "new_password_confirm"))
  }
}

impl CheckedRequest for PasswordResetConfirm {
  fn confirmation(&self) -> Option<(&str, &str, &'static str)> {
    Some((&self.new_password, &self.new_password_confirm, "new_password_confirm"))
  }
}
