//! Login accounts for existing student, teacher and employee profiles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{id_string, Ctx};
use crate::query::{invalidation, Mutation, Query, QueryKey, QueryOptions};

const ACCOUNTS_PATH: &str = "/auth/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
  pub id: u64,
  pub email: String,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  pub role: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub is_active: bool,
  #[serde(default)]
  pub last_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileWithoutAccount {
  /// UUID for students, number for everyone else
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub email: String,
  /// Student number, employee id, ...
  #[serde(default)]
  pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilesWithoutAccounts {
  #[serde(default)]
  pub students: Vec<ProfileWithoutAccount>,
  #[serde(default)]
  pub teachers: Vec<ProfileWithoutAccount>,
  #[serde(default)]
  pub employees: Vec<ProfileWithoutAccount>,
}

impl ProfilesWithoutAccounts {
  pub fn len(&self) -> usize {
    self.students.len() + self.teachers.len() + self.employees.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
  Student,
  Teacher,
  Employee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
  pub profile_type: ProfileType,
  pub profile_id: String,
  /// student, teacher or staff
  pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedAccount {
  #[serde(default)]
  pub message: String,
  pub user: UserAccount,
  pub generated_password: String,
  #[serde(default)]
  pub profile_type: String,
  #[serde(default)]
  pub profile_id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordReset {
  #[serde(default)]
  pub message: String,
  pub new_password: String,
  pub user: UserAccount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResetPassword {
  pub user_id: u64,
}

#[derive(Clone)]
pub struct Accounts {
  ctx: Ctx,
}

impl Accounts {
  pub fn new(ctx: Ctx) -> Self {
    Self { ctx }
  }

  pub fn without_accounts(&self) -> Query<ProfilesWithoutAccounts> {
    self.ctx.query_with(
      QueryKey::new("users-without-accounts"),
      format!("{}users-without-accounts/", ACCOUNTS_PATH),
      QueryOptions::default().stale_time(Duration::from_secs(5 * 60)),
    )
  }

  pub fn user_accounts(&self) -> Query<Vec<UserAccount>> {
    self.ctx.query_with(
      QueryKey::new("user-accounts"),
      format!("{}list-accounts/", ACCOUNTS_PATH),
      QueryOptions::default().stale_time(Duration::from_secs(2 * 60)),
    )
  }

  /// The response carries the generated password; it is shown once and
  /// never cached.
  pub fn create_for_profile(&self) -> Mutation<NewAccount, CreatedAccount> {
    self.ctx.mutation(
      &invalidation::ACCOUNT_CREATE,
      |client, account: NewAccount| async move {
        client
          .post(&format!("{}create-account-for-profile/", ACCOUNTS_PATH), &account)
          .await
      },
    )
  }

  pub fn reset_password(&self) -> Mutation<ResetPassword, PasswordReset> {
    self.ctx.mutation(
      &invalidation::ACCOUNT_RESET_PASSWORD,
      |client, reset: ResetPassword| async move {
        client
          .post(&format!("{}reset-password/", ACCOUNTS_PATH), &reset)
          .await
      },
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::test_support::harness;
  use serde_json::json;

  fn user(id: u64) -> Value {
    json!({"id": id, "email": "ada@school.test", "role": "student", "is_active": true})
  }

  #[tokio::test]
  async fn test_profiles_without_accounts_mix_id_kinds() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::GET,
      "/auth/users-without-accounts/",
      200,
      json!({
        "students": [{"id": "2b1c", "name": "Ada", "identifier": "STU-001"}],
        "teachers": [{"id": 7, "name": "Mr. Bello", "identifier": "T-7"}],
      }),
    );
    let accounts = Accounts::new(Ctx::new(client, cache));

    let profiles = accounts.without_accounts().load().await.unwrap().unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles.teachers[0].id, "7");
    assert!(profiles.employees.is_empty());
  }

  #[tokio::test]
  async fn test_creating_account_refreshes_both_lists() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::POST,
      "/auth/create-account-for-profile/",
      201,
      json!({
        "message": "created",
        "user": user(11),
        "generated_password": "x9-Tq!",
        "profile_type": "student",
        "profile_id": "2b1c",
      }),
    );
    let without = QueryKey::new("users-without-accounts");
    let listed = QueryKey::new("user-accounts");
    cache.set_data(&without, json!({}));
    cache.set_data(&listed, json!([]));
    let accounts = Accounts::new(Ctx::new(client, cache.clone()));

    let created = accounts
      .create_for_profile()
      .mutate_async(NewAccount {
        profile_type: ProfileType::Student,
        profile_id: "2b1c".into(),
        role: "student".into(),
      })
      .await
      .unwrap();
    assert_eq!(created.generated_password, "x9-Tq!");
    assert_eq!(
      mock.last_body(Method::POST, "/auth/create-account-for-profile/").unwrap()["profile_type"],
      json!("student")
    );
    assert!(cache.snapshot(&without).unwrap().is_invalidated);
    assert!(cache.snapshot(&listed).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_reset_password_leaves_profiles_alone() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::POST,
      "/auth/reset-password/",
      200,
      json!({"message": "reset", "new_password": "n3w", "user": user(11)}),
    );
    let without = QueryKey::new("users-without-accounts");
    cache.set_data(&without, json!({}));
    let accounts = Accounts::new(Ctx::new(client, cache.clone()));

    let reset = accounts
      .reset_password()
      .mutate_async(ResetPassword { user_id: 11 })
      .await
      .unwrap();
    assert_eq!(reset.new_password, "n3w");
    assert!(!cache.snapshot(&without).unwrap().is_invalidated);
  }
}
