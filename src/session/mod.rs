//! Authentication state and route guarding.
//!
//! ```text
//! Uninitialized ──start()──▶ Checking ──profile ok──▶ Authenticated(user)
//!       │                        └──────failure─────▶ Unauthenticated
//!       └──────────no token─────────────────────────▶ Unauthenticated
//! ```
//!
//! `login` moves to `Authenticated`; `logout`, or any request the backend
//! rejects as unauthorized, moves to `Unauthenticated` and wipes the
//! credentials and the query cache.

mod tokens;
mod types;

pub use tokens::{MemoryTokenStore, SqliteTokenStore, TokenStore};
pub use types::{
  AuthResponse, CheckedRequest, LoginRequest, MessageResponse, PasswordChange, PasswordResetConfirm,
  PasswordResetRequest, ProfileUpdate, RegisterRequest, Role, User,
};

use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiEvent};
use crate::observability::token_fingerprint;
use crate::query::{fetcher, invalidation, Mutation, Query, QueryCache, QueryKey, QueryOptions};

const PROFILE_PATH: &str = "/auth/profile/";
const USER_STALE_TIME: Duration = Duration::from_secs(5 * 60);
const USER_RETRY: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
  /// `start` has not run yet
  Uninitialized,
  /// A stored token is being checked against the profile endpoint
  Checking,
  Authenticated(User),
  Unauthenticated,
}

impl AuthState {
  pub fn user(&self) -> Option<&User> {
    match self {
      AuthState::Authenticated(user) => Some(user),
      _ => None,
    }
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, AuthState::Uninitialized | AuthState::Checking)
  }
}

/// What a page should do given the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
  /// Session still resolving; show a spinner
  Pending,
  Allow,
  Redirect(String),
}

/// Shared auth state. Cheap to clone.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

struct SessionInner {
  client: ApiClient,
  cache: QueryCache,
  login_path: String,
  state: watch::Sender<AuthState>,
  redirect_after_login: Mutex<Option<String>>,
}

impl Session {
  pub fn new(client: ApiClient, cache: QueryCache, login_path: impl Into<String>) -> Self {
    let (state, _) = watch::channel(AuthState::Uninitialized);
    Self {
      inner: Arc::new(SessionInner {
        client,
        cache,
        login_path: login_path.into(),
        state,
        redirect_after_login: Mutex::new(None),
      }),
    }
  }

  pub fn state(&self) -> AuthState {
    self.inner.state.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<AuthState> {
    self.inner.state.subscribe()
  }

  pub fn user(&self) -> Option<User> {
    self.state().user().cloned()
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(*self.inner.state.borrow(), AuthState::Authenticated(_))
  }

  pub fn is_loading(&self) -> bool {
    self.inner.state.borrow().is_loading()
  }

  pub fn login_path(&self) -> &str {
    &self.inner.login_path
  }

  pub fn user_key() -> QueryKey {
    QueryKey::new("user")
  }

  fn set_state(&self, state: AuthState) {
    self.inner.state.send_replace(state);
  }

  fn tokens(&self) -> &Arc<dyn TokenStore> {
    self.inner.client.tokens()
  }

  /// The current user's profile. Disabled while there is no stored token.
  pub fn user_query(&self) -> Query<User> {
    let client = self.inner.client.clone();
    Query::new(
      self.inner.cache.clone(),
      Self::user_key(),
      fetcher(move || {
        let client = client.clone();
        async move { client.get::<Value>(PROFILE_PATH).await }
      }),
      QueryOptions::default()
        .enabled(self.tokens().has_token())
        .stale_time(USER_STALE_TIME)
        .retry(USER_RETRY),
    )
  }

  /// Resolve the initial state from whatever token is stored.
  pub async fn start(&self) -> AuthState {
    if !self.tokens().has_token() {
      debug!("no stored token");
      self.set_state(AuthState::Unauthenticated);
      return self.state();
    }

    self.set_state(AuthState::Checking);
    match self.user_query().load().await {
      Ok(Some(user)) => {
        info!(user_id = user.id, role = %user.role, "session restored");
        self.set_state(AuthState::Authenticated(user));
      }
      Ok(None) => self.set_state(AuthState::Unauthenticated),
      Err(e) if e.is_auth_error() => self.expire("stored token rejected"),
      Err(e) => {
        warn!(error = %e, "could not verify stored session");
        self.set_state(AuthState::Unauthenticated);
      }
    }
    self.state()
  }

  pub async fn login(&self, request: LoginRequest) -> Result<User, ApiError> {
    request.check()?;
    let response: AuthResponse = self.inner.client.post("/auth/login/", &request).await?;
    self.establish(&response);
    Ok(response.user)
  }

  /// Store the credentials from a login/registration response and seed the
  /// user query so the profile is not fetched again right away.
  fn establish(&self, response: &AuthResponse) {
    if response.access_token.is_empty() {
      debug!("login response carried no tokens");
    } else if let Err(e) = self
      .tokens()
      .set_tokens(&response.access_token, &response.refresh_token)
    {
      warn!(error = %e, "failed to persist tokens");
    }
    match serde_json::to_value(&response.user) {
      Ok(user) => self.inner.cache.set_data(&Self::user_key(), user),
      Err(e) => warn!(error = %e, "failed to cache user profile"),
    }
    info!(
      user_id = response.user.id,
      role = %response.user.role,
      token = %token_fingerprint(&response.access_token),
      "logged in"
    );
    self.set_state(AuthState::Authenticated(response.user.clone()));
  }

  /// Tell the backend, then drop local credentials and cached data whatever
  /// the backend said.
  pub async fn logout(&self) {
    if let Err(e) = self
      .inner
      .client
      .post::<Value, _>("/auth/logout/", &json!({}))
      .await
    {
      warn!(error = %e, "logout request failed");
    }
    self.clear_local();
    info!("logged out");
  }

  fn clear_local(&self) {
    if let Err(e) = self.tokens().clear() {
      warn!(error = %e, "failed to clear tokens");
    }
    self.inner.cache.clear();
    self.set_state(AuthState::Unauthenticated);
  }

  fn expire(&self, reason: &str) {
    info!(reason, "session expired");
    self.clear_local();
  }

  /// Forced logout on authorization errors. Returns whether `err` was one.
  pub fn intercept(&self, err: &ApiError) -> bool {
    if err.is_auth_error() {
      self.expire("request unauthorized");
      true
    } else {
      false
    }
  }

  /// React to client events in the background. The task ends once the
  /// session is dropped.
  pub fn listen(&self) -> JoinHandle<()> {
    let mut events = self.inner.client.events();
    let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);

    tokio::spawn(async move {
      loop {
        let event = match events.recv().await {
          Ok(event) => event,
          Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "missed client events");
            continue;
          }
          Err(RecvError::Closed) => break,
        };
        let Some(inner) = weak.upgrade() else { break };
        let session = Session { inner };
        match event {
          ApiEvent::Unauthorized => {
            if !matches!(session.state(), AuthState::Unauthenticated) {
              session.expire("backend rejected credentials");
            }
          }
          ApiEvent::TokenRefreshed => debug!("access token refreshed"),
        }
      }
    })
  }

  /// Decide whether `path` may render. An unauthenticated visit remembers
  /// `path` so `public_route` can send the user back after login.
  pub fn guard(&self, path: &str, allowed: &[Role]) -> RouteDecision {
    match self.state() {
      AuthState::Uninitialized | AuthState::Checking => RouteDecision::Pending,
      AuthState::Unauthenticated => {
        *self.remembered() = Some(path.to_string());
        RouteDecision::Redirect(self.inner.login_path.clone())
      }
      AuthState::Authenticated(user) => {
        if allowed.is_empty() || allowed.contains(&user.role) {
          RouteDecision::Allow
        } else {
          RouteDecision::Redirect(self.landing_path(&user.role))
        }
      }
    }
  }

  /// Guard for login/registration pages: signed-in users are sent on to
  /// the remembered path (once) or their dashboard.
  pub fn public_route(&self) -> RouteDecision {
    match self.state() {
      AuthState::Uninitialized | AuthState::Checking => RouteDecision::Pending,
      AuthState::Unauthenticated => RouteDecision::Allow,
      AuthState::Authenticated(user) => match self.remembered().take() {
        Some(path) => RouteDecision::Redirect(path),
        None => RouteDecision::Redirect(self.landing_path(&user.role)),
      },
    }
  }

  /// Dashboard for `role`, or the login page for roles without one.
  pub fn landing_path(&self, role: &Role) -> String {
    role
      .landing_path()
      .unwrap_or_else(|| self.inner.login_path.clone())
  }

  fn remembered(&self) -> std::sync::MutexGuard<'_, Option<String>> {
    self
      .inner
      .redirect_after_login
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  pub fn register(&self) -> Mutation<RegisterRequest, AuthResponse> {
    let client = self.inner.client.clone();
    let session = self.clone();
    Mutation::new(self.inner.cache.clone(), &invalidation::REGISTER, move |request: RegisterRequest| {
      let client = client.clone();
      async move {
        request.check()?;
        client.post("/auth/register/", &request).await
      }
    })
    .on_success(move |response: &AuthResponse, _: &QueryCache| session.establish(response))
  }

  pub fn update_profile(&self) -> Mutation<ProfileUpdate, User> {
    let client = self.inner.client.clone();
    let session = self.clone();
    Mutation::new(
      self.inner.cache.clone(),
      &invalidation::PROFILE_UPDATE,
      move |update: ProfileUpdate| {
        let client = client.clone();
        async move { client.patch(PROFILE_PATH, &update).await }
      },
    )
    .on_success(move |user: &User, cache: &QueryCache| {
      if let Ok(value) = serde_json::to_value(user) {
        cache.set_data(&Self::user_key(), value);
      }
      session.set_state(AuthState::Authenticated(user.clone()));
    })
  }

  pub fn change_password(&self) -> Mutation<PasswordChange, MessageResponse> {
    self.checked_post(&invalidation::CHANGE_PASSWORD, "/auth/change-password/")
  }

  pub fn request_password_reset(&self) -> Mutation<PasswordResetRequest, MessageResponse> {
    self.checked_post(&invalidation::PASSWORD_RESET_REQUEST, "/auth/password-reset/")
  }

  pub fn confirm_password_reset(&self) -> Mutation<PasswordResetConfirm, MessageResponse> {
    self.checked_post(
      &invalidation::PASSWORD_RESET_CONFIRM,
      "/auth/password-reset/confirm/",
    )
  }

  /// Takes the verification token.
  pub fn verify_email(&self) -> Mutation<String, MessageResponse> {
    let client = self.inner.client.clone();
    Mutation::new(self.inner.cache.clone(), &invalidation::VERIFY_EMAIL, move |token: String| {
      let client = client.clone();
      async move { client.post("/auth/verify-email/", &json!({ "token": token })).await }
    })
  }

  /// Takes the address to resend to.
  pub fn resend_verification(&self) -> Mutation<String, MessageResponse> {
    let client = self.inner.client.clone();
    Mutation::new(
      self.inner.cache.clone(),
      &invalidation::RESEND_VERIFICATION,
      move |email: String| {
        let client = client.clone();
        async move {
          client
            .post("/auth/resend-verification/", &json!({ "email": email }))
            .await
        }
      },
    )
  }

  fn checked_post<I>(
    &self,
    spec: &'static crate::query::MutationSpec,
    path: &'static str,
  ) -> Mutation<I, MessageResponse>
  where
    I: CheckedRequest + serde::Serialize + Send + Sync + 'static,
  {
    let client = self.inner.client.clone();
    Mutation::new(self.inner.cache.clone(), spec, move |input: I| {
      let client = client.clone();
      async move {
        input.check()?;
        client.post(path, &input).await
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::query::CacheSettings;
  use crate::test_support::{MockTransport, BASE_URL};

  fn teacher_json() -> Value {
    json!({
      "id": 7,
      "email": "teacher@school.test",
      "first_name": "Grace",
      "last_name": "Hopper",
      "role": "teacher",
      "is_active": true,
    })
  }

  fn login_response() -> Value {
    json!({
      "user": teacher_json(),
      "access_token": "access-1",
      "refresh_token": "refresh-1",
      "token_type": "Bearer",
    })
  }

  fn setup(tokens: MemoryTokenStore) -> (Arc<MockTransport>, Arc<MemoryTokenStore>, QueryCache, Session) {
    let mock = MockTransport::new();
    let tokens = Arc::new(tokens);
    let client = ApiClient::new(BASE_URL, mock.clone(), tokens.clone()).unwrap();
    let cache = QueryCache::new(CacheSettings {
      retry_delay: Duration::from_millis(1),
      ..CacheSettings::default()
    });
    let session = Session::new(client, cache.clone(), "/login");
    (mock, tokens, cache, session)
  }

  #[tokio::test]
  async fn test_start_without_token_skips_profile() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    assert_eq!(session.state(), AuthState::Uninitialized);
    assert_eq!(session.start().await, AuthState::Unauthenticated);
    assert_eq!(mock.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_start_with_valid_token_restores_user() {
    let (mock, _, _, session) = setup(MemoryTokenStore::with_tokens("a", "r"));
    mock.on(Method::GET, PROFILE_PATH, 200, teacher_json());

    let state = session.start().await;
    assert_eq!(state.user().map(|u| u.role.clone()), Some(Role::Teacher));
    assert!(session.is_authenticated());
  }

  #[tokio::test]
  async fn test_start_with_rejected_token_clears_credentials() {
    let (mock, tokens, _, session) = setup(MemoryTokenStore::with_tokens("a", "r"));
    mock.on(Method::GET, PROFILE_PATH, 401, json!({"detail": "expired"}));
    mock.on(Method::POST, "/auth/token/refresh/", 401, json!({"detail": "expired"}));

    assert_eq!(session.start().await, AuthState::Unauthenticated);
    assert!(!tokens.has_token());
    assert_eq!(mock.calls(Method::GET, PROFILE_PATH), 1);
  }

  #[tokio::test]
  async fn test_start_with_server_error_retries_and_keeps_token() {
    let (mock, tokens, _, session) = setup(MemoryTokenStore::with_tokens("a", "r"));
    mock.on(Method::GET, PROFILE_PATH, 503, json!({"detail": "maintenance"}));

    assert_eq!(session.start().await, AuthState::Unauthenticated);
    assert_eq!(mock.calls(Method::GET, PROFILE_PATH), 1 + USER_RETRY as usize);
    assert!(tokens.has_token());
  }

  #[tokio::test]
  async fn test_teacher_login_lands_on_teacher_dashboard() {
    let (mock, tokens, cache, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());
    session.start().await;

    let user = session
      .login(LoginRequest::new("teacher@school.test", "secret"))
      .await
      .unwrap();

    assert_eq!(user.role, Role::Teacher);
    assert_eq!(tokens.access_token().unwrap().as_deref(), Some("access-1"));
    assert_eq!(cache.get_data(&Session::user_key()), Some(teacher_json()));
    assert_eq!(
      session.public_route(),
      RouteDecision::Redirect("/teacher/dashboard".into())
    );
    assert_eq!(session.guard("/teacher/classes", &[Role::Teacher]), RouteDecision::Allow);
  }

  #[tokio::test]
  async fn test_role_only_login_response_routes_by_role() {
    let (mock, tokens, _, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, json!({"user": {"role": "teacher"}}));
    session.start().await;

    let user = session
      .login(LoginRequest::new("teacher@gmail.com", "x"))
      .await
      .unwrap();

    assert_eq!(user.role, Role::Teacher);
    assert_eq!(session.landing_path(&user.role), "/teacher/dashboard");
    assert_eq!(
      session.public_route(),
      RouteDecision::Redirect("/teacher/dashboard".into())
    );
    assert!(!tokens.has_token());
  }

  #[tokio::test]
  async fn test_invalid_login_sends_nothing() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    let err = session
      .login(LoginRequest::new("nope", "secret"))
      .await
      .unwrap_err();
    assert!(err.field_errors().unwrap().get("email").is_some());
    assert_eq!(mock.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_failed_login_stays_unauthenticated() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    mock.on(
      Method::POST,
      "/auth/login/",
      400,
      json!({"message": "Invalid credentials"}),
    );
    session.start().await;

    let err = session
      .login(LoginRequest::new("teacher@school.test", "wrong"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials (status 400)");
    assert_eq!(session.state(), AuthState::Unauthenticated);
  }

  #[tokio::test]
  async fn test_logout_clears_cache_so_next_query_refetches() {
    let (mock, tokens, cache, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());
    mock.on(Method::POST, "/auth/logout/", 500, json!({"detail": "boom"}));
    mock.on(Method::GET, "/students/", 200, json!([{"s_id": "a"}]));
    session.login(LoginRequest::new("teacher@school.test", "secret")).await.unwrap();

    let client = ApiClient::new(BASE_URL, mock.clone(), tokens.clone()).unwrap();
    let students: Query<Value> = Query::new(
      cache.clone(),
      QueryKey::new("students"),
      fetcher(move || {
        let client = client.clone();
        async move { client.get::<Value>("/students/").await }
      }),
      QueryOptions::default(),
    );
    students.load().await.unwrap();
    students.load().await.unwrap();
    assert_eq!(mock.calls(Method::GET, "/students/"), 1);

    session.logout().await;
    assert_eq!(session.state(), AuthState::Unauthenticated);
    assert!(!tokens.has_token());
    assert!(cache.get_data(&Session::user_key()).is_none());
    assert!(students.data().is_none());

    students.load().await.unwrap();
    assert_eq!(mock.calls(Method::GET, "/students/"), 2);
  }

  #[tokio::test]
  async fn test_guard_remembers_path_for_after_login() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());

    assert_eq!(session.guard("/teacher/exams", &[]), RouteDecision::Pending);
    session.start().await;
    assert_eq!(
      session.guard("/teacher/exams", &[Role::Teacher]),
      RouteDecision::Redirect("/login".into())
    );
    assert_eq!(session.public_route(), RouteDecision::Allow);

    session.login(LoginRequest::new("teacher@school.test", "secret")).await.unwrap();
    assert_eq!(
      session.public_route(),
      RouteDecision::Redirect("/teacher/exams".into())
    );
    assert_eq!(
      session.public_route(),
      RouteDecision::Redirect("/teacher/dashboard".into())
    );
  }

  #[tokio::test]
  async fn test_wrong_role_redirects_to_own_dashboard() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());
    session.login(LoginRequest::new("teacher@school.test", "secret")).await.unwrap();

    assert_eq!(
      session.guard("/admin/finance", &[Role::Admin, Role::Accountant]),
      RouteDecision::Redirect("/teacher/dashboard".into())
    );
    assert_eq!(session.landing_path(&Role::Unknown), "/login");
  }

  #[tokio::test]
  async fn test_intercept_only_reacts_to_auth_errors() {
    let (mock, tokens, _, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());
    session.login(LoginRequest::new("teacher@school.test", "secret")).await.unwrap();

    assert!(!session.intercept(&ApiError::Transport("offline".into())));
    assert!(session.is_authenticated());

    assert!(session.intercept(&ApiError::Unauthorized("expired".into())));
    assert_eq!(session.state(), AuthState::Unauthenticated);
    assert!(!tokens.has_token());
  }

  #[tokio::test]
  async fn test_listener_logs_out_on_unauthorized_event() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());
    mock.on(Method::GET, "/payments/", 401, json!({"detail": "expired"}));
    mock.on(Method::POST, "/auth/token/refresh/", 401, json!({"detail": "expired"}));
    session.login(LoginRequest::new("teacher@school.test", "secret")).await.unwrap();

    let listener = session.listen();
    let mut state = session.subscribe();
    let client = session.inner.client.clone();
    assert!(client.get::<Value>("/payments/").await.is_err());

    tokio::time::timeout(Duration::from_secs(1), async {
      while !matches!(*state.borrow_and_update(), AuthState::Unauthenticated) {
        state.changed().await.unwrap();
      }
    })
    .await
    .unwrap();
    listener.abort();
  }

  #[tokio::test]
  async fn test_update_profile_refreshes_user() {
    let (mock, _, cache, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/login/", 200, login_response());
    let mut updated = teacher_json();
    updated["phone"] = json!("555-0100");
    mock.on(Method::PATCH, PROFILE_PATH, 200, updated.clone());
    session.login(LoginRequest::new("teacher@school.test", "secret")).await.unwrap();
    let _observer = session.user_query();

    let update = session.update_profile();
    update
      .mutate_async(ProfileUpdate {
        phone: Some("555-0100".into()),
        ..ProfileUpdate::default()
      })
      .await
      .unwrap();

    assert_eq!(session.user().unwrap().phone.as_deref(), Some("555-0100"));
    assert_eq!(cache.get_data(&Session::user_key()), Some(updated));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(mock.calls(Method::GET, PROFILE_PATH), 0);
  }

  #[tokio::test]
  async fn test_register_establishes_session() {
    let (mock, tokens, _, session) = setup(MemoryTokenStore::new());
    mock.on(Method::POST, "/auth/register/", 201, login_response());

    let register = session.register();
    register
      .mutate_async(RegisterRequest {
        email: "teacher@school.test".into(),
        password: "long-enough".into(),
        password_confirm: "long-enough".into(),
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        role: Role::Teacher,
        phone: None,
      })
      .await
      .unwrap();

    assert!(session.is_authenticated());
    assert!(tokens.has_token());
  }

  #[tokio::test]
  async fn test_change_password_mismatch_is_local() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    let change = session.change_password();
    let err = change
      .mutate_async(PasswordChange {
        current_password: "old-password".into(),
        new_password: "new-password".into(),
        new_password_confirm: "typo-password".into(),
      })
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(change.error(), Some(err));
    assert_eq!(mock.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_password_reset_posts_email() {
    let (mock, _, _, session) = setup(MemoryTokenStore::new());
    mock.on(
      Method::POST,
      "/auth/password-reset/",
      200,
      json!({"message": "Password reset email sent"}),
    );

    let reset = session.request_password_reset();
    let response = reset
      .mutate_async(PasswordResetRequest {
        email: "parent@school.test".into(),
      })
      .await
      .unwrap();
    assert_eq!(response.message, "Password reset email sent");
    assert_eq!(
      mock.last_body(Method::POST, "/auth/password-reset/"),
      Some(json!({"email": "parent@school.test"}))
    );
  }
}
