//! Session ownership and route guards.
//!
//! [`Session`] is the one place the signed-in user is read and changed.
//! Callers get a handle instead of reaching for ambient state, and can
//! subscribe to sign-in/sign-out changes.

use crate::remote::{ApiError, AuthApi};
use crate::store::Store;
use crate::types::StoredUser;
use crate::validate::{validate_login, validate_signup, SignupForm, ValidationError};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The backend answered but did not sign the user in.
    #[error("{0}")]
    Rejected(String),
    #[error("{}", .0.message())]
    Api(ApiError),
}

pub struct Session {
    store: Arc<Store>,
    user: watch::Sender<Option<StoredUser>>,
}

impl Session {
    pub fn new(store: Arc<Store>) -> Self {
        let (user, _) = watch::channel(store.get_user());
        Self { store, user }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn current(&self) -> Option<StoredUser> {
        self.user.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StoredUser>> {
        self.user.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn sign_in(&self, user: StoredUser) {
        tracing::info!(user = %user.id, "signed in");
        self.store.set_user(&user);
        self.user.send_replace(Some(user));
    }

    /// Drop the session and every cached record.
    pub fn sign_out(&self) {
        self.store.clear_all();
        self.user.send_replace(None);
        tracing::info!("signed out");
    }

    pub async fn login(
        &self,
        api: &dyn AuthApi,
        email: &str,
        password: &str,
    ) -> Result<Route, SessionError> {
        let request = validate_login(email, password)?;
        let response = api.login_user(&request).await.map_err(SessionError::Api)?;

        match response.user {
            Some(user) if response.success => {
                self.sign_in(user);
                Ok(Route::Dashboard)
            }
            _ => Err(SessionError::Rejected(non_empty_or(
                response.message,
                "Login failed",
            ))),
        }
    }

    pub async fn signup(
        &self,
        api: &dyn AuthApi,
        form: &SignupForm,
        today: NaiveDate,
    ) -> Result<Route, SessionError> {
        let request = validate_signup(form, today)?;
        let response = api.register_user(&request).await.map_err(SessionError::Api)?;

        match response.user {
            Some(user) => {
                self.sign_in(user);
                Ok(Route::Dashboard)
            }
            None => Err(SessionError::Rejected(non_empty_or(
                response.message,
                "Signup failed. Please try again.",
            ))),
        }
    }

    /// Best-effort backend logout, then local sign-out regardless of the outcome.
    pub async fn logout(&self, api: Option<&dyn AuthApi>) -> Route {
        if let Some(api) = api {
            if let Err(e) = api.logout_user().await {
                tracing::warn!(error = %e, "backend logout failed; clearing local session anyway");
            }
        }
        self.sign_out();
        Route::Welcome
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// Application screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Welcome,
    Login,
    Signup,
    Dashboard,
    Contacts,
    AddContact,
    EditContact(String),
    Insights,
    Profile,
    EditProfile,
    Settings,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Welcome => "/".into(),
            Route::Login => "/login".into(),
            Route::Signup => "/signup".into(),
            Route::Dashboard => "/dashboard".into(),
            Route::Contacts => "/contacts".into(),
            Route::AddContact => "/add-contact".into(),
            Route::EditContact(id) => format!("/edit-contact/{id}"),
            Route::Insights => "/insights".into(),
            Route::Profile => "/profile".into(),
            Route::EditProfile => "/edit-profile".into(),
            Route::Settings => "/settings".into(),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let route = match path {
            "/" => Route::Welcome,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/dashboard" => Route::Dashboard,
            "/contacts" => Route::Contacts,
            "/add-contact" => Route::AddContact,
            "/insights" => Route::Insights,
            "/profile" => Route::Profile,
            "/edit-profile" => Route::EditProfile,
            "/settings" => Route::Settings,
            other => {
                let id = other.strip_prefix("/edit-contact/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Route::EditContact(id.to_string())
            }
        };
        Some(route)
    }

    pub fn guard(&self) -> Guard {
        match self {
            Route::Welcome | Route::Login | Route::Signup => Guard::PublicOnly,
            _ => Guard::Protected,
        }
    }
}

/// Route guard variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Entry screens; signed-in users are sent to the dashboard.
    PublicOnly,
    /// Everything else; anonymous users are sent to login.
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    /// The stored-user check has not completed; show a loading indicator.
    #[default]
    Checking,
    Allow,
    Redirect(Route),
}

impl Guard {
    pub fn decide(&self, authenticated: bool) -> GuardState {
        match (self, authenticated) {
            (Guard::PublicOnly, true) => GuardState::Redirect(Route::Dashboard),
            (Guard::Protected, false) => GuardState::Redirect(Route::Login),
            _ => GuardState::Allow,
        }
    }

    pub fn check(&self, session: &Session) -> GuardState {
        self.decide(session.is_authenticated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ApiResult;
    use crate::types::{LoginResponse, RegisterResponse, UserLoginRequest, UserRegistrationRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAuth {
        login: Option<ApiResult<LoginResponse>>,
        register: Option<ApiResult<RegisterResponse>>,
        logout_fails: bool,
        seen_login: Mutex<Option<UserLoginRequest>>,
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn register_user(&self, _: &UserRegistrationRequest) -> ApiResult<RegisterResponse> {
            self.register.clone().expect("register not scripted")
        }

        async fn login_user(&self, request: &UserLoginRequest) -> ApiResult<LoginResponse> {
            *self.seen_login.lock().unwrap() = Some(request.clone());
            self.login.clone().expect("login not scripted")
        }

        async fn logout_user(&self) -> ApiResult<()> {
            if self.logout_fails {
                Err(ApiError::Network)
            } else {
                Ok(())
            }
        }
    }

    fn user(id: &str) -> StoredUser {
        StoredUser {
            id: id.into(),
            name: "A".into(),
            email: "a@b.com".into(),
            gender: "male".into(),
            date_of_birth: "1990-01-01".into(),
            phone: "1".into(),
            created_at: "2025-01-01".into(),
            avatar: None,
        }
    }

    fn signup_form() -> SignupForm {
        SignupForm {
            name: "A".into(),
            email: "a@b.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            gender: "male".into(),
            date_of_birth: "1990-01-01".into(),
            phone: "1".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn session() -> Session {
        Session::new(Arc::new(Store::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_login_success_stores_user_and_targets_dashboard() {
        let session = session();
        let api = FakeAuth {
            login: Some(Ok(LoginResponse {
                success: true,
                user: Some(user("1")),
                message: "ok".into(),
            })),
            ..Default::default()
        };
        let mut rx = session.subscribe();

        let route = session.login(&api, "a@b.com", "x").await.unwrap();
        assert_eq!(route, Route::Dashboard);
        assert_eq!(session.store().get_user().unwrap().id, "1");
        assert_eq!(session.current().unwrap().id, "1");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().id, "1");
        let sent = api.seen_login.lock().unwrap().clone().unwrap();
        assert_eq!(sent.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_login_unsuccessful_body_uses_message() {
        let session = session();
        let api = FakeAuth {
            login: Some(Ok(LoginResponse { success: false, user: None, message: String::new() })),
            ..Default::default()
        };
        let err = session.login(&api, "a@b.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_validation_skips_network() {
        let session = session();
        let api = FakeAuth::default();
        let err = session.login(&api, "", "").await.unwrap_err();
        assert_eq!(err, SessionError::Validation(ValidationError::MissingFields));
        assert!(api.seen_login.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_backend_error_passes_message() {
        let session = session();
        let api = FakeAuth {
            login: Some(Err(ApiError::Backend { status: 401, message: "Bad password".into() })),
            ..Default::default()
        };
        let err = session.login(&api, "a@b.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Bad password");
    }

    #[tokio::test]
    async fn test_login_error_without_message_uses_generic_text() {
        let session = session();
        let api = FakeAuth {
            login: Some(Err(ApiError::from_error_body(401, "{}"))),
            ..Default::default()
        };
        let err = session.login(&api, "a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Backend { status: 401, .. })));
        assert_eq!(err.to_string(), crate::remote::REQUEST_FAILED_MESSAGE);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_signup_without_user_uses_fallback() {
        let session = session();
        let api = FakeAuth {
            register: Some(Ok(RegisterResponse { user: None, message: String::new() })),
            ..Default::default()
        };
        let err = session.signup(&api, &signup_form(), today()).await.unwrap_err();
        assert_eq!(err.to_string(), "Signup failed. Please try again.");
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_signup_stores_returned_user() {
        let session = session();
        let api = FakeAuth {
            register: Some(Ok(RegisterResponse { user: Some(user("9")), message: String::new() })),
            ..Default::default()
        };
        assert_eq!(session.signup(&api, &signup_form(), today()).await.unwrap(), Route::Dashboard);
        assert_eq!(session.current().unwrap().id, "9");
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let session = session();
        session.sign_in(user("1"));
        session.store().set_contacts(&[]);
        let api = FakeAuth { logout_fails: true, ..Default::default() };

        assert_eq!(session.logout(Some(&api)).await, Route::Welcome);
        assert!(!session.is_authenticated());
        assert!(session.current().is_none());
        assert!(!session.store().has_contacts());
    }

    #[test]
    fn test_guards() {
        assert_eq!(Guard::PublicOnly.decide(true), GuardState::Redirect(Route::Dashboard));
        assert_eq!(Guard::PublicOnly.decide(false), GuardState::Allow);
        assert_eq!(Guard::Protected.decide(false), GuardState::Redirect(Route::Login));
        assert_eq!(Guard::Protected.decide(true), GuardState::Allow);
        assert_eq!(GuardState::default(), GuardState::Checking);
    }

    #[test]
    fn test_check_follows_session() {
        let session = session();
        assert_eq!(Route::Insights.guard().check(&session), GuardState::Redirect(Route::Login));
        assert_eq!(Route::Signup.guard().check(&session), GuardState::Allow);
        session.sign_in(user("1"));
        assert_eq!(Route::Login.guard().check(&session), GuardState::Redirect(Route::Dashboard));
        assert_eq!(Route::Insights.guard().check(&session), GuardState::Allow);
    }

    #[test]
    fn test_route_paths_round_trip() {
        for route in [
            Route::Welcome,
            Route::Dashboard,
            Route::EditContact("c1".into()),
            Route::Settings,
        ] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
        assert_eq!(Route::parse("/edit-contact/"), None);
        assert_eq!(Route::parse("/nope"), None);
    }
}
