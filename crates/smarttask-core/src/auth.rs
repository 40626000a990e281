//! Login and sign-up forms.
//!
//! Validation is synchronous and checks every field, so several errors can be
//! reported at once. Submission goes through an [`Authenticator`]; the only
//! implementation shipped here waits for a fixed delay and then accepts any
//! well-formed credentials.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::notify::{Notification, Notifier};

pub const DEFAULT_AUTH_DELAY: Duration = Duration::from_millis(1000);

pub const MIN_PASSWORD_CHARS: usize = 6;

/// Length at which any phone string is accepted, formatted or not.
pub const LOOSE_PHONE_CHARS: usize = 10;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d{3}\)\s\d{3}-\d{4}$").expect("phone regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Phone,
    Password,
    ConfirmPassword,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to message. Any entry blocks submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn insert(&mut self, field: Field, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, msg)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {msg}")?;
        }
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Strict `(XXX) XXX-XXXX`, or anything at least ten characters long.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone) || phone.chars().count() >= LOOSE_PHONE_CHARS
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.insert(Field::Email, "Email is required");
    } else if !is_valid_email(email) {
        errors.insert(Field::Email, "Please enter a valid email");
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.is_empty() {
        errors.insert(Field::Password, "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert(Field::Password, "Password must be at least 6 characters");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginDraft {
    pub email: String,
    pub password: String,
}

impl LoginDraft {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupDraft {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();

        if self.name.is_empty() {
            errors.insert(Field::Name, "Name is required");
        }

        check_email(&mut errors, &self.email);

        if self.phone.is_empty() {
            errors.insert(Field::Phone, "Phone number is required");
        } else if !is_valid_phone(&self.phone) {
            errors.insert(Field::Phone, "Please enter a valid phone number");
        }

        check_password(&mut errors, &self.password);

        if self.confirm_password.is_empty() {
            errors.insert(Field::ConfirmPassword, "Please confirm your password");
        } else if self.password != self.confirm_password {
            errors.insert(Field::ConfirmPassword, "Passwords do not match");
        }

        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tasks,
    Loads,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Tasks => "/tasks",
            Route::Loads => "/loads",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub message: String,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthFailure {}

pub trait Authenticator {
    fn login(
        &self,
        draft: &LoginDraft,
    ) -> impl Future<Output = Result<Session, AuthFailure>> + Send;

    fn signup(
        &self,
        draft: &SignupDraft,
    ) -> impl Future<Output = Result<Session, AuthFailure>> + Send;
}

/// Accepts every attempt after `delay`. There is no credential check.
///
/// The delay runs on the tokio timer, so a paused test clock drives it and
/// dropping the returned future cancels it.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedAuthenticator {
    pub delay: Duration,
}

impl Default for SimulatedAuthenticator {
    fn default() -> Self {
        Self {
            delay: DEFAULT_AUTH_DELAY,
        }
    }
}

impl SimulatedAuthenticator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Authenticator for SimulatedAuthenticator {
    fn login(
        &self,
        draft: &LoginDraft,
    ) -> impl Future<Output = Result<Session, AuthFailure>> + Send {
        let delay = self.delay;
        let email = draft.email.clone();
        async move {
            debug!(?delay, "simulating login");
            tokio::time::sleep(delay).await;
            Ok(Session { email })
        }
    }

    fn signup(
        &self,
        draft: &SignupDraft,
    ) -> impl Future<Output = Result<Session, AuthFailure>> + Send {
        let delay = self.delay;
        let email = draft.email.clone();
        async move {
            debug!(?delay, "simulating signup");
            tokio::time::sleep(delay).await;
            Ok(Session { email })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded(Route),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Validation failed; nothing was submitted.
    Invalid(FieldErrors),
    Failed(AuthFailure),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Invalid(errors) => write!(f, "invalid input: {errors}"),
            AuthError::Failed(failure) => write!(f, "authentication failed: {failure}"),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Clone, Copy)]
enum Attempt<'a> {
    Login(&'a LoginDraft),
    Signup(&'a SignupDraft),
}

impl Attempt<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Attempt::Login(_) => "login",
            Attempt::Signup(_) => "signup",
        }
    }

    fn validate(&self) -> FieldErrors {
        match self {
            Attempt::Login(draft) => draft.validate(),
            Attempt::Signup(draft) => draft.validate(),
        }
    }

    fn route(&self) -> Route {
        match self {
            Attempt::Login(_) => Route::Tasks,
            Attempt::Signup(_) => Route::Loads,
        }
    }

    fn success_notice(&self) -> Notification {
        match self {
            Attempt::Login(_) => Notification::normal("Login Successful!", "Welcome back to Uqaab"),
            Attempt::Signup(_) => Notification::normal(
                "Account Created!",
                "Welcome to Smart Task Manager. You can now start finding loads.",
            ),
        }
    }

    fn failure_notice(&self, failure: &AuthFailure) -> Notification {
        let title = match self {
            Attempt::Login(_) => "Login Failed",
            Attempt::Signup(_) => "Sign Up Failed",
        };
        Notification::destructive(title, failure.message.clone())
    }
}

/// Login/sign-up form state machine:
/// `Idle -> Validating -> (Idle with errors | Submitting -> Succeeded)`.
#[derive(Debug)]
pub struct AuthForm<A: Authenticator, N: Notifier> {
    authenticator: A,
    notifier: N,
    phase: AuthPhase,
    errors: FieldErrors,
}

impl<A: Authenticator, N: Notifier> AuthForm<A, N> {
    pub fn new(authenticator: A, notifier: N) -> Self {
        Self {
            authenticator,
            notifier,
            phase: AuthPhase::Idle,
            errors: FieldErrors::default(),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    /// Errors from the last rejected submit.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Back to `Idle`, e.g. after an in-flight submit was dropped.
    pub fn reset(&mut self) {
        self.phase = AuthPhase::Idle;
        self.errors = FieldErrors::default();
    }

    #[instrument(skip_all)]
    pub async fn submit_login(&mut self, draft: &LoginDraft) -> Result<Route, AuthError> {
        self.submit(Attempt::Login(draft)).await
    }

    #[instrument(skip_all)]
    pub async fn submit_signup(&mut self, draft: &SignupDraft) -> Result<Route, AuthError> {
        self.submit(Attempt::Signup(draft)).await
    }

    async fn submit(&mut self, attempt: Attempt<'_>) -> Result<Route, AuthError> {
        let kind = attempt.kind();
        self.phase = AuthPhase::Validating;
        self.errors = attempt.validate();

        if !self.errors.is_empty() {
            debug!(kind, errors = %self.errors, "validation rejected submit");
            self.phase = AuthPhase::Idle;
            return Err(AuthError::Invalid(self.errors.clone()));
        }

        self.phase = AuthPhase::Submitting;
        let outcome = match &attempt {
            Attempt::Login(draft) => self.authenticator.login(draft).await,
            Attempt::Signup(draft) => self.authenticator.signup(draft).await,
        };

        match outcome {
            Ok(session) => {
                let route = attempt.route();
                info!(kind, email = %session.email, %route, "authenticated");
                self.notifier.notify(attempt.success_notice());
                self.phase = AuthPhase::Succeeded(route);
                Ok(route)
            }
            Err(failure) => {
                warn!(kind, error = %failure, "authentication failed");
                self.notifier.notify(attempt.failure_notice(&failure));
                self.phase = AuthPhase::Idle;
                Err(AuthError::Failed(failure))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupDraft {
        SignupDraft {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "(555) 123-4567".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b@c.d.e"));
        assert!(!is_valid_email("bad-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@.com extra"));
    }

    #[test]
    fn phone_accepts_strict_format_or_any_long_string() {
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(is_valid_phone("5551234567"));
        assert!(is_valid_phone("aaaaaaaaaa"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("(555)123"));
    }

    #[test]
    fn bad_login_reports_both_fields() {
        let draft = LoginDraft {
            email: "bad-email".to_string(),
            password: "123".to_string(),
        };
        let errors = draft.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get(Field::Email), Some("Please enter a valid email"));
        assert_eq!(
            errors.get(Field::Password),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn empty_login_reports_required() {
        let errors = LoginDraft::default().validate();
        assert_eq!(errors.get(Field::Email), Some("Email is required"));
        assert_eq!(errors.get(Field::Password), Some("Password is required"));
    }

    #[test]
    fn password_length_counts_characters() {
        let draft = LoginDraft {
            email: "user@example.com".to_string(),
            password: "pässwö".to_string(),
        };
        assert!(draft.validate().is_empty());
    }

    #[test]
    fn signup_mismatch_blocks_only_confirm() {
        let mut draft = signup();
        draft.confirm_password = "secret2".to_string();
        let errors = draft.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(Field::ConfirmPassword), Some("Passwords do not match"));
    }

    #[test]
    fn empty_signup_reports_every_field() {
        let errors = SignupDraft::default().validate();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors.get(Field::Name), Some("Name is required"));
        assert_eq!(errors.get(Field::Phone), Some("Phone number is required"));
        assert_eq!(
            errors.get(Field::ConfirmPassword),
            Some("Please confirm your password")
        );
    }

    #[test]
    fn field_wire_names() {
        let mut draft = signup();
        draft.confirm_password = String::new();
        let errors = draft.validate();
        let names: Vec<&str> = errors.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(names, vec!["confirmPassword"]);
        assert_eq!(errors.to_string(), "confirmPassword: Please confirm your password");
    }

    #[test]
    fn valid_signup_passes() {
        assert!(signup().validate().is_empty());
    }
}
