use std::fs;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use smarttask_core::auth::{
    AuthError, AuthFailure, AuthForm, AuthPhase, Authenticator, Field, LoginDraft, Route, Session,
    SignupDraft, SimulatedAuthenticator,
};
use smarttask_core::board::TaskBoard;
use smarttask_core::datastore::{FileSlot, Slot, TaskStore};
use smarttask_core::filter::{CategoryFilter, StatusFilter, TaskQuery};
use smarttask_core::form::TaskForm;
use smarttask_core::notify::{Notification, Severity};
use smarttask_core::task::{Category, Priority};
use tempfile::tempdir;

#[test]
fn file_slot_roundtrip_and_filtering() {
    let temp = tempdir().expect("tempdir");
    let slot = FileSlot::open(temp.path(), "smart-tasks").expect("open slot");
    let path = slot.path().to_path_buf();
    let mut board = TaskBoard::new(TaskStore::open(slot), Vec::<Notification>::new());

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    let mut form = TaskForm::create();
    form.draft.title = "Pay rent".to_string();
    form.draft.category = Some(Category::Finance);
    form.draft.priority = Priority::High;
    form.draft.deadline = Some(now - Duration::days(1));
    let rent = board.submit(&form, now).expect("create").expect("not blank").id.clone();

    let mut form = TaskForm::create();
    form.draft.title = "Stretch".to_string();
    form.draft.description = "ten minutes".to_string();
    form.draft.category = Some(Category::Health);
    form.draft.deadline = Some(now + Duration::days(2));
    board.submit(&form, now).expect("create");

    assert!(path.exists());

    let reopened = TaskStore::open(FileSlot::open(temp.path(), "smart-tasks").expect("reopen"));
    assert_eq!(reopened.tasks(), board.store().tasks());

    let views = board.visible(now);
    assert!(views[0].overdue && !views[0].due_soon);
    assert!(!views[1].overdue && views[1].due_soon);

    board.query = TaskQuery {
        search: "MINUTES".to_string(),
        category: CategoryFilter::Only(Category::Health),
        status: StatusFilter::Pending,
    };
    let visible = board.visible(now);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].task.title, "Stretch");

    board.toggle(&rent).expect("toggle");
    let stats = board.stats(now);
    assert_eq!(stats.overdue, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.total, stats.completed + stats.pending);
}

#[test]
fn browser_written_blob_is_readable() {
    let temp = tempdir().expect("tempdir");
    let blob = r#"[
        {"id":"1735689600000","title":"Old task","category":"Work","deadline":"",
         "priority":"low","completed":true,"createdAt":"2025-01-01T00:00:00.000Z"},
        {"id":"1735689600001","title":"No description","completed":false,
         "createdAt":"2025-01-01T00:00:00.001Z"}
    ]"#;
    fs::write(temp.path().join("smart-tasks.json"), blob).expect("seed slot");

    let store = TaskStore::open(FileSlot::open(temp.path(), "smart-tasks").expect("open"));
    assert_eq!(store.len(), 2);
    assert_eq!(store.tasks()[0].category, Some(Category::Work));
    assert_eq!(store.tasks()[1].description, "");
    assert_eq!(store.tasks()[1].priority, Priority::Medium);

    let query = TaskQuery {
        search: "description".to_string(),
        ..TaskQuery::default()
    };
    assert_eq!(query.apply(store.tasks()).len(), 1);
}

#[test]
fn corrupt_slot_reads_as_empty() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("smart-tasks.json"), "[{\"id\":").expect("seed slot");

    let slot = FileSlot::open(temp.path(), "smart-tasks").expect("open");
    assert!(slot.read().expect("read").is_some());
    assert!(TaskStore::open(slot).is_empty());
}

#[test]
fn editing_only_description_keeps_everything_else() {
    let temp = tempdir().expect("tempdir");
    let slot = FileSlot::open(temp.path(), "smart-tasks").expect("open slot");
    let mut board = TaskBoard::new(TaskStore::open(slot), Vec::<Notification>::new());
    let now = Utc::now();

    let mut form = TaskForm::create();
    form.draft.title = "Renew passport".to_string();
    form.draft.category = Some(Category::Personal);
    form.draft.deadline = Some(now + Duration::days(30));
    let before = board.submit(&form, now).expect("create").expect("created").clone();
    board.toggle(&before.id).expect("toggle");
    let before = board.store().get(&before.id).expect("present").clone();

    let mut form = TaskForm::edit(&before);
    form.draft.description = "photos first".to_string();
    let after = board
        .submit(&form, now + Duration::hours(1))
        .expect("update")
        .expect("updated")
        .clone();

    assert_eq!(after.description, "photos first");
    assert_eq!(after.id, before.id);
    assert_eq!(after.title, before.title);
    assert_eq!(after.category, before.category);
    assert_eq!(after.priority, before.priority);
    assert_eq!(after.deadline, before.deadline);
    assert_eq!(after.completed, before.completed);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test(start_paused = true)]
async fn login_waits_for_the_delay_then_routes_to_tasks() {
    let mut form = AuthForm::new(SimulatedAuthenticator::default(), Vec::<Notification>::new());
    let draft = LoginDraft {
        email: "user@example.com".to_string(),
        password: "hunter22".to_string(),
    };

    let start = tokio::time::Instant::now();
    let route = form.submit_login(&draft).await.expect("login");
    let waited = start.elapsed();
    assert!(waited >= StdDuration::from_millis(1000), "waited {waited:?}");
    assert!(waited < StdDuration::from_millis(1100), "waited {waited:?}");

    assert_eq!(route, Route::Tasks);
    assert_eq!(route.path(), "/tasks");
    assert_eq!(form.phase(), AuthPhase::Succeeded(Route::Tasks));
    assert_eq!(form.notifier().len(), 1);
    assert_eq!(form.notifier()[0].title, "Login Successful!");
    assert_eq!(form.notifier()[0].severity, Severity::Normal);
}

#[tokio::test(start_paused = true)]
async fn invalid_login_does_not_wait_or_navigate() {
    let mut form = AuthForm::new(SimulatedAuthenticator::default(), Vec::<Notification>::new());
    let draft = LoginDraft {
        email: "bad-email".to_string(),
        password: "123".to_string(),
    };

    let start = tokio::time::Instant::now();
    let err = form.submit_login(&draft).await.expect_err("rejected");
    assert_eq!(start.elapsed(), StdDuration::ZERO);

    let AuthError::Invalid(errors) = err else {
        panic!("expected validation errors");
    };
    assert!(errors.contains(Field::Email));
    assert!(errors.contains(Field::Password));
    assert_eq!(form.phase(), AuthPhase::Idle);
    assert_eq!(form.errors(), &errors);
    assert!(form.notifier().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signup_password_mismatch_is_blocked() {
    let mut form = AuthForm::new(SimulatedAuthenticator::default(), Vec::<Notification>::new());
    let draft = SignupDraft {
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        phone: "(555) 987-6543".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret2".to_string(),
    };

    let err = form.submit_signup(&draft).await.expect_err("blocked");
    let AuthError::Invalid(errors) = err else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.get(Field::ConfirmPassword), Some("Passwords do not match"));
    assert_ne!(form.phase(), AuthPhase::Succeeded(Route::Loads));

    let fixed = SignupDraft {
        confirm_password: "secret1".to_string(),
        ..draft
    };
    let route = form.submit_signup(&fixed).await.expect("signup");
    assert_eq!(route.path(), "/loads");
    assert_eq!(form.notifier()[0].title, "Account Created!");
    assert!(form.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn simulated_delay_can_be_cancelled() {
    let auth = SimulatedAuthenticator::new(StdDuration::from_secs(5));
    let draft = LoginDraft {
        email: "user@example.com".to_string(),
        password: "hunter22".to_string(),
    };

    let cut_short = tokio::time::timeout(StdDuration::from_secs(1), auth.login(&draft)).await;
    assert!(cut_short.is_err());

    let session = auth.login(&draft).await.expect("completes");
    assert_eq!(session.email, "user@example.com");
}

#[tokio::test(start_paused = true)]
async fn dropped_submit_stays_submitting_until_reset() {
    let mut form = AuthForm::new(SimulatedAuthenticator::default(), Vec::<Notification>::new());
    let draft = LoginDraft {
        email: "user@example.com".to_string(),
        password: "hunter22".to_string(),
    };

    let cut_short =
        tokio::time::timeout(StdDuration::from_millis(200), form.submit_login(&draft)).await;
    assert!(cut_short.is_err());
    assert_eq!(form.phase(), AuthPhase::Submitting);
    assert!(form.notifier().is_empty());

    form.reset();
    assert_eq!(form.phase(), AuthPhase::Idle);

    let route = form.submit_login(&draft).await.expect("login");
    assert_eq!(route, Route::Tasks);
    assert_eq!(form.notifier().len(), 1);
}

struct Refusing;

impl Authenticator for Refusing {
    async fn login(&self, _draft: &LoginDraft) -> Result<Session, AuthFailure> {
        Err(AuthFailure {
            message: "account locked".to_string(),
        })
    }

    async fn signup(&self, _draft: &SignupDraft) -> Result<Session, AuthFailure> {
        Err(AuthFailure {
            message: "registration closed".to_string(),
        })
    }
}

#[tokio::test]
async fn authenticator_failure_returns_to_idle_with_destructive_notice() {
    let mut form = AuthForm::new(Refusing, Vec::<Notification>::new());
    let draft = LoginDraft {
        email: "user@example.com".to_string(),
        password: "hunter22".to_string(),
    };

    let err = form.submit_login(&draft).await.expect_err("refused");
    assert!(matches!(err, AuthError::Failed(ref f) if f.message == "account locked"));
    assert_eq!(form.phase(), AuthPhase::Idle);
    assert_eq!(form.notifier()[0].title, "Login Failed");
    assert_eq!(form.notifier()[0].severity, Severity::Destructive);
}
