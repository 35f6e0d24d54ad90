mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{instant_throttle, posting, scratch_dir, tailored, FormScript, ScriptedAdapter, ScriptedSession};
use job_autopilot::error::ErrorKind;
use job_autopilot::models::{ApplicantProfile, Credentials, Platform};
use job_autopilot::services::{ChannelSink, StatusEvent, StatusReporter};
use job_autopilot::workflow::{
    ApplicationAttempt, ApplyFlow, ApplyRequest, ApplySettings, ApplyState, CancelSignal, FailureReason,
};
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    adapter: Arc<ScriptedAdapter>,
    flow: ApplyFlow,
    events: UnboundedReceiver<StatusEvent>,
    resume_dir: std::path::PathBuf,
}

fn harness(form: FormScript, dry_run: bool) -> Harness {
    let adapter = ScriptedAdapter::with_form(form);
    let (sink, events) = ChannelSink::new();
    let resume_dir = scratch_dir("apply");
    let profile = ApplicantProfile {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        ..Default::default()
    };
    let settings = ApplySettings {
        dry_run,
        step_limit: 10,
        login_timeout: Duration::from_secs(1),
        confirmation_wait: Duration::from_secs(2),
        resume_dir: resume_dir.clone(),
    };
    let flow = ApplyFlow::new(
        adapter.clone(),
        instant_throttle(),
        StatusReporter::new(Arc::new(sink)),
        profile,
        settings,
    );
    Harness {
        adapter,
        flow,
        events,
        resume_dir,
    }
}

async fn run(h: &Harness, session: &mut ScriptedSession, deadline: Option<Duration>) -> ApplicationAttempt {
    run_with_cancel(h, session, &CancelSignal::new(), deadline).await
}

async fn run_with_cancel(
    h: &Harness,
    session: &mut ScriptedSession,
    cancel: &CancelSignal,
    deadline: Option<Duration>,
) -> ApplicationAttempt {
    run_full(h, session, cancel, None, deadline).await
}

async fn run_logged_in(h: &Harness, session: &mut ScriptedSession) -> ApplicationAttempt {
    let credentials = Credentials::new("ada@example.com", "hunter2");
    run_full(h, session, &CancelSignal::new(), Some(&credentials), None).await
}

async fn run_full(
    h: &Harness,
    session: &mut ScriptedSession,
    cancel: &CancelSignal,
    credentials: Option<&Credentials>,
    deadline: Option<Duration>,
) -> ApplicationAttempt {
    let posting = posting(Platform::LinkedIn, "42");
    let tailored = tailored(&posting.id);
    let request = ApplyRequest {
        posting: &posting,
        tailored: &tailored,
        credentials,
    };
    h.flow.run(session, &request, cancel, deadline).await
}

/// 恰好一条事件
fn single_event(h: &mut Harness) -> StatusEvent {
    let event = h.events.try_recv().expect("应有一条状态事件");
    assert!(h.events.try_recv().is_err(), "只应有一条状态事件");
    event
}

fn resume_files_left(h: &Harness) -> usize {
    std::fs::read_dir(&h.resume_dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn test_three_step_application_completes() {
    let mut h = harness(FormScript::default(), false);
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    assert_eq!(attempt.status, ApplyState::Complete);
    assert_eq!(attempt.step_index, 2);
    assert!(attempt.completed_at.is_some());

    let event = single_event(&mut h);
    assert!(event.is_success());
    assert_eq!(event.job_id, "linkedin:42");

    {
        let calls = h.adapter.calls();
        assert_eq!(calls.next_clicks, 2);
        assert_eq!(calls.submits, 1);
        assert_eq!(calls.uploads.len(), 1);
        assert!(calls.uploads[0].1, "上传时简历文件应当存在");
        assert!(!calls.uploads[0].0.exists(), "结束后临时简历应被删除");
        assert_eq!(
            calls.fills,
            vec![
                ("First name".to_string(), "Ada".to_string()),
                ("Cover letter".to_string(), "Dear hiring team".to_string()),
                ("Email".to_string(), "ada@example.com".to_string()),
            ]
        );
    }
    assert_eq!(resume_files_left(&h), 0);
    assert_eq!(session.close_count(), 1);
    assert_eq!(
        session.navigations.lock().unwrap().as_slice(),
        ["https://www.linkedin.com/jobs/view/42".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_form_fails_with_one_event() {
    let mut h = harness(
        FormScript {
            form_present: false,
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::FormNotFound));
    let event = single_event(&mut h);
    assert!(!event.is_success());
    assert!(event.details.starts_with("FormNotFound (FormStructural)"));
    assert_eq!(session.close_count(), 1);
    assert_eq!(resume_files_left(&h), 0);
}

#[tokio::test(start_paused = true)]
async fn test_external_redirect_is_unsupported_without_filling() {
    let mut h = harness(
        FormScript {
            external: true,
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    assert!(matches!(attempt.status, ApplyState::Unsupported(_)));
    {
        let calls = h.adapter.calls();
        assert!(calls.fills.is_empty());
        assert!(calls.uploads.is_empty());
        assert_eq!(calls.submits, 0);
    }
    let event = single_event(&mut h);
    assert!(!event.is_success());
    assert!(event.details.contains("PlatformUnsupported"));
    assert!(event.details.contains("Lever"));
}

#[tokio::test(start_paused = true)]
async fn test_endless_steps_fail_after_ten() {
    let mut h = harness(
        FormScript {
            endless: true,
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::TooManySteps(10)));
    assert_eq!(h.adapter.calls().next_clicks, 10);
    assert_eq!(h.adapter.calls().submits, 0);
    assert_eq!(single_event(&mut h).status, job_autopilot::services::StatusKind::Failure);
}

#[tokio::test(start_paused = true)]
async fn test_form_errors_stop_before_submit() {
    let mut h = harness(
        FormScript {
            errors_at_step: Some(1),
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    match &attempt.status {
        ApplyState::Failed(reason) => {
            assert_eq!(reason.kind(), ErrorKind::Validation);
            assert_eq!(
                reason,
                &FailureReason::FormValidation(vec!["Please enter a valid phone number".to_string()])
            );
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(h.adapter.calls().submits, 0);
    let event = single_event(&mut h);
    assert!(event.details.contains("Please enter a valid phone number"));
}

#[tokio::test(start_paused = true)]
async fn test_dry_run_stops_at_review() {
    let mut h = harness(FormScript::default(), true);
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    assert_eq!(attempt.status, ApplyState::DryRun);
    assert_eq!(h.adapter.calls().submits, 0);
    let event = single_event(&mut h);
    assert!(event.is_success());
    assert_eq!(event.details, "DryRun: stopped before submit");
}

#[tokio::test(start_paused = true)]
async fn test_disabled_submit_and_missing_confirmation() {
    let mut h = harness(
        FormScript {
            submit_enabled: false,
            ..Default::default()
        },
        false,
    );
    let attempt = run(&h, &mut ScriptedSession::new(), None).await;
    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::SubmitUnavailable));
    single_event(&mut h);

    let mut h = harness(
        FormScript {
            confirms: false,
            ..Default::default()
        },
        false,
    );
    let attempt = run(&h, &mut ScriptedSession::new(), None).await;
    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::ConfirmationTimeout));
    single_event(&mut h);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_failure() {
    let mut h = harness(FormScript::default(), false);
    let mut session = ScriptedSession::failing_navigation();

    let attempt = run(&h, &mut session, None).await;

    assert!(matches!(
        attempt.status,
        ApplyState::Failed(FailureReason::NavigationFailed(_))
    ));
    assert_eq!(single_event(&mut h).status, job_autopilot::services::StatusKind::Failure);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_still_tears_down() {
    let mut h = harness(FormScript::default(), false);
    let mut session = ScriptedSession::new();
    let cancel = CancelSignal::new();
    cancel.cancel();

    let attempt = run_with_cancel(&h, &mut session, &cancel, None).await;

    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::Cancelled));
    assert_eq!(session.close_count(), 1);
    single_event(&mut h);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded_cleans_up() {
    let mut h = harness(
        FormScript {
            hang_on_form: true,
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, Some(Duration::from_secs(30))).await;

    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::DeadlineExceeded));
    assert_eq!(session.close_count(), 1);
    assert_eq!(resume_files_left(&h), 0);
    single_event(&mut h);
}

#[tokio::test(start_paused = true)]
async fn test_panic_inside_state_is_internal_failure() {
    let mut h = harness(
        FormScript {
            panic_on_fields: true,
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    match &attempt.status {
        ApplyState::Failed(reason) => assert_eq!(reason.kind(), ErrorKind::Internal),
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(session.close_count(), 1);
    assert_eq!(resume_files_left(&h), 0);
    assert!(single_event(&mut h).details.contains("field detection exploded"));
}

#[tokio::test(start_paused = true)]
async fn test_login_with_credentials_then_completes() {
    let mut h = harness(FormScript::default(), false);
    let mut session = ScriptedSession::new();

    let attempt = run_logged_in(&h, &mut session).await;

    assert_eq!(attempt.status, ApplyState::Complete);
    assert_eq!(h.adapter.calls().logins, 1);
    assert!(single_event(&mut h).is_success());
    assert_eq!(session.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_login_never_confirmed_times_out() {
    let mut h = harness(
        FormScript {
            logged_in: false,
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run_logged_in(&h, &mut session).await;

    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::LoginTimeout));
    assert_eq!(h.adapter.calls().logins, 1);
    assert!(session.navigations.lock().unwrap().is_empty(), "登录失败后不应打开岗位页");
    let event = single_event(&mut h);
    assert!(event.details.starts_with("LoginTimeout (Timeout)"));
    assert_eq!(session.close_count(), 1);
    assert_eq!(resume_files_left(&h), 0);
}

#[tokio::test(start_paused = true)]
async fn test_step_without_next_or_submit_is_stuck() {
    let mut h = harness(
        FormScript {
            no_next_at_step: Some(1),
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    assert_eq!(attempt.status, ApplyState::Failed(FailureReason::StuckOnStep(1)));
    assert_eq!(attempt.step_index, 1);
    assert_eq!(h.adapter.calls().submits, 0);
    assert_eq!(single_event(&mut h).status, job_autopilot::services::StatusKind::Failure);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_on_form_step_fails_blocked() {
    let mut h = harness(
        FormScript {
            block_at_step: Some(1),
            ..Default::default()
        },
        false,
    );
    let mut session = ScriptedSession::new();

    let attempt = run(&h, &mut session, None).await;

    match &attempt.status {
        ApplyState::Failed(reason) => {
            assert_eq!(reason, &FailureReason::Blocked("captcha challenge".to_string()));
            assert_eq!(reason.kind(), ErrorKind::Blocked);
        }
        other => panic!("unexpected state {:?}", other),
    }
    {
        let calls = h.adapter.calls();
        assert_eq!(calls.submits, 0);
        assert_eq!(calls.fills.len(), 1, "只填了第一步");
    }
    assert!(single_event(&mut h).details.contains("captcha challenge"));
    assert_eq!(session.close_count(), 1);
}
