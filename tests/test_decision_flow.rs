//! Decision-flow tests: the access filter and the arbiter wired together
//! the way the channel adapters wire them, with events fed by hand.
//! No Telegram traffic anywhere.

use std::collections::HashSet;
use std::time::Duration;

use sudogate::access::{self, ReviewEvent, Screen, APPROVE_DATA, DENY_DATA};
use sudogate::arbiter::{self, Decision, ReviewAction, Verdict};
use sudogate::config::{ApprovalUx, Config, DEFAULT_TIMEOUT_SECS};
use sudogate::executor;

const LIVE_MESSAGE: i32 = 777;

fn approvers(ids: &[u64]) -> HashSet<u64> {
    ids.iter().copied().collect()
}

fn event(actor: u64, target: i32, tag: &str) -> ReviewEvent {
    ReviewEvent {
        actor,
        target,
        tag: tag.to_string(),
    }
}

/// Feed one raw event through the filter into the slot, the way an
/// adapter's update handler does.
fn deliver(
    slot: &tokio::sync::mpsc::Sender<Verdict>,
    raw: ReviewEvent,
    approvers: &HashSet<u64>,
) {
    if let Screen::Authorized(verdict) = access::screen(&raw, LIVE_MESSAGE, approvers) {
        arbiter::offer(slot, verdict);
    }
}

#[test]
fn test_mismatched_target_always_rejected() {
    let set = approvers(&[111, 222, 333]);

    // Wrong target loses no matter who acted or what they pressed.
    let table = [
        (111, 555, APPROVE_DATA),
        (222, 555, DENY_DATA),
        (333, -1, APPROVE_DATA),
        (999, 555, APPROVE_DATA),
        (111, 778, "✅"),
    ];
    for (actor, target, tag) in table {
        let screened = access::screen(&event(actor, target, tag), LIVE_MESSAGE, &set);
        assert_eq!(screened, Screen::WrongTarget, "actor {actor} target {target}");
    }
}

#[tokio::test]
async fn test_non_approver_leaves_request_pending() {
    let set = approvers(&[111, 222, 333]);
    let (slot, mut verdicts) = arbiter::verdict_slot();

    deliver(&slot, event(999, LIVE_MESSAGE, APPROVE_DATA), &set);
    deliver(&slot, event(998, LIVE_MESSAGE, DENY_DATA), &set);

    // Nothing was forwarded, so the wait runs to its timeout.
    let decision = arbiter::wait_for_decision(&mut verdicts, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(decision, Decision::TimedOut);
}

#[tokio::test]
async fn test_first_writer_wins_across_the_full_path() {
    let set = approvers(&[111, 222]);
    let (slot, mut verdicts) = arbiter::verdict_slot();

    // Two authorized approves in immediate succession: one verdict lands.
    deliver(&slot, event(111, LIVE_MESSAGE, APPROVE_DATA), &set);
    deliver(&slot, event(222, LIVE_MESSAGE, APPROVE_DATA), &set);

    let decision = arbiter::wait_for_decision(&mut verdicts, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Approved { by: 111 });

    // A deny after resolution goes nowhere.
    drop(verdicts);
    deliver(&slot, event(222, LIVE_MESSAGE, DENY_DATA), &set);
}

#[tokio::test]
async fn test_authorized_deny_resolves_denied() {
    let set = approvers(&[42]);
    let (slot, mut verdicts) = arbiter::verdict_slot();

    deliver(&slot, event(42, LIVE_MESSAGE, "no"), &set);

    let decision = arbiter::wait_for_decision(&mut verdicts, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied { by: 42 });
}

#[tokio::test]
async fn test_scenario_approve_arrives_during_wait() {
    // Approver set {42}, approval delivered well inside the timeout.
    let set = approvers(&[42]);
    let (slot, mut verdicts) = arbiter::verdict_slot();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        deliver(&slot, event(42, LIVE_MESSAGE, APPROVE_DATA), &set);
    });

    let decision = arbiter::wait_for_decision(&mut verdicts, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Approved { by: 42 });
}

#[tokio::test]
async fn test_scenario_timeout_names_the_wait() {
    let (_slot, mut verdicts) = arbiter::verdict_slot();

    let decision = arbiter::wait_for_decision(&mut verdicts, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(decision, Decision::TimedOut);

    // The status shown to approvers carries the timeout value.
    let status = executor::status_line(&decision, 2);
    assert!(status.contains('2'), "{status}");
    assert_eq!(executor::EXIT_FAILURE, 1);
}

#[test]
fn test_timeout_precedence() {
    let config = |timeout_seconds| Config {
        bot_token: "t".to_string(),
        approvers: approvers(&[1]),
        timeout_seconds,
        approval_ux: ApprovalUx::Buttons,
    };

    // Configured value beats the hardcoded default; override beats both.
    assert_eq!(config(60).effective_timeout(None), 60);
    assert_eq!(config(60).effective_timeout(Some(0)), 60);
    assert_eq!(config(60).effective_timeout(Some(45)), 45);
    assert_eq!(config(DEFAULT_TIMEOUT_SECS).effective_timeout(None), 300);
}

#[test]
fn test_approver_membership() {
    let set = approvers(&[111, 222, 333]);
    assert!(access::is_approver(&set, 222));
    assert!(!access::is_approver(&set, 999));
}

#[test]
fn test_duplicate_event_does_not_double_count() {
    let set = approvers(&[111]);
    let (slot, mut verdicts) = arbiter::verdict_slot();

    // The same press processed twice fills the slot exactly once.
    let raw = event(111, LIVE_MESSAGE, APPROVE_DATA);
    deliver(&slot, raw.clone(), &set);
    deliver(&slot, raw, &set);

    assert_eq!(
        verdicts.try_recv().unwrap(),
        Verdict {
            action: ReviewAction::Approve,
            reviewer: 111,
        }
    );
    assert!(verdicts.try_recv().is_err());
}
