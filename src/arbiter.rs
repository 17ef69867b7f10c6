//! The wait-and-decide core: one pending request, one decision.
//!
//! The decision slot is a capacity-1 channel written with `try_send`, so
//! the first verdict to land wins and every later write is dropped. The
//! waiter races that slot against the timeout clock and the process
//! interrupt signals, and resolves exactly once.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// What an approver did, once screening has let it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Deny,
}

/// An authorized approve/deny event. Raw chat traffic never reaches the
/// waiter; adapters forward only events that passed screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub action: ReviewAction,
    /// Telegram user id of the approver who acted.
    pub reviewer: u64,
}

/// Terminal outcome of one approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved { by: u64 },
    Denied { by: u64 },
    TimedOut,
    Cancelled,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved { by } => write!(f, "approved by {}", by),
            Decision::Denied { by } => write!(f, "denied by {}", by),
            Decision::TimedOut => write!(f, "timed out"),
            Decision::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Create the verdict slot. Capacity 1 plus `offer`'s non-blocking write
/// gives first-writer-wins: the slot never holds more than the winning
/// verdict.
pub fn verdict_slot() -> (mpsc::Sender<Verdict>, mpsc::Receiver<Verdict>) {
    mpsc::channel(1)
}

/// Non-blocking write into the slot. Losing writers (slot already full,
/// or the waiter already resolved and dropped the receiver) are dropped
/// silently; a duplicate click is not an error.
pub fn offer(slot: &mpsc::Sender<Verdict>, verdict: Verdict) {
    if let Err(dropped) = slot.try_send(verdict) {
        tracing::debug!("verdict discarded after resolution: {}", dropped);
    }
}

/// Block until the request resolves: the first verdict, the timeout, or
/// an interrupt, whichever comes first. Returns exactly one decision;
/// afterwards the receiver is dropped and late verdicts go nowhere.
///
/// If every sender disappears without a verdict (the update listener
/// died), the wait keeps running so the timeout still fires.
pub async fn wait_for_decision(
    verdicts: &mut mpsc::Receiver<Verdict>,
    timeout: Duration,
) -> Result<Decision> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let timer = tokio::time::sleep(timeout);
    tokio::pin!(timer);

    let mut slot_open = true;
    let decision = loop {
        tokio::select! {
            verdict = verdicts.recv(), if slot_open => match verdict {
                Some(Verdict { action: ReviewAction::Approve, reviewer }) => {
                    break Decision::Approved { by: reviewer };
                }
                Some(Verdict { action: ReviewAction::Deny, reviewer }) => {
                    break Decision::Denied { by: reviewer };
                }
                None => slot_open = false,
            },
            _ = &mut timer => break Decision::TimedOut,
            _ = sigint.recv() => break Decision::Cancelled,
            _ = sigterm.recv() => break Decision::Cancelled,
        }
    };

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_writer_wins() {
        let (tx, mut rx) = verdict_slot();

        offer(
            &tx,
            Verdict {
                action: ReviewAction::Approve,
                reviewer: 111,
            },
        );
        // Slot already holds the approval; this deny loses the race.
        offer(
            &tx,
            Verdict {
                action: ReviewAction::Deny,
                reviewer: 222,
            },
        );

        let decision = wait_for_decision(&mut rx, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Approved { by: 111 });

        // A verdict arriving after resolution is silently dropped.
        drop(rx);
        offer(
            &tx,
            Verdict {
                action: ReviewAction::Deny,
                reviewer: 333,
            },
        );
    }

    #[tokio::test]
    async fn test_deny_first_resolves_denied() {
        let (tx, mut rx) = verdict_slot();
        offer(
            &tx,
            Verdict {
                action: ReviewAction::Deny,
                reviewer: 42,
            },
        );
        let decision = wait_for_decision(&mut rx, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Denied { by: 42 });
    }

    #[tokio::test]
    async fn test_times_out_with_no_events() {
        let (_tx, mut rx) = verdict_slot();
        let decision = wait_for_decision(&mut rx, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(decision, Decision::TimedOut);
    }

    #[tokio::test]
    async fn test_verdict_delivered_mid_wait() {
        let (tx, mut rx) = verdict_slot();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            offer(
                &tx,
                Verdict {
                    action: ReviewAction::Approve,
                    reviewer: 42,
                },
            );
        });

        let decision = wait_for_decision(&mut rx, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Approved { by: 42 });
    }

    #[tokio::test]
    async fn test_dead_listener_still_times_out() {
        let (tx, mut rx) = verdict_slot();
        drop(tx);

        let started = std::time::Instant::now();
        let decision = wait_for_decision(&mut rx, Duration::from_millis(80))
            .await
            .unwrap();
        assert_eq!(decision, Decision::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
