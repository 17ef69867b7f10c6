//! Screening of inbound chat events against the live request.
//!
//! Every button press or reply seen by the listener flows through here.
//! Only events that target the live request message, come from a listed
//! approver, and carry a recognizable action become verdicts; everything
//! else is dropped without touching the pending decision.

use std::collections::HashSet;

use crate::arbiter::{ReviewAction, Verdict};

/// Callback data carried by the approve button.
pub const APPROVE_DATA: &str = "sg:approve";
/// Callback data carried by the deny button.
pub const DENY_DATA: &str = "sg:deny";

/// An inbound event as seen on the wire, before screening.
#[derive(Debug, Clone)]
pub struct ReviewEvent {
    /// Telegram user id of whoever acted.
    pub actor: u64,
    /// Message id the action targets.
    pub target: i32,
    /// Raw action tag: button callback data, or reply text.
    pub tag: String,
}

/// Outcome of screening one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Counts toward the decision.
    Authorized(Verdict),
    /// About some other message; not ours to judge.
    WrongTarget,
    /// Right message, but the actor is not a listed approver.
    Unauthorized,
    /// Right message and actor, but the tag means neither approve nor deny.
    Unrecognized,
}

/// Screen one event against the live request. Checks run in order:
/// target, then membership, then tag, so an unauthorized actor on the
/// right message is reported as `Unauthorized` whatever their tag said.
pub fn screen(event: &ReviewEvent, live_message: i32, approvers: &HashSet<u64>) -> Screen {
    if event.target != live_message {
        tracing::debug!(target = event.target, "event for another message, ignoring");
        return Screen::WrongTarget;
    }
    if !is_approver(approvers, event.actor) {
        tracing::debug!(actor = event.actor, "event from non-approver, ignoring");
        return Screen::Unauthorized;
    }
    match parse_action(&event.tag) {
        Some(action) => Screen::Authorized(Verdict {
            action,
            reviewer: event.actor,
        }),
        None => {
            tracing::debug!(tag = %event.tag, "unrecognized action tag, ignoring");
            Screen::Unrecognized
        }
    }
}

pub fn is_approver(approvers: &HashSet<u64>, actor: u64) -> bool {
    approvers.contains(&actor)
}

/// Map an action tag onto approve/deny. Accepts the button callback data
/// and the reply vocabulary; several spellings collapse onto each action.
pub fn parse_action(tag: &str) -> Option<ReviewAction> {
    match tag.trim().to_lowercase().as_str() {
        APPROVE_DATA | "✅" | "👍" | "yes" | "y" | "approve" | "ok" => Some(ReviewAction::Approve),
        DENY_DATA | "❌" | "👎" | "no" | "n" | "deny" => Some(ReviewAction::Deny),
        _ => None,
    }
}
