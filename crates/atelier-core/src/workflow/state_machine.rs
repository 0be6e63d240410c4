//! Legal status transitions for content items.
//!
//! ```text
//! draft ──► pending_approval ──► published ──► archived
//!   │              │                              ▲
//!   │              └──► rejected ──► draft        │
//!   │                      └──────────────────────┤
//!   └──► published (any-scope publishers only)    │
//! ```
//!
//! The table below is the only place status legality is decided. Each edge
//! lists the permissions that may take it; own-scope permissions only count
//! when the actor authored the item.

use chrono::{DateTime, Utc};

use crate::error::AtelierError;
use crate::workflow::content::{ContentItem, ContentStatus, HistoryEntry};
use crate::workflow::permissions::names::*;
use crate::workflow::permissions::{Actor, PermissionModel};

/// One edge of the transition table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: ContentStatus,
    pub to: ContentStatus,
    /// Any one of these grants the edge.
    pub grants: &'static [&'static str],
    pub requires_reason: bool,
}

/// Taking a live item off the site needs the same authority as putting one up.
const UNPUBLISHERS: &[&str] = &[MANAGE_ALL_CONTENT, PUBLISH_CONTENT];

const ARCHIVERS: &[&str] = &[MANAGE_ALL_CONTENT, PUBLISH_CONTENT, MANAGE_OWN_CONTENT];

pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: ContentStatus::Draft,
        to: ContentStatus::PendingApproval,
        grants: &[MANAGE_ALL_CONTENT, SUBMIT_FOR_APPROVAL, MANAGE_OWN_CONTENT],
        requires_reason: false,
    },
    TransitionRule {
        from: ContentStatus::Draft,
        to: ContentStatus::Published,
        grants: &[MANAGE_ALL_CONTENT, PUBLISH_CONTENT],
        requires_reason: false,
    },
    TransitionRule {
        from: ContentStatus::PendingApproval,
        to: ContentStatus::Published,
        grants: &[APPROVE_CONTENT],
        requires_reason: false,
    },
    TransitionRule {
        from: ContentStatus::PendingApproval,
        to: ContentStatus::Rejected,
        grants: &[APPROVE_CONTENT],
        requires_reason: true,
    },
    TransitionRule {
        from: ContentStatus::Published,
        to: ContentStatus::Archived,
        grants: UNPUBLISHERS,
        requires_reason: false,
    },
    TransitionRule {
        from: ContentStatus::Rejected,
        to: ContentStatus::Draft,
        grants: &[MANAGE_ALL_CONTENT, MANAGE_OWN_CONTENT],
        requires_reason: false,
    },
    TransitionRule {
        from: ContentStatus::Rejected,
        to: ContentStatus::Archived,
        grants: ARCHIVERS,
        requires_reason: false,
    },
];

/// Look up the edge `from → to`.
pub fn rule_for(from: ContentStatus, to: ContentStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|r| r.from == from && r.to == to)
}

/// Statuses reachable from `from` in one step.
pub fn targets_from(from: ContentStatus) -> Vec<ContentStatus> {
    TRANSITIONS
        .iter()
        .filter(|r| r.from == from)
        .map(|r| r.to)
        .collect()
}

/// Trim a free-text reason; blank input counts as absent.
pub fn normalize_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// Move `item` to `target` on behalf of `actor`, stamped with the current time.
///
/// The returned item is not persisted.
pub fn transition(
    permissions: &PermissionModel,
    item: ContentItem,
    target: ContentStatus,
    actor: &Actor,
    reason: Option<&str>,
) -> Result<ContentItem, AtelierError> {
    transition_at(permissions, item, target, actor, reason, Utc::now())
}

/// [`transition`] with an explicit timestamp.
pub fn transition_at(
    permissions: &PermissionModel,
    mut item: ContentItem,
    target: ContentStatus,
    actor: &Actor,
    reason: Option<&str>,
    at: DateTime<Utc>,
) -> Result<ContentItem, AtelierError> {
    let from = item.status;
    let rule = rule_for(from, target).ok_or_else(|| AtelierError::InvalidTransition {
        from: from.to_string(),
        to: target.to_string(),
    })?;

    if !permissions.can_act_with_any(actor, &item, rule.grants) {
        return Err(AtelierError::Unauthorized(format!(
            "Moving content from '{}' to '{}' requires one of {:?}",
            from, target, rule.grants
        )));
    }

    let reason = normalize_reason(reason);
    if rule.requires_reason && reason.is_none() {
        return Err(AtelierError::MissingReason);
    }

    item.rejection_reason = if target == ContentStatus::Rejected {
        reason.clone()
    } else {
        None
    };
    item.status = target;
    item.updated_at = at;
    item.history.push(HistoryEntry {
        from,
        to: target,
        at,
        actor_id: actor.id.clone(),
        reason,
    });

    tracing::debug!(
        content_id = %item.id,
        actor_id = %actor.id,
        from = %from,
        to = %target,
        "content transition"
    );

    Ok(item)
}
