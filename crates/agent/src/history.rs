//! History sanitizer — turns stored transcript turns into a sequence the
//! tool-calling completion protocol accepts.
//!
//! Rules, applied per turn in transcript order:
//!
//! 1. legacy `function` turns are dropped;
//! 2. `tool` turns without a call id are dropped;
//! 3. a `tool` turn survives only if its id was issued by the most recent
//!    retained `assistant` turn and has not been answered yet;
//! 4. with [`HistoryProfile::Crm`], `system` turns carrying injected gateway
//!    data or gateway failure notices are dropped;
//! 5. missing content becomes `""`.
//!
//! Turns are never reordered. Dropped turns leave the pending-call state
//! untouched, which keeps the sanitizer idempotent.

use std::collections::HashSet;
use switchyard_core::message::{Message, Role, StoredTurn};

use crate::crm::directive::is_injected_gateway_payload;

/// Which filter set to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryProfile {
    #[default]
    Standard,
    /// Also strips directives the CRM bridge injected on earlier turns.
    Crm,
}

/// Tool-call ids the next `tool` turns may answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum PendingTools {
    #[default]
    None,
    Ids(HashSet<String>),
}

impl PendingTools {
    /// State after `turn` has been retained.
    fn after(self, turn: &StoredTurn) -> Self {
        match turn.role {
            Role::User | Role::System => Self::None,
            Role::Assistant => Self::Ids(turn.tool_calls.iter().map(|c| c.id.clone()).collect()),
            Role::Tool => match (self, turn.tool_call_id.as_deref()) {
                (Self::Ids(mut ids), Some(id)) => {
                    ids.remove(id);
                    Self::Ids(ids)
                }
                (state, _) => state,
            },
            Role::Function => self,
        }
    }

    fn accepts(&self, call_id: &str) -> bool {
        matches!(self, Self::Ids(ids) if ids.contains(call_id))
    }
}

/// Sanitize `turns`, given oldest first.
pub fn sanitize(turns: Vec<StoredTurn>, profile: HistoryProfile) -> Vec<Message> {
    let (_, kept) = turns.into_iter().fold(
        (PendingTools::None, Vec::new()),
        |(state, mut kept), turn| {
            if !retain(&state, &turn, profile) {
                return (state, kept);
            }
            let state = state.after(&turn);
            kept.push(into_message(turn));
            (state, kept)
        },
    );
    kept
}

/// Sanitize turns as the thread store returns them (newest first).
pub fn sanitize_storage_order(mut newest_first: Vec<StoredTurn>, profile: HistoryProfile) -> Vec<Message> {
    newest_first.reverse();
    sanitize(newest_first, profile)
}

fn retain(state: &PendingTools, turn: &StoredTurn, profile: HistoryProfile) -> bool {
    match turn.role {
        Role::Function => false,
        Role::Tool => turn
            .tool_call_id
            .as_deref()
            .is_some_and(|id| state.accepts(id)),
        Role::System if profile == HistoryProfile::Crm => !turn
            .content
            .as_deref()
            .is_some_and(is_injected_gateway_payload),
        _ => true,
    }
}

fn into_message(turn: StoredTurn) -> Message {
    Message {
        id: turn.id,
        role: turn.role,
        content: turn.content.unwrap_or_default(),
        tool_calls: turn.tool_calls,
        tool_call_id: turn.tool_call_id,
        attachments: turn.attachments,
        timestamp: turn.timestamp,
    }
}
