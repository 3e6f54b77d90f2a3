use serde_json::{Value, json};

use common::models::{AdminAction, Direction};
use gateway::remote::RequestSpec;

/// UI actions that become fire-and-forget backend commands. One request per
/// action, no retry, no idempotency key; the backend decides success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    SubmitTrade(Direction),
    RunScan,
    LoadUsers,
    AdminUserAction {
        target_id: i64,
        action: AdminAction,
    },
}

/// Session-scoped selection state handed to command builders instead of
/// ambient globals.
#[derive(Debug, Clone)]
pub struct Selection {
    pub user_id: String,
    pub asset: String,
}

/// The dispatch table: maps a UI action plus the current selection to a
/// request description. Pure, so every command is testable offline.
pub fn build_request(action: &UiAction, selection: &Selection) -> RequestSpec {
    match action {
        UiAction::SubmitTrade(direction) => RequestSpec::post(
            "/api/execute-trade",
            json!({
                "asset": selection.asset,
                "direction": direction,
                "user_id": selection.user_id,
            }),
        ),
        UiAction::RunScan => RequestSpec::get("/api/market-scan"),
        UiAction::LoadUsers => RequestSpec::get(&format!(
            "/api/admin/users?admin_id={}",
            selection.user_id
        )),
        UiAction::AdminUserAction { target_id, action } => RequestSpec::post(
            "/api/admin/user-action",
            json!({
                "admin_id": selection.user_id,
                "target_id": target_id.to_string(),
                "action": action.as_str(),
            }),
        ),
    }
}

/// Success/failure exactly as the backend reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: Option<String>,
}

pub fn outcome_from(value: &Value) -> CommandOutcome {
    CommandOutcome {
        success: value.get("status").and_then(Value::as_str) == Some("success"),
        message: value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Guards command feedback so only the newest response ever drives the UI.
/// Each submission takes a sequence number; a response may only be applied
/// if nothing newer has been applied before it.
#[derive(Debug, Default)]
pub struct ResponseTracker {
    issued: u64,
    applied: u64,
}

impl ResponseTracker {
    pub fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn try_apply(&mut self, seq: u64) -> bool {
        if seq > self.applied {
            self.applied = seq;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::remote::HttpMethod;

    fn selection() -> Selection {
        Selection {
            user_id: "1241907317".to_string(),
            asset: "BTC/USDT".to_string(),
        }
    }

    #[test]
    fn trade_request_carries_selection_state() {
        let spec = build_request(&UiAction::SubmitTrade(Direction::Buy), &selection());

        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.path, "/api/execute-trade");
        assert_eq!(
            spec.body.unwrap(),
            json!({
                "asset": "BTC/USDT",
                "direction": "BUY",
                "user_id": "1241907317",
            })
        );
    }

    #[test]
    fn admin_action_request_uses_string_ids() {
        let spec = build_request(
            &UiAction::AdminUserAction {
                target_id: 555123,
                action: AdminAction::ApproveKyc,
            },
            &selection(),
        );

        assert_eq!(spec.path, "/api/admin/user-action");
        assert_eq!(
            spec.body.unwrap(),
            json!({
                "admin_id": "1241907317",
                "target_id": "555123",
                "action": "approve_kyc",
            })
        );
    }

    #[test]
    fn read_actions_map_to_get_requests() {
        let spec = build_request(&UiAction::RunScan, &selection());
        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.path, "/api/market-scan");
        assert!(spec.body.is_none());

        let spec = build_request(&UiAction::LoadUsers, &selection());
        assert_eq!(spec.path, "/api/admin/users?admin_id=1241907317");
        assert!(spec.body.is_none());
    }

    #[test]
    fn outcome_reads_the_status_flag() {
        let ok = outcome_from(&json!({"status": "success", "order_id": "ORD_1"}));
        assert!(ok.success);
        assert_eq!(ok.message, None);

        let failed = outcome_from(&json!({"status": "error", "message": "not authorized"}));
        assert!(!failed.success);
        assert_eq!(failed.message.as_deref(), Some("not authorized"));
    }

    #[test]
    fn stale_responses_never_overwrite_newer_ones() {
        let mut tracker = ResponseTracker::default();
        let first = tracker.begin();
        let second = tracker.begin();

        // The second submission responds first; the late first response is
        // stale and must be ignored.
        assert!(tracker.try_apply(second));
        assert!(!tracker.try_apply(first));
    }

    #[test]
    fn in_order_responses_all_apply() {
        let mut tracker = ResponseTracker::default();
        let first = tracker.begin();
        let second = tracker.begin();

        assert!(tracker.try_apply(first));
        assert!(tracker.try_apply(second));
        assert!(!tracker.try_apply(second), "replay of the same response");
    }
}
