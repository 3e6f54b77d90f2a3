use anyhow::Context;
use tracing::{info, warn};

use common::models::{AdminAction, User};
use gateway::remote::BackendClient;

use crate::commands::{self, CommandOutcome, Selection, UiAction};

/// Aggregate counters shown above the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStats {
    pub total: usize,
    pub verified: usize,
}

impl AdminStats {
    pub fn from_users(users: &[User]) -> Self {
        Self {
            total: users.len(),
            verified: users.iter().filter(|u| u.is_verified()).count(),
        }
    }
}

/// Case-insensitive substring filter over id, username, name and email.
/// Order is preserved from the last full load.
pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    users.iter().filter(|u| u.matches(term)).collect()
}

/// The admin view: a read-only snapshot of backend-owned users, refreshed
/// wholesale and discarded on the next load. All mutation happens on the
/// backend; this side only sends commands and re-reads.
pub struct AdminPanel {
    backend: BackendClient,
    admin_id: String,
    users: Vec<User>,
}

impl AdminPanel {
    pub fn new(backend: BackendClient, admin_id: String) -> Self {
        Self {
            backend,
            admin_id,
            users: Vec::new(),
        }
    }

    /// Replaces the cached snapshot with a fresh load; most recent fetch wins.
    pub async fn load_users(&mut self) -> anyhow::Result<AdminStats> {
        self.users = self
            .backend
            .admin_users(&self.admin_id)
            .await
            .context("Error loading users")?;
        Ok(self.stats())
    }

    pub fn stats(&self) -> AdminStats {
        AdminStats::from_users(&self.users)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn search(&self, term: &str) -> Vec<&User> {
        filter_users(&self.users, term)
    }

    pub fn user(&self, telegram_id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.telegram_id == telegram_id)
    }

    /// Fire-and-forget admin command. On reported success the snapshot is
    /// reloaded; on failure the backend's message is surfaced, nothing is
    /// retried.
    pub async fn user_action(
        &mut self,
        target_id: i64,
        action: AdminAction,
    ) -> anyhow::Result<CommandOutcome> {
        let selection = Selection {
            user_id: self.admin_id.clone(),
            asset: String::new(),
        };
        let spec = commands::build_request(&UiAction::AdminUserAction { target_id, action }, &selection);

        let value = self.backend.send_command(&spec).await?;
        let outcome = commands::outcome_from(&value);

        if outcome.success {
            info!("Admin action {:?} applied to {}", action, target_id);
            if let Err(e) = self.load_users().await {
                warn!("Reload after admin action failed: {}", e);
            }
        } else {
            warn!(
                "Action failed: {}",
                outcome.message.as_deref().unwrap_or("unknown error")
            );
        }

        Ok(outcome)
    }
}

/// Flattened per-user detail rows, the counterpart of the user modal.
pub fn detail_rows(user: &User) -> Vec<(&'static str, String)> {
    fn text(value: &Option<String>) -> String {
        value.clone().unwrap_or_else(|| "N/A".to_string())
    }
    fn yes_no(value: bool) -> String {
        if value { "YES" } else { "NO" }.to_string()
    }

    vec![
        ("ID", user.telegram_id.to_string()),
        ("DB ID", user.id.to_string()),
        ("Name", text(&user.full_name)),
        ("Email", text(&user.email)),
        ("Phone", text(&user.phone)),
        ("Country", text(&user.country)),
        ("Plan", user.subscription_plan.to_uppercase()),
        ("Expiry", text(&user.plan_expires_at)),
        ("KYC", user.kyc_status.clone()),
        ("KYC Submitted", text(&user.kyc_submitted_at)),
        ("Banned", yes_no(user.is_banned)),
        ("Ban Reason", text(&user.ban_reason)),
        ("Admin", yes_no(user.is_admin)),
        ("Super", yes_no(user.is_super_admin)),
        ("Balance", format!("${:.2}", user.wallet_balance)),
        ("Signals Today", user.signals_used_today.to_string()),
        ("Timezone", text(&user.timezone)),
        ("Autotrade", yes_no(user.autotrade_enabled)),
        ("Joined", text(&user.joined_at)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(telegram_id: i64, username: &str, name: &str, email: &str, kyc: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "id": telegram_id,
            "telegram_id": telegram_id,
            "username": username,
            "full_name": name,
            "email": email,
            "subscription_plan": "free",
            "kyc_status": kyc,
        }))
        .unwrap()
    }

    fn roster() -> Vec<User> {
        vec![
            user(100, "alpha", "Alice Moss", "alice@mail.com", "approved"),
            user(200, "bravo", "Bob Stone", "bob@mail.com", "pending"),
            user(300, "charlie", "Carol Alva", "carol@mail.com", "approved"),
        ]
    }

    #[test]
    fn stats_count_kyc_verified_users() {
        let stats = AdminStats::from_users(&roster());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.verified, 2);
    }

    #[test]
    fn search_returns_exact_subset_order_preserved() {
        let users = roster();

        // "al" hits Alice (name/username/email) and Carol (name "Alva").
        let hits = filter_users(&users, "AL");
        let ids: Vec<i64> = hits.iter().map(|u| u.telegram_id).collect();
        assert_eq!(ids, vec![100, 300]);

        let hits = filter_users(&users, "bob@");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].telegram_id, 200);

        let hits = filter_users(&users, "zzz");
        assert!(hits.is_empty());
    }

    #[test]
    fn empty_query_matches_everyone() {
        let users = roster();
        assert_eq!(filter_users(&users, "").len(), users.len());
    }

    #[test]
    fn detail_rows_format_booleans_and_balance() {
        let mut u = user(100, "alpha", "Alice Moss", "alice@mail.com", "approved");
        u.wallet_balance = 12.5;
        u.is_banned = true;

        let rows = detail_rows(&u);
        let get = |label: &str| {
            rows.iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("Balance"), "$12.50");
        assert_eq!(get("Banned"), "YES");
        assert_eq!(get("Phone"), "N/A");
        assert_eq!(get("Plan"), "FREE");
    }
}
