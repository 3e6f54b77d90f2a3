use serde::{Deserialize, Serialize};

/// Backend-owned user record. The client only ever holds a read-only
/// snapshot of these for the admin panel; every field is authoritative on
/// the backend side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub subscription_plan: String,
    #[serde(default)]
    pub plan_expires_at: Option<String>,
    #[serde(default)]
    pub kyc_status: String,
    #[serde(default)]
    pub kyc_submitted_at: Option<String>,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub ban_reason: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub wallet_balance: f64,
    #[serde(default)]
    pub signals_used_today: i64,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub autotrade_enabled: bool,
    #[serde(default)]
    pub joined_at: Option<String>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.kyc_status == "approved"
    }

    /// Case-insensitive substring match over id, username, name and email.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.telegram_id.to_string().contains(&q)
            || contains_ci(&self.username, &q)
            || contains_ci(&self.full_name, &q)
            || contains_ci(&self.email, &q)
    }
}

fn contains_ci(field: &Option<String>, lowered_query: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains(lowered_query))
}

/// Admin commands accepted by the backend's user-action endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    ApproveKyc,
    UpgradePlan,
    Ban,
    Unban,
    Delete,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::ApproveKyc => "approve_kyc",
            AdminAction::UpgradePlan => "upgrade_plan",
            AdminAction::Ban => "ban",
            AdminAction::Unban => "unban",
            AdminAction::Delete => "delete",
        }
    }

    /// The single ban button toggles off the user's current state.
    pub fn toggle_ban(is_banned: bool) -> Self {
        if is_banned {
            AdminAction::Unban
        } else {
            AdminAction::Ban
        }
    }
}
