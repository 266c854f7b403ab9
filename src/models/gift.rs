use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "gift_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GiftType {
    Normal,
    Vip,
}

impl std::fmt::Display for GiftType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GiftType::Normal => write!(f, "normal"),
            GiftType::Vip => write!(f, "vip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "gift_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GiftStatus {
    Free,
    Reserved,
    WaitingPayment,
    Paid,
    Used,
}

impl GiftStatus {
    /// Legal transitions. Forward-only, except cancellation back to Free.
    pub fn can_transition_to(self, next: GiftStatus) -> bool {
        use GiftStatus::*;
        matches!(
            (self, next),
            (Free, Reserved)
                | (Reserved, WaitingPayment)
                | (Reserved, Paid)
                | (Reserved, Free)
                | (WaitingPayment, Paid)
                | (WaitingPayment, Free)
                | (Paid, Used)
        )
    }

    /// Pre-paid states from which a payment may still be attached or the
    /// reservation released.
    pub fn is_pre_paid(self) -> bool {
        matches!(self, GiftStatus::Reserved | GiftStatus::WaitingPayment)
    }
}

impl std::fmt::Display for GiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GiftStatus::Free => write!(f, "free"),
            GiftStatus::Reserved => write!(f, "reserved"),
            GiftStatus::WaitingPayment => write!(f, "waiting_payment"),
            GiftStatus::Paid => write!(f, "paid"),
            GiftStatus::Used => write!(f, "used"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Gift {
    pub id: i64,
    pub code: String,
    pub gift_type: GiftType,
    pub status: GiftStatus,
    pub reserved: bool,
    pub reserved_at: Option<DateTime<Utc>>,
    pub tg_user_id: Option<i64>,
    pub payment_id: Option<String>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the redemption front-end sees. No reservation internals.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GiftSummary {
    pub code: String,
    pub gift_type: GiftType,
    pub status: GiftStatus,
    pub is_used: bool,
}

impl From<Gift> for GiftSummary {
    fn from(gift: Gift) -> Self {
        Self {
            code: gift.code,
            gift_type: gift.gift_type,
            status: gift.status,
            is_used: gift.is_used,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckGiftResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift: Option<GiftSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UseGiftResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Free normal gifts still on sale.
    pub normal_available: i64,
    /// Whether any vip gift has already been redeemed.
    pub vip_used: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SeedGiftsRequest {
    pub count: u32,
    #[serde(default = "default_seed_type")]
    pub gift_type: GiftType,
}

fn default_seed_type() -> GiftType {
    GiftType::Normal
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SeedGiftsResponse {
    pub created: u32,
    pub codes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GiftQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<GiftStatus>,
}

/// Codes are matched case-insensitively; upper case is canonical in the store.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(GiftStatus::Free.can_transition_to(GiftStatus::Reserved));
        assert!(GiftStatus::Reserved.can_transition_to(GiftStatus::WaitingPayment));
        assert!(GiftStatus::WaitingPayment.can_transition_to(GiftStatus::Paid));
        assert!(GiftStatus::Paid.can_transition_to(GiftStatus::Used));
    }

    #[test]
    fn test_cancellation_reverts_to_free() {
        assert!(GiftStatus::Reserved.can_transition_to(GiftStatus::Free));
        assert!(GiftStatus::WaitingPayment.can_transition_to(GiftStatus::Free));
        // paid and used gifts can never be released back on sale
        assert!(!GiftStatus::Paid.can_transition_to(GiftStatus::Free));
        assert!(!GiftStatus::Used.can_transition_to(GiftStatus::Free));
    }

    #[test]
    fn test_terminal_used_state() {
        for next in [
            GiftStatus::Free,
            GiftStatus::Reserved,
            GiftStatus::WaitingPayment,
            GiftStatus::Paid,
            GiftStatus::Used,
        ] {
            assert!(!GiftStatus::Used.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_skipping_reservation() {
        assert!(!GiftStatus::Free.can_transition_to(GiftStatus::Paid));
        assert!(!GiftStatus::Free.can_transition_to(GiftStatus::Used));
    }

    #[test]
    fn test_pre_paid_states() {
        assert!(GiftStatus::Reserved.is_pre_paid());
        assert!(GiftStatus::WaitingPayment.is_pre_paid());
        assert!(!GiftStatus::Free.is_pre_paid());
        assert!(!GiftStatus::Paid.is_pre_paid());
        assert!(!GiftStatus::Used.is_pre_paid());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("ab12cd34"), "AB12CD34");
        assert_eq!(normalize_code("AB12CD34"), "AB12CD34");
        assert_eq!(normalize_code("  ab12cd34 "), "AB12CD34");
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&GiftStatus::WaitingPayment).unwrap();
        assert_eq!(json, "\"waiting_payment\"");
        let back: GiftStatus = serde_json::from_str("\"waiting_payment\"").unwrap();
        assert_eq!(back, GiftStatus::WaitingPayment);
    }
}
