use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::order::CustomerInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum CustomRequestStatus {
    Submitted,
    Quoted,
    Approved,
    Rejected,
    Cancelled,
}

impl CustomRequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CustomRequestStatus::Approved
                | CustomRequestStatus::Rejected
                | CustomRequestStatus::Cancelled
        )
    }
}

/// A bespoke, non-catalog order negotiated through a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRequest {
    pub id: Uuid,
    pub customer_info: CustomerInfo,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    pub status: CustomRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
