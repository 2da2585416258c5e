use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Fulfilment state of an order. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum OrderStatus {
    #[serde(alias = "pending")]
    #[strum(serialize = "OrderPending", serialize = "pending")]
    OrderPending,
    InTransit,
    OutForDelivery,
    OrderDelivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Customers may only withdraw orders that have not left the warehouse.
    pub fn is_customer_cancellable(self) -> bool {
        matches!(self, OrderStatus::OrderPending)
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::OrderPending => "Order Pending",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::OrderDelivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PaymentType {
    Prepaid,
    #[serde(rename = "COD")]
    #[strum(serialize = "COD")]
    Cod,
}

/// `Prepaid`/`Pending` are the checkout-time values; `partial`/`paid`/`unpaid`
/// are produced by the payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PaymentStatus {
    #[serde(rename = "Paid")]
    #[strum(serialize = "Paid")]
    Prepaid,
    #[serde(rename = "Pending")]
    #[strum(serialize = "Pending")]
    Pending,
    #[serde(rename = "partial")]
    #[strum(serialize = "partial")]
    Partial,
    #[serde(rename = "paid")]
    #[strum(serialize = "paid")]
    Paid,
    #[serde(rename = "unpaid")]
    #[strum(serialize = "unpaid")]
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid customer email"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// One immutable line of the payment audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub method: String,
    pub note: String,
    pub recorded_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub tracking_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_charges: Decimal,
    pub discount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub total: Decimal,
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub payment_id: Option<String>,
    pub payment_method: String,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub amount_paid: Decimal,
    pub amount_due: Decimal,
    #[serde(default)]
    pub payment_history: Vec<PaymentEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status_update: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_cancelled(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_cod(&self) -> bool {
        self.payment_type == PaymentType::Cod
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
