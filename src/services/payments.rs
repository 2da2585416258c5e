use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{Order, PaymentEntry, PaymentStatus},
    notifications::{messages, NotificationDispatcher},
    store::{keys, KeyLocks, SharedStore},
};

use super::{load_order, save_order};

/// One payment to post against an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub amount: Decimal,
    pub method: String,
    #[serde(default)]
    pub note: String,
    pub recorded_by: String,
}

/// Three-way status rule applied after every ledger change.
pub fn status_for(amount_paid: Decimal, amount_due: Decimal) -> PaymentStatus {
    if amount_due <= Decimal::ZERO {
        PaymentStatus::Paid
    } else if amount_paid > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// Posts `amount` to the ledger and appends the audit entry.
pub fn apply_payment(order: &mut Order, input: &PaymentInput, at: DateTime<Utc>) {
    order.amount_paid += input.amount;
    order.amount_due = order.total - order.amount_paid;
    order.payment_status = status_for(order.amount_paid, order.amount_due);
    order.payment_history.push(PaymentEntry {
        amount: input.amount,
        date: at,
        method: input.method.clone(),
        note: input.note.clone(),
        recorded_by: input.recorded_by.clone(),
    });
}

/// Settles whatever is still due. Returns the settled amount, or `None` when
/// nothing was due.
pub fn settle_remaining(
    order: &mut Order,
    method: &str,
    recorded_by: &str,
    at: DateTime<Utc>,
) -> Option<Decimal> {
    if order.amount_due <= Decimal::ZERO {
        return None;
    }
    let remaining = order.amount_due;
    order.payment_history.push(PaymentEntry {
        amount: remaining,
        date: at,
        method: method.to_string(),
        note: "Marked as fully paid".to_string(),
        recorded_by: recorded_by.to_string(),
    });
    order.amount_paid = order.total;
    order.amount_due = Decimal::ZERO;
    order.payment_status = PaymentStatus::Paid;
    Some(remaining)
}

/// Cumulative payment tracking for orders.
#[derive(Clone)]
pub struct PaymentReconciler {
    store: SharedStore,
    locks: KeyLocks,
    notifier: NotificationDispatcher,
}

impl PaymentReconciler {
    pub fn new(store: SharedStore, locks: KeyLocks, notifier: NotificationDispatcher) -> Self {
        Self {
            store,
            locks,
            notifier,
        }
    }

    #[instrument(skip(self, input), fields(amount = %input.amount))]
    pub async fn record_payment(
        &self,
        order_id: Uuid,
        input: PaymentInput,
    ) -> Result<Order, ServiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        if input.method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Payment method is required".to_string(),
            ));
        }

        let key = keys::order(order_id);
        let _guard = self.locks.lock(&key).await;
        let mut order = load_order(&self.store, order_id).await?;
        if order.is_cancelled() {
            return Err(ServiceError::Conflict(
                "Cannot record a payment on a cancelled order".to_string(),
            ));
        }

        apply_payment(&mut order, &input, Utc::now());
        save_order(&self.store, &order).await?;
        info!(
            order_id = %order.id,
            amount_paid = %order.amount_paid,
            amount_due = %order.amount_due,
            status = %order.payment_status,
            "payment recorded"
        );

        self.notifier
            .dispatch_all("payment_received", messages::payment_received(&order, input.amount))
            .await;
        Ok(order)
    }

    /// Idempotent: an order with nothing due is returned unchanged.
    #[instrument(skip(self))]
    pub async fn mark_fully_paid(
        &self,
        order_id: Uuid,
        method: &str,
        recorded_by: &str,
    ) -> Result<Order, ServiceError> {
        let key = keys::order(order_id);
        let _guard = self.locks.lock(&key).await;
        let mut order = load_order(&self.store, order_id).await?;
        if order.is_cancelled() {
            return Err(ServiceError::Conflict(
                "Cannot mark a cancelled order as paid".to_string(),
            ));
        }

        let Some(settled) = settle_remaining(&mut order, method, recorded_by, Utc::now()) else {
            info!(order_id = %order.id, "order already fully paid");
            return Ok(order);
        };

        save_order(&self.store, &order).await?;
        info!(order_id = %order.id, settled = %settled, "order marked as fully paid");

        self.notifier
            .dispatch_all("payment_received", messages::payment_received(&order, settled))
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn verify_payment(
        &self,
        order_id: Uuid,
        verified: bool,
        verified_by: &str,
    ) -> Result<Order, ServiceError> {
        let key = keys::order(order_id);
        let _guard = self.locks.lock(&key).await;
        let mut order = load_order(&self.store, order_id).await?;
        if order.is_cancelled() {
            return Err(ServiceError::Conflict(
                "Cannot verify payment for a cancelled order".to_string(),
            ));
        }

        order.payment_verified = Some(verified);
        order.payment_verified_at = Some(Utc::now());
        order.verified_by = Some(verified_by.to_string());
        save_order(&self.store, &order).await?;

        info!(order_id = %order.id, verified, "payment verification recorded");
        Ok(order)
    }
}
