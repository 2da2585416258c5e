use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{CustomerInfo, Order, OrderItem, OrderStatus, PaymentStatus, PaymentType},
    notifications::{is_valid_email, messages, NotificationDispatcher},
    store::{keys, KeyLocks, KeyValueStoreExt, SharedStore},
};

use super::{
    coupons::CouponEngine,
    inventory::{InventoryLedger, StockAdjustment},
    load_order, save_order,
};

/// Checkout submission.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_charges: Decimal,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[validate]
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}

/// Who is cancelling, which decides the status restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelActor {
    /// Self-service; only allowed before the order ships
    Customer,
    /// Staff cancelling after a failed payment; allowed from any live status
    PaymentFailure { admin: String },
}

impl CancelActor {
    fn label(&self) -> String {
        match self {
            CancelActor::Customer => "customer".to_string(),
            CancelActor::PaymentFailure { admin } => admin.clone(),
        }
    }
}

/// `AV` + epoch millis + three random digits.
pub fn generate_tracking_id() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(100..1000);
    format!("AV{}{}", Utc::now().timestamp_millis(), suffix)
}

fn is_cash_on_delivery(payment_method: &str) -> bool {
    payment_method.trim().eq_ignore_ascii_case("cod")
}

fn validate_cart(cart: &NewOrder) -> Result<(), ServiceError> {
    cart.validate()?;
    if !is_valid_email(&cart.customer_info.email) {
        return Err(ServiceError::ValidationError(format!(
            "Invalid customer email: {}",
            cart.customer_info.email
        )));
    }
    for item in &cart.items {
        if item.id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Every item needs a product id".to_string(),
            ));
        }
        if item.quantity == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for {} must be at least 1",
                item.id
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Price for {} cannot be negative",
                item.id
            )));
        }
    }
    if cart.shipping_charges < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Shipping charges cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Items describing exactly what a deduction took, for compensation.
fn deducted_items(items: &[OrderItem], report: &[StockAdjustment]) -> Vec<OrderItem> {
    items
        .iter()
        .zip(report)
        .filter_map(|(item, adj)| match (adj.previous_stock, adj.new_stock) {
            (Some(before), Some(after)) if before > after => Some(OrderItem {
                quantity: before - after,
                ..item.clone()
            }),
            _ => None,
        })
        .collect()
}

/// Order state machine and the coordination around it.
#[derive(Clone)]
pub struct OrderLifecycleManager {
    store: SharedStore,
    locks: KeyLocks,
    inventory: InventoryLedger,
    coupons: CouponEngine,
    notifier: NotificationDispatcher,
}

impl OrderLifecycleManager {
    pub fn new(
        store: SharedStore,
        locks: KeyLocks,
        inventory: InventoryLedger,
        coupons: CouponEngine,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            locks,
            inventory,
            coupons,
            notifier,
        }
    }

    #[instrument(skip(self, cart), fields(items = cart.items.len()))]
    pub async fn create_order(&self, cart: NewOrder) -> Result<Order, ServiceError> {
        validate_cart(&cart)?;

        let subtotal: Decimal = cart.items.iter().map(OrderItem::line_total).sum();

        let mut applied_coupon = None;
        let mut discount = Decimal::ZERO;
        if let Some(code) = cart.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
            let check = self.coupons.apply(code, Some(subtotal)).await?;
            if !check.valid {
                return Err(ServiceError::ValidationError(
                    check.reason.unwrap_or_else(|| "Invalid coupon".to_string()),
                ));
            }
            discount = check.discount_amount;
            applied_coupon = check.coupon;
        }

        let total = subtotal + cart.shipping_charges - discount;
        let (payment_type, payment_status, amount_paid) =
            if is_cash_on_delivery(&cart.payment_method) {
                (PaymentType::Cod, PaymentStatus::Pending, Decimal::ZERO)
            } else {
                (PaymentType::Prepaid, PaymentStatus::Prepaid, total)
            };

        let order = Order {
            id: Uuid::new_v4(),
            tracking_id: generate_tracking_id(),
            items: cart.items,
            subtotal,
            shipping_charges: cart.shipping_charges,
            discount,
            coupon_code: applied_coupon.as_ref().map(|c| c.code.clone()),
            total,
            customer_info: cart.customer_info,
            payment_id: cart.payment_id,
            payment_method: cart.payment_method,
            payment_type,
            payment_status,
            status: OrderStatus::OrderPending,
            amount_paid,
            amount_due: total - amount_paid,
            payment_history: Vec::new(),
            payment_verified: None,
            payment_verified_at: None,
            verified_by: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            created_at: Utc::now(),
            last_status_update: None,
        };

        let report = self.inventory.deduct(&order.items).await;

        if let Err(err) = save_order(&self.store, &order).await {
            error!(
                order_id = %order.id,
                error = %err,
                "order write failed, returning deducted stock"
            );
            self.inventory
                .restore(&deducted_items(&order.items, &report))
                .await;
            return Err(err);
        }
        info!(
            order_id = %order.id,
            tracking_id = %order.tracking_id,
            total = %order.total,
            payment_type = %order.payment_type,
            "order created"
        );

        if let Some(coupon) = applied_coupon {
            if let Err(err) = self.coupons.record_usage(coupon.id).await {
                warn!(coupon = %coupon.code, error = %err, "failed to record coupon usage");
            }
        }

        self.notifier
            .dispatch_all(
                "order_placed",
                messages::order_placed(&order, self.notifier.admin()),
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        order_id: Uuid,
        reason: Option<String>,
        actor: CancelActor,
    ) -> Result<Order, ServiceError> {
        let key = keys::order(order_id);
        let _guard = self.locks.lock(&key).await;
        let mut order = load_order(&self.store, order_id).await?;

        if order.is_cancelled() {
            return Err(ServiceError::Conflict("Order is already cancelled".to_string()));
        }
        if actor == CancelActor::Customer && !order.status.is_customer_cancellable() {
            return Err(ServiceError::Conflict(format!(
                "Order cannot be cancelled once it is {}",
                order.status.label()
            )));
        }

        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| match actor {
                CancelActor::Customer => "Cancelled by customer".to_string(),
                CancelActor::PaymentFailure { .. } => "Payment failed".to_string(),
            });
        order.status = OrderStatus::Cancelled;
        order.cancellation_reason = Some(reason);
        order.cancelled_by = Some(actor.label());
        order.cancelled_at = Some(Utc::now());
        order.last_status_update = order.cancelled_at;
        save_order(&self.store, &order).await?;
        info!(order_id = %order.id, cancelled_by = %actor.label(), "order cancelled");

        self.inventory.restore(&order.items).await;
        self.notifier
            .dispatch_all(
                "order_cancelled",
                messages::order_cancelled(&order, self.notifier.admin()),
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        if new_status.is_terminal() {
            return Err(ServiceError::InvalidStatus(
                "Use the cancellation operations to cancel an order".to_string(),
            ));
        }

        let key = keys::order(order_id);
        let _guard = self.locks.lock(&key).await;
        let mut order = load_order(&self.store, order_id).await?;
        if order.is_cancelled() {
            return Err(ServiceError::Conflict(
                "Cannot update the status of a cancelled order".to_string(),
            ));
        }

        let previous = order.status;
        order.status = new_status;
        order.last_status_update = Some(Utc::now());
        save_order(&self.store, &order).await?;
        info!(order_id = %order.id, from = %previous, to = %new_status, "order status updated");

        self.notifier
            .dispatch_all("status_changed", messages::status_changed(&order))
            .await;
        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, ServiceError> {
        load_order(&self.store, order_id).await
    }

    pub async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Order, ServiceError> {
        let orders: Vec<Order> = self.store.list_json(keys::ORDER_PREFIX).await?;
        orders
            .into_iter()
            .find(|o| o.tracking_id == tracking_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", tracking_id)))
    }

    /// Newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, ServiceError> {
        let mut orders: Vec<Order> = self.store.list_json(keys::ORDER_PREFIX).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn list_customer_orders(&self, email: &str) -> Result<Vec<Order>, ServiceError> {
        let mut orders = self.list_orders().await?;
        orders.retain(|o| o.customer_info.email.eq_ignore_ascii_case(email.trim()));
        Ok(orders)
    }
}
