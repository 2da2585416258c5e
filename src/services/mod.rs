// Lifecycle services
pub mod coupons;
pub mod custom_requests;
pub mod inventory;
pub mod orders;
pub mod payments;

// Service factory for dependency injection
pub mod factory;

use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::Order,
    store::{keys, KeyValueStoreExt, SharedStore},
};

pub use coupons::{CouponEngine, CouponUpdate, CouponValidation, NewCoupon};
pub use custom_requests::{CustomRequestDesk, NewCustomRequest};
pub use factory::{ServiceContainer, ServiceFactory};
pub use inventory::{AdjustmentOutcome, InventoryLedger, StockAdjustment};
pub use orders::{CancelActor, NewOrder, OrderLifecycleManager};
pub use payments::{PaymentInput, PaymentReconciler};

pub(crate) async fn load_order(store: &SharedStore, id: Uuid) -> Result<Order, ServiceError> {
    store
        .get_json(&keys::order(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
}

pub(crate) async fn save_order(store: &SharedStore, order: &Order) -> Result<(), ServiceError> {
    store.set_json(&keys::order(order.id), order).await?;
    Ok(())
}
