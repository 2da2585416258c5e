use std::sync::Arc;

use crate::{
    notifications::NotificationDispatcher,
    services::{
        coupons::CouponEngine, custom_requests::CustomRequestDesk, inventory::InventoryLedger,
        orders::OrderLifecycleManager, payments::PaymentReconciler,
    },
    store::{KeyLocks, SharedStore},
};

/// Builds services over one store, one lock table and one dispatcher.
pub struct ServiceFactory {
    store: SharedStore,
    locks: KeyLocks,
    notifier: NotificationDispatcher,
}

impl ServiceFactory {
    pub fn new(store: SharedStore, notifier: NotificationDispatcher) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            notifier,
        }
    }

    pub fn inventory(&self) -> InventoryLedger {
        InventoryLedger::new(self.store.clone(), self.locks.clone())
    }

    pub fn coupons(&self) -> CouponEngine {
        CouponEngine::new(self.store.clone(), self.locks.clone())
    }

    pub fn payments(&self) -> PaymentReconciler {
        PaymentReconciler::new(self.store.clone(), self.locks.clone(), self.notifier.clone())
    }

    pub fn orders(&self) -> OrderLifecycleManager {
        OrderLifecycleManager::new(
            self.store.clone(),
            self.locks.clone(),
            self.inventory(),
            self.coupons(),
            self.notifier.clone(),
        )
    }

    pub fn custom_requests(&self) -> CustomRequestDesk {
        CustomRequestDesk::new(self.store.clone(), self.locks.clone(), self.notifier.clone())
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub inventory: Arc<InventoryLedger>,
    pub coupons: Arc<CouponEngine>,
    pub payments: Arc<PaymentReconciler>,
    pub orders: Arc<OrderLifecycleManager>,
    pub custom_requests: Arc<CustomRequestDesk>,
}

impl ServiceContainer {
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            inventory: Arc::new(factory.inventory()),
            coupons: Arc::new(factory.coupons()),
            payments: Arc::new(factory.payments()),
            orders: Arc::new(factory.orders()),
            custom_requests: Arc::new(factory.custom_requests()),
        }
    }
}
