use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    models::{OrderItem, Product},
    store::{keys, KeyLocks, KeyValueStoreExt, SharedStore},
};

/// What happened to one line item during a stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: String,
    pub requested: u32,
    /// Stock before and after, when the product exists and was written
    pub previous_stock: Option<u32>,
    pub new_stock: Option<u32>,
    pub outcome: AdjustmentOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentOutcome {
    Applied,
    /// Deduction was larger than the stock on hand; stock was set to zero
    Clamped,
    ProductMissing,
    Failed(String),
}

impl StockAdjustment {
    pub fn is_applied(&self) -> bool {
        matches!(
            self.outcome,
            AdjustmentOutcome::Applied | AdjustmentOutcome::Clamped
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Deduct,
    Restore,
}

/// Stock accounting against order line items.
///
/// Each item is processed independently: a missing product or a failed write
/// is logged and reported, and the remaining items are still processed.
#[derive(Clone)]
pub struct InventoryLedger {
    store: SharedStore,
    locks: KeyLocks,
}

impl InventoryLedger {
    pub fn new(store: SharedStore, locks: KeyLocks) -> Self {
        Self { store, locks }
    }

    pub async fn get_product(&self, id: &str) -> Result<Option<Product>, ServiceError> {
        Ok(self.store.get_json(&keys::product(id)).await?)
    }

    /// Seeds or replaces a catalog product.
    pub async fn put_product(&self, product: &Product) -> Result<(), ServiceError> {
        let key = keys::product(&product.id);
        let _guard = self.locks.lock(&key).await;
        self.store.set_json(&key, product).await?;
        Ok(())
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn deduct(&self, items: &[OrderItem]) -> Vec<StockAdjustment> {
        let mut report = Vec::with_capacity(items.len());
        for item in items {
            report.push(self.adjust(item, Direction::Deduct).await);
        }
        info!(
            applied = report.iter().filter(|a| a.is_applied()).count(),
            "inventory deducted"
        );
        report
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn restore(&self, items: &[OrderItem]) -> Vec<StockAdjustment> {
        let mut report = Vec::with_capacity(items.len());
        for item in items {
            report.push(self.adjust(item, Direction::Restore).await);
        }
        info!(
            applied = report.iter().filter(|a| a.is_applied()).count(),
            "inventory restored"
        );
        report
    }

    async fn adjust(&self, item: &OrderItem, direction: Direction) -> StockAdjustment {
        let key = keys::product(&item.id);
        let _guard = self.locks.lock(&key).await;

        let mut adjustment = StockAdjustment {
            product_id: item.id.clone(),
            requested: item.quantity,
            previous_stock: None,
            new_stock: None,
            outcome: AdjustmentOutcome::Applied,
        };

        let mut product: Product = match self.store.get_json(&key).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                warn!(product_id = %item.id, "product not found, skipping stock adjustment");
                adjustment.outcome = AdjustmentOutcome::ProductMissing;
                return adjustment;
            }
            Err(err) => {
                warn!(product_id = %item.id, error = %err, "failed to load product");
                adjustment.outcome = AdjustmentOutcome::Failed(err.to_string());
                return adjustment;
            }
        };

        let previous = product.stock;
        product.stock = match direction {
            Direction::Deduct => {
                if item.quantity > previous {
                    warn!(
                        product_id = %item.id,
                        stock = previous,
                        requested = item.quantity,
                        "deduction exceeds stock, clamping to zero"
                    );
                    adjustment.outcome = AdjustmentOutcome::Clamped;
                }
                previous.saturating_sub(item.quantity)
            }
            Direction::Restore => previous.saturating_add(item.quantity),
        };

        if let Err(err) = self.store.set_json(&key, &product).await {
            warn!(product_id = %item.id, error = %err, "failed to persist stock");
            adjustment.outcome = AdjustmentOutcome::Failed(err.to_string());
            return adjustment;
        }

        adjustment.previous_stock = Some(previous);
        adjustment.new_stock = Some(product.stock);
        adjustment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, KeyValueStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn item(id: &str, quantity: u32) -> OrderItem {
        OrderItem {
            id: id.into(),
            name: id.into(),
            price: dec!(10),
            quantity,
        }
    }

    async fn ledger_with(products: &[(&str, u32)]) -> InventoryLedger {
        let ledger = InventoryLedger::new(Arc::new(InMemoryStore::new()), KeyLocks::new());
        for (id, stock) in products {
            ledger
                .put_product(&Product::new(*id, *id, *stock, dec!(10)))
                .await
                .unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn deduct_clamps_at_zero() {
        let ledger = ledger_with(&[("a", 2)]).await;
        let report = ledger.deduct(&[item("a", 5)]).await;

        assert_eq!(report[0].outcome, AdjustmentOutcome::Clamped);
        assert_eq!(ledger.get_product("a").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn missing_product_does_not_stop_the_batch() {
        let ledger = ledger_with(&[("b", 4)]).await;
        let report = ledger.deduct(&[item("ghost", 1), item("b", 1)]).await;

        assert_eq!(report[0].outcome, AdjustmentOutcome::ProductMissing);
        assert!(report[1].is_applied());
        assert_eq!(ledger.get_product("b").await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn restore_adds_back_the_quantity() {
        let ledger = ledger_with(&[("c", 1)]).await;
        ledger.restore(&[item("c", 3)]).await;
        assert_eq!(ledger.get_product("c").await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn unknown_catalog_fields_survive_a_stock_write() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set_json(
                &keys::product("d"),
                &serde_json::json!({
                    "id": "d",
                    "name": "Lamp",
                    "stock": 3,
                    "price": "5",
                    "imageUrl": "x.png"
                }),
            )
            .await
            .unwrap();
        let ledger = InventoryLedger::new(store.clone(), KeyLocks::new());
        ledger.deduct(&[item("d", 1)]).await;

        let raw = store.get(&keys::product("d")).await.unwrap().unwrap();
        assert_eq!(raw["imageUrl"], "x.png");
        assert_eq!(raw["stock"], 2);
    }
}
