use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product as far as stock accounting is concerned.
///
/// Unknown catalog fields are preserved so that stock writes do not strip
/// data owned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub stock: u32,
    pub price: Decimal,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stock: u32, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stock,
            price,
            extra: serde_json::Map::new(),
        }
    }
}
