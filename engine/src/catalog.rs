//! Product and kingdom catalog lookups.
//!
//! The catalog lives in a separate service; the engine only needs the
//! attributes that feed the conversion multipliers.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crownfx_common::{KingdomId, ProductId};

/// Product attributes relevant to conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Demand multiplier applied to product conversions.
    pub demand_multiplier: Decimal,
    /// Quality multiplier applied to product conversions.
    pub quality_multiplier: Decimal,
    /// Kingdom the product originates from.
    pub kingdom_id: KingdomId,
}

/// Kingdom attributes relevant to conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KingdomInfo {
    /// Kingdom ID.
    pub id: KingdomId,
    /// Kingdom name.
    pub name: String,
    /// Quality rate applied to all conversions in the kingdom's context.
    pub quality_rate: Decimal,
    /// Owner kingdoms receive a fixed conversion bonus.
    pub is_owner: bool,
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Look up a product by ID.
    async fn product(&self, id: ProductId) -> Option<ProductInfo>;

    /// Look up a kingdom by ID.
    async fn kingdom(&self, id: KingdomId) -> Option<KingdomInfo>;
}

/// In-memory catalog, used by the services and in tests.
pub struct StaticCatalog {
    products: DashMap<i64, ProductInfo>,
    kingdoms: DashMap<i64, KingdomInfo>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            kingdoms: DashMap::new(),
        }
    }

    /// Add a product.
    pub fn insert_product(&self, product: ProductInfo) {
        self.products.insert(product.id.value(), product);
    }

    /// Add a kingdom.
    pub fn insert_kingdom(&self, kingdom: KingdomInfo) {
        self.kingdoms.insert(kingdom.id.value(), kingdom);
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn product(&self, id: ProductId) -> Option<ProductInfo> {
        self.products.get(&id.value()).map(|p| p.clone())
    }

    async fn kingdom(&self, id: KingdomId) -> Option<KingdomInfo> {
        self.kingdoms.get(&id.value()).map(|k| k.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_catalog_lookup() {
        let catalog = StaticCatalog::new();
        catalog.insert_kingdom(KingdomInfo {
            id: KingdomId::new(1),
            name: "Altamura".to_string(),
            quality_rate: dec!(1.1),
            is_owner: true,
        });
        catalog.insert_product(ProductInfo {
            id: ProductId::new(7),
            name: "Dragon-scale shield".to_string(),
            demand_multiplier: dec!(1.5),
            quality_multiplier: dec!(1.2),
            kingdom_id: KingdomId::new(1),
        });

        let product = catalog.product(ProductId::new(7)).await.unwrap();
        assert_eq!(product.kingdom_id, KingdomId::new(1));

        let kingdom = catalog.kingdom(product.kingdom_id).await.unwrap();
        assert!(kingdom.is_owner);

        assert!(catalog.product(ProductId::new(99)).await.is_none());
        assert!(catalog.kingdom(KingdomId::new(99)).await.is_none());
    }
}
