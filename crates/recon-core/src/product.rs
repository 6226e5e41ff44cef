//! # Product Types
//!
//! The four digital product kinds an order can grant access to, and
//! the catalog that is the authoritative price source.
//! Catalog entries are loaded from `config/catalog.toml`.

use crate::error::{ReconError, ReconResult};
use crate::money::Price;
use serde::{Deserialize, Serialize};

/// The product kinds sold through the ledger.
///
/// An order references exactly one of these; the kind tag selects which
/// enrollment table the entitlement granter touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Course,
    TestSeries,
    Qbank,
    Webinar,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Course => "course",
            ProductKind::TestSeries => "test_series",
            ProductKind::Qbank => "qbank",
            ProductKind::Webinar => "webinar",
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to exactly one product.
///
/// Constructed through [`ProductRef::from_parts`], which enforces the
/// exactly-one invariant the whole order ledger depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRef {
    pub kind: ProductKind,
    pub id: String,
}

impl ProductRef {
    pub fn new(kind: ProductKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Build a reference from the four optional id fields a purchase
    /// request carries. Exactly one must be set.
    pub fn from_parts(
        course_id: Option<String>,
        test_series_id: Option<String>,
        qbank_id: Option<String>,
        webinar_id: Option<String>,
    ) -> ReconResult<Self> {
        let mut refs: Vec<ProductRef> = Vec::new();
        if let Some(id) = course_id {
            refs.push(ProductRef::new(ProductKind::Course, id));
        }
        if let Some(id) = test_series_id {
            refs.push(ProductRef::new(ProductKind::TestSeries, id));
        }
        if let Some(id) = qbank_id {
            refs.push(ProductRef::new(ProductKind::Qbank, id));
        }
        if let Some(id) = webinar_id {
            refs.push(ProductRef::new(ProductKind::Webinar, id));
        }

        match refs.len() {
            0 => Err(ReconError::Validation(
                "Exactly one product reference is required, none supplied".to_string(),
            )),
            1 => Ok(refs.remove(0)),
            n => Err(ReconError::Validation(format!(
                "Exactly one product reference is required, {} supplied",
                n
            ))),
        }
    }
}

impl std::fmt::Display for ProductRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A purchasable entry in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Product kind
    pub kind: ProductKind,

    /// Unique id within the kind
    pub id: String,

    /// Display title
    pub title: String,

    /// Authoritative price
    pub price: Price,

    /// Whether this item is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Product catalog (loaded from config)
///
/// The catalog is the single authoritative price source: client-submitted
/// prices are validated against it and never trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item to the catalog
    pub fn add(&mut self, item: CatalogItem) {
        self.items.push(item);
    }

    /// Find an item by kind and id
    pub fn get(&self, kind: ProductKind, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.kind == kind && i.id == id)
    }

    /// Authoritative price of an active product.
    ///
    /// Fails `NotFound` when the product is absent or withdrawn.
    pub fn price_of(&self, product: &ProductRef) -> ReconResult<Price> {
        match self.get(product.kind, &product.id) {
            Some(item) if item.active => Ok(item.price),
            _ => Err(ReconError::NotFound(format!(
                "Product not found: {}",
                product
            ))),
        }
    }

    /// Load catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(CatalogItem {
            kind: ProductKind::Course,
            id: "anatomy-101".to_string(),
            title: "Anatomy 101".to_string(),
            price: Price::new(499.0, Currency::INR),
            active: true,
        });
        catalog.add(CatalogItem {
            kind: ProductKind::Qbank,
            id: "neet-qbank".to_string(),
            title: "NEET QBank".to_string(),
            price: Price::new(299.0, Currency::INR),
            active: false,
        });
        catalog
    }

    #[test]
    fn test_exactly_one_product_ref() {
        let r = ProductRef::from_parts(Some("c1".into()), None, None, None).unwrap();
        assert_eq!(r.kind, ProductKind::Course);
        assert_eq!(r.id, "c1");

        let none = ProductRef::from_parts(None, None, None, None);
        assert!(matches!(none, Err(ReconError::Validation(_))));

        let two = ProductRef::from_parts(Some("c1".into()), None, Some("q1".into()), None);
        assert!(matches!(two, Err(ReconError::Validation(_))));
    }

    #[test]
    fn test_price_lookup() {
        let catalog = catalog();
        let price = catalog
            .price_of(&ProductRef::new(ProductKind::Course, "anatomy-101"))
            .unwrap();
        assert_eq!(price.as_decimal(), 499.0);
    }

    #[test]
    fn test_inactive_product_is_not_found() {
        let catalog = catalog();
        let result = catalog.price_of(&ProductRef::new(ProductKind::Qbank, "neet-qbank"));
        assert!(matches!(result, Err(ReconError::NotFound(_))));
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml_str = r#"
            [[items]]
            kind = "course"
            id = "anatomy-101"
            title = "Anatomy 101"
            price = { amount_minor = 49900, currency = "INR" }
        "#;
        let catalog = Catalog::from_toml(toml_str).unwrap();
        assert_eq!(catalog.items.len(), 1);
        assert_eq!(catalog.items[0].kind, ProductKind::Course);
    }
}
