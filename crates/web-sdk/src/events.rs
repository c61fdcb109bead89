//! Canonical hit types: the backend-agnostic shape of pageviews, events,
//! exceptions, timings and ecommerce transactions before any protocol
//! adaptor sees them.

use ga_bridge_core::{FieldMap, FieldValue, HitType};
use serde::{Deserialize, Serialize};

use crate::custom_data::{custom_data, is_custom_key};

/// One outgoing hit in canonical form. Field keys use the modern protocol's
/// field names (`eventCategory`, `timingVar`, `page`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct HitDescriptor {
    pub hit_type: HitType,
    pub fields: FieldMap,
}

impl HitDescriptor {
    pub fn new(hit_type: HitType) -> Self {
        Self {
            hit_type,
            fields: FieldMap::new(),
        }
    }

    pub fn with_fields(hit_type: HitType, fields: FieldMap) -> Self {
        Self { hit_type, fields }
    }

    /// Set a field; `None` leaves the field absent.
    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        if value.is_null() {
            self.fields.remove(key);
        } else {
            self.fields.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Field value or `Null` when absent, for positional argument lists.
    pub fn positional(&self, key: &str) -> FieldValue {
        self.fields.get(key).cloned().unwrap_or_default()
    }
}

/// An error being reported as an exception hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionReport {
    pub message: String,
    pub stack: Option<String>,
}

impl ExceptionReport {
    pub fn new(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            message: message.into(),
            stack,
        }
    }

    /// Message from `Display`; stack from the error's source chain, one
    /// message per line starting with the error itself.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let stack = std::iter::successors(Some(err), |e| e.source())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            message: err.to_string(),
            stack: Some(stack),
        }
    }
}

/// A purchase with its line items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub id: Option<String>,
    pub affiliation: Option<String>,
    pub revenue: Option<FieldValue>,
    pub tax: Option<FieldValue>,
    pub shipping: Option<FieldValue>,
    pub coupon: Option<String>,
    pub currency_code: Option<String>,
    pub billing_city: Option<String>,
    pub billing_region: Option<String>,
    pub billing_country: Option<String>,
    pub custom_dimensions_metrics: FieldMap,
    /// Any other key the host supplied, passed through untouched.
    pub extra: FieldMap,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<FieldValue>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub variant: Option<String>,
    pub quantity: Option<FieldValue>,
    pub coupon: Option<String>,
    pub currency_code: Option<String>,
    pub custom_dimensions_metrics: FieldMap,
    pub extra: FieldMap,
}

const TRANSACTION_KEYS: [&str; 11] = [
    "id",
    "affiliation",
    "revenue",
    "tax",
    "shipping",
    "coupon",
    "currencyCode",
    "billingCity",
    "billingRegion",
    "billingCountry",
    "products",
];

const PRODUCT_KEYS: [&str; 9] = [
    "id",
    "name",
    "price",
    "brand",
    "category",
    "variant",
    "quantity",
    "coupon",
    "currencyCode",
];

/// Entries that are neither a named field nor custom data.
fn extra(fields: &FieldMap, known: &[&str]) -> FieldMap {
    fields
        .iter()
        .filter(|(key, value)| {
            !value.is_null() && !known.contains(&key.as_str()) && !is_custom_key(key)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn text(fields: &FieldMap, key: &str) -> Option<String> {
    fields.get(key).and_then(FieldValue::to_text)
}

fn value(fields: &FieldMap, key: &str) -> Option<FieldValue> {
    fields.get(key).filter(|v| !v.is_null()).cloned()
}

fn put(fields: &mut FieldMap, key: &str, value: Option<impl Into<FieldValue>>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), value.into());
    }
}

impl Transaction {
    /// Build from a loose property bag as handed over by the host. Custom
    /// dimensions and metrics are picked out of the same bag.
    pub fn from_fields(fields: &FieldMap) -> Self {
        let products = match fields.get("products") {
            Some(FieldValue::List(items)) => items
                .iter()
                .filter_map(FieldValue::as_map)
                .map(Product::from_fields)
                .collect(),
            _ => Vec::new(),
        };
        Self {
            id: text(fields, "id"),
            affiliation: text(fields, "affiliation"),
            revenue: value(fields, "revenue"),
            tax: value(fields, "tax"),
            shipping: value(fields, "shipping"),
            coupon: text(fields, "coupon"),
            currency_code: text(fields, "currencyCode"),
            billing_city: text(fields, "billingCity"),
            billing_region: text(fields, "billingRegion"),
            billing_country: text(fields, "billingCountry"),
            custom_dimensions_metrics: custom_data(fields),
            extra: extra(fields, &TRANSACTION_KEYS),
            products,
        }
    }

    /// Transaction-level field bag: passthrough entries, custom data, then
    /// the named fields.
    pub fn fields(&self) -> FieldMap {
        let mut fields = self.extra.clone();
        fields.extend(self.custom_dimensions_metrics.clone());
        put(&mut fields, "id", self.id.clone());
        put(&mut fields, "affiliation", self.affiliation.clone());
        put(&mut fields, "revenue", self.revenue.clone());
        put(&mut fields, "tax", self.tax.clone());
        put(&mut fields, "shipping", self.shipping.clone());
        put(&mut fields, "coupon", self.coupon.clone());
        put(&mut fields, "currencyCode", self.currency_code.clone());
        put(&mut fields, "billingCity", self.billing_city.clone());
        put(&mut fields, "billingRegion", self.billing_region.clone());
        put(&mut fields, "billingCountry", self.billing_country.clone());
        fields
    }
}

impl Product {
    pub fn from_fields(fields: &FieldMap) -> Self {
        Self {
            id: text(fields, "id"),
            name: text(fields, "name"),
            price: value(fields, "price"),
            brand: text(fields, "brand"),
            category: text(fields, "category"),
            variant: text(fields, "variant"),
            quantity: value(fields, "quantity"),
            coupon: text(fields, "coupon"),
            currency_code: text(fields, "currencyCode"),
            custom_dimensions_metrics: custom_data(fields),
            extra: extra(fields, &PRODUCT_KEYS),
        }
    }

    pub fn fields(&self) -> FieldMap {
        let mut fields = self.extra.clone();
        fields.extend(self.custom_dimensions_metrics.clone());
        put(&mut fields, "id", self.id.clone());
        put(&mut fields, "name", self.name.clone());
        put(&mut fields, "price", self.price.clone());
        put(&mut fields, "brand", self.brand.clone());
        put(&mut fields, "category", self.category.clone());
        put(&mut fields, "variant", self.variant.clone());
        put(&mut fields, "quantity", self.quantity.clone());
        put(&mut fields, "coupon", self.coupon.clone());
        put(&mut fields, "currencyCode", self.currency_code.clone());
        fields
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> FieldMap {
        match FieldValue::from(value) {
            FieldValue::Map(m) => m,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn test_transaction_from_fields() {
        let tx = Transaction::from_fields(&bag(json!({
            "id": "T-1",
            "revenue": "35.43",
            "tax": "4.90",
            "shipping": 5.99,
            "currencyCode": "BRL",
            "dimension10": "Card ID #1234",
            "metric1": 1,
            "region": "BRL",
            "products": [{
                "id": "12345",
                "name": "Triblend Android T-Shirt",
                "price": "15.25",
                "quantity": 1,
                "dimension2": "Clearance"
            }]
        })));

        assert_eq!(tx.id.as_deref(), Some("T-1"));
        assert_eq!(tx.revenue, Some(FieldValue::from("35.43")));
        assert_eq!(tx.shipping, Some(FieldValue::from(5.99)));
        assert_eq!(tx.currency_code.as_deref(), Some("BRL"));
        assert_eq!(tx.custom_dimensions_metrics.len(), 2);
        assert_eq!(tx.products.len(), 1);

        let product = &tx.products[0];
        assert_eq!(product.id.as_deref(), Some("12345"));
        assert_eq!(product.quantity, Some(FieldValue::Int(1)));
        assert_eq!(
            product.custom_dimensions_metrics.get("dimension2"),
            Some(&FieldValue::from("Clearance"))
        );
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let tx = Transaction::from_fields(&bag(json!({
            "id": "T-1",
            "region": "BRL",
            "dimension1": "gold",
            "note": null,
            "products": [{ "id": "p1", "size": "XL" }]
        })));

        assert_eq!(tx.extra.len(), 1);
        let fields = tx.fields();
        assert_eq!(fields.get("region"), Some(&FieldValue::from("BRL")));
        assert_eq!(fields.get("dimension1"), Some(&FieldValue::from("gold")));
        assert!(!fields.contains_key("products"));
        assert!(!fields.contains_key("note"));

        let item = tx.products[0].fields();
        assert_eq!(item.get("size"), Some(&FieldValue::from("XL")));
        assert_eq!(item.get("id"), Some(&FieldValue::from("p1")));
    }

    #[test]
    fn test_numeric_transaction_id_becomes_text() {
        let tx = Transaction::from_fields(&bag(json!({ "id": 1001 })));
        assert_eq!(tx.id.as_deref(), Some("1001"));
    }

    #[test]
    fn test_transaction_fields_skip_absent_values() {
        let tx = Transaction {
            id: Some("T-1".into()),
            revenue: Some("10.00".into()),
            ..Default::default()
        };
        let fields = tx.fields();
        assert_eq!(fields.len(), 2);
        assert!(!fields.contains_key("tax"));
    }

    #[test]
    fn test_descriptor_set_none_removes() {
        let mut hit = HitDescriptor::new(HitType::Event);
        hit.set("eventLabel", "baz");
        hit.set("eventLabel", None::<String>);
        assert!(hit.get("eventLabel").is_none());
        assert_eq!(hit.positional("eventLabel"), FieldValue::Null);
    }

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "checkout failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_exception_report_from_error_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let report = ExceptionReport::from_error(&err);
        assert_eq!(report.message, "checkout failed");
        assert_eq!(report.stack.as_deref(), Some("checkout failed\ndisk full"));
    }
}
