//! Command translator: turns track calls into validated canonical hits.
//!
//! Every builder here either returns hits ready for an adaptor or a
//! `Validation` error, in which case nothing of the call is dispatched.

use ga_bridge_core::{BridgeError, BridgeResult, FieldMap, FieldValue, HitType, Settings};

use crate::adaptors::Protocol;
use crate::custom_data::custom_data;
use crate::events::{ExceptionReport, HitDescriptor, Transaction};
use crate::host::PageLocation;

const DEFAULT_EVENT_CATEGORY: &str = "Event";
const EXCEPTION_CATEGORY: &str = "Exceptions";
const ENHANCED_ECOMMERCE_CATEGORY: &str = "Enhanced Ecommerce";
const ENHANCED_ECOMMERCE_ACTION: &str = "Purchase";
const REQUIRED_TIMING_FIELDS: [&str; 3] = ["timingCategory", "timingVar", "timingValue"];

fn present<'a>(properties: &'a FieldMap, key: &str) -> Option<&'a FieldValue> {
    properties.get(key).filter(|v| !v.is_null())
}

/// `properties.page`, falling back to the host's current location.
fn page_of(properties: &FieldMap, location: &PageLocation) -> FieldValue {
    match properties.get("page") {
        Some(page) if page.is_truthy() => page.clone(),
        _ => location.current_page().into(),
    }
}

pub fn pageview_hit(path: &str, properties: &FieldMap) -> HitDescriptor {
    let mut hit = HitDescriptor::with_fields(HitType::Pageview, custom_data(properties));
    hit.set("page", path);
    hit
}

pub fn event_hit(
    action: &str,
    properties: &FieldMap,
    location: &PageLocation,
) -> BridgeResult<HitDescriptor> {
    if action.is_empty() {
        return Err(BridgeError::Validation(
            "missing required argument action".into(),
        ));
    }

    let category = match properties.get("category") {
        Some(category) if category.is_truthy() => category.clone(),
        _ => DEFAULT_EVENT_CATEGORY.into(),
    };
    let non_interaction = present(properties, "nonInteraction")
        .or_else(|| present(properties, "noninteraction"))
        .cloned();

    let mut hit = HitDescriptor::with_fields(HitType::Event, custom_data(properties));
    hit.set("eventCategory", category);
    hit.set("eventAction", action);
    hit.set("eventLabel", present(properties, "label").cloned());
    if let Some(value) = properties.get("value") {
        hit.set("eventValue", value.to_integer());
    }
    hit.set("nonInteraction", non_interaction);
    hit.set("page", page_of(properties, location));
    match properties.get("hitCallback") {
        Some(FieldValue::Callback(callback)) => hit.set("hitCallback", callback.clone()),
        Some(_) => {
            hit.fields.insert("hitCallback".into(), FieldValue::Null);
        }
        None => {}
    }
    Ok(hit)
}

pub fn exception_hit(error: &ExceptionReport, location: &PageLocation) -> HitDescriptor {
    let mut hit = HitDescriptor::new(HitType::Exception);
    hit.set("eventCategory", EXCEPTION_CATEGORY);
    hit.set("eventAction", error.message.as_str());
    hit.set("eventLabel", error.stack.clone());
    hit.set("nonInteraction", true);
    hit.set("page", location.current_page());
    hit
}

pub fn user_properties_hit(properties: &FieldMap) -> HitDescriptor {
    HitDescriptor::with_fields(HitType::SetUserProperties, custom_data(properties))
}

pub fn timing_hit(properties: &FieldMap, location: &PageLocation) -> BridgeResult<HitDescriptor> {
    if let Some(missing) = REQUIRED_TIMING_FIELDS
        .iter()
        .find(|key| present(properties, key).is_none())
    {
        return Err(BridgeError::Validation(format!(
            "timing properties missing required property {missing}"
        )));
    }

    let mut hit = HitDescriptor::new(HitType::Timing);
    for key in REQUIRED_TIMING_FIELDS
        .iter()
        .chain(&["timingLabel", "optSampleRate"])
    {
        hit.set(key, present(properties, key).cloned());
    }
    hit.set("page", page_of(properties, location));
    Ok(hit)
}

/// The full ecommerce sequence for one transaction: require, the
/// transaction itself, one item per product, then send.
pub fn transaction_hits(transaction: &Transaction) -> BridgeResult<Vec<HitDescriptor>> {
    let transaction_id = transaction
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BridgeError::Validation("transaction is missing an id".into()))?;

    let mut hits = Vec::with_capacity(transaction.products.len() + 3);
    hits.push(HitDescriptor::new(HitType::EcommerceRequire));
    hits.push(HitDescriptor::with_fields(
        HitType::EcommerceAddTransaction,
        transaction.fields(),
    ));
    for product in &transaction.products {
        let mut item = HitDescriptor::with_fields(HitType::EcommerceAddItem, product.fields());
        item.set("transactionId", transaction_id);
        hits.push(item);
    }
    let mut send = HitDescriptor::with_fields(
        HitType::EcommerceSend,
        transaction.custom_dimensions_metrics.clone(),
    );
    send.set("currencyCode", transaction.currency_code.clone());
    hits.push(send);
    Ok(hits)
}

/// Final protocol-specific rewrite before an adaptor renders the hit.
///
/// The enhanced ecommerce plugin has no send command of its own: its data
/// travels with the next ordinary hit, so the send step becomes a
/// non-interactive event carrying the transaction's custom data.
pub fn resolve_for(
    protocol: Protocol,
    hit: HitDescriptor,
    settings: &Settings,
    location: &PageLocation,
) -> HitDescriptor {
    match (protocol, hit.hit_type) {
        (Protocol::Modern, HitType::EcommerceSend) if settings.enhanced_ecommerce => {
            let mut event = HitDescriptor::with_fields(HitType::Event, custom_data(&hit.fields));
            event.set("eventCategory", ENHANCED_ECOMMERCE_CATEGORY);
            event.set("eventAction", ENHANCED_ECOMMERCE_ACTION);
            event.set("nonInteraction", true);
            event.set("page", location.current_page());
            event
        }
        _ => hit,
    }
}
