//! Custom dimension and metric extraction.

use ga_bridge_core::FieldMap;

const DIMENSION_PREFIX: &str = "dimension";
const METRIC_PREFIX: &str = "metric";

/// Whether a property key addresses a custom dimension or metric slot.
///
/// Plain prefix match: `dimensionFoo` qualifies just like `dimension3`.
pub fn is_custom_key(key: &str) -> bool {
    key.starts_with(DIMENSION_PREFIX) || key.starts_with(METRIC_PREFIX)
}

/// New map holding only the custom dimension/metric entries of `properties`.
pub fn custom_data(properties: &FieldMap) -> FieldMap {
    properties
        .iter()
        .filter(|(key, _)| is_custom_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
