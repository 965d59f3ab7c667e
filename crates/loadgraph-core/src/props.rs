//! Component input properties.

use std::collections::BTreeMap;

use serde_json::Value;

/// External inputs handed to a declaration, keyed by name.
pub type Props = BTreeMap<String, Value>;

/// Overlay `computed` on top of `base`, returning a new map.
///
/// Keys present in both take the computed value. Neither input is modified.
pub fn merge(base: &Props, computed: &Props) -> Props {
    let mut merged = base.clone();
    merged.extend(computed.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Read `props[key][field]`, treating anything missing as `Null`.
pub fn field_of(props: &Props, key: &str, field: &str) -> Value {
    props
        .get(key)
        .and_then(|v| v.get(field))
        .cloned()
        .unwrap_or(Value::Null)
}
