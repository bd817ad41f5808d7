//! Deep merge of option value trees

use serde_json::{Map, Value};

/// Deep merge `overlay` into `base`.
///
/// Objects merge key by key with `overlay` winning on conflicts. Arrays and
/// scalars from `overlay` replace the value in `base` wholesale. Values taken
/// from `overlay` are cloned, so `base` never shares structure with it.
pub fn merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_maps(base_map, overlay_map);
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Deep merge every key of `overlay` into `base`.
pub fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, overlay_value) in overlay {
        match base.get_mut(key) {
            Some(base_value) => merge_value(base_value, overlay_value),
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

/// Merge `overlay` into an optional accumulator, starting it if empty.
pub fn merge_into(accumulator: &mut Option<Value>, overlay: &Value) {
    match accumulator {
        Some(existing) => merge_value(existing, overlay),
        None => *accumulator = Some(overlay.clone()),
    }
}
