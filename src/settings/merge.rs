//! Field-by-field merging of settings documents.

use serde_json::Value;

/// Lay one settings tier over the tiers below it.
///
/// A tier only has to name the fields it changes: a project file holding
/// `repository: { kind: database }` keeps the default table name and paths.
/// A blank settings file reads as null and leaves the lower tiers intact, as
/// does an explicit `~` for a single field. Lists and scalars from the higher
/// tier replace the lower value outright. Keys keep the position they had in
/// the lowest tier that named them.
///
/// ```
/// use serde_json::json;
/// use cfgstore::settings::deep_merge;
///
/// let defaults = json!({"repository": {"kind": "file", "table": "config"}});
/// let project = json!({"repository": {"kind": "database"}});
/// assert_eq!(
///     deep_merge(defaults, project),
///     json!({"repository": {"kind": "database", "table": "config"}})
/// );
/// ```
pub fn deep_merge(lower: Value, upper: Value) -> Value {
    match (lower, upper) {
        (Value::Object(mut fields), Value::Object(upper)) => {
            for (key, value) in upper {
                match fields.get_mut(&key) {
                    Some(slot) => *slot = deep_merge(slot.take(), value),
                    None => {
                        fields.insert(key, value);
                    }
                }
            }
            Value::Object(fields)
        }
        (lower, Value::Null) => lower,
        (_, upper) => upper,
    }
}

/// Merge settings tiers from lowest (compiled defaults) to highest.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}
