//! Serde support for tri-state patch fields.
//!
//! A nullable field in a patch has three states: absent (leave untouched),
//! `null` (clear) and a value (set). It is modeled as `Option<Option<T>>`
//! and must be declared with:
//!
//! ```ignore
//! #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::model::patch::nullable")]
//! ```

/// `with`-module for `Option<Option<T>>` patch fields.
pub mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
