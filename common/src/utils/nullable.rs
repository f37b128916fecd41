//! Serde helpers for JSON `null` in request bodies.

use serde::{Deserialize, Deserializer};

/// Reads `null` as the type's default, so a required text field sent as
/// `null` fails validation like an empty one.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tells an explicit `null` (`Some(None)`) from an absent field (`None`,
/// via `#[serde(default)]`).
pub fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
