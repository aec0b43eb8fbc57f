use serde::{Deserialize, Deserializer};

/// Decodes JSON `null` as the type's zero value, matching how the upstream's
/// own clients treat missing data.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
