//! Value Objects for the storefront

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a shopper, seller or admin as issued by the auth provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role { Buyer, Seller, Admin }

/// The authenticated caller of a service operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self { Self { user_id, role } }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
    pub fn can_sell(&self) -> bool { matches!(self.role, Role::Seller | Role::Admin) }
}

/// Options picked for a cart line (size, colour, engraving...).
///
/// Stored as key-sorted string pairs, so two selections are equal regardless
/// of the order the client sent the keys in. Scalar JSON values are
/// normalized to strings; nested values are rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SelectedOptions(BTreeMap<String, String>);

impl SelectedOptions {
    pub fn new() -> Self { Self::default() }
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl<'de> Deserialize<'de> for SelectedOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => Ok((key, s)),
                serde_json::Value::Number(n) => Ok((key, n.to_string())),
                serde_json::Value::Bool(b) => Ok((key, b.to_string())),
                other => Err(de::Error::custom(format!("option `{key}` must be a string, number or boolean, got {other}"))),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}
