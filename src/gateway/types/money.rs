//! Money input type for API boundary enforcement

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money;

/// Amount accepted from clients, already validated by
/// [`money::parse_amount`]: positive, whole Toman, within range.
///
/// Accepts a JSON string (`"80000"`) or a JSON integer (`80000`). JSON
/// floats are refused so `1e5` or `100.5` never sneak through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictAmount(Decimal);

impl StrictAmount {
    pub fn inner(self) -> Decimal {
        self.0
    }
}

impl<'de> Deserialize<'de> for StrictAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum AmountOrString {
            Integer(i64),
            String(String),
        }

        let raw = match AmountOrString::deserialize(deserializer)? {
            AmountOrString::Integer(n) => n.to_string(),
            AmountOrString::String(s) => {
                if s.contains(['e', 'E', '+']) {
                    return Err(D::Error::custom(format!("Invalid amount format: {}", s)));
                }
                s
            }
        };
        money::parse_amount(&raw)
            .map(StrictAmount)
            .map_err(|e| D::Error::custom(e.to_string()))
    }
}

impl Serialize for StrictAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}
