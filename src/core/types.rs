use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Width of a rendered attribute value, e.g. `000000002`.
pub const ATTRIBUTE_VALUE_WIDTH: usize = 9;

/// Name of a simulated service, e.g. `service-0003`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);

impl ServiceName {
    /// Name of the simulated service at `index`.
    pub fn for_index(index: usize) -> Self {
        ServiceName(format!("service-{index:04}"))
    }

    /// Returns the string representation of the service name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One configured attribute dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute key attached to every sample
    pub name: String,
    /// Number of distinct values, never below 1
    #[serde(default = "one", deserialize_with = "deserialize_at_least_one")]
    pub cardinality: usize,
}

impl AttributeDefinition {
    /// Creates a definition, clamping the cardinality to at least 1.
    pub fn new(name: impl Into<String>, cardinality: usize) -> Self {
        Self {
            name: name.into(),
            cardinality: cardinality.max(1),
        }
    }
}

/// A single `name=value` assignment inside a combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePair {
    /// Attribute key
    pub name: String,
    /// Zero-padded decimal value
    pub value: String,
}

impl AttributePair {
    pub fn new(name: impl Into<String>, value: usize) -> Self {
        Self {
            name: name.into(),
            value: format!("{value:0width$}", width = ATTRIBUTE_VALUE_WIDTH),
        }
    }
}

impl fmt::Display for AttributePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// One value per attribute definition, in definition order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttributeCombination {
    pairs: Vec<AttributePair>,
}

impl AttributeCombination {
    pub fn new(pairs: Vec<AttributePair>) -> Self {
        Self { pairs }
    }

    /// Combination carrying no attributes at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn pairs(&self) -> &[AttributePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value assigned to `name`, if the combination has it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.name == name)
            .map(|pair| pair.value.as_str())
    }
}

impl fmt::Display for AttributeCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{pair}")?;
        }
        write!(f, "]")
    }
}

fn one() -> usize {
    1
}

/// Reads any integer and clamps it to `>= 1`; negative and zero become 1.
pub(crate) fn deserialize_at_least_one<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = i64::deserialize(deserializer)?.max(1);
    T::try_from(raw).map_err(|_| D::Error::custom(format!("value {raw} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_for_index() {
        assert_eq!(ServiceName::for_index(0).as_str(), "service-0000");
        assert_eq!(ServiceName::for_index(42).as_str(), "service-0042");
        assert_eq!(ServiceName::for_index(12345).as_str(), "service-12345");
    }

    #[test]
    fn test_attribute_value_is_zero_padded() {
        assert_eq!(AttributePair::new("zone", 2).value, "000000002");
        assert_eq!(AttributePair::new("zone", 123_456_789).value, "123456789");
    }

    #[test]
    fn test_definition_clamps_cardinality() {
        assert_eq!(AttributeDefinition::new("a", 0).cardinality, 1);
        assert_eq!(AttributeDefinition::new("a", 7).cardinality, 7);
    }

    #[test]
    fn test_definition_deserialize_clamps() {
        let defs: Vec<AttributeDefinition> = serde_yaml::from_str(
            "- {name: a, cardinality: -4}\n- {name: b, cardinality: 0}\n- {name: c}\n- {name: d, cardinality: 3}",
        )
        .unwrap();
        let cards: Vec<usize> = defs.iter().map(|d| d.cardinality).collect();
        assert_eq!(cards, vec![1, 1, 1, 3]);
    }

    #[test]
    fn test_combination_display_and_lookup() {
        let combo = AttributeCombination::new(vec![
            AttributePair::new("one", 0),
            AttributePair::new("two", 1),
        ]);
        assert_eq!(combo.to_string(), "[one=000000000,two=000000001]");
        assert_eq!(combo.get("two"), Some("000000001"));
        assert_eq!(combo.get("three"), None);
        assert_eq!(combo.len(), 2);
        assert!(AttributeCombination::empty().is_empty());
    }
}
