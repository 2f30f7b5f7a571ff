use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One summary field value: prose or a list of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Text(String),
    Items(Vec<String>),
}

/// A structured meeting summary.
///
/// The field set is determined at processing time by the resolved prompt
/// schema, so this is a map-backed record rather than a fixed struct. Field
/// order follows schema order and survives serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingSummary {
    fields: Vec<(String, SummaryValue)>,
}

impl MeetingSummary {
    pub fn new(fields: Vec<(String, SummaryValue)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, SummaryValue)] {
        &self.fields
    }

    pub fn get(&self, category: &str) -> Option<&SummaryValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> String {
        // Serialization below is infallible for string/list values.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

// Serialized as a JSON object in field order. serde_json's default Map would
// reorder keys alphabetically, which would scramble the schema order.
impl Serialize for MeetingSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MeetingSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;

        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = MeetingSummary;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a map of summary fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, SummaryValue>()? {
                    fields.push((name, value));
                }
                Ok(MeetingSummary::new(fields))
            }
        }

        deserializer.deserialize_map(FieldVisitor)
    }
}
