use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::{ADDRESS_TYPE, RELATION_IN, RELATION_SAME_AS};
use crate::error::Result;
use crate::pipeline::processing::matcher::{MatchResult, MatchedAddress, UnmatchedAddress};
use crate::types::{Geometry, ValidityInterval};

/// Address entity emitted for a matched house number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressObject {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(flatten)]
    pub validity: ValidityInterval,
    /// The house number's data plus `houseNumberId` and `streetId` references.
    pub data: Map<String, Value>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// Per house number summary; `error` is set for unmatched ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub house_number_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    pub address_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u64>,
    pub geometry: Geometry,
}

/// Records handed to the graph writer, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "obj", rename_all = "lowercase")]
pub enum GraphRecord {
    Object(AddressObject),
    Relation(Relation),
    Log(LogEntry),
}

impl GraphRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphRecord::Object(_) => "object",
            GraphRecord::Relation(_) => "relation",
            GraphRecord::Log(_) => "log",
        }
    }
}

/// Expands match results into graph records. Pure; performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordTransformer;

impl RecordTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Matched => object, relation (in), relation (sameAs), log.
    /// Unmatched => log.
    pub fn expand(&self, result: MatchResult) -> Vec<GraphRecord> {
        match result {
            MatchResult::Matched(matched) => self.expand_matched(matched),
            MatchResult::Unmatched(unmatched) => vec![self.expand_unmatched(unmatched)],
        }
    }

    /// Expand one line of the matching stage's output. Lines carrying
    /// neither a `streetId` nor an `error` produce nothing.
    pub fn expand_value(&self, value: Value) -> Result<Vec<GraphRecord>> {
        let has_street = value.get("streetId").is_some_and(|v| !v.is_null());
        let has_error = value.get("error").is_some_and(|v| !v.is_null());
        if !has_street && !has_error {
            debug!("dropping inferred record without streetId or error");
            return Ok(Vec::new());
        }

        let result: MatchResult = if has_street {
            MatchResult::Matched(serde_json::from_value(value)?)
        } else {
            MatchResult::Unmatched(serde_json::from_value(value)?)
        };
        Ok(self.expand(result))
    }

    fn expand_matched(&self, matched: MatchedAddress) -> Vec<GraphRecord> {
        let mut data = matched.address_data.clone();
        data.insert(
            "houseNumberId".to_string(),
            Value::String(matched.house_number_id.clone()),
        );
        data.insert("streetId".to_string(), Value::String(matched.street_id.clone()));

        let object = AddressObject {
            id: matched.id.clone(),
            name: matched.name,
            object_type: ADDRESS_TYPE.to_string(),
            validity: matched.validity,
            data,
            geometry: matched.address_geometry.clone(),
        };

        let located_in = Relation {
            from: matched.house_number_id.clone(),
            to: matched.street_id.clone(),
            relation_type: RELATION_IN.to_string(),
        };

        let same_as = Relation {
            from: matched.id,
            to: matched.house_number_id.clone(),
            relation_type: RELATION_SAME_AS.to_string(),
        };

        let log = LogEntry {
            error: None,
            house_number_id: matched.house_number_id,
            street_id: Some(matched.street_id),
            street_name: Some(matched.street_name),
            address_data: matched.address_data,
            distance: Some(matched.distance),
            geometry: matched.address_geometry,
        };

        vec![
            GraphRecord::Object(object),
            GraphRecord::Relation(located_in),
            GraphRecord::Relation(same_as),
            GraphRecord::Log(log),
        ]
    }

    fn expand_unmatched(&self, unmatched: UnmatchedAddress) -> GraphRecord {
        GraphRecord::Log(LogEntry {
            error: Some(unmatched.error),
            house_number_id: unmatched.house_number_id,
            street_id: None,
            street_name: None,
            address_data: unmatched.address_data,
            distance: None,
            geometry: unmatched.address_geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matched() -> MatchResult {
        MatchResult::Matched(MatchedAddress {
            id: "A".to_string(),
            name: "10 Broadway".to_string(),
            house_number_id: "H".to_string(),
            street_id: "S".to_string(),
            validity: ValidityInterval::new("1920", "1925"),
            street_name: "Broadway".to_string(),
            address_data: json!({"number": "10"}).as_object().unwrap().clone(),
            distance: 5000,
            address_geometry: Geometry::Point { coordinates: [-74.0, 40.7] },
        })
    }

    fn unmatched() -> MatchResult {
        MatchResult::Unmatched(UnmatchedAddress {
            error: "Can't find street within 25 meters and 15 years".to_string(),
            house_number_id: "H".to_string(),
            address_data: Map::new(),
            address_geometry: Geometry::Point { coordinates: [-74.0, 40.7] },
        })
    }

    #[test]
    fn test_matched_expands_to_four_records_in_order() {
        let records = RecordTransformer::new().expand(matched());
        let kinds: Vec<&str> = records.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec!["object", "relation", "relation", "log"]);

        let GraphRecord::Object(object) = &records[0] else { panic!() };
        assert_eq!(object.id, "A");
        assert_eq!(object.object_type, "st:Address");
        assert_eq!(object.data.get("number"), Some(&json!("10")));
        assert_eq!(object.data.get("houseNumberId"), Some(&json!("H")));
        assert_eq!(object.data.get("streetId"), Some(&json!("S")));

        assert_eq!(
            records[1],
            GraphRecord::Relation(Relation {
                from: "H".to_string(),
                to: "S".to_string(),
                relation_type: "st:in".to_string(),
            })
        );
        assert_eq!(
            records[2],
            GraphRecord::Relation(Relation {
                from: "A".to_string(),
                to: "H".to_string(),
                relation_type: "st:sameAs".to_string(),
            })
        );

        let GraphRecord::Log(log) = &records[3] else { panic!() };
        assert_eq!(log.error, None);
        assert_eq!(log.distance, Some(5000));
        assert!(!log.address_data.contains_key("streetId"));
        assert!(!log.address_data.contains_key("houseNumberId"));
        assert_eq!(log.address_data.get("number"), Some(&json!("10")));
    }

    #[test]
    fn test_unmatched_expands_to_single_log() {
        let records = RecordTransformer::new().expand(unmatched());
        assert_eq!(records.len(), 1);
        let GraphRecord::Log(log) = &records[0] else { panic!() };
        assert!(log.error.as_deref().unwrap().contains("25 meters"));
        assert_eq!(log.street_id, None);
    }

    #[test]
    fn test_expand_value_drops_records_without_street_or_error() {
        let transformer = RecordTransformer::new();
        let records = transformer
            .expand_value(json!({"houseNumberId": "H", "addressData": {}}))
            .unwrap();
        assert!(records.is_empty());

        let encoded = serde_json::to_value(matched()).unwrap();
        assert_eq!(transformer.expand_value(encoded).unwrap().len(), 4);

        let encoded = serde_json::to_value(unmatched()).unwrap();
        assert_eq!(transformer.expand_value(encoded).unwrap().len(), 1);
    }

    #[test]
    fn test_graph_record_wire_shape() {
        let records = RecordTransformer::new().expand(matched());
        let relation = serde_json::to_value(&records[1]).unwrap();
        assert_eq!(
            relation,
            json!({"type": "relation", "obj": {"from": "H", "to": "S", "type": "st:in"}})
        );

        let object = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(object["type"], json!("object"));
        assert_eq!(object["obj"]["validUntil"], json!("1925"));
    }
}
