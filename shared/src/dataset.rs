use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::layer::{Datum, Layer, LayerData};
use crate::topology::{LocationId, Topology, parse_location_id};

/// One `{location_id, value}` row of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    #[serde(deserialize_with = "location_id")]
    pub location_id: LocationId,
    #[serde(default, deserialize_with = "loose_number")]
    pub value: Option<f64>,
}

fn location_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LocationId, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    parse_location_id(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid location_id: {raw}")))
}

/// Numbers or numeric strings; anything else reads as "no value".
fn loose_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Parse a JSON array of dataset records.
pub fn parse_dataset(text: &str) -> Result<Vec<DataRecord>, String> {
    serde_json::from_str(text).map_err(|e| format!("parse error: {e}"))
}

/// One layer per administrative level `admin0..admin{detail-1}` plus the
/// deepest level's disputes group (keyed `disputes`). Levels missing from
/// the topology are skipped.
pub fn create_layers(topology: &Topology, dataset: &[DataRecord], detail: usize) -> Vec<Layer> {
    if detail == 0 {
        return Vec::new();
    }

    let mut data = LayerData::with_capacity(dataset.len());
    let mut extent: Option<[f64; 2]> = None;
    for record in dataset {
        data.insert(
            record.location_id,
            Datum {
                value: record.value,
                color: None,
            },
        );
        if let Some(v) = record.value.filter(|v| v.is_finite()) {
            extent = Some(match extent {
                Some([lo, hi]) => [lo.min(v), hi.max(v)],
                None => [v, v],
            });
        }
    }

    let groups = (0..detail)
        .map(|level| format!("admin{level}"))
        .chain(std::iter::once(format!("admin{}_disputes", detail - 1)));

    groups
        .filter(|group| topology.object(group).is_some())
        .map(|group| {
            let key = if group.contains("disputes") {
                "disputes".to_string()
            } else {
                group.clone()
            };
            let mut layer = Layer::new(key, group).with_data(data.clone());
            layer.extent = extent;
            layer
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::tests::THREE_SQUARES;

    #[test]
    fn parses_loose_records() {
        let records = parse_dataset(
            r#"[{"location_id": 1, "value": 10}, {"location_id": "2", "value": "20.5"},
                {"location_id": 3, "value": null}, {"location_id": 4}]"#,
        )
        .expect("dataset parses");
        let values: Vec<(LocationId, Option<f64>)> =
            records.iter().map(|r| (r.location_id, r.value)).collect();
        assert_eq!(
            values,
            vec![(1, Some(10.0)), (2, Some(20.5)), (3, None), (4, None)]
        );
    }

    #[test]
    fn rejects_records_without_location() {
        let err = parse_dataset(r#"[{"location_id": "abc", "value": 1}]"#).expect_err("should fail");
        assert!(err.starts_with("parse error:"));
    }

    #[test]
    fn creates_layers_for_present_levels() {
        let topology = Topology::from_json(THREE_SQUARES).expect("fixture parses");
        let dataset = [
            DataRecord {
                location_id: 1,
                value: Some(10.0),
            },
            DataRecord {
                location_id: 2,
                value: Some(20.0),
            },
        ];
        let layers = create_layers(&topology, &dataset, 2);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].key, "admin0");
        assert_eq!(layers[0].extent, Some([10.0, 20.0]));
        assert_eq!(layers[0].data.get(&2).and_then(|d| d.value), Some(20.0));
        assert!(create_layers(&topology, &dataset, 0).is_empty());
    }
}
