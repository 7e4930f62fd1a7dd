use serde::{Deserialize, Serialize};

use crate::topology::{FeatureProperties, LocationId};

/// Ordered set of selected location ids. Replaced wholesale by [`select`](Self::select).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionModel {
    ids: Vec<LocationId>,
}

impl SelectionModel {
    pub fn new(ids: impl IntoIterator<Item = LocationId>) -> Self {
        let mut model = Self::default();
        model.select(ids);
        model
    }

    /// Replace the selection. Duplicates are dropped, first occurrence wins.
    pub fn select(&mut self, ids: impl IntoIterator<Item = LocationId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn ids(&self) -> &[LocationId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.ids.contains(&id)
    }

    /// Whether a feature with own location `location` and claimants
    /// `disputes` counts as selected.
    pub fn is_selected(&self, location: Option<LocationId>, disputes: &[LocationId]) -> bool {
        if location.is_none() && disputes.is_empty() {
            return false;
        }
        let own = location.is_some_and(|id| self.contains(id));
        if disputes.is_empty() {
            return own;
        }

        let disputes_intersect = disputes.iter().any(|id| self.contains(*id));
        match location {
            None if disputes_intersect => true,
            Some(id) if disputes_intersect && disputes.contains(&id) => true,
            _ if disputes_intersect && !own => true,
            _ => own,
        }
    }

    /// `key_field` names the property holding the feature's location id.
    pub fn is_feature_selected(&self, properties: &FeatureProperties, key_field: &str) -> bool {
        self.is_selected(properties.id_for(key_field), &properties.disputes)
    }
}

/// Normalize loosely typed ids (form values, query strings) to location ids.
/// Entries that are not numeric are skipped.
pub fn parse_selection<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<LocationId> {
    raw.into_iter()
        .filter_map(|s| crate::topology::parse_location_id(&serde_json::Value::from(s)))
        .collect()
}
