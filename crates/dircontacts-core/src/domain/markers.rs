//! Marker tags on contacts and groups
//!
//! The store keeps opaque key/value pairs on every contact and group.
//! [`Markers`] is that tag set; [`MarkerScheme`] knows which keys and
//! values this system writes and answers the provenance, renamed and
//! managed-group questions from them.

use std::collections::BTreeMap;

use super::newtypes::EmployeeId;
use crate::config::MarkersConfig;

/// Key/value tag set as stored on a contact or group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers(BTreeMap<String, String>);

impl Markers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn has(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Markers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The marker names and values this system reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerScheme {
    contact_id_name: String,
    source_name: String,
    source_value: String,
    renamed_name: String,
    renamed_value: String,
    group_name: String,
    group_value: String,
}

impl MarkerScheme {
    #[must_use]
    pub fn from_config(config: &MarkersConfig) -> Self {
        Self {
            contact_id_name: config.contact_id_name.clone(),
            source_name: config.contact_source_name.clone(),
            source_value: config.contact_source_value.clone(),
            renamed_name: config.contact_renamed_name.clone(),
            renamed_value: config.contact_renamed_value.clone(),
            group_name: config.group_name.clone(),
            group_value: config.group_value.clone(),
        }
    }

    /// Contact carries the provenance marker.
    #[must_use]
    pub fn is_managed(&self, markers: &Markers) -> bool {
        markers.has(&self.source_name, &self.source_value)
    }

    /// Contact is in the renamed (soft-deleted) state.
    #[must_use]
    pub fn is_renamed(&self, markers: &Markers) -> bool {
        markers.has(&self.renamed_name, &self.renamed_value)
    }

    /// Group is the managed group.
    #[must_use]
    pub fn is_managed_group(&self, markers: &Markers) -> bool {
        markers.has(&self.group_name, &self.group_value)
    }

    /// The employee identifier recorded on a contact, if any.
    #[must_use]
    pub fn employee_id<'a>(&self, markers: &'a Markers) -> Option<&'a str> {
        markers.get(&self.contact_id_name).filter(|id| !id.is_empty())
    }

    /// Tag a new contact with provenance and its identifier.
    pub fn tag_managed(&self, markers: &mut Markers, id: &EmployeeId) {
        markers.insert(&self.contact_id_name, id.as_str());
        markers.insert(&self.source_name, &self.source_value);
    }

    pub fn tag_renamed(&self, markers: &mut Markers) {
        markers.insert(&self.renamed_name, &self.renamed_value);
    }

    pub fn untag_renamed(&self, markers: &mut Markers) {
        markers.remove(&self.renamed_name);
    }

    /// Tags for a newly created managed group.
    #[must_use]
    pub fn group_markers(&self) -> Markers {
        std::iter::once((self.group_name.clone(), self.group_value.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> MarkerScheme {
        MarkerScheme::from_config(&MarkersConfig::default())
    }

    #[test]
    fn test_tag_managed_sets_provenance_and_id() {
        let scheme = scheme();
        let mut markers = Markers::new();
        assert!(!scheme.is_managed(&markers));

        scheme.tag_managed(&mut markers, &EmployeeId::new("E1").unwrap());
        assert!(scheme.is_managed(&markers));
        assert_eq!(scheme.employee_id(&markers), Some("E1"));
    }

    #[test]
    fn test_provenance_requires_matching_value() {
        let scheme = scheme();
        let cfg = MarkersConfig::default();
        let markers: Markers = [(cfg.contact_source_name, "someone-else")].into_iter().collect();
        assert!(!scheme.is_managed(&markers));
    }

    #[test]
    fn test_renamed_roundtrip() {
        let scheme = scheme();
        let mut markers = Markers::new();
        scheme.tag_renamed(&mut markers);
        assert!(scheme.is_renamed(&markers));
        scheme.untag_renamed(&mut markers);
        assert!(!scheme.is_renamed(&markers));
        assert!(markers.is_empty());
    }

    #[test]
    fn test_group_markers_identify_managed_group() {
        let scheme = scheme();
        assert!(scheme.is_managed_group(&scheme.group_markers()));
        assert!(!scheme.is_managed_group(&Markers::new()));
    }
}
