// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::collections::BTreeMap;

use super::{max_confidence_name, KpfRecord};
use crate::adapter;
use crate::canonical::{CanonicalRecord, Schema};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::presence::Optional;

/// 轨迹类型标签记录 (`types`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Label {
    track_id: Optional<u64>,
    classification: BTreeMap<String, f64>,
}

impl Label {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_track_id(&self) -> bool {
        self.track_id.has()
    }
    pub fn get_track_id(&self) -> u64 {
        self.track_id.get()
    }
    pub fn set_track_id(&mut self, id: u64) {
        self.track_id.set(id);
    }
    pub fn remove_track_id(&mut self) {
        self.track_id.remove();
    }

    pub fn has_classification(&self) -> bool {
        !self.classification.is_empty()
    }
    pub fn get_classification(&self) -> &BTreeMap<String, f64> {
        &self.classification
    }
    pub fn get_classification_mut(&mut self) -> &mut BTreeMap<String, f64> {
        &mut self.classification
    }
    pub fn add_classification(&mut self, name: impl Into<String>, probability: f64) {
        self.classification.insert(name.into(), probability);
    }
    pub fn remove_classification(&mut self) {
        self.classification.clear();
    }

    /// 置信度最高的类型名, 并列时取名称排序最靠前的
    pub fn get_max_classification_name(&self) -> String {
        max_confidence_name(&self.classification)
    }
}

impl KpfRecord for Label {
    const SCHEMA: Schema = Schema::Types;

    fn validate(&self) -> Result<()> {
        if !self.has_track_id() {
            return Err(KpfError::invalid("types", "track id is not set"));
        }
        if !self.has_classification() {
            return Err(KpfError::invalid("types", "classification is empty"));
        }
        Ok(())
    }

    fn to_canonical(&self) -> CanonicalRecord {
        adapter::label::to_canonical(self)
    }

    fn from_canonical(rec: &CanonicalRecord, skipped: &mut Vec<UnsupportedDomain>) -> Result<Self> {
        adapter::label::from_canonical(rec, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_gate() {
        let mut label = Label::new();
        label.set_track_id(66);
        let mut buf = Vec::new();
        let err = label.write(&mut buf).unwrap_err();
        assert!(err.is_invalid());
        assert!(buf.is_empty());

        label.add_classification("Dumpster", 1.0);
        label.write(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "- { types: { id1: 66, cset3: { Dumpster: 1 } } }\n"
        );
    }

    #[test]
    fn test_missing_track_id_is_invalid() {
        let mut label = Label::new();
        label.add_classification("Vehicle", 1.0);
        assert!(!label.is_valid());
    }

    #[test]
    fn test_presence() {
        let mut label = Label::new();
        label.set_track_id(67);
        label.add_classification("Vehicle", 1.0);
        assert!(label.has_track_id() && label.has_classification());

        label.remove_classification();
        assert!(!label.has_classification());
        label.clear();
        assert!(!label.has_track_id());
    }

    #[test]
    fn test_round_trip() {
        let mut label = Label::new();
        label.set_track_id(7);
        label.add_classification("Person", 0.25);
        label.add_classification("Vehicle", 0.75);
        let text = label.to_kpf_string().unwrap();
        assert_eq!(Label::from_kpf_str(&text).unwrap(), label);
        assert_eq!(label.get_max_classification_name(), "Vehicle");
    }
}
