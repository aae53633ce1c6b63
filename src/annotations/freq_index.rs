//! Label-based lookup into per-group frequency arrays.
//!
//! Frequency arrays are ordered by the table metadata, not by convention. The
//! positions of the overall entry and of each ancestry group are read from
//! `freq_index_dict` (or derived from `freq_meta`) and every row is checked
//! against them before it is flattened.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{AnnotationError, ProjectedRecord};

/// Label → array position, as described by one metadata dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDictionary {
    name: String,
    entries: BTreeMap<String, usize>,
}

impl IndexDictionary {
    /// Read `<prefix>_index_dict`, falling back to `<prefix>_meta`, from the
    /// struct `globals[globals_field]`.
    pub fn from_globals(
        globals: &Value,
        globals_field: &str,
        prefix: &str,
    ) -> Result<Self, AnnotationError> {
        let scope = globals
            .get(globals_field)
            .ok_or_else(|| AnnotationError::MissingMetadata(globals_field.to_string()))?;

        let dict_field = format!("{prefix}_index_dict");
        if let Some(dict) = scope.get(&dict_field).and_then(string_map) {
            let entries = dict
                .into_iter()
                .filter_map(|(key, value)| {
                    let index = value.as_u64().and_then(|i| usize::try_from(i).ok())?;
                    Some((key, index))
                })
                .collect();
            return Ok(Self {
                name: format!("{globals_field}.{dict_field}"),
                entries,
            });
        }

        let meta_field = format!("{prefix}_meta");
        if let Some(meta) = scope.get(&meta_field).and_then(Value::as_array) {
            let entries = meta
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| meta_key(entry).map(|key| (key, index)))
                .collect();
            return Ok(Self {
                name: format!("{globals_field}.{meta_field}"),
                entries,
            });
        }

        Err(AnnotationError::MissingMetadata(format!(
            "{globals_field}.{prefix}"
        )))
    }

    /// Build a dictionary directly.
    pub fn from_entries<K: Into<String>>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, usize)>,
    ) -> Self {
        Self {
            name: name.into(),
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Position of `key`, failing when the metadata does not describe it.
    pub fn lookup(&self, key: &str) -> Result<usize, AnnotationError> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| AnnotationError::UnknownFrequencyKey {
                key: key.to_string(),
                dictionary: self.name.clone(),
                available: self.entries.keys().cloned().collect::<Vec<_>>().join(","),
            })
    }

    /// Number of described positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolved position of one ancestry group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestryIndex {
    /// Label used for column names, e.g. `afr`.
    pub label: String,
    /// Metadata key, e.g. `afr_adj`.
    pub key: String,
    /// Position in the frequency array.
    pub index: usize,
}

/// Resolved positions for the overall entry and each ancestry label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyIndex {
    overall: usize,
    overall_key: String,
    faf_overall: usize,
    ancestry: Vec<AncestryIndex>,
}

impl FrequencyIndex {
    /// Resolve `group` (e.g. `adj`) and `<label>_<group>` for every label.
    pub fn resolve(
        freq: &IndexDictionary,
        faf: &IndexDictionary,
        group: &str,
        labels: &[String],
    ) -> Result<Self, AnnotationError> {
        let overall = freq.lookup(group)?;
        let faf_overall = faf.lookup(group)?;
        let ancestry = labels
            .iter()
            .map(|label| {
                let key = format!("{label}_{group}");
                freq.lookup(&key).map(|index| AncestryIndex {
                    label: label.clone(),
                    key,
                    index,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            overall,
            overall_key: group.to_string(),
            faf_overall,
            ancestry,
        })
    }

    /// Resolve from table globals.
    pub fn from_globals(
        globals: &Value,
        globals_field: &str,
        group: &str,
        labels: &[String],
    ) -> Result<Self, AnnotationError> {
        let freq = IndexDictionary::from_globals(globals, globals_field, "freq")?;
        let faf = IndexDictionary::from_globals(globals, globals_field, "faf")?;
        Self::resolve(&freq, &faf, group, labels)
    }

    /// Position of the overall frequency entry.
    pub fn overall(&self) -> usize {
        self.overall
    }

    /// Position of the overall FAF entry.
    pub fn faf_overall(&self) -> usize {
        self.faf_overall
    }

    /// Ancestry positions in label order.
    pub fn ancestry(&self) -> &[AncestryIndex] {
        &self.ancestry
    }

    /// Fail when the row's joint arrays are shorter than the metadata claims.
    pub fn check_row(&self, record: &ProjectedRecord, row: usize) -> Result<(), AnnotationError> {
        let out_of_range = |array, key: &str, index, len| AnnotationError::IndexOutOfRange {
            row,
            locus: record.locus.to_string(),
            array,
            key: key.to_string(),
            index,
            len,
        };

        if let Some(freq) = &record.joint.freq {
            let len = freq.len();
            if self.overall >= len {
                return Err(out_of_range("joint.freq", &self.overall_key, self.overall, len));
            }
            if let Some(bad) = self.ancestry.iter().find(|a| a.index >= len) {
                return Err(out_of_range("joint.freq", &bad.key, bad.index, len));
            }
        }
        if let Some(faf) = &record.joint.faf {
            if self.faf_overall >= faf.len() {
                return Err(out_of_range(
                    "joint.faf",
                    &self.overall_key,
                    self.faf_overall,
                    faf.len(),
                ));
            }
        }
        Ok(())
    }
}

/// Accept a JSON object or a Hail-style `[{"key": k, "value": v}]` array.
fn string_map(value: &Value) -> Option<Vec<(String, Value)>> {
    match value {
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let key = item.get("key")?.as_str()?.to_string();
                let value = item.get("value")?.clone();
                Some((key, value))
            })
            .collect(),
        _ => None,
    }
}

/// Key for a `freq_meta` entry: `group` alone, or `<gen_anc>_<group>`. Other
/// strata (sex, subsets, downsamplings) have no key.
fn meta_key(entry: &Value) -> Option<String> {
    let fields: BTreeMap<String, String> = string_map(entry)?
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect();
    let group = fields.get("group")?;
    let ancestry = fields.get("gen_anc").or_else(|| fields.get("pop"));
    match (ancestry, fields.len()) {
        (None, 1) => Some(group.clone()),
        (Some(anc), 2) => Some(format!("{anc}_{group}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_from_index_dict() {
        let globals = json!({
            "joint_globals": {
                "freq_index_dict": {"adj": 0, "raw": 1, "afr_adj": 2, "nfe_adj": 3},
                "faf_index_dict": {"adj": 0, "afr_adj": 1}
            }
        });
        let index =
            FrequencyIndex::from_globals(&globals, "joint_globals", "adj", &labels(&["nfe", "afr"]))
                .unwrap();
        assert_eq!(index.overall(), 0);
        assert_eq!(index.faf_overall(), 0);
        let positions: Vec<_> = index
            .ancestry()
            .iter()
            .map(|a| (a.label.as_str(), a.index))
            .collect();
        assert_eq!(positions, vec![("nfe", 3), ("afr", 2)]);
    }

    #[test]
    fn derives_keys_from_meta_arrays() {
        let globals = json!({
            "joint_globals": {
                "freq_meta": [
                    {"group": "adj"},
                    {"group": "raw"},
                    {"group": "adj", "gen_anc": "afr"},
                    {"group": "adj", "sex": "XX"},
                    [{"key": "group", "value": "adj"}, {"key": "gen_anc", "value": "remaining"}]
                ],
                "faf_meta": [{"group": "adj"}]
            }
        });
        let index = FrequencyIndex::from_globals(
            &globals,
            "joint_globals",
            "adj",
            &labels(&["afr", "remaining"]),
        )
        .unwrap();
        assert_eq!(index.ancestry()[0].index, 2);
        assert_eq!(index.ancestry()[1].index, 4);
    }

    #[test]
    fn hail_key_value_dict_is_accepted() {
        let globals = json!({
            "g": {
                "freq_index_dict": [{"key": "adj", "value": 0}, {"key": "sas_adj", "value": 5}],
                "faf_index_dict": [{"key": "adj", "value": 0}]
            }
        });
        let index = FrequencyIndex::from_globals(&globals, "g", "adj", &labels(&["sas"])).unwrap();
        assert_eq!(index.ancestry()[0].index, 5);
    }

    #[test]
    fn unknown_label_fails_fast() {
        let globals = json!({
            "joint_globals": {
                "freq_index_dict": {"adj": 0, "afr_adj": 1},
                "faf_index_dict": {"adj": 0}
            }
        });
        let err = FrequencyIndex::from_globals(&globals, "joint_globals", "adj", &labels(&["oth"]))
            .unwrap_err();
        match err {
            AnnotationError::UnknownFrequencyKey { key, available, .. } => {
                assert_eq!(key, "oth_adj");
                assert_eq!(available, "adj,afr_adj");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_metadata_is_reported() {
        let err =
            FrequencyIndex::from_globals(&json!({}), "joint_globals", "adj", &[]).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingMetadata(_)));
    }
}
