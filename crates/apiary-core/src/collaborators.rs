//! Ports to systems the engine does not own.
//!
//! The inspection service creates inspection records; the hive directory
//! turns hive ids into display names. Both live outside this crate in a real
//! deployment. The store module ships local adapters for the inspection side.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{BatchId, HiveId, InspectionId},
    Result,
};

/// Everything the inspection service needs to create one inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionDraft {
    pub batch_id: BatchId,
    pub hive_id: HiveId,
    pub inspected_on: NaiveDate,
    /// Inspection content. Opaque to the engine.
    pub payload: serde_json::Value,
}

/// Creates inspection records and hands back their ids.
#[async_trait::async_trait]
pub trait InspectionService: Send + Sync {
    /// Create an inspection for one hive.
    ///
    /// # Errors
    ///
    /// Any error. The engine reports it as `UpstreamInspectionCreationFailed`.
    async fn create_inspection(&self, draft: &InspectionDraft) -> Result<InspectionId>;

    /// Remove an inspection whose batch update could not be persisted.
    ///
    /// Services that cannot delete may keep the default, which does nothing.
    async fn discard(&self, _id: &InspectionId) -> Result<()> {
        Ok(())
    }
}

/// Read-only hive lookup.
pub trait HiveDirectory: Send + Sync {
    /// Display name for a hive, if the directory knows it.
    fn display_name(&self, hive: &HiveId) -> Option<String>;
}

/// Hive directory backed by a fixed map, usually the `[hives]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticHiveDirectory {
    names: HashMap<HiveId, String>,
}

impl StaticHiveDirectory {
    #[must_use]
    pub const fn new(names: HashMap<HiveId, String>) -> Self {
        Self { names }
    }

    /// Build from raw config entries, dropping ids that fail validation.
    #[must_use]
    pub fn from_config(entries: &HashMap<String, String>) -> Self {
        entries
            .iter()
            .filter_map(|(id, name)| HiveId::parse(id).ok().map(|hive| (hive, name.clone())))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(HiveId, String)> for StaticHiveDirectory {
    fn from_iter<T: IntoIterator<Item = (HiveId, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl HiveDirectory for StaticHiveDirectory {
    fn display_name(&self, hive: &HiveId) -> Option<String> {
        self.names.get(hive).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_directory_lookup() {
        let entries = HashMap::from([
            ("H1".to_string(), "North meadow".to_string()),
            ("bad id".to_string(), "ignored".to_string()),
        ]);
        let directory = StaticHiveDirectory::from_config(&entries);

        assert_eq!(directory.len(), 1);
        let h1 = HiveId::parse("H1").expect("valid hive id");
        assert_eq!(directory.display_name(&h1).as_deref(), Some("North meadow"));
        let h2 = HiveId::parse("H2").expect("valid hive id");
        assert!(directory.display_name(&h2).is_none());
    }
}
