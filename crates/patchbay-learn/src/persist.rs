//! Mapping file format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "mappings": [
//!     { "channel": 0, "ccNumber": 74, "parameterId": "filter_cutoff", ... }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::mapping::CCMapping;
use crate::table::MappingTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MAPPING_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
    pub version: u32,
    pub mappings: Vec<CCMapping>,
}

impl MappingDocument {
    pub fn from_table(table: &MappingTable) -> Self {
        Self {
            version: MAPPING_FILE_VERSION,
            mappings: table.iter().cloned().collect(),
        }
    }

    /// Builds a table, applying the usual conflict rules in file order.
    pub fn into_table(self) -> Result<MappingTable> {
        if self.version != MAPPING_FILE_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }

        let mut table = MappingTable::new();
        for mapping in self.mappings {
            mapping.validate().map_err(Error::InvalidMapping)?;
            let outcome = table.insert(mapping);
            if let Some(conflict) = outcome.conflict {
                tracing::warn!(
                    "Mapping file reuses CC {} for {}; keeping the later entry",
                    conflict.cc_number,
                    conflict.parameter_id
                );
            }
        }
        Ok(table)
    }
}

pub(crate) fn write(path: &Path, table: &MappingTable) -> Result<()> {
    let json = serde_json::to_string_pretty(&MappingDocument::from_table(table))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    Ok(())
}

pub(crate) fn read(path: &Path) -> Result<MappingTable> {
    let json = fs::read_to_string(path)?;
    let document: MappingDocument = serde_json::from_str(&json)?;
    document.into_table()
}
