//! Region entity model
//!
//! A region is a node of the administrative hierarchy. Its ancestor chain is
//! stored root-first: `parent_ids[0]` is the topmost ancestor and the last
//! element is the immediate parent.

use serde::{Deserialize, Serialize};

/// A geographic unit in the administrative hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Unique key, e.g. `district_510`
    pub region_id: String,
    /// Open set of types: country, state, district, subdistrict, ulb, zone, ...
    pub region_type: String,
    /// Display name
    pub name: String,
    /// Ancestor ids, root-first
    pub parent_ids: Vec<String>,
    /// Ancestor names, positionally parallel to `parent_ids`
    pub parent_names: Vec<String>,
}

impl Region {
    /// Create a root region (no ancestors)
    #[must_use]
    pub fn root(region_id: &str, region_type: &str, name: &str) -> Self {
        Self {
            region_id: region_id.to_string(),
            region_type: region_type.to_string(),
            name: name.to_string(),
            parent_ids: Vec::new(),
            parent_names: Vec::new(),
        }
    }

    /// Create a region placed directly beneath `parent`
    #[must_use]
    pub fn child_of(parent: &Self, region_id: &str, region_type: &str, name: &str) -> Self {
        let mut parent_ids = parent.parent_ids.clone();
        parent_ids.push(parent.region_id.clone());
        let mut parent_names = parent.parent_names.clone();
        parent_names.push(parent.name.clone());

        Self {
            region_id: region_id.to_string(),
            region_type: region_type.to_string(),
            name: name.to_string(),
            parent_ids,
            parent_names,
        }
    }

    /// Derive the region type from the id prefix (`district_510` -> `district`)
    #[must_use]
    pub fn type_from_id(region_id: &str) -> &str {
        region_id.split('_').next().unwrap_or(region_id)
    }

    /// True if `candidate` is this region or one of its ancestors
    #[must_use]
    pub fn in_scope(&self, candidate: &str) -> bool {
        self.region_id == candidate || self.parent_ids.iter().any(|id| id == candidate)
    }

    /// Id of the immediate parent, `None` for roots
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_ids.last().map(String::as_str)
    }

    /// Number of ancestors above this region
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent_ids.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Ancestor ids and names must line up one to one
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.parent_ids.len() == self.parent_names.len()
    }
}
