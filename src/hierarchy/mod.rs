//! Region hierarchy lookups
//!
//! The hierarchy is built once from the region collection and is read-only
//! afterwards. Children are indexed by *immediate* parent, so
//! [`RegionHierarchy::children_of`] returns the regions directly beneath any
//! node, whatever its depth.

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Region;

/// One step of the trail from the scope region down to a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub id: String,
}

/// A flat `(id, name, parent)` row as found in region source tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRow {
    pub region_id: String,
    pub region_name: String,
    pub parent_id: Option<String>,
}

/// In-memory region tree
#[derive(Debug, Clone, Default)]
pub struct RegionHierarchy {
    regions: FxHashMap<String, Region>,
    children: FxHashMap<String, Vec<String>>,
}

impl RegionHierarchy {
    /// Build a hierarchy from regions that already carry their ancestor chains
    ///
    /// # Errors
    /// Returns a configuration error for duplicate ids or for regions whose
    /// `parent_ids` and `parent_names` differ in length.
    pub fn from_regions<I>(regions: I) -> Result<Self>
    where
        I: IntoIterator<Item = Region>,
    {
        let mut by_id: FxHashMap<String, Region> = FxHashMap::default();
        for region in regions {
            if !region.is_consistent() {
                return Err(Error::Configuration(format!(
                    "region '{}' has {} parent ids but {} parent names",
                    region.region_id,
                    region.parent_ids.len(),
                    region.parent_names.len()
                )));
            }
            if by_id.contains_key(&region.region_id) {
                return Err(Error::Configuration(format!(
                    "duplicate region id '{}'",
                    region.region_id
                )));
            }
            by_id.insert(region.region_id.clone(), region);
        }

        let mut children: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for region in by_id.values() {
            if let Some(parent) = region.parent_id() {
                children
                    .entry(parent.to_string())
                    .or_default()
                    .push(region.region_id.clone());
            }
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }

        debug!(
            "Built region hierarchy with {} regions and {} parents",
            by_id.len(),
            children.len()
        );

        Ok(Self {
            regions: by_id,
            children,
        })
    }

    /// Build a hierarchy from flat `(id, name, parent)` rows
    ///
    /// The region type is the id prefix before the first `_`. Ancestor chains
    /// are resolved root-first; a chain stops at a missing parent or at a cycle.
    ///
    /// # Errors
    /// Returns a configuration error for duplicate ids.
    pub fn from_parent_table<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = RegionRow>,
    {
        let mut index: FxHashMap<String, RegionRow> = FxHashMap::default();
        for row in rows {
            if index.contains_key(&row.region_id) {
                return Err(Error::Configuration(format!(
                    "duplicate region id '{}'",
                    row.region_id
                )));
            }
            index.insert(row.region_id.clone(), row);
        }

        let mut regions = Vec::with_capacity(index.len());
        for row in index.values() {
            let mut parent_ids = Vec::new();
            let mut parent_names = Vec::new();
            let mut seen = FxHashSet::default();
            seen.insert(row.region_id.as_str());

            let mut next = row.parent_id.as_deref().filter(|id| !id.is_empty());
            while let Some(parent_id) = next {
                let Some(parent) = index.get(parent_id) else {
                    warn!(
                        "Region '{}' references unknown parent '{parent_id}'",
                        row.region_id
                    );
                    break;
                };
                if !seen.insert(parent.region_id.as_str()) {
                    warn!("Cycle in region parents at '{}'", parent.region_id);
                    break;
                }
                parent_ids.push(parent.region_id.clone());
                parent_names.push(parent.region_name.clone());
                next = parent.parent_id.as_deref().filter(|id| !id.is_empty());
            }

            // Collected nearest-first, stored root-first
            parent_ids.reverse();
            parent_names.reverse();

            regions.push(Region {
                region_id: row.region_id.clone(),
                region_type: Region::type_from_id(&row.region_id).to_string(),
                name: row.region_name.clone(),
                parent_ids,
                parent_names,
            });
        }

        Self::from_regions(regions)
    }

    /// Look up a region by id
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] for unknown ids.
    pub fn find(&self, region_id: &str) -> Result<&Region> {
        self.regions.get(region_id).ok_or_else(|| Error::NotFound {
            region_id: region_id.to_string(),
        })
    }

    #[must_use]
    pub fn get(&self, region_id: &str) -> Option<&Region> {
        self.regions.get(region_id)
    }

    /// Regions directly beneath `region_id`, ordered by id
    #[must_use]
    pub fn children_of(&self, region_id: &str) -> Vec<&Region> {
        self.children
            .get(region_id)
            .map(|ids| ids.iter().filter_map(|id| self.regions.get(id)).collect())
            .unwrap_or_default()
    }

    /// True if `scope_region_id` is `region` itself or one of its ancestors
    #[must_use]
    pub fn in_scope(region: &Region, scope_region_id: &str) -> bool {
        region.in_scope(scope_region_id)
    }

    /// Trail from the scope region down to `region`, both inclusive
    ///
    /// Ancestors above the scope region are omitted. If the scope region is
    /// not on the chain the whole ancestor chain is returned.
    #[must_use]
    pub fn breadcrumbs(region: &Region, scope_region_id: &str) -> Vec<Breadcrumb> {
        let mut crumbs = Vec::with_capacity(region.depth() + 1);
        if region.region_id != scope_region_id {
            for (id, name) in region
                .parent_ids
                .iter()
                .zip(&region.parent_names)
                .rev()
            {
                crumbs.push(Breadcrumb {
                    name: name.clone(),
                    id: id.clone(),
                });
                if id == scope_region_id {
                    break;
                }
            }
            crumbs.reverse();
        }
        crumbs.push(Breadcrumb {
            name: region.name.clone(),
            id: region.region_id.clone(),
        });
        crumbs
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
