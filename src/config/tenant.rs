//! Per-tenant dashboard configuration
//!
//! Tenants are described by JSON files and loaded once at start-up into a
//! [`TenantRegistry`]. The registry is immutable afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::calendar::WeekStart;
use crate::engine::Aggregate;
use crate::error::{Error, Result};
use crate::models::REGION_PATH_LEN;

/// Dashboard configuration of one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub dashboard_title: String,
    /// Host names served for this tenant
    pub domains: Vec<String>,
    /// Stage fields tracked by this tenant, in display order
    pub stages: Vec<String>,
    pub stage_definitions: BTreeMap<String, String>,
    /// Region type to the region path index of its subregions
    pub subregion_indexes: BTreeMap<String, usize>,
    /// Topmost region visible to callers of this tenant
    pub scope_region: Option<String>,
    /// Region types whose dashboards break down into subregions
    pub splittable_region_types: Vec<String>,
    pub data_start_date: NaiveDate,
    pub week_start: WeekStart,
    /// Stages carried by every weekly trend bucket
    pub trend_stages: Vec<String>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        let stages: Vec<String> = ["suspected", "tested", "confirmed", "deaths"]
            .map(String::from)
            .to_vec();
        Self {
            tenant_id: String::new(),
            dashboard_title: "Dashboard".to_string(),
            domains: Vec::new(),
            stage_definitions: stages.iter().map(|s| (s.clone(), String::new())).collect(),
            stages,
            subregion_indexes: [
                ("state", 1),
                ("district", 2),
                ("subdistrict", 4),
                ("ulb", 3),
                ("zone", 4),
            ]
            .into_iter()
            .map(|(region_type, index)| (region_type.to_string(), index))
            .collect(),
            scope_region: None,
            splittable_region_types: Vec::new(),
            data_start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            week_start: WeekStart::Monday,
            trend_stages: vec!["tested".to_string(), "confirmed".to_string()],
        }
    }
}

impl TenantConfig {
    /// Region path index holding the subregions of `region_type`, if any
    #[must_use]
    pub fn subregion_index(&self, region_type: &str) -> Option<usize> {
        self.subregion_indexes.get(region_type).copied()
    }

    #[must_use]
    pub fn is_splittable(&self, region_type: &str) -> bool {
        self.splittable_region_types.iter().any(|t| t == region_type)
    }

    /// Default panels shown on the dashboard of a region of this type
    #[must_use]
    pub fn dashboard_panels(&self, region_type: &str) -> Vec<Aggregate> {
        if self.is_splittable(region_type) {
            vec![
                Aggregate::Summary,
                Aggregate::Trends,
                Aggregate::FeatureDistributions,
                Aggregate::SubregionwiseDistribution,
                Aggregate::Predictions,
            ]
        } else {
            vec![
                Aggregate::Summary,
                Aggregate::FeatureDistributions,
                Aggregate::Trends,
            ]
        }
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(Error::Configuration("tenant_id must not be empty".into()));
        }
        if self.stages.is_empty() {
            return Err(Error::Configuration(format!(
                "tenant '{}' defines no stages",
                self.tenant_id
            )));
        }
        if self.trend_stages.is_empty() {
            return Err(Error::Configuration(format!(
                "tenant '{}' defines no trend stages",
                self.tenant_id
            )));
        }
        if let Some((region_type, index)) = self
            .subregion_indexes
            .iter()
            .find(|(_, index)| **index >= REGION_PATH_LEN)
        {
            return Err(Error::Configuration(format!(
                "tenant '{}' maps '{region_type}' to region index {index}, beyond the {REGION_PATH_LEN}-level path",
                self.tenant_id
            )));
        }
        Ok(())
    }
}

/// All configured tenants, keyed by id and by domain
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: BTreeMap<String, TenantConfig>,
    domains: FxHashMap<String, String>,
}

impl TenantRegistry {
    /// Build a registry from in-memory configurations
    ///
    /// # Errors
    /// Fails when a configuration is invalid, a tenant id repeats, or a
    /// domain is claimed by two tenants.
    pub fn from_tenants<I>(tenants: I) -> Result<Self>
    where
        I: IntoIterator<Item = TenantConfig>,
    {
        let mut registry = Self::default();
        for tenant in tenants {
            registry.insert(tenant)?;
        }
        Ok(registry)
    }

    /// Load every `*.json` tenant file in `dir`
    ///
    /// Files without a `tenant_id` are shared templates and are skipped.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Configuration(format!(
                "tenant directory not found: {}",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("listing tenant directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut registry = Self::default();
        for path in files {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading tenant file {}", path.display()))?;
            let tenant: TenantConfig = serde_json::from_str(&text)
                .with_context(|| format!("parsing tenant file {}", path.display()))?;
            if tenant.tenant_id.trim().is_empty() {
                debug!("Skipping tenant template {}", path.display());
                continue;
            }
            registry.insert(tenant)?;
        }

        if registry.tenants.is_empty() {
            warn!("No tenants configured in {}", dir.display());
        } else {
            info!(
                "Loaded {} tenants from {}",
                registry.tenants.len(),
                dir.display()
            );
        }
        Ok(registry)
    }

    fn insert(&mut self, tenant: TenantConfig) -> Result<()> {
        tenant.validate()?;
        if self.tenants.contains_key(&tenant.tenant_id) {
            return Err(Error::Configuration(format!(
                "tenant '{}' is configured twice",
                tenant.tenant_id
            )));
        }
        for domain in &tenant.domains {
            let key = normalize_domain(domain);
            if let Some(owner) = self.domains.get(&key) {
                return Err(Error::Configuration(format!(
                    "domain '{domain}' is claimed by both '{owner}' and '{}'",
                    tenant.tenant_id
                )));
            }
            self.domains.insert(key, tenant.tenant_id.clone());
        }
        self.tenants.insert(tenant.tenant_id.clone(), tenant);
        Ok(())
    }

    /// Tenant serving `host`; any port suffix is ignored
    #[must_use]
    pub fn for_domain(&self, host: &str) -> Option<&TenantConfig> {
        self.domains
            .get(&normalize_domain(host))
            .and_then(|id| self.tenants.get(id))
    }

    #[must_use]
    pub fn get(&self, tenant_id: &str) -> Option<&TenantConfig> {
        self.tenants.get(tenant_id)
    }

    /// All tenants ordered by id
    pub fn tenants(&self) -> impl Iterator<Item = &TenantConfig> {
        self.tenants.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

fn normalize_domain(host: &str) -> String {
    let host = host.trim();
    let host = host.rsplit_once(':').map_or(host, |(name, port)| {
        if port.chars().all(|c| c.is_ascii_digit()) { name } else { host }
    });
    host.to_ascii_lowercase()
}
