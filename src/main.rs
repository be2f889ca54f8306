//! Command line access to the aggregation engine
//!
//! Usage:
//!   epi-query query --tenant <id> [--request <file>]
//!   epi-query latest <region_id> --tenant <id>
//!   epi-query breadcrumbs <region_id> --scope <region_id>
//!   epi-query tenants

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use epi_aggregator::{
    AggregationEngine, EngineConfig, MemoryStore, QueryRequest, RegionHierarchy, RetryingStore,
    Snapshot, TenantConfig, TenantRegistry,
};
use log::info;

type Engine = AggregationEngine<RetryingStore<MemoryStore>>;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(name = "epi-query")]
#[command(version)]
#[command(about = "Query regional case aggregates from a dashboard snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of tenant JSON files
    #[arg(long, global = true, default_value = "tenants")]
    tenants: PathBuf,

    /// Snapshot directory with regions, cases and predictions
    #[arg(long, global = true, default_value = "data")]
    data: PathBuf,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

/// Selects the tenant a command runs for
#[derive(clap::Args)]
struct TenantArgs {
    /// Tenant id
    #[arg(long, conflicts_with = "domain")]
    tenant: Option<String>,

    /// Host name served for the tenant
    #[arg(long)]
    domain: Option<String>,

    /// Caller scope region; defaults to the tenant's scope region
    #[arg(long)]
    scope: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query read from a JSON file or stdin
    ///
    /// A blank start date defaults to the tenant's data start date, a blank
    /// end date to the region's latest record date, and an empty aggregate
    /// list to the tenant's dashboard panels for the region.
    Query {
        #[command(flatten)]
        tenant: TenantArgs,

        /// Request JSON file (stdin if not specified)
        #[arg(short, long)]
        request: Option<PathBuf>,
    },

    /// Print the latest record date of a region
    Latest {
        region_id: String,

        #[command(flatten)]
        tenant: TenantArgs,
    },

    /// Print the breadcrumb trail from a scope region down to a region
    Breadcrumbs {
        region_id: String,

        /// Scope region the trail starts at
        #[arg(long)]
        scope: String,
    },

    /// List configured tenants
    Tenants,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Query { tenant, request } => {
            let registry = TenantRegistry::load_dir(&cli.tenants)?;
            let (tenant, scope) = select_tenant(&registry, tenant)?;
            let engine = load_engine(&cli.data).await?;
            let mut request = read_request(request.as_deref())?;
            fill_defaults(&engine, tenant, &scope, &mut request).await?;

            let response = engine.query(tenant, &scope, &request).await?;
            for (aggregate, error) in response.failures() {
                log::warn!("{aggregate} unavailable: {}", error.message);
            }
            print_json(&response, cli.pretty)?;
        }
        Commands::Latest { region_id, tenant } => {
            let registry = TenantRegistry::load_dir(&cli.tenants)?;
            let (_, scope) = select_tenant(&registry, tenant)?;
            let engine = load_engine(&cli.data).await?;
            let latest = engine.latest_record_date(region_id, &scope).await?;
            let body = serde_json::json!({
                "region_id": region_id,
                "latest_record_date": latest,
            });
            print_json(&body, cli.pretty)?;
        }
        Commands::Breadcrumbs { region_id, scope } => {
            let snapshot = Snapshot::load_dir(&cli.data).await?;
            let region = snapshot.hierarchy.find(region_id)?;
            if !RegionHierarchy::in_scope(region, scope) {
                bail!("region '{region_id}' is outside scope '{scope}'");
            }
            print_json(&RegionHierarchy::breadcrumbs(region, scope), cli.pretty)?;
        }
        Commands::Tenants => {
            let registry = TenantRegistry::load_dir(&cli.tenants)?;
            let mut out = io::stdout().lock();
            for tenant in registry.tenants() {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    tenant.tenant_id,
                    tenant.dashboard_title,
                    tenant.domains.join(",")
                )?;
            }
        }
    }

    Ok(())
}

fn select_tenant<'a>(
    registry: &'a TenantRegistry,
    args: &TenantArgs,
) -> anyhow::Result<(&'a TenantConfig, String)> {
    let tenant = match (&args.tenant, &args.domain) {
        (Some(id), _) => registry
            .get(id)
            .with_context(|| format!("unknown tenant '{id}'"))?,
        (None, Some(domain)) => registry
            .for_domain(domain)
            .with_context(|| format!("no tenant serves domain '{domain}'"))?,
        (None, None) => bail!("pass --tenant or --domain"),
    };
    let scope = args
        .scope
        .clone()
        .or_else(|| tenant.scope_region.clone())
        .with_context(|| {
            format!("tenant '{}' has no scope region; pass --scope", tenant.tenant_id)
        })?;
    Ok((tenant, scope))
}

async fn load_engine(data: &Path) -> anyhow::Result<Engine> {
    let snapshot = Snapshot::load_dir(data)
        .await
        .with_context(|| format!("loading snapshot from {}", data.display()))?;
    let config = EngineConfig::from_env();
    info!(
        "Store calls time out after {:?}, {} retries, {} concurrent",
        config.store_timeout, config.max_retries, config.max_concurrent_queries
    );
    let store = RetryingStore::from_config(snapshot.store, &config);
    Ok(AggregationEngine::new(Arc::new(snapshot.hierarchy), Arc::new(store)))
}

fn read_request(path: Option<&Path>) -> anyhow::Result<QueryRequest> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading request from stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("parsing request JSON")
}

async fn fill_defaults(
    engine: &Engine,
    tenant: &TenantConfig,
    scope: &str,
    request: &mut QueryRequest,
) -> anyhow::Result<()> {
    if request.start_date.trim().is_empty() {
        request.start_date = tenant.data_start_date.to_string();
    }
    if request.end_date.trim().is_empty() {
        let latest = engine.latest_record_date(&request.region_id, scope).await?;
        let end = latest.unwrap_or_else(|| chrono::Local::now().date_naive());
        request.end_date = end.to_string();
    }
    if request.aggregates.is_empty() {
        let region = engine.resolve(&request.region_id, scope)?;
        request.aggregates = tenant
            .dashboard_panels(&region.region_type)
            .iter()
            .map(|aggregate| aggregate.name().to_string())
            .collect();
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}
