//! Pricewall CLI: inspect snapshots, rows and the catalog without the TUI.
//!
//! Commands:
//! - `meta`: per-source counts and sync status from the snapshot metadata
//! - `rows`: the flattened row list (or one virtual window of it)
//! - `classify`: subcategory counts per source
//! - `catalog`: categories, sources and taxonomies (or the TOML form)
//! - `export`: ordered assets as CSV

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pricewall_core::catalog::{Catalog, Taxonomy};
use pricewall_core::classify::Classifier;
use pricewall_core::config::PricewallConfig;
use pricewall_core::data::SnapshotProvider;
use pricewall_core::domain::ScopeKey;
use pricewall_core::flatten::VirtualRow;
use pricewall_core::pipeline::ViewStatus;
use pricewall_loader::worker::execute;
use pricewall_loader::{relative_time, LoaderSettings, ViewModel};

#[derive(Parser)]
#[command(
    name = "pricewall-cli",
    about = "Pricewall CLI: snapshot, row and catalog inspection"
)]
struct Cli {
    /// Config file. Defaults to <config dir>/pricewall/config.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which assets to show.
#[derive(Args, Debug, Clone, Default)]
struct ViewArgs {
    /// Category id (e.g. crypto, weather). Omit for every source.
    #[arg(long)]
    category: Option<String>,

    /// Narrow to one source id.
    #[arg(long)]
    source: Option<String>,

    /// Case-insensitive match on symbol or name.
    #[arg(long)]
    search: Option<String>,

    /// Display width in terminal columns; drives the tiles per row.
    #[arg(long, default_value_t = 120)]
    width: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-source counts and sync status.
    Meta {
        /// Print the raw metadata as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the flattened row list.
    Rows {
        #[command(flatten)]
        view: ViewArgs,

        /// Scroll offset; with --viewport prints only that window.
        #[arg(long)]
        scroll: Option<u64>,

        /// Viewport height in lines.
        #[arg(long)]
        viewport: Option<u64>,

        /// Stop after this many rows.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Subcategory counts per source.
    Classify {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Show the catalog in use.
    Catalog {
        /// Print TOML suitable for `catalog_path`.
        #[arg(long, default_value_t = false)]
        toml: bool,
    },
    /// Write ordered assets as CSV.
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Output file. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let default_path = dirs::config_dir().map(|d| d.join("pricewall").join("config.toml"));
    let config = PricewallConfig::load_or_default(cli.config.as_deref(), default_path.as_deref())
        .context("loading configuration")?;
    let catalog = Arc::new(config.load_catalog().context("loading catalog")?);

    match cli.command {
        Commands::Meta { json } => run_meta(&config, &catalog, json),
        Commands::Rows {
            view,
            scroll,
            viewport,
            limit,
        } => run_rows(&config, &catalog, &view, scroll, viewport, limit),
        Commands::Classify { view } => run_classify(&config, &catalog, &view),
        Commands::Catalog { toml } => run_catalog(&catalog, toml),
        Commands::Export { view, output } => run_export(&config, &catalog, &view, output),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}

/// Load the requested view synchronously: the same jobs the TUI hands its
/// worker, executed inline.
fn load_view(config: &PricewallConfig, catalog: &Arc<Catalog>, args: &ViewArgs) -> Result<ViewModel> {
    if let Some(category) = &args.category {
        if catalog.category(category).is_none() {
            let known: Vec<&str> = catalog.categories.iter().map(|c| c.id.as_str()).collect();
            bail!("unknown category '{category}'. Valid: {}", known.join(", "));
        }
    }
    let provider = config.build_provider(catalog)?;
    let classifier = Classifier::new(catalog)?;
    let now = Instant::now();

    let mut vm = ViewModel::new(
        Arc::clone(catalog),
        classifier,
        LoaderSettings {
            freshness: config.freshness(),
            prefetch_stagger: config.prefetch_stagger(),
        },
        config.view.size_model(),
        config.view.overscan,
    );
    vm.resize(args.width, 0, config.view.min_tile_width, config.view.max_columns, now);

    let jobs = vm.select_category(args.category.clone(), now);
    for job in jobs {
        tracing::info!(id = job.id, target = ?job.target, "fetching");
        let result = execute(provider.as_ref(), &job.target);
        vm.complete(job.id, result, now);
    }
    if args.source.is_some() {
        vm.select_source(args.source.clone(), now);
    }
    if let Some(search) = &args.search {
        vm.set_search(search.clone(), now);
    }

    if let ViewStatus::Failed(reason) = vm.derived().status() {
        bail!("failed to load snapshot: {reason}");
    }
    Ok(vm)
}

// ── meta ─────────────────────────────────────────────────────────────

fn run_meta(config: &PricewallConfig, catalog: &Catalog, json: bool) -> Result<()> {
    let provider: Arc<dyn SnapshotProvider> = config.build_provider(catalog)?;
    let meta = provider.fetch_meta().context("fetching metadata")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    let now = Utc::now();
    println!("Provider:   {}", provider.name());
    println!("Generated:  {} ({})", meta.generated_at, relative_time(meta.generated_at, now));
    println!("Assets:     {}", meta.total_assets);
    println!();
    println!("{:<12} {:<22} {:>8} {:<10} {:<14}", "Source", "Name", "Assets", "Status", "Last sync");
    println!("{}", "-".repeat(70));
    for schedule in &meta.sources {
        let count = meta.asset_counts.get(&schedule.source_id).copied().unwrap_or(0);
        let status = if schedule.enabled {
            schedule.status.label()
        } else {
            "disabled"
        };
        let last = schedule
            .last_sync
            .map(|t| relative_time(t, now))
            .unwrap_or_else(|| "never".into());
        println!(
            "{:<12} {:<22} {:>8} {:<10} {:<14}",
            schedule.source_id,
            catalog.source_name(&schedule.source_id),
            count,
            status,
            last
        );
    }

    println!();
    println!("{:<14} {:>8}", "Category", "Assets");
    println!("{}", "-".repeat(23));
    for group in &catalog.categories {
        let scope = ScopeKey::new(group.sources.iter().cloned());
        println!("{:<14} {:>8}", group.id, meta.count_in(&scope));
    }
    Ok(())
}

// ── rows ─────────────────────────────────────────────────────────────

fn run_rows(
    config: &PricewallConfig,
    catalog: &Arc<Catalog>,
    args: &ViewArgs,
    scroll: Option<u64>,
    viewport: Option<u64>,
    limit: Option<usize>,
) -> Result<()> {
    let mut vm = load_view(config, catalog, args)?;
    let derived = vm.derived();
    println!(
        "{} assets in {} rows, {} columns, extent {}",
        derived.total_filtered,
        derived.rows.len(),
        vm.columns(),
        vm.window().total_extent
    );

    if let Some(height) = viewport {
        vm.set_viewport(height);
        vm.scroll_to(scroll.unwrap_or(0));
        let window = vm.window();
        println!(
            "window: scroll {} visible {:?} rendered {:?}",
            window.scroll, window.visible, window.rendered
        );
        for item in window.items.iter().take(limit.unwrap_or(usize::MAX)) {
            if let Some(row) = vm.rows().get(item.index) {
                println!("{:>6} @{:<7} {}", item.index, item.start, describe_row(catalog, row));
            }
        }
        return Ok(());
    }

    for (index, row) in vm.rows().iter().enumerate().take(limit.unwrap_or(usize::MAX)) {
        println!("{index:>6} {}", describe_row(catalog, row));
    }
    Ok(())
}

fn describe_row(catalog: &Catalog, row: &VirtualRow) -> String {
    match row {
        VirtualRow::Header { source, count } => {
            format!("# {} ({count})", catalog.source_name(source))
        }
        VirtualRow::Subheader { label, count, .. } => format!("  ## {label} ({count})"),
        VirtualRow::Tiles { prices, .. } => {
            let tiles: Vec<String> = prices
                .iter()
                .map(|a| format!("{} {}", a.symbol(), a.record.value))
                .collect();
            format!("    {}", tiles.join(" | "))
        }
    }
}

// ── classify ─────────────────────────────────────────────────────────

fn run_classify(config: &PricewallConfig, catalog: &Arc<Catalog>, args: &ViewArgs) -> Result<()> {
    let vm = load_view(config, catalog, args)?;
    let counts = subgroup_counts(vm.rows());
    if counts.is_empty() {
        println!("No assets.");
        return Ok(());
    }
    println!("{:<12} {:<24} {:>8}", "Source", "Subcategory", "Assets");
    println!("{}", "-".repeat(46));
    for ((source, label), count) in &counts {
        println!("{:<12} {:<24} {:>8}", source, label, count);
    }
    Ok(())
}

/// Assets per (source, subcategory label) in the flattened rows. Sources
/// without subheaders count under "-".
fn subgroup_counts(rows: &[VirtualRow]) -> BTreeMap<(String, String), usize> {
    let mut counts = BTreeMap::new();
    let mut source = String::new();
    let mut label = "-".to_string();
    for row in rows {
        match row {
            VirtualRow::Header { source: s, .. } => {
                source = s.clone();
                label = "-".into();
            }
            VirtualRow::Subheader { label: l, .. } => label = l.clone(),
            VirtualRow::Tiles { prices, .. } => {
                *counts.entry((source.clone(), label.clone())).or_insert(0) += prices.len();
            }
        }
    }
    counts
}

// ── catalog ──────────────────────────────────────────────────────────

fn run_catalog(catalog: &Catalog, toml: bool) -> Result<()> {
    if toml {
        print!("{}", catalog.to_toml()?);
        return Ok(());
    }
    for group in &catalog.categories {
        println!("{} {} ({})", group.icon, group.name, group.id);
        for source in &group.sources {
            let taxonomy = match catalog.taxonomy(source) {
                Some(Taxonomy::IdSegment { delimiter, labels, .. }) => {
                    format!("id segment split on '{delimiter}', {} labels", labels.len())
                }
                Some(Taxonomy::Keywords { rules, fallback, .. }) => {
                    format!("{} keyword rules, fallback '{fallback}'", rules.len())
                }
                None => "no subcategories".into(),
            };
            println!("  {:<12} {:<22} {}", source, catalog.source_name(source), taxonomy);
        }
    }
    Ok(())
}

// ── export ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize, PartialEq)]
struct ExportRow {
    source: String,
    subcategory: String,
    asset_id: String,
    symbol: String,
    name: String,
    value: String,
    change_pct: Option<String>,
    market_cap: Option<String>,
}

/// Assets in display order, tagged with the subheader they sit under.
fn export_rows(rows: &[VirtualRow]) -> Vec<ExportRow> {
    let mut out = Vec::new();
    let mut label = String::new();
    for row in rows {
        match row {
            VirtualRow::Header { .. } => label.clear(),
            VirtualRow::Subheader { label: l, .. } => label = l.clone(),
            VirtualRow::Tiles { prices, .. } => {
                out.extend(prices.iter().map(|a| ExportRow {
                    source: a.record.source.clone(),
                    subcategory: label.clone(),
                    asset_id: a.record.asset_id.clone(),
                    symbol: a.record.symbol.clone(),
                    name: a.record.name.clone(),
                    value: a.record.value.clone(),
                    change_pct: a.record.change_pct.clone(),
                    market_cap: a.record.market_cap.clone(),
                }));
            }
        }
    }
    out
}

fn run_export(
    config: &PricewallConfig,
    catalog: &Arc<Catalog>,
    args: &ViewArgs,
    output: Option<PathBuf>,
) -> Result<()> {
    let vm = load_view(config, catalog, args)?;
    let rows = export_rows(vm.rows());

    let writer: Box<dyn io::Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut csv = csv::Writer::from_writer(writer);
    for row in &rows {
        csv.serialize(row)?;
    }
    csv.flush()?;

    if let Some(path) = output {
        eprintln!("Wrote {} assets to {}", rows.len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewall_core::domain::{AssetRecord, ClassifiedAsset};
    use pricewall_core::flatten::UNCATEGORIZED_LABEL;

    fn asset(source: &str, id: &str) -> ClassifiedAsset {
        ClassifiedAsset::new(
            Arc::new(AssetRecord {
                source: source.into(),
                asset_id: id.into(),
                symbol: id.to_uppercase(),
                name: id.into(),
                value: "1.5".into(),
                change_pct: None,
                market_cap: None,
            }),
            None,
        )
    }

    fn rows() -> Vec<VirtualRow> {
        vec![
            VirtualRow::Header { source: "kalshi".into(), count: 3 },
            VirtualRow::Subheader { source: "kalshi".into(), label: "Sports".into(), count: 2 },
            VirtualRow::Tiles { prices: vec![asset("kalshi", "a"), asset("kalshi", "b")], column_count: 2 },
            VirtualRow::Subheader {
                source: "kalshi".into(),
                label: UNCATEGORIZED_LABEL.into(),
                count: 1,
            },
            VirtualRow::Tiles { prices: vec![asset("kalshi", "c")], column_count: 2 },
            VirtualRow::Header { source: "npm".into(), count: 1 },
            VirtualRow::Tiles { prices: vec![asset("npm", "left-pad")], column_count: 2 },
        ]
    }

    #[test]
    fn subgroup_counts_follow_headers() {
        let counts = subgroup_counts(&rows());
        let key = |s: &str, l: &str| (s.to_string(), l.to_string());
        assert_eq!(counts[&key("kalshi", "Sports")], 2);
        assert_eq!(counts[&key("kalshi", UNCATEGORIZED_LABEL)], 1);
        assert_eq!(counts[&key("npm", "-")], 1);
    }

    #[test]
    fn export_keeps_display_order_and_labels() {
        let out = export_rows(&rows());
        let ids: Vec<&str> = out.iter().map(|r| r.asset_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "left-pad"]);
        assert_eq!(out[0].subcategory, "Sports");
        assert_eq!(out[3].subcategory, "");
    }

    #[test]
    fn describe_tile_row_lists_symbols() {
        let catalog = Catalog::default_catalog();
        let line = describe_row(&catalog, &rows()[2]);
        assert_eq!(line, "    A 1.5 | B 1.5");
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pricewall-cli", "rows", "--category", "crypto", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Rows { .. }));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let config = PricewallConfig::default();
        let catalog = Arc::new(Catalog::default_catalog());
        let args = ViewArgs {
            category: Some("nope".into()),
            width: 120,
            ..ViewArgs::default()
        };
        assert!(load_view(&config, &catalog, &args).is_err());
    }

    #[test]
    fn synthetic_rows_load_end_to_end() {
        let config = PricewallConfig::default();
        let catalog = Arc::new(Catalog::default_catalog());
        let args = ViewArgs {
            category: Some("weather".into()),
            width: 120,
            ..ViewArgs::default()
        };
        let vm = load_view(&config, &catalog, &args).unwrap();
        assert!(matches!(vm.rows().first(), Some(VirtualRow::Header { source, .. }) if source == "weather"));
    }
}
