//! Build-info CLI
//!
//! Entry point for the `buildinfo` command-line tool.

use buildinfo::config::EffectiveConfig;
use buildinfo::mock::MockArtifactIndex;
use buildinfo::record::ProcessContext;
use buildinfo::{aggregate, publish, BuildInfo, Digest, ImageManifest, JsonFileDriver, Reconciler};
use buildinfo_digest::{from_storage_name, to_storage_name};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "buildinfo")]
#[command(about = "Build-info collection, merge and publish", version)]
struct Cli {
    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a registry manifest and print its layer digests
    Layers {
        /// Manifest document (schema v1 or v2)
        manifest: PathBuf,

        /// Image config document, for the dependent-layer count
        #[arg(long)]
        image_config: Option<PathBuf>,
    },

    /// Convert a digest to its storage file name
    StorageName {
        /// Digest (`algorithm:hex`), or a storage name with --reverse
        value: String,

        /// Convert a storage name back to a digest string
        #[arg(long)]
        reverse: bool,
    },

    /// Merge per-step build-info documents
    Merge {
        /// Step records, merged in order
        #[arg(required = true)]
        records: Vec<PathBuf>,

        /// Write the merged record here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Merge, reconcile and deploy per-step build-info documents
    Publish {
        /// Step records, merged in order
        #[arg(required = true)]
        records: Vec<PathBuf>,

        /// Artifact index catalog (JSON array of stored items)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Output path of the deployed document (overrides deploy.output)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Config file (TOML)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Default module id (overrides deploy.module_id)
        #[arg(long)]
        module_id: Option<String>,

        /// Skip the artifact index query
        #[arg(long)]
        no_reconcile: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Layers {
            manifest,
            image_config,
        } => run_layers(&manifest, image_config.as_deref()),
        Commands::StorageName { value, reverse } => run_storage_name(&value, reverse),
        Commands::Merge { records, output } => run_merge(&records, output.as_deref()),
        Commands::Publish {
            records,
            index,
            output,
            config,
            module_id,
            no_reconcile,
        } => run_publish(PublishArgs {
            records,
            index,
            output,
            config,
            module_id,
            no_reconcile,
        }),
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("Error {}: {}", context, error);
    process::exit(1);
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("reading {}", path.display()), e))
}

fn run_layers(manifest_path: &Path, config_path: Option<&Path>) {
    let manifest = read_file(manifest_path);
    let image_config = config_path.map(read_file);

    let parsed = ImageManifest::from_documents(&manifest, image_config.as_deref())
        .unwrap_or_else(|e| fail("parsing manifest", e));

    let digests: Vec<_> = parsed
        .layer_set
        .digests()
        .map(|d| json!({"digest": d.to_string(), "storageName": d.storage_name()}))
        .collect();
    let output = json!({
        "digests": digests,
        "dependentLayers": parsed.dependent_layers,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => fail("serializing output", e),
    }
}

fn run_storage_name(value: &str, reverse: bool) {
    if reverse {
        println!("{}", from_storage_name(value));
        return;
    }
    match Digest::parse(value) {
        Ok(digest) => println!("{}", to_storage_name(&digest)),
        Err(e) => fail("parsing digest", e),
    }
}

fn load_records(paths: &[PathBuf]) -> BuildInfo {
    let records = paths.iter().map(|path| {
        BuildInfo::from_file(path).unwrap_or_else(|e| fail(&format!("loading {}", path.display()), e))
    });
    // clap requires at least one path
    aggregate(records.collect::<Vec<_>>()).unwrap_or_else(|| fail("merging", "no records"))
}

fn run_merge(paths: &[PathBuf], output: Option<&Path>) {
    let merged = load_records(paths);

    match output {
        Some(path) => {
            if let Err(e) = merged.write_to_file(path) {
                fail(&format!("writing {}", path.display()), e);
            }
        }
        None => match merged.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => fail("serializing record", e),
        },
    }
}

struct PublishArgs {
    records: Vec<PathBuf>,
    index: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    module_id: Option<String>,
    no_reconcile: bool,
}

fn run_publish(args: PublishArgs) {
    let mut overrides = serde_json::Map::new();
    if args.no_reconcile {
        overrides.insert("reconcile".to_string(), json!({"enabled": false}));
    }
    let mut deploy = serde_json::Map::new();
    if let Some(output) = &args.output {
        deploy.insert("output".to_string(), json!(output.to_string_lossy()));
    }
    if let Some(module_id) = &args.module_id {
        deploy.insert("module_id".to_string(), json!(module_id));
    }
    if !deploy.is_empty() {
        overrides.insert("deploy".to_string(), deploy.into());
    }
    let cli_overrides = (!overrides.is_empty()).then(|| overrides.into());

    let settings = EffectiveConfig::build(args.config.as_deref(), cli_overrides)
        .and_then(|c| c.settings())
        .unwrap_or_else(|e| fail("loading config", e));

    let mut record = load_records(&args.records);
    settings.env.apply(record.env_mut());
    if let Err(e) = record.collect_env(&ProcessContext) {
        fail("collecting environment", e);
    }

    let index = match &args.index {
        Some(path) => MockArtifactIndex::from_catalog_file(path)
            .unwrap_or_else(|e| fail("loading index catalog", e)),
        None => MockArtifactIndex::new(),
    };
    let report = Reconciler::new(&index)
        .with_enabled(settings.reconcile.enabled && args.index.is_some())
        .reconcile(&mut record)
        .unwrap_or_else(|e| fail("reconciling", e));

    let module_id = settings
        .deploy
        .module_id
        .clone()
        .unwrap_or_else(|| record.name().to_string());
    let driver = JsonFileDriver::new(&settings.deploy.output);
    if let Err(e) = publish(&mut record, &driver, &module_id) {
        fail("publishing", e);
    }

    eprintln!(
        "Published {} #{} to {} ({} digests queried, {} matched, {} new artifacts)",
        record.name(),
        record.number(),
        driver.path().display(),
        report.queried_digests,
        report.matched_entries,
        report.new_artifacts
    );
}
