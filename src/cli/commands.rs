use crate::config::{load_config_file, resolve_config_path, ConfigLayer, GeneratorConfig};
use crate::driver::{default_registry, run_pipeline};
use crate::generator::imports::fix_imports;
use crate::generator::svc::SVC_FILE;
use crate::generator::svcimpl::{generate_rpc_impl, generate_svc_impl};
use crate::generator::writer::write_atomic;
use crate::logging::{init_logging, LogFormat};
use crate::meta::{load_document, load_interface, InterfaceMeta, ServiceMeta};
use crate::source::SourceFile;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for svcgen
///
/// Every command is incremental: existing files are extended, never overwritten.
#[derive(Debug, Parser)]
#[command(name = "svcgen", version)]
#[command(about = "Incremental service scaffolding generator", long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(
        long,
        global = true,
        value_enum,
        env = "SVCGEN_LOG_FORMAT",
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create or extend svcimpl.rs for a service trait
    Impl {
        /// Service directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Service trait source or metadata document (default: <DIR>/svc.rs)
        #[arg(short, long)]
        interface: Option<PathBuf>,
    },
    /// Create or extend the RPC implementation in svcimpl.rs
    Grpc {
        /// Service directory
        #[arg(short, long)]
        dir: PathBuf,

        /// RPC service document (JSON, YAML or TOML)
        #[arg(short, long)]
        service: PathBuf,

        /// Service trait source or metadata document; its name picks the implementing struct
        #[arg(short, long)]
        interface: Option<PathBuf>,
    },
    /// Generate models, queries, DTOs and a CRUD service from a database schema
    Db {
        /// Service directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Backend driver (sqlite, postgres, mysql, tidb, declared)
        #[arg(long, env = "SVCGEN_DRIVER")]
        driver: Option<String>,

        /// Connection string, or schema document for the declared driver
        #[arg(long, env = "SVCGEN_DSN", hide_env_values = true)]
        dsn: Option<String>,

        /// Exclude soft-deleted rows and delete by setting the soft-delete column
        #[arg(long, default_value_t = false)]
        soft_delete: bool,

        /// Soft-delete column (default: deleted_at)
        #[arg(long)]
        soft_delete_column: Option<String>,

        /// Namespace for every generated table accessor
        #[arg(long, env = "SVCGEN_TABLE_PREFIX")]
        table_prefix: Option<String>,

        /// Also generate the RPC implementation
        #[arg(long, default_value_t = false, requires = "service")]
        grpc: bool,

        /// RPC service document, used with --grpc
        #[arg(long)]
        service: Option<PathBuf>,

        /// Service trait name (default: directory name in UpperCamel case)
        #[arg(long)]
        service_name: Option<String>,

        /// Path to the config file (default: <DIR>/svcgen.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Merge, deduplicate and sort the imports of one file
    FixImports {
        /// Rust source file
        file: PathBuf,
    },
}

/// Parse arguments, install logging and execute the command
///
/// # Errors
///
/// Returns the first failure of the selected command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;
    run(cli)
}

/// Execute an already parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Impl { dir, interface } => {
            let path = interface.unwrap_or_else(|| dir.join(SVC_FILE));
            let iface = read_interface(&path)?;
            let outcome = generate_svc_impl(&dir, &iface)?;
            info!(dir = %dir.display(), ?outcome, "Service implementation done");
            Ok(())
        }
        Commands::Grpc {
            dir,
            service,
            interface,
        } => {
            let meta: ServiceMeta = load_document(&service)
                .with_context(|| format!("failed to load service {}", service.display()))?;
            let iface = rpc_interface(&dir, interface.as_deref())?;
            let (impl_name, trait_name) = match &iface {
                Some(iface) => (iface.impl_name(), Some(iface.name.as_str())),
                None => (format!("{}Impl", meta.name), None),
            };
            let outcome = generate_rpc_impl(&dir, &impl_name, trait_name, &meta)?;
            info!(dir = %dir.display(), %impl_name, ?outcome, "RPC implementation done");
            Ok(())
        }
        Commands::Db {
            dir,
            driver,
            dsn,
            soft_delete,
            soft_delete_column,
            table_prefix,
            grpc,
            service,
            service_name,
            config,
        } => {
            let flags = ConfigLayer {
                driver,
                dsn,
                soft_delete: soft_delete.then_some(true),
                soft_delete_column,
                table_prefix,
                grpc: grpc.then_some(true),
                service,
                service_name,
            };
            let config = db_config(dir, flags, config.as_deref())?;
            run_pipeline(&default_registry(), &config)?;
            info!(dir = %config.dir.display(), driver = %config.driver, "Database service done");
            Ok(())
        }
        Commands::FixImports { file } => {
            let src = SourceFile::read(&file)?;
            let fixed = fix_imports(&src, &[])?;
            let outcome = write_atomic(&file, &fixed)?;
            info!(file = %file.display(), ?outcome, "Imports fixed");
            Ok(())
        }
    }
}

/// Flags over the config file over defaults
pub fn db_config(dir: PathBuf, flags: ConfigLayer, explicit: Option<&Path>) -> Result<GeneratorConfig> {
    let layer = match resolve_config_path(explicit, &dir)? {
        Some(path) => {
            let file = load_config_file(&path)?.unwrap_or_default();
            info!(path = %path.display(), "Loaded config file");
            flags.or(file)
        }
        None => flags,
    };
    Ok(GeneratorConfig::from_layer(dir, layer))
}

fn read_interface(path: &Path) -> Result<InterfaceMeta> {
    load_interface(path).with_context(|| format!("failed to read interface from {}", path.display()))
}

/// The interface an RPC service is implemented for: `--interface`, else `<DIR>/svc.rs`
fn rpc_interface(dir: &Path, interface: Option<&Path>) -> Result<Option<InterfaceMeta>> {
    let path = match interface {
        Some(path) => Some(path.to_path_buf()),
        None => Some(dir.join(SVC_FILE)).filter(|p| p.exists()),
    };
    path.map(|p| read_interface(&p)).transpose()
}
