//! The `cpk` command.
//!
//! Stores credentials at typed graph paths, generates passwords, and
//! manages portable encrypted wallets.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use cpk::entry::{define_attribute, list_children, read_value, store_value};
use cpk::graph::{parse_path, DEFAULT_ATTRIBUTE};
use cpk::{
    open_wallet, save_wallet, Config, CpkError, FileBackend, GraphStore, PassphraseAdapter,
    Record, Service,
};

/// Environment variable holding the passphrase, for non-interactive use.
const PASSPHRASE_ENV: &str = "CPK_PASSPHRASE";

// ── Context ───────────────────────────────────────────────────────────────────

struct Ctx {
    config_path: PathBuf,
    config: Config,
    data_dir: PathBuf,
    verbose: bool,
}

impl Ctx {
    fn load(
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => Config::default_path()?,
        };
        let config = Config::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        let data_dir = Config::data_dir(data_dir)?;
        log::debug!(
            "config {}, data dir {}",
            config_path.display(),
            data_dir.display()
        );
        Ok(Self {
            config_path,
            config,
            data_dir,
            verbose,
        })
    }

    fn graph_path(&self) -> PathBuf {
        self.config.graph_path(&self.data_dir)
    }

    fn wallet_path(&self) -> PathBuf {
        self.config.wallet_path(&self.data_dir)
    }

    /// Open the graph store, refusing to create one implicitly.
    fn open_store(&self) -> Result<GraphStore<FileBackend>> {
        let path = self.graph_path();
        if !path.exists() {
            bail!(
                "no graph store at {} (run `cpk init` first)",
                path.display()
            );
        }
        let store = GraphStore::open(FileBackend::new(&path), self.config.store_options())
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(store)
    }
}

// ── Input helpers ─────────────────────────────────────────────────────────────

fn read_line() -> std::io::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

fn read_passphrase() -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    eprint!("Passphrase: ");
    let passphrase = read_line().context("failed to read passphrase")?;
    if passphrase.is_empty() {
        return Err(anyhow!("passphrase cannot be empty"));
    }
    Ok(passphrase)
}

/// Run the configured generator; its stdout minus the final newline is the
/// new value.
fn generate_value(generator: &str) -> Result<String> {
    let mut parts = generator.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("password_generator is not configured"))?;
    let output = Command::new(program)
        .args(parts)
        .output()
        .with_context(|| format!("failed to run {program}"))?;
    if !output.status.success() {
        bail!("{program} exited with {}", output.status);
    }
    let mut value = String::from_utf8(output.stdout).context("generator output is not UTF-8")?;
    if value.ends_with('\n') {
        value.pop();
    }
    if value.is_empty() {
        bail!("{program} produced no output");
    }
    Ok(value)
}

fn parse_assignment(token: &str) -> Result<(String, String)> {
    token
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| anyhow!("expected key=value, got {token:?}"))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// cpk: credentials addressed by typed paths such as
/// `service=mail user=alice`.
#[derive(Parser, Debug)]
#[command(
    name = "cpk",
    about = "Credential store with typed graph addressing",
    version,
    long_about = "cpk: credential store\n\nStore, generate and look up secrets at paths of attr=value steps,\nand keep portable encrypted wallets of service records."
)]
struct Cli {
    /// Configuration file (default: <config dir>/cpk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (default: $CPK_DATA_DIR or <data dir>/cpk)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration and create the graph store
    Init,

    /// Store a value at a path, generating passwords
    New {
        /// Overwrite an existing value
        #[arg(short, long, conflicts_with = "stdin")]
        force: bool,

        /// Read the value from stdin instead of running the generator
        #[arg(long)]
        stdin: bool,

        /// Create an attribute: TOKENS are NAME [DESCRIPTION]
        #[arg(short, long)]
        attribute: bool,

        /// Path tokens: `attr=value`, `value` or `attr=`
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// Print the value stored at a path
    Get {
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// List the nodes below a path
    Ls { tokens: Vec<String> },

    /// Manage the wallet file
    Wallet {
        #[command(subcommand)]
        subcommand: WalletCommands,
    },
}

#[derive(Subcommand, Debug)]
enum WalletCommands {
    /// List declared services
    Services,

    /// List records
    Records {
        /// Only records of this service
        #[arg(long)]
        service: Option<String>,

        /// Print secret attributes instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Declare a service
    AddService {
        name: String,

        /// Identifier attribute (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Secret attribute (repeatable)
        #[arg(long = "secret")]
        secrets: Vec<String>,
    },

    /// Add a record to a declared service
    AddRecord {
        service: String,

        /// Attribute values as key=value
        #[arg(required = true)]
        attrs: Vec<String>,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = Ctx::load(cli.config, cli.data_dir, cli.verbose).and_then(|ctx| {
        match cli.command {
            Commands::Init => cmd_init(&ctx),
            Commands::New {
                attribute: true,
                tokens,
                ..
            } => cmd_new_attribute(&ctx, &tokens),
            Commands::New {
                force,
                stdin,
                tokens,
                ..
            } => cmd_new(&ctx, &tokens, force, stdin),
            Commands::Get { tokens } => cmd_get(&ctx, &tokens),
            Commands::Ls { tokens } => cmd_ls(&ctx, &tokens),
            Commands::Wallet { subcommand } => match subcommand {
                WalletCommands::Services => cmd_wallet_services(&ctx),
                WalletCommands::Records { service, reveal } => {
                    cmd_wallet_records(&ctx, service.as_deref(), reveal)
                }
                WalletCommands::AddService { name, ids, secrets } => {
                    cmd_wallet_add_service(&ctx, name, ids, secrets)
                }
                WalletCommands::AddRecord { service, attrs } => {
                    cmd_wallet_add_record(&ctx, &service, &attrs)
                }
            },
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `cpk init`
fn cmd_init(ctx: &Ctx) -> Result<()> {
    if !ctx.config_path.exists() {
        ctx.config
            .save(&ctx.config_path)
            .context("failed to write configuration")?;
        println!("Wrote {}", ctx.config_path.display());
    }

    let graph_path = ctx.graph_path();
    if graph_path.exists() {
        println!("Graph store already initialized at {}", graph_path.display());
        return Ok(());
    }

    let store = GraphStore::open(FileBackend::new(&graph_path), ctx.config.store_options())
        .context("failed to create graph store")?;
    println!("Initialized graph store at {}", graph_path.display());
    if ctx.verbose {
        println!("  Nodes:      {}", store.node_count());
        println!("  Attributes: {}", store.registry().len());
    }
    Ok(())
}

/// `cpk new [--force | --stdin] TOKEN...`
fn cmd_new(ctx: &Ctx, tokens: &[String], force: bool, stdin: bool) -> Result<()> {
    let path = parse_path(tokens)?;
    let mut store = ctx.open_store()?;
    let adapter = PassphraseAdapter::new(read_passphrase()?);
    let policy = ctx.config.terminal_policy();
    let password_name = store.registry().password_name().map(str::to_string);
    let generator = ctx.config.password_generator.as_str();

    let mut generated = None;
    let id = store_value(&mut store, &path, &policy, force, &adapter, |target| {
        let is_password = match (target, &password_name) {
            (Some(attr), Some(name)) => &attr.name == name,
            _ => false,
        };
        if is_password && !stdin {
            let value = generate_value(generator)
                .map_err(|e| CpkError::Config(format!("password generator: {e:#}")))?;
            generated = Some(value.clone());
            Ok(value)
        } else {
            Ok(read_line()?)
        }
    })
    .map_err(|e| match e {
        CpkError::AlreadyExists(path) => anyhow!("{path} already has a value (use --force)"),
        other => other.into(),
    })?;

    if let Some(value) = generated {
        println!("{value}");
    }
    if ctx.verbose {
        eprintln!("Stored at {id}");
    }
    Ok(())
}

/// `cpk new --attribute NAME [DESCRIPTION]`
fn cmd_new_attribute(ctx: &Ctx, tokens: &[String]) -> Result<()> {
    let (name, description) = match tokens {
        [name] => (name, None),
        [name, description] => (name, Some(description.clone())),
        _ => bail!("expected NAME [DESCRIPTION]"),
    };
    let mut store = ctx.open_store()?;
    let id = define_attribute(&mut store, name, description)?;
    if ctx.verbose {
        println!("Created attribute {name} ({id})");
    }
    Ok(())
}

/// `cpk get TOKEN...`
fn cmd_get(ctx: &Ctx, tokens: &[String]) -> Result<()> {
    let path = parse_path(tokens)?;
    let store = ctx.open_store()?;
    let adapter = PassphraseAdapter::new(read_passphrase()?);
    let value = read_value(&store, &path, &ctx.config.terminal_policy(), &adapter)?;
    println!("{value}");
    Ok(())
}

/// `cpk ls [TOKEN...]`
fn cmd_ls(ctx: &Ctx, tokens: &[String]) -> Result<()> {
    let path = parse_path(tokens)?;
    let store = ctx.open_store()?;
    let policy = ctx.config.terminal_policy();

    for (attribute, node) in list_children(&store, &path)? {
        if Some(attribute.name.as_str()) == policy.implicit_type() {
            println!("{}=********", attribute.name);
        } else if attribute.name == DEFAULT_ATTRIBUTE {
            println!("{}", node.value);
        } else {
            println!("{}={}", attribute.name, node.value);
        }
    }
    Ok(())
}

fn open_wallet_file(ctx: &Ctx) -> Result<(PathBuf, PassphraseAdapter, cpk::Wallet)> {
    let path = ctx.wallet_path();
    let adapter = PassphraseAdapter::new(read_passphrase()?);
    let wallet = open_wallet(&path, &adapter)
        .with_context(|| format!("failed to open wallet {}", path.display()))?;
    Ok((path, adapter, wallet))
}

fn save_wallet_file(path: &Path, wallet: &cpk::Wallet, adapter: &PassphraseAdapter) -> Result<()> {
    save_wallet(path, wallet, adapter)
        .with_context(|| format!("failed to save wallet {}", path.display()))
}

/// `cpk wallet services`
fn cmd_wallet_services(ctx: &Ctx) -> Result<()> {
    let (_, _, wallet) = open_wallet_file(ctx)?;
    if wallet.services().is_empty() {
        println!("No services.");
        return Ok(());
    }
    for service in wallet.services() {
        println!("{service}");
    }
    Ok(())
}

/// `cpk wallet records [--service NAME] [--reveal]`
fn cmd_wallet_records(ctx: &Ctx, service: Option<&str>, reveal: bool) -> Result<()> {
    let (_, _, wallet) = open_wallet_file(ctx)?;
    if let Some(name) = service {
        wallet.get_service(name)?;
    }

    let records: Vec<&Record> = match service {
        Some(name) => wallet.records_for(name).collect(),
        None => wallet.records().iter().collect(),
    };
    for record in records {
        let attrs: Vec<String> = record
            .attrs()
            .iter()
            .map(|(k, v)| {
                if record.service().is_secret(k) && !reveal {
                    format!("{k}=********")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect();
        println!("{}: {}", record.service().name(), attrs.join(" "));
    }
    Ok(())
}

/// `cpk wallet add-service NAME --id ATTR... --secret ATTR...`
fn cmd_wallet_add_service(
    ctx: &Ctx,
    name: String,
    ids: Vec<String>,
    secrets: Vec<String>,
) -> Result<()> {
    let (path, adapter, mut wallet) = open_wallet_file(ctx)?;
    let service = Service::new(name, ids, secrets)?;
    let label = service.to_string();
    wallet.add_service(service)?;
    save_wallet_file(&path, &wallet, &adapter)?;
    if ctx.verbose {
        println!("Added service {label}");
    }
    Ok(())
}

/// `cpk wallet add-record SERVICE KEY=VALUE...`
fn cmd_wallet_add_record(ctx: &Ctx, service: &str, attrs: &[String]) -> Result<()> {
    let attrs = attrs
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>>>()?;

    let (path, adapter, mut wallet) = open_wallet_file(ctx)?;
    let service = wallet.get_service(service)?.clone();
    let record = Record::new(&service, attrs)?;
    wallet.add_record(record)?;
    save_wallet_file(&path, &wallet, &adapter)?;
    if ctx.verbose {
        println!(
            "Added record to {} ({} total)",
            service.name(),
            wallet.records_for(service.name()).count()
        );
    }
    Ok(())
}
