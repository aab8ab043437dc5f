//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use intakeforge_core::{
    ProgressReporter, available_account_names, build_household_context, build_meeting_prep,
    find_account_workbook, parse_intake, register_household, render_documents, write_documents,
};
use intakeforge_forms::{CATALOG, DocumentKind, MAX_ADVISOR_ACCOUNTS, MappingContext, lookup};
use intakeforge_intake::AccountWorkbook;
use intakeforge_render::RenderOptions;
use intakeforge_shared::{AppConfig, init_config, load_config, load_config_from};
use intakeforge_storage::{HouseholdStore, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// IntakeForge — turn household intake sheets into account-opening documents.
#[derive(Parser)]
#[command(
    name = "intakeforge",
    version,
    about = "Turn household intake spreadsheets into account-opening documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.intakeforge/intakeforge.toml.
    #[arg(long, global = true, env = "INTAKEFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse an intake file and show the household it describes.
    Parse {
        /// Intake workbook (.xlsx, .xls, .ods) or .csv file.
        file: PathBuf,

        /// Print the parsed result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render account-opening documents for an intake file.
    Render {
        /// Intake workbook (.xlsx, .xls, .ods) or .csv file.
        file: PathBuf,

        /// Document key to render (repeatable). See `intakeforge forms`.
        #[arg(long = "doc", required_unless_present = "all")]
        docs: Vec<String>,

        /// Render every document in the catalog.
        #[arg(long, conflicts_with = "docs")]
        all: bool,

        /// Output directory (defaults to config `output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Directory holding fillable templates (defaults to config `forms_dir`).
        #[arg(long)]
        forms: Option<PathBuf>,

        #[command(flatten)]
        accounts: AccountArgs,
    },

    /// Register the intake's household and create its contact record.
    Register {
        /// Intake workbook (.xlsx, .xls, .ods) or .csv file.
        file: PathBuf,
    },

    /// List registered households.
    List,

    /// Print the context block for a registered household.
    Context {
        /// Household display name (case-insensitive).
        name: String,

        /// Account workbook to include (defaults to a lookup in config `accounts_dir`).
        #[arg(long = "accounts", value_name = "FILE")]
        workbook: Option<PathBuf>,
    },

    /// Print the meeting-prep one-pager from a household's account workbook.
    Prep {
        /// Household display name.
        name: String,

        /// Account workbook to use (defaults to a lookup in config `accounts_dir`).
        #[arg(long = "accounts", value_name = "FILE")]
        workbook: Option<PathBuf>,
    },

    /// List the documents that can be rendered.
    Forms,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Account numbers for the advisor and journal forms.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct AccountArgs {
    /// Brokerage account number for the advisor form (repeatable or comma-separated).
    #[arg(long = "account", value_name = "NUMBER", value_delimiter = ',')]
    pub accounts: Vec<String>,

    /// Receiving account number on journal requests.
    #[arg(long, value_name = "NUMBER")]
    pub receiving_account: Option<String>,

    /// Receiving account owner on journal requests (defaults to the client name).
    #[arg(long, value_name = "NAME")]
    pub receiving_owner: Option<String>,
}

impl AccountArgs {
    /// Copy the flags into `ctx`. More than the form's account slots is an error.
    fn apply(self, ctx: &mut MappingContext) -> Result<()> {
        let accounts: Vec<String> = self
            .accounts
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if accounts.len() > MAX_ADVISOR_ACCOUNTS {
            return Err(eyre!(
                "{} account numbers given; the advisor form holds at most {MAX_ADVISOR_ACCOUNTS}",
                accounts.len()
            ));
        }
        ctx.account_numbers = accounts;
        if let Some(account) = self.receiving_account {
            ctx.receiving_account = account.trim().to_string();
        }
        if let Some(owner) = self.receiving_owner {
            ctx.receiving_owner = owner.trim().to_string();
        }
        Ok(())
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "intakeforge=info",
        1 => "intakeforge=debug",
        _ => "intakeforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Parse { file, json } => cmd_parse(&file, json),
        Command::Render {
            file,
            docs,
            all,
            out,
            forms,
            accounts,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_render(&config, &file, &docs, all, out, forms, accounts)
        }
        Command::Register { file } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_register(&config, &file).await
        }
        Command::List => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_list(&config).await
        }
        Command::Context { name, workbook } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_context(&config, &name, workbook).await
        }
        Command::Prep { name, workbook } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_prep(&config, &name, workbook)
        }
        Command::Forms => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_forms(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_parse(file: &Path, json: bool) -> Result<()> {
    let intake = parse_intake(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&intake)?);
        return Ok(());
    }

    let household = &intake.household;
    println!();
    println!("  Layout:     {:?}", intake.layout.kind);
    println!("  Parties:    {}", intake.parties.len());
    println!("  Household:  {}", household.display_name());
    if let Some(co) = &household.co_holder {
        println!("  Co-holder:  {}", co.name);
    }
    for (idx, dep) in household.dependents.iter().enumerate() {
        println!("  Dependent {}: {}", idx + 1, dep.name);
    }
    println!();
    for (label, value) in household.flat_fields() {
        if !value.is_empty() {
            println!("  {label:<28} {value}");
        }
    }

    let gaps: Vec<&str> = intake
        .parties
        .iter()
        .flat_map(|p| p.gaps.iter().map(|g| g.label.as_str()))
        .collect();
    if !gaps.is_empty() {
        println!();
        println!("  Unrecognised labels ({}): {}", gaps.len(), gaps.join(", "));
    }
    println!();
    Ok(())
}

fn cmd_render(
    config: &AppConfig,
    file: &Path,
    docs: &[String],
    all: bool,
    out: Option<PathBuf>,
    forms: Option<PathBuf>,
    accounts: AccountArgs,
) -> Result<()> {
    let kinds: Vec<DocumentKind> = if all {
        DocumentKind::ALL.to_vec()
    } else {
        docs.iter()
            .map(|key| lookup(key).map(|spec| spec.kind))
            .collect::<intakeforge_shared::Result<_>>()?
    };

    let today = chrono::Local::now().date_naive();
    let mut opts = RenderOptions::from_config(config, today)?;
    if let Some(dir) = forms {
        opts.forms_dir = dir;
    }
    let out_dir = match out {
        Some(dir) => dir,
        None => config.output_dir()?,
    };
    let ctx = mapping_context(config, today, accounts)?;

    let intake = parse_intake(file)?;
    let name = intake.household.display_name();
    info!(household = %name, documents = kinds.len(), "rendering documents");

    let reporter = CliProgress::new();
    let outcomes = render_documents(&intake, &kinds, &ctx, &opts, &reporter);
    reporter.finish();

    let written = write_documents(&out_dir, &name, &outcomes)?;

    println!();
    for outcome in &outcomes {
        let spec = outcome.kind.spec();
        match &outcome.result {
            Ok(doc) => println!(
                "  ok    {:<20} {:<9} {} page(s), {} field(s)",
                spec.key, doc.mode, doc.page_count, doc.fields_written
            ),
            Err(e) => println!("  FAIL  {:<20} {e}", spec.key),
        }
        if !outcome.missing_required.is_empty() {
            let missing: Vec<&str> = outcome.missing_required.iter().map(|f| f.label()).collect();
            println!("        missing: {}", missing.join(", "));
        }
    }
    println!();
    println!("  Output:   {}", written.out_dir.display());
    println!("  Manifest: {}", written.manifest_path.display());
    println!();

    let failed = written.manifest.failures.len();
    if failed > 0 {
        return Err(eyre!("{failed} document(s) failed to render"));
    }
    Ok(())
}

async fn cmd_register(config: &AppConfig, file: &Path) -> Result<()> {
    let intake = parse_intake(file)?;
    let storage = Storage::open(&config.database_path()?).await?;

    let registration = register_household(&storage, &intake.household).await?;

    println!();
    println!("  Household registered!");
    println!("  Name:       {}", registration.household.name);
    println!("  Contact ID: {}", registration.contact_id);
    println!("  Household:  {}", registration.household.id);
    if !registration.contact.notes.is_empty() {
        println!("  Notes:      {}", registration.contact.notes);
    }
    println!();
    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let path = config.database_path()?;
    if !path.is_file() {
        println!("No households registered yet.");
        return Ok(());
    }
    let storage = Storage::open_readonly(&path).await?;
    let households = storage.list_households().await?;
    if households.is_empty() {
        println!("No households registered yet.");
        return Ok(());
    }

    for h in households {
        println!(
            "  {:<32} {:<18} {}",
            h.name,
            h.contact_id.as_deref().unwrap_or("-"),
            h.registered_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn mapping_context(
    config: &AppConfig,
    today: chrono::NaiveDate,
    accounts: AccountArgs,
) -> Result<MappingContext> {
    let mut ctx = MappingContext::from_config(config, today);
    accounts.apply(&mut ctx)?;
    Ok(ctx)
}

async fn cmd_context(config: &AppConfig, name: &str, workbook: Option<PathBuf>) -> Result<()> {
    let storage = Storage::open_readonly(&config.database_path()?).await?;
    let stored = storage
        .load_household(name)
        .await?
        .ok_or_else(|| eyre!("no registered household named '{name}'"))?;

    let book = match workbook {
        Some(path) => Some(path),
        None => find_account_workbook(&config.accounts_dir()?, &stored.name)?,
    }
    .map(|path| AccountWorkbook::load(&path))
    .transpose()?;

    print!("{}", build_household_context(&stored, book.as_ref()));
    Ok(())
}

fn cmd_prep(config: &AppConfig, name: &str, workbook: Option<PathBuf>) -> Result<()> {
    let path = match workbook {
        Some(path) => path,
        None => {
            let dir = config.accounts_dir()?;
            match find_account_workbook(&dir, name)? {
                Some(path) => path,
                None => {
                    let available = available_account_names(&dir)?;
                    return Err(if available.is_empty() {
                        eyre!("no account workbooks in {}", dir.display())
                    } else {
                        eyre!(
                            "no account workbook for '{name}'. Available: {}",
                            available.join(", ")
                        )
                    });
                }
            }
        }
    };

    info!(household = %name, path = %path.display(), "building meeting prep");
    let book = AccountWorkbook::load(&path)?;
    let today = chrono::Local::now().date_naive();
    print!("{}", build_meeting_prep(name, &book, today));
    Ok(())
}

fn cmd_forms(config: &AppConfig) -> Result<()> {
    let forms_dir = config.forms_dir()?;
    for spec in &CATALOG {
        let accounts: Vec<String> = spec.account_types.iter().map(ToString::to_string).collect();
        let template = if forms_dir.join(spec.template).is_file() {
            "template"
        } else {
            "data sheet"
        };
        println!(
            "  {:<20} {:<38} {:<24} {}",
            spec.key,
            spec.label,
            accounts.join(", "),
            template
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(format!("Rendering {name}"));
    }

    fn document_rendered(&self, kind: DocumentKind, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendered [{current}/{total}] {kind}"));
    }
}
