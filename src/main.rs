//! hcloud-image CLI entrypoint.
//!
//! This is the main entrypoint for the hcloud-image command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hcloud_image_provider::cli::{Cli, Commands, OutputFormatter, StateCommands};
use hcloud_image_provider::config::{
    find_config_file, ConfigParser, ConfigValidator, ResourceConfig, SpecHasher,
};
use hcloud_image_provider::error::Result;
use hcloud_image_provider::hcloud::HcloudConnector;
use hcloud_image_provider::planner::{PlanExecutor, ResourcePlan};
use hcloud_image_provider::provider::ImageProvider;
use hcloud_image_provider::state::{LocalStateStore, ResourceRecord, StateStore, STATE_DIR};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight calls");
            signal.cancel();
        }
    });

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Plan => cmd_plan(config_path, &cancel, &formatter).await,
        Commands::Apply { yes } => cmd_apply(config_path, yes, &cancel, &formatter).await,
        Commands::Refresh => cmd_refresh(config_path, &cancel, &formatter).await,
        Commands::Destroy { yes } => cmd_destroy(config_path, yes, &cancel, &formatter).await,
        Commands::Cleanup => cmd_cleanup(config_path, &cancel, &formatter).await,
        Commands::State { command } => cmd_state(config_path, command, &formatter).await,
    }
}

/// Validate the resource file.
fn cmd_validate(
    config_path: Option<&Path>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating resource file: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().collect(&config);
    eprint!("{}", formatter.format_validation(&config, &result, show_warnings));

    if result.is_valid() {
        Ok(())
    } else {
        // Surface the first problem as the exit error.
        ConfigValidator::new().validate(&config).map(|_| ())
    }
}

/// Show what apply would change.
async fn cmd_plan(
    config_path: Option<&Path>,
    cancel: &CancellationToken,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, store) = load_config_and_store(config_path)?;
    let provider = ImageProvider::new(HcloudConnector::new(config.provider.clone()));

    let (plan, _) = compute_plan(&provider, &config, &store, cancel).await?;

    eprint!("{}", formatter.format_plan(&plan));
    Ok(())
}

/// Converge the image to the resource file.
async fn cmd_apply(
    config_path: Option<&Path>,
    auto_approve: bool,
    cancel: &CancellationToken,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, store) = load_config_and_store(config_path)?;
    let provider = ImageProvider::new(HcloudConnector::new(config.provider.clone()));

    let (plan, prior) = compute_plan(&provider, &config, &store, cancel).await?;

    if plan.is_empty() {
        if let Some(record) = &prior {
            store.save(record).await?;
        }
        eprintln!("No changes to apply.");
        return Ok(());
    }

    eprint!("{}", formatter.format_plan(&plan));

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let executor = PlanExecutor::new(&provider, &store, cancel);
    let result = executor.execute(&plan, &config.image, prior.as_ref()).await?;

    eprint!("{}", formatter.format_execution(&result));
    Ok(())
}

/// Refresh the recorded state from the remote image.
async fn cmd_refresh(
    config_path: Option<&Path>,
    cancel: &CancellationToken,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, store) = load_config_and_store(config_path)?;
    let name = &config.resource.name;

    let Some(record) = store.load(name).await? else {
        eprintln!("No state recorded for {name}.");
        return Ok(());
    };

    let provider = ImageProvider::new(HcloudConnector::new(config.provider.clone()));
    match provider
        .read(&record.id, &config.image, &record.state, cancel)
        .await?
    {
        Some(response) => {
            let refreshed = ResourceRecord::new(response.id, name.clone(), response.state);
            store.save(&refreshed).await?;
            eprint!("{}", formatter.format_records(std::slice::from_ref(&refreshed)));
        }
        None => {
            store.remove(name).await?;
            eprint!(
                "{}",
                formatter.format_message(&format!(
                    "Image {} no longer exists, removed {name} from state.",
                    record.id
                ))
            );
        }
    }

    Ok(())
}

/// Delete the image and forget it.
async fn cmd_destroy(
    config_path: Option<&Path>,
    auto_approve: bool,
    cancel: &CancellationToken,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, store) = load_config_unvalidated(config_path)?;
    let name = &config.resource.name;

    let Some(record) = store.load(name).await? else {
        eprintln!("No image recorded for {name}.");
        return Ok(());
    };

    let plan = ResourcePlan::for_destroy(name, &record.id);
    eprint!("{}", formatter.format_plan(&plan));

    if !auto_approve
        && !confirm(
            "\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ",
            "destroy",
        )?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let provider = ImageProvider::new(HcloudConnector::new(config.provider.clone()));
    let executor = PlanExecutor::new(&provider, &store, cancel);
    let result = executor.execute(&plan, &config.image, Some(&record)).await?;

    eprint!("{}", formatter.format_execution(&result));
    Ok(())
}

/// Remove leftovers of interrupted uploads.
async fn cmd_cleanup(
    config_path: Option<&Path>,
    cancel: &CancellationToken,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config_unvalidated(config_path)?;
    let token = if config.image.token.is_empty() {
        ConfigParser::get_token()?
    } else {
        config.image.token.clone()
    };

    let provider = ImageProvider::new(HcloudConnector::new(config.provider.clone()));
    let outcome = provider.cleanup(&token, cancel).await?;

    eprint!("{}", formatter.format_cleanup(&outcome));
    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&Path>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, store) = load_config_unvalidated(config_path)?;

    match command {
        StateCommands::Show => {
            let records = store.list().await?;
            eprint!("{}", formatter.format_records(&records));
        }
        StateCommands::Rm { name } => {
            let name = name.unwrap_or_else(|| config.resource.name.clone());
            let message = if store.remove(&name).await? {
                format!("Removed {name} from state. The image itself was not deleted.")
            } else {
                format!("No state recorded for {name}.")
            };
            eprint!("{}", formatter.format_message(&message));
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Refreshes the recorded image and plans the changes needed to converge it.
///
/// Returns the plan together with the refreshed record, `None` when nothing
/// is recorded or the image vanished.
async fn compute_plan(
    provider: &ImageProvider<HcloudConnector>,
    config: &ResourceConfig,
    store: &LocalStateStore,
    cancel: &CancellationToken,
) -> Result<(ResourcePlan, Option<ResourceRecord>)> {
    let name = &config.resource.name;
    let spec = &config.image;
    let spec_hash = SpecHasher::new().hash_spec(spec);

    let refreshed = match store.load(name).await? {
        Some(record) => provider
            .read(&record.id, spec, &record.state, cancel)
            .await?
            .map(|response| ResourceRecord::new(response.id, name.clone(), response.state)),
        None => None,
    };

    let Some(record) = refreshed else {
        // Validates the spec the same way a real create would.
        let preview = provider.create(name, spec, true, cancel).await?;
        debug!("Dry-run create for {name} resolved id {}", preview.id);
        let plan = ResourcePlan::for_create(name, &spec_hash, "Image does not exist");
        return Ok((plan, None));
    };

    let diff = provider.diff(spec, &record.state);
    debug!("Diff for {name}: {diff}");
    let plan = ResourcePlan::from_diff(name, &record.id, &diff, &spec_hash);

    Ok((plan, Some(record)))
}

/// Prompts on stderr and compares the answer.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case(expected))
}

/// Resolves the resource file path.
fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.to_path_buf()))
}

fn config_dir(config_file: &Path) -> &Path {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads and validates the resource file and opens its state store.
fn load_config_and_store(
    config_path: Option<&Path>,
) -> Result<(ResourceConfig, LocalStateStore)> {
    open_resource(config_path, true)
}

/// Loads the resource file without validating the image spec.
///
/// Destroy, cleanup and state commands only need the recorded state or the
/// token.
fn load_config_unvalidated(
    config_path: Option<&Path>,
) -> Result<(ResourceConfig, LocalStateStore)> {
    open_resource(config_path, false)
}

fn open_resource(
    config_path: Option<&Path>,
    validate: bool,
) -> Result<(ResourceConfig, LocalStateStore)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading resource file from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    if validate {
        let result = ConfigValidator::new().validate(&config)?;
        for warning in &result.warnings {
            warn!("{warning}");
        }
    }

    let state_dir = config.state.path.as_ref().map_or_else(
        || config_dir(&config_file).join(STATE_DIR),
        PathBuf::from,
    );
    let store = LocalStateStore::with_base_dir(state_dir);
    debug!("Using state file {}", store.state_path().display());

    Ok((config, store))
}
