use addedat_models::ItemType;
use addedat_sources::SourceError;
use clap::{ArgAction, Parser, Subcommand};
use commands::config::ConfigCommands;
use commands::items::ItemsArgs;
use commands::select::SelectCommands;
use commands::update::UpdateArgs;
use commands::{config, items, sections, select, update, ConnectionArgs};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

/// Exit status when no Plex URL or token could be resolved.
const EXIT_MISSING_CREDENTIALS: i32 = 2;

#[derive(Parser)]
#[command(name = "addedat")]
#[command(about = "Bulk-edit the Added date of Plex library items")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the added date of matching, listed or selected items
    #[command(long_about = "Set the addedAt date of library items. Targets come from --ids, from the saved selection (--selected), or from walking the section with the optional --year and --title-contains filters. Each write is retried up to 4 times with backoff; failures are reported per item and never abort the run.")]
    Update(UpdateArgs),

    /// List library sections
    Sections {
        /// Only sections holding this type
        #[arg(long = "type", value_name = "TYPE")]
        item_type: Option<ItemType>,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Browse one page of a library section
    Items(ItemsArgs),

    /// Build the saved selection used by `update --selected`
    Select {
        #[command(subcommand)]
        cmd: SelectCommands,
    },

    /// Show or change configuration and credentials
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

/// Process exit status for a failed command.
fn exit_code(err: &color_eyre::Report) -> i32 {
    match err.downcast_ref::<SourceError>() {
        Some(SourceError::MissingCredentials) => EXIT_MISSING_CREDENTIALS,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    let result = match cli.command {
        Commands::Update(args) => update::run_update(args, &output).await,
        Commands::Sections { item_type, connection } => sections::run_sections(item_type, connection, &output).await,
        Commands::Items(args) => items::run_items(args, &output).await,
        Commands::Select { cmd } => select::run_select(cmd, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
    };

    match result {
        Err(e) if exit_code(&e) == EXIT_MISSING_CREDENTIALS => {
            output.error(format!(
                "Missing {} or {} (flags, environment or 'addedat config plex')",
                addedat_config::ENV_BASE_URL,
                addedat_config::ENV_TOKEN
            ));
            std::process::exit(EXIT_MISSING_CREDENTIALS);
        }
        other => other,
    }
}
