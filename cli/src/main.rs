use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use console::style;
use minimanus_core::agent::{self, Profile};
use minimanus_core::{DEFAULT_SESSION, HistoryStore, config, history, providers};
use std::path::PathBuf;
use tracing::error;

mod logging;
mod onboard;
mod skills;
mod templates;

#[derive(Parser)]
#[command(name = "minimanus")]
#[command(about = "minimanus - a minimal tool-using agent loop", long_about = None)]
struct Cli {
    /// Log debug output to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive setup of ~/.minimanus/config.toml
    Onboard,
    /// Run a single task until the agent terminates
    Run {
        #[arg(short, long)]
        task: String,
        #[arg(short, long, default_value_t = Profile::Tools)]
        profile: Profile,
        #[arg(long)]
        max_steps: Option<usize>,
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
        /// Only log to the console
        #[arg(long)]
        no_log_file: bool,
        #[arg(long, default_value = DEFAULT_SESSION)]
        session_id: String,
        /// History compression threshold in estimated tokens
        #[arg(long)]
        max_tokens: Option<usize>,
    },
    /// List the tools a profile would advertise
    Tools {
        #[arg(short, long, default_value_t = Profile::Tools)]
        profile: Profile,
    },
    /// Show or clear stored conversation history
    History {
        #[arg(long, default_value = DEFAULT_SESSION)]
        session_id: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        clear: bool,
    },
    /// Manage installed skills
    Skills {
        #[command(subcommand)]
        command: skills::SkillsCommands,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::load_dotenv();

    let Some(command) = cli.command else {
        if !config::config_exists() {
            return onboard_and_save();
        }
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Onboard => onboard_and_save()?,
        Commands::Run {
            task,
            profile,
            max_steps,
            log_dir,
            no_log_file,
            session_id,
            max_tokens,
        } => {
            let log_path = logging::init(cli.verbose, (!no_log_file).then_some(log_dir.as_path()))?;

            let mut config = config::Config::load_or_init()?;
            if max_steps.is_some() {
                config.max_steps = max_steps;
            }
            if let Some(max_tokens) = max_tokens {
                config.context.max_tokens = max_tokens;
            }

            let provider = providers::create_provider(&config)?;
            let history = if profile.uses_history() {
                let store = history::create_history(Some(&config.history_db()))?;
                Some((store, session_id))
            } else {
                None
            };

            let agent = agent::build_agent(profile, &config, provider, history).await;

            println!("{} {}", style("Task:").cyan().bold(), task);
            match agent.run(&task).await {
                Ok(outcome) => {
                    println!();
                    println!("{}", outcome.answer);
                    println!();
                    println!(
                        "{}",
                        style(format!("Finished in {} step(s)", outcome.steps)).dim()
                    );
                }
                Err(e) => {
                    error!("Run failed: {}", e);
                    if let Some(path) = log_path {
                        eprintln!("See {} for the full trace.", path.display());
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Tools { profile } => {
            logging::init(cli.verbose, None)?;
            let config = config::Config::load_or_init()?;
            let registry = agent::build_registry(profile, &config).await;

            println!(
                "{} Profile '{}' advertises {} tool(s)",
                style("✓").green().bold(),
                profile,
                registry.len()
            );
            println!();
            for spec in registry.schemas() {
                println!("  {} - {}", style(&spec.name).white().bold(), spec.description);
            }
        }
        Commands::History {
            session_id,
            limit,
            clear,
        } => {
            logging::init(cli.verbose, None)?;
            let config = config::Config::load_or_init()?;
            let store = history::create_history(Some(&config.history_db()))?;

            if clear {
                let removed = store.clear(&session_id).await?;
                println!(
                    "{} Removed {} record(s) from session '{}'",
                    style("✓").green().bold(),
                    removed,
                    session_id
                );
                return Ok(());
            }

            let total = store.count(&session_id).await?;
            let records = store.recent(&session_id, limit).await?;
            println!(
                "Session '{}': showing {} of {} record(s)",
                session_id,
                records.len(),
                total
            );
            println!();
            for record in records {
                println!(
                    "{} {}: {}",
                    style(&record.created_at).dim(),
                    style(record.role).cyan(),
                    record.content
                );
            }
        }
        Commands::Skills { command } => {
            let config = config::Config::load_or_init()?;
            skills::handle_command(command, &config.skills_dir())?;
        }
    }

    Ok(())
}

fn onboard_and_save() -> Result<()> {
    let onboard_config = onboard::run_onboard().map_err(|e| {
        eprintln!("Onboarding failed: {}", e);
        anyhow::anyhow!("Onboarding failed: {}", e)
    })?;
    config::save_config(&onboard_config)?;
    Ok(())
}
