mod setup;
mod store;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{Write, stdout};
use std::path::PathBuf;

use stellatrack_core::{ErrorKind, LevelOutcome, Role, RunRepository, TrackerError};
use store::FileStore;

#[derive(Debug, Parser)]
#[command(name = "stellatrack", version)]
#[command(about = "Plan potential runs: one main and two supports, capacity-limited targets, portable exports")]
struct Args {
    /// Directory holding the saved runs
    #[arg(long, global = true, default_value = ".stellatrack")]
    data_dir: PathBuf,

    /// Tracker config JSON (max level, base capacities, asset URLs)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON to use instead of the built-in roster
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List catalog characters
    Characters,
    /// Show a character's potential pool for a role
    Catalog {
        char_id: String,
        #[arg(value_parser = parse_role)]
        role: Role,
        /// Only show potentials whose name or description contains this text
        #[arg(long)]
        search: Option<String>,
        /// Mark potentials already assigned in this run
        #[arg(long)]
        run: Option<String>,
    },
    /// List saved runs
    List {
        /// Print the stored run documents as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an empty run
    Create {
        #[arg(long)]
        name: Option<String>,
        main: String,
        sup1: String,
        sup2: String,
    },
    /// Show a run with capacity and targets per character
    Show { run: String },
    /// Assign a potential to a run at level 1
    Add {
        run: String,
        potential: String,
        /// Owning character (defaults to the potential's owner)
        #[arg(long = "char")]
        char_id: Option<String>,
    },
    /// Raise or lower a target's level by DELTA
    Level {
        run: String,
        potential: String,
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },
    /// Remove a target from a run
    Remove { run: String, potential: String },
    /// Delete a run
    Delete { run: String },
    /// Show aggregate stat bonuses of a run
    Stats { run: String },
    /// Write a run to a portable JSON file
    Export {
        run: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Import a run from a portable JSON file
    Import { file: PathBuf },
}

fn parse_role(label: &str) -> Result<Role, String> {
    Role::parse(label).ok_or_else(|| format!("unknown role '{label}' (expected main or support)"))
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(args) {
        report_failure(&err);
        std::process::exit(1);
    }
}

fn report_failure(err: &anyhow::Error) {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<TrackerError>())
        .map(TrackerError::kind);
    match kind {
        Some(ErrorKind::CapacityExceeded) => {
            eprintln!("{} {err:#}", "⚠️  Capacity reached:".yellow().bold());
        }
        Some(ErrorKind::MalformedImport) => {
            eprintln!("{} {err:#}", "❌ Invalid file:".red().bold());
        }
        Some(ErrorKind::PersistenceFailure) => {
            eprintln!("{} {err:#}", "❌ Not saved:".red().bold());
        }
        _ => eprintln!("{} {err:#}", "❌".red()),
    }
}

/// Resolve a run by id, falling back to an exact name match.
fn resolve_run(repo: &RunRepository<FileStore>, selector: &str) -> Result<String, TrackerError> {
    repo.run(selector)
        .or_else(|| repo.runs().iter().find(|r| r.name == selector))
        .map(|r| r.id.clone())
        .ok_or_else(|| TrackerError::RunNotFound(selector.to_string()))
}

fn run(args: Args) -> Result<()> {
    let mut repo = setup::open_repository(
        &args.data_dir,
        args.config.as_deref(),
        args.catalog.as_deref(),
    )?;
    let mut out = stdout().lock();

    match args.command {
        Command::Characters => {
            for character in &repo.catalog().characters {
                writeln!(
                    out,
                    "{:<4} {:<10} {:?}",
                    character.id,
                    character.name.bold(),
                    character.element
                )?;
            }
        }
        Command::Catalog {
            char_id,
            role,
            search,
            run,
        } => {
            if repo.catalog().character(&char_id).is_none() {
                return Err(TrackerError::CharacterNotFound(char_id).into());
            }
            let selected = match run {
                Some(selector) => Some(resolve_run(&repo, &selector)?),
                None => None,
            };
            let pool = repo.catalog().potentials_for(&char_id, role);
            let run = selected.as_deref().and_then(|id| repo.run(id));
            view::render_pool(&mut out, &pool, role, run, search.as_deref())?;
        }
        Command::List { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(repo.runs())?)?;
            } else if repo.runs().is_empty() {
                writeln!(out, "{}", "No runs found. Start a new journey.".dimmed())?;
            } else {
                for run in repo.runs() {
                    view::render_run_summary(&mut out, repo.catalog(), run)?;
                }
            }
        }
        Command::Create {
            name,
            main,
            sup1,
            sup2,
        } => {
            let name = name.unwrap_or_else(|| repo.suggested_run_name());
            let run = repo
                .create_run(&name, &main, &sup1, &sup2)
                .context("creating run")?;
            writeln!(out, "✅ Created run {} ({})", run.id.bold(), run.name)?;
        }
        Command::Show { run } => {
            let id = resolve_run(&repo, &run)?;
            if let Some(run) = repo.run(&id) {
                view::render_run(&mut out, repo.catalog(), repo.config(), run)?;
            }
        }
        Command::Add {
            run,
            potential,
            char_id,
        } => {
            let id = resolve_run(&repo, &run)?;
            let char_id = char_id
                .or_else(|| repo.catalog().potential(&potential).map(|p| p.char_id.clone()))
                .unwrap_or_default();
            let updated = repo
                .add_target(&id, &potential, &char_id)
                .with_context(|| format!("adding {potential}"))?;
            writeln!(out, "✅ Added {} to {}", potential.bold(), updated.name)?;
            if let Some(role) = repo.catalog().potential(&potential).map(|p| p.role) {
                view::render_capacity(&mut out, &repo.capacity(&id, &char_id, role)?)?;
            }
        }
        Command::Level {
            run,
            potential,
            delta,
        } => {
            let id = resolve_run(&repo, &run)?;
            match repo
                .set_level(&id, &potential, delta)
                .with_context(|| format!("leveling {potential}"))?
            {
                LevelOutcome::Changed(change) => {
                    writeln!(
                        out,
                        "✅ {} Lv {} → {}",
                        potential.bold(),
                        change.previous_level,
                        change.target.level
                    )?;
                    view::render_capacity(&mut out, &change.capacity)?;
                }
                LevelOutcome::Unchanged(target) => {
                    writeln!(
                        out,
                        "{} stays at Lv {}",
                        potential.bold(),
                        target.level
                    )?;
                }
            }
        }
        Command::Remove { run, potential } => {
            let id = resolve_run(&repo, &run)?;
            repo.remove_target(&id, &potential)
                .with_context(|| format!("removing {potential}"))?;
            writeln!(out, "🗑️  Removed {}", potential.bold())?;
        }
        Command::Delete { run } => {
            let id = resolve_run(&repo, &run)?;
            repo.delete_run(&id).context("deleting run")?;
            writeln!(out, "🗑️  Deleted run {}", id.bold())?;
        }
        Command::Stats { run } => {
            let id = resolve_run(&repo, &run)?;
            let stats = repo.stats(&id)?;
            if let Some(run) = repo.run(&id) {
                view::render_stats(&mut out, run, &stats)?;
            }
        }
        Command::Export { run, out_dir } => {
            let id = resolve_run(&repo, &run)?;
            let export = repo.export_run(&id)?;
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            let path = out_dir.join(&export.file_name);
            fs::write(&path, export.record.to_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            writeln!(out, "📦 Exported to {}", path.display())?;
        }
        Command::Import { file } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let run = repo
                .import_run(&contents)
                .with_context(|| format!("importing {}", file.display()))?;
            writeln!(out, "✅ Imported run {} ({})", run.id.bold(), run.name)?;
        }
    }

    out.flush()?;
    Ok(())
}
