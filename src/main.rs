//! remotefm - batch file operations against a remote tree.
//!
//! Usage:
//!   remotefm --root DIR ls [PATH]                 List a directory
//!   remotefm --root DIR cp DEST SRC...            Copy into DEST
//!   remotefm --root DIR mv DEST SRC...            Move into DEST
//!   remotefm --root DIR upload DEST LOCAL...      Upload local paths
//!   remotefm --root DIR download LOCAL_DIR SRC... Download remote paths
//!   remotefm --root DIR rm [-y] PATH...           Delete remote paths
//!   remotefm --root DIR shell                     Interactive session with undo
//!
//! The "remote" side is a local directory served through the backend
//! contract, which makes every batch observable on disk.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use remotefm_core::{
    file_type_label, format_mtime, format_size, path, EntryCategory, ErrorCategory, LocalBackend,
    RemoteEntry,
};
use remotefm_ops::{
    BatchEvent, BatchReport, ConflictAction, ConflictDecision, ConflictResolver, EngineConfig,
    FixedResolver, OpsError, Panel, SharedContext, TransferKind,
};

#[derive(Parser)]
#[command(
    name = "remotefm",
    version,
    about = "Batch file operations with conflict resolution and undo",
    long_about = "remotefm plans copy, move, upload, download and delete batches against a \
                  remote tree, resolving conflicts before anything is touched, then runs \
                  them step by step. Ctrl-C stops a running batch at the next step."
)]
struct Cli {
    /// Directory served as the remote root
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// What to do when a destination already exists
    #[arg(long, value_enum, default_value_t = ConflictMode::Ask, global = true)]
    on_conflict: ConflictMode,

    /// Do not write a snapshot of unfinished steps when a batch stops early
    #[arg(long, global = true)]
    no_snapshot: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a remote directory
    Ls {
        /// Remote directory
        #[arg(default_value = "/")]
        path: String,

        /// Only show one category (folders, iso, archives, slurm, other)
        #[arg(short, long)]
        category: Option<EntryCategory>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Copy remote paths into a remote directory
    Cp {
        /// Destination directory
        dest: String,

        /// Source paths
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Move remote paths into a remote directory
    Mv {
        /// Destination directory
        dest: String,

        /// Source paths
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Upload local files or directories
    Upload {
        /// Remote destination directory
        dest: String,

        /// Local paths
        #[arg(required = true)]
        local: Vec<PathBuf>,
    },

    /// Download remote files or directories
    Download {
        /// Local target directory
        local_dir: PathBuf,

        /// Remote paths
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Delete remote paths (permanently)
    Rm {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Line-oriented session keeping the undo record between commands
    Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConflictMode {
    Ask,
    Overwrite,
    Skip,
    Rename,
    Cancel,
}

impl ConflictMode {
    fn resolver(self) -> Box<dyn ConflictResolver> {
        let action = match self {
            Self::Ask => return Box::new(PromptResolver),
            Self::Overwrite => ConflictAction::Overwrite,
            Self::Skip => ConflictAction::Skip,
            Self::Rename => ConflictAction::Rename,
            Self::Cancel => ConflictAction::Cancel,
        };
        Box::new(FixedResolver::new(action))
    }
}

/// Asks on stdin. An uppercase answer applies to every remaining conflict.
struct PromptResolver;

fn read_answer(prompt: &str) -> Option<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

impl ConflictResolver for PromptResolver {
    fn resolve(&mut self, destination: &str) -> ConflictDecision {
        loop {
            let Some(answer) = read_answer(&format!(
                "{destination} already exists. [o]verwrite [s]kip [r]ename [c]ancel \
                 (uppercase = all): "
            )) else {
                return ConflictDecision::once(ConflictAction::Cancel);
            };
            let Some(first) = answer.chars().next() else {
                continue;
            };
            let action = match first.to_ascii_lowercase() {
                'o' => ConflictAction::Overwrite,
                's' => ConflictAction::Skip,
                'r' => ConflictAction::Rename,
                'c' => ConflictAction::Cancel,
                _ => continue,
            };
            return if first.is_ascii_uppercase() {
                ConflictDecision::for_all(action)
            } else {
                ConflictDecision::once(action)
            };
        }
    }

    fn prompt_rename(&mut self, destination_dir: &str, current_name: &str) -> Option<String> {
        read_answer(&format!(
            "New name for {current_name} in {destination_dir} (empty to skip): "
        ))
    }
}

/// Deletes cannot be undone, so they are always confirmed.
fn confirm_delete(paths: &[String]) -> bool {
    let prompt = match paths {
        [single] => format!("Permanently delete {single}? [y/N] "),
        _ => format!("Permanently delete {} items? [y/N] ", paths.len()),
    };
    read_answer(&prompt).is_some_and(|answer| is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.root.canonicalize().context("Invalid root")?;
    let config = EngineConfig::builder()
        .persist_snapshots(!cli.no_snapshot)
        .build()
        .map_err(OpsError::from)?;
    let context = SharedContext::new(Arc::new(LocalBackend::new(root)), config);
    let panel = Arc::new(Panel::new(context, "/"));
    watch_interrupts(Arc::clone(&panel));

    let mut resolver = cli.on_conflict.resolver();
    let report = match cli.command {
        Command::Ls {
            path,
            category,
            format,
        } => {
            let view = Panel::new(panel.context().clone(), resolve_remote("/", &path));
            return run_ls(&view, category, format);
        }
        Command::Cp { dest, sources } => {
            let dest = resolve_remote("/", &dest);
            panel
                .copy_into(&absolute(&sources), &dest, resolver.as_mut(), print_event)
                .await?
        }
        Command::Mv { dest, sources } => {
            let dest = resolve_remote("/", &dest);
            panel
                .move_into(&absolute(&sources), &dest, resolver.as_mut(), print_event)
                .await?
        }
        Command::Upload { dest, local } => {
            let dest = resolve_remote("/", &dest);
            panel
                .upload_into(&local, &dest, resolver.as_mut(), print_event)
                .await?
        }
        Command::Download { local_dir, sources } => {
            let sources = absolute(&sources);
            panel
                .download_into(&sources, &local_dir, resolver.as_mut(), print_event)
                .await?
        }
        Command::Rm { yes, paths } => {
            let paths = absolute(&paths);
            if yes || confirm_delete(&paths) {
                panel.delete(&paths, print_event).await?
            } else {
                BatchReport::Declined
            }
        }
        Command::Shell => return run_shell(&panel, resolver.as_mut()).await,
    };

    if !print_report(&report) {
        bail!("batch did not complete");
    }
    Ok(())
}

/// Ctrl-C stops the running batch; with nothing running it exits.
fn watch_interrupts(panel: Arc<Panel>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if panel.cancel() {
                eprintln!("\nStopping after the current step...");
            } else {
                std::process::exit(130);
            }
        }
    });
}

fn print_event(event: &BatchEvent) {
    if let BatchEvent::Progress(progress) = event {
        eprintln!("[{:>3.0}%] {}", progress.percentage(), progress.label);
    }
}

/// Print the result of a request. Returns false when a batch stopped early.
fn print_report(report: &BatchReport) -> bool {
    match report {
        BatchReport::NothingToDo => {
            eprintln!("Nothing to do.");
            true
        }
        BatchReport::Declined => {
            eprintln!("Cancelled, nothing was changed.");
            true
        }
        BatchReport::Finished(outcome) if outcome.is_success() => {
            eprintln!("{}", outcome.summary());
            true
        }
        BatchReport::Finished(outcome) if outcome.cancelled => {
            eprintln!("{}. Steps already done were kept.", outcome.summary());
            false
        }
        BatchReport::Finished(outcome) => {
            let category = ErrorCategory::classify(outcome.error_message());
            eprintln!("{}: {}", category.title(), category.hint());
            eprintln!("{}", outcome.error_message());
            false
        }
    }
}

fn run_ls(panel: &Panel, category: Option<EntryCategory>, format: OutputFormat) -> Result<()> {
    let listing = panel
        .categorized()
        .with_context(|| format!("Cannot list {}", panel.current_dir()))?;
    let entries = match category {
        Some(category) => listing.category(category),
        None => listing.all.as_slice(),
    };

    match format {
        OutputFormat::Text => {
            for entry in entries {
                print_entry(entry);
            }
        }
        OutputFormat::Json => match category {
            Some(_) => println!("{}", serde_json::to_string_pretty(entries)?),
            None => println!("{}", serde_json::to_string_pretty(&listing)?),
        },
    }
    Ok(())
}

fn print_entry(entry: &RemoteEntry) {
    let size = if entry.is_directory {
        String::new()
    } else {
        format_size(entry.size)
    };
    let name = if entry.is_directory {
        format!("{}/", entry.name)
    } else {
        entry.name.to_string()
    };
    println!(
        "{:<40} {:<16} {:>10}  {}",
        name,
        file_type_label(&entry.name, entry.is_directory),
        size,
        format_mtime(entry.modified)
    );
}

const SHELL_HELP: &str = "\
commands:
  ls [PATH] [CATEGORY]    list a directory
  cd PATH                 change directory
  pwd                     print the current directory
  cp DEST SRC...          copy into DEST
  mv DEST SRC...          move into DEST
  upload DEST LOCAL...    upload local paths
  download DIR SRC...     download into a local directory
  rm PATH...              delete (asks first)
  copy PATH... / cut PATH...  put paths on the clipboard
  paste [DEST]            paste the clipboard
  undo                    reverse the last move
  exit                    leave";

async fn run_shell(panel: &Panel, resolver: &mut dyn ConflictResolver) -> Result<()> {
    let mut cwd = "/".to_string();
    eprintln!("{SHELL_HELP}");

    while let Some(line) = read_answer(&format!("remotefm:{cwd}> ")) {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        let remote = |arg: &&str| resolve_remote(&cwd, arg);

        let report = match (command, args) {
            ("exit" | "quit", _) => break,
            ("help", _) => {
                eprintln!("{SHELL_HELP}");
                continue;
            }
            ("pwd", _) => {
                println!("{cwd}");
                continue;
            }
            ("cd", [dir]) => {
                cwd = path::normalize_dir(&resolve_remote(&cwd, dir));
                continue;
            }
            ("ls", rest) => {
                let dir = rest.first().map_or_else(|| cwd.clone(), remote);
                let category = match rest.get(1).map(|c| c.parse::<EntryCategory>()) {
                    Some(Ok(category)) => Some(category),
                    Some(Err(_)) => {
                        eprintln!("unknown category");
                        continue;
                    }
                    None => None,
                };
                let view = Panel::new(panel.context().clone(), dir);
                if let Err(err) = run_ls(&view, category, OutputFormat::Text) {
                    eprintln!("{err:#}");
                }
                continue;
            }
            ("cp", [dest, sources @ ..]) if !sources.is_empty() => {
                let sources: Vec<String> = sources.iter().map(remote).collect();
                panel
                    .copy_into(&sources, &remote(dest), resolver, print_event)
                    .await
            }
            ("mv", [dest, sources @ ..]) if !sources.is_empty() => {
                let sources: Vec<String> = sources.iter().map(remote).collect();
                panel
                    .move_into(&sources, &remote(dest), resolver, print_event)
                    .await
            }
            ("upload", [dest, local @ ..]) if !local.is_empty() => {
                let local: Vec<PathBuf> = local.iter().map(PathBuf::from).collect();
                panel
                    .upload_into(&local, &remote(dest), resolver, print_event)
                    .await
            }
            ("download", [dir, sources @ ..]) if !sources.is_empty() => {
                let sources: Vec<String> = sources.iter().map(remote).collect();
                panel
                    .download_into(&sources, &PathBuf::from(dir), resolver, print_event)
                    .await
            }
            ("rm", paths) if !paths.is_empty() => {
                let paths: Vec<String> = paths.iter().map(remote).collect();
                if confirm_delete(&paths) {
                    panel.delete(&paths, print_event).await
                } else {
                    Ok(BatchReport::Declined)
                }
            }
            ("copy" | "cut", paths) if !paths.is_empty() => {
                let op = if command == "cut" {
                    TransferKind::Move
                } else {
                    TransferKind::Copy
                };
                let paths: Vec<String> = paths.iter().map(remote).collect();
                eprintln!("{} item(s) on the clipboard", paths.len());
                panel.context().clipboard().set(op, paths);
                continue;
            }
            ("paste", rest) => {
                let dest = rest.first().map_or_else(|| cwd.clone(), remote);
                panel.paste_into(&dest, resolver, print_event).await
            }
            ("undo", _) => {
                if let Some(record) = panel.context().undo_ledger().get() {
                    eprintln!("{}", record.undo_description());
                }
                panel.undo(resolver, print_event).await
            }
            _ => {
                eprintln!("unrecognized command, try `help`");
                continue;
            }
        };

        match report {
            Ok(report) => {
                print_report(&report);
            }
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}

/// Anchor command-line remote paths at the root.
fn absolute(paths: &[String]) -> Vec<String> {
    paths.iter().map(|p| resolve_remote("/", p)).collect()
}

/// Resolve a shell argument against the current remote directory.
fn resolve_remote(cwd: &str, arg: &str) -> String {
    if arg.starts_with('/') {
        arg.to_string()
    } else {
        path::join(cwd, arg)
    }
}
