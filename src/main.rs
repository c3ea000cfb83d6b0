use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use regex_patcher::config::load_from_path;
use regex_patcher::files::{patch_file_in_place, split_file_arg, Action, FileOutcome};
use regex_patcher::patch::{Mode, PatchError, PatchRequest};
use regex_patcher::PatchDocument;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "regex-patcher")]
#[command(about = "Apply and revert pattern-based patches to any text file", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch to one or more files
    Apply(PatchArgs),

    /// Revert a previously applied append or prepend patch
    Revert(PatchArgs),
}

#[derive(Args)]
struct PatchArgs {
    /// Files to patch; repeatable, each value may be comma-separated
    #[arg(short, long)]
    files: Vec<String>,

    /// Regular expression to match
    #[arg(short, long)]
    regexp: Option<String>,

    /// Text to insert at each match; may reference capture groups as \N
    #[arg(short, long)]
    text: Option<String>,

    /// append, prepend or replace
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Patch all occurrences of the pattern, not just the first
    #[arg(short, long)]
    global: bool,

    /// Byte offset from which to start matching
    #[arg(short, long)]
    offset: Option<usize>,

    /// YAML patch file supplying any fields not given as flags
    #[arg(short, long)]
    patch_file: Option<PathBuf>,

    /// Show what would change without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply(args) => run(args, Action::Apply),
        Commands::Revert(args) => run(args, Action::Revert),
    }
}

/// Lift the explicit flags into a patch record so file-loaded fields can be
/// merged beneath them.
fn cli_document(args: &PatchArgs) -> PatchDocument {
    PatchDocument {
        regexp: args.regexp.clone(),
        text: args.text.clone(),
        mode: args.mode,
        global: args.global.then_some(true),
        offset: args.offset,
        files: None,
    }
}

fn run_request(request: &PatchRequest, action: Action, contents: &str) -> Result<String, PatchError> {
    match action {
        Action::Apply => request.apply(contents),
        Action::Revert => request.revert(contents),
    }
}

fn run(args: PatchArgs, action: Action) -> Result<()> {
    let overrides = cli_document(&args);
    let record = match &args.patch_file {
        Some(path) => load_from_path(path)?.merged_under(&overrides),
        None => overrides,
    };

    let request = record.to_request()?;
    if action == Action::Revert && !request.mode.is_revertible() {
        return Err(PatchError::IrreversibleMode.into());
    }

    // Explicit --files flags win over the record's files field.
    let files: Vec<String> = if args.files.is_empty() {
        record.files()?.unwrap_or_default()
    } else {
        args.files.iter().flat_map(|f| split_file_arg(f)).collect()
    };
    if files.is_empty() {
        bail!("no files to patch: pass --files or a patch file with a files field");
    }

    let verb = match action {
        Action::Apply => "Applying",
        Action::Revert => "Reverting",
    };
    println!(
        "{} /{}/ ({} mode) across {} file(s)",
        verb,
        request.pattern,
        request.mode,
        files.len()
    );
    if args.dry_run {
        println!("{}", "  [DRY RUN - no files will be modified]".cyan());
    }
    println!();

    let mut patched = 0;
    let mut unchanged = 0;

    for file in &files {
        let path = Path::new(file.as_str());

        if args.dry_run {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read {file}"))?;
            let edited = run_request(&request, action, &contents)
                .with_context(|| format!("patch failed on {file}"))?;
            if edited == contents {
                println!("{} {}: unchanged", "⊙".yellow(), file);
                unchanged += 1;
            } else {
                println!("{} {}: would be patched", "✓".green(), file);
                patched += 1;
                if args.diff {
                    display_diff(path, &contents, &edited);
                }
            }
            continue;
        }

        let before = args
            .diff
            .then(|| fs::read_to_string(path))
            .transpose()
            .with_context(|| format!("failed to read {file}"))?;

        match patch_file_in_place(path, &request, action)? {
            FileOutcome::Patched { .. } => {
                println!("{} {}: patched", "✓".green(), file);
                patched += 1;
                if let Some(before) = before {
                    if let Ok(after) = fs::read_to_string(path) {
                        display_diff(path, &before, &after);
                    }
                }
            }
            FileOutcome::Unchanged { .. } => {
                println!("{} {}: unchanged", "⊙".yellow(), file);
                unchanged += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} patched", format!("{}", patched).green());
    println!("  {} unchanged", format!("{}", unchanged).yellow());

    Ok(())
}

/// Show a unified diff between original and patched content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
