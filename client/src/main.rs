//! Sheetops CLI - run spreadsheet workflows against a transformation service
//!
//! # Commands
//!
//! ```bash
//! sheetops compare a.xlsx b.xlsx                         # Whole-row compare
//! sheetops compare a.xlsx b.xlsx --left-column id --right-column code --unmatched
//! sheetops join a.xlsx b.xlsx --on id=id --on date=day   # Join on column pairs
//! sheetops join a.xlsx b.xlsx --suggest                  # Join on suggested pairs
//! sheetops merge people.xlsx --group first,last:full_name --separator " " --preview
//! sheetops split scores.xlsx --id id --value q1 --value q2 --preview
//! sheetops duplicates values contacts.xlsx --column email --preview
//! sheetops duplicates rows contacts.xlsx
//! ```
//!
//! Global options: `--service-url URL`, `--download DIR`, `-v` / `-vv`.
//! The committed result is printed to stdout as JSON; progress goes to stderr.

use clap::{ArgAction, Parser, Subcommand};
use sheetops::builders::separator_label;
use sheetops::interpret::{
    DuplicatePreview, JoinSuggestions, MergePreview, OperationDetails, SplitPreview,
    UnmatchedListing,
};
use sheetops::{
    ClientConfig, CompareMode, DuplicateMode, LogEntry, OperationResult, Orchestrator,
    SeparatorChoice, Slot, SplitSide,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "sheetops")]
#[command(about = "Compare, join, merge, split and deduplicate spreadsheets", long_about = None)]
struct Cli {
    /// Transformation service URL (overrides SHEETOPS_SERVICE_URL)
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Save produced artifacts into this directory
    #[arg(long, global = true)]
    download: Option<PathBuf>,

    /// Diagnostic verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find rows of the first file missing from the second
    Compare {
        left: PathBuf,
        right: PathBuf,

        /// Compare on this column of the first file (requires --right-column)
        #[arg(long, requires = "right_column")]
        left_column: Option<String>,

        /// Compare on this column of the second file (requires --left-column)
        #[arg(long, requires = "left_column")]
        right_column: Option<String>,

        /// List every unmatched row, not just the sample
        #[arg(long)]
        unmatched: bool,
    },

    /// Join two files on column pairs
    Join {
        left: PathBuf,
        right: PathBuf,

        /// Join pair as LEFT=RIGHT (repeatable)
        #[arg(long = "on", value_parser = parse_join_pair)]
        on: Vec<(String, String)>,

        /// Ask the service for pairs and use them when --on is absent
        #[arg(long)]
        suggest: bool,
    },

    /// Merge columns into new columns
    Merge {
        input: PathBuf,

        /// Group as COL1,COL2:NEW_NAME (repeatable, columns in merge order)
        #[arg(long = "group", value_parser = parse_merge_group, required = true)]
        groups: Vec<(Vec<String>, String)>,

        /// Separator placed between merged values (default: space)
        #[arg(short, long)]
        separator: Option<String>,

        /// Show a preview before committing
        #[arg(long)]
        preview: bool,
    },

    /// Unpivot value columns into variable/value rows
    Split {
        input: PathBuf,

        /// Id column kept on every row (repeatable)
        #[arg(long = "id", required = true)]
        id_columns: Vec<String>,

        /// Value column to unpivot (repeatable)
        #[arg(long = "value", required = true)]
        value_columns: Vec<String>,

        /// Name of the produced variable column (default: Variable)
        #[arg(long)]
        variable_name: Option<String>,

        /// Name of the produced value column (default: Value)
        #[arg(long)]
        value_name: Option<String>,

        /// Show a preview before committing
        #[arg(long)]
        preview: bool,
    },

    /// Find duplicates
    Duplicates {
        #[command(subcommand)]
        method: DuplicateCommand,
    },
}

#[derive(Subcommand)]
enum DuplicateCommand {
    /// Repeated values inside chosen columns
    Values {
        input: PathBuf,

        /// Column to check (repeatable)
        #[arg(long = "column", required = true)]
        columns: Vec<String>,

        /// Show a preview before committing
        #[arg(long)]
        preview: bool,
    },

    /// Fully identical rows
    Rows { input: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.service_url.as_deref() {
        config = config.with_base_url(url)?;
    }

    let orchestrator = Orchestrator::new(config)?;
    let mut console = Console::new(orchestrator.activity().subscribe());
    eprintln!("🌐 Service: {}", orchestrator.client().base_url());

    let outcome = match cli.command {
        Commands::Compare {
            left,
            right,
            left_column,
            right_column,
            unmatched,
        } => {
            cmd_compare(
                &orchestrator,
                &mut console,
                &left,
                &right,
                left_column.zip(right_column),
                unmatched,
            )
            .await
        }

        Commands::Join {
            left,
            right,
            on,
            suggest,
        } => cmd_join(&orchestrator, &mut console, &left, &right, on, suggest).await,

        Commands::Merge {
            input,
            groups,
            separator,
            preview,
        } => cmd_merge(&orchestrator, &mut console, &input, groups, separator, preview).await,

        Commands::Split {
            input,
            id_columns,
            value_columns,
            variable_name,
            value_name,
            preview,
        } => {
            let names = (variable_name, value_name);
            cmd_split(
                &orchestrator,
                &mut console,
                &input,
                &id_columns,
                &value_columns,
                names,
                preview,
            )
            .await
        }

        Commands::Duplicates { method } => match method {
            DuplicateCommand::Values {
                input,
                columns,
                preview,
            } => cmd_duplicate_values(&orchestrator, &mut console, &input, &columns, preview).await,
            DuplicateCommand::Rows { input } => {
                cmd_duplicate_rows(&orchestrator, &mut console, &input).await
            }
        },
    };
    console.flush();
    let result = outcome?;

    print_summary(&result);
    if let Some(dir) = cli.download.as_deref() {
        save_artifacts(&orchestrator, &result, dir).await?;
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    eprintln!("\n✨ Done!");
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

async fn cmd_compare(
    orchestrator: &Orchestrator,
    console: &mut Console,
    left: &Path,
    right: &Path,
    columns: Option<(String, String)>,
    show_unmatched: bool,
) -> CliResult<OperationResult> {
    let (l, r) = tokio::join!(
        orchestrator.upload_path(Slot::CompareLeft, left),
        orchestrator.upload_path(Slot::CompareRight, right),
    );
    console.flush();
    l?;
    r?;

    if let Some((left_column, right_column)) = columns {
        let mut state = orchestrator.state();
        state.compare.set_mode(CompareMode::SpecificColumns);
        state.select_compare_left(&left_column)?;
        state.select_compare_right(&right_column)?;
    }

    let result = orchestrator.commit_compare().await?.into_result()?;
    console.flush();

    if show_unmatched {
        let listing = orchestrator.preview_compare().await?;
        console.flush();
        print_unmatched(&listing);
    }
    Ok(result)
}

async fn cmd_join(
    orchestrator: &Orchestrator,
    console: &mut Console,
    left: &Path,
    right: &Path,
    pairs: Vec<(String, String)>,
    suggest: bool,
) -> CliResult<OperationResult> {
    let (l, r) = tokio::join!(
        orchestrator.upload_path(Slot::JoinLeft, left),
        orchestrator.upload_path(Slot::JoinRight, right),
    );
    console.flush();
    l?;
    r?;

    if suggest {
        let suggestions = orchestrator.suggest_join_columns().await?;
        console.flush();
        print_suggestions(&suggestions);
        if pairs.is_empty() {
            orchestrator.state().join.apply_suggestions(&suggestions.pairs);
        }
    }

    {
        let mut state = orchestrator.state();
        for (index, (left_column, right_column)) in pairs.iter().enumerate() {
            if index > 0 {
                state.join.add_pair();
            }
            state.set_join_left(index, left_column)?;
            state.set_join_right(index, right_column)?;
        }
    }

    let result = orchestrator.commit_join().await?.into_result()?;
    console.flush();
    Ok(result)
}

async fn cmd_merge(
    orchestrator: &Orchestrator,
    console: &mut Console,
    input: &Path,
    groups: Vec<(Vec<String>, String)>,
    separator: Option<String>,
    preview: bool,
) -> CliResult<OperationResult> {
    orchestrator.upload_path(Slot::Merge, input).await?;
    console.flush();

    {
        let mut state = orchestrator.state();
        if let Some(sep) = separator.as_deref() {
            state.merge.set_default_separator(&SeparatorChoice::from_separator(sep));
        }
        for (index, (columns, name)) in groups.iter().enumerate() {
            let first = state.merge.groups().first().map(|g| g.id());
            let id = match first {
                Some(id) if index == 0 => id,
                _ => state.add_merge_group()?,
            };
            for column in columns {
                state.merge.select_column(id, column)?;
            }
            state.merge.set_new_column_name(id, name)?;
        }
    }

    if preview {
        let preview = orchestrator.preview_merge().await?;
        console.flush();
        print_merge_preview(&preview);
    }

    let result = orchestrator.commit_merge().await?.into_result()?;
    console.flush();
    Ok(result)
}

async fn cmd_split(
    orchestrator: &Orchestrator,
    console: &mut Console,
    input: &Path,
    id_columns: &[String],
    value_columns: &[String],
    names: (Option<String>, Option<String>),
    preview: bool,
) -> CliResult<OperationResult> {
    orchestrator.upload_path(Slot::Split, input).await?;
    console.flush();

    {
        let mut state = orchestrator.state();
        for column in id_columns {
            state.split.set_checked(SplitSide::Id, column, true)?;
        }
        for column in value_columns {
            state.split.set_checked(SplitSide::Value, column, true)?;
        }
        if let Some(name) = names.0.as_deref() {
            state.split.set_variable_column_name(name);
        }
        if let Some(name) = names.1.as_deref() {
            state.split.set_value_column_name(name);
        }
    }

    if preview {
        let preview = orchestrator.preview_split().await?;
        console.flush();
        print_split_preview(&preview);
    }

    let result = orchestrator.commit_split().await?.into_result()?;
    console.flush();
    Ok(result)
}

async fn cmd_duplicate_values(
    orchestrator: &Orchestrator,
    console: &mut Console,
    input: &Path,
    columns: &[String],
    preview: bool,
) -> CliResult<OperationResult> {
    orchestrator.upload_path(Slot::Duplicate, input).await?;
    console.flush();

    {
        let mut state = orchestrator.state();
        state.enter_duplicate_mode(DuplicateMode::ByValues)?;
        for column in columns {
            state.duplicate.set_checked(column, true)?;
        }
    }

    if preview {
        let preview = orchestrator.preview_duplicate_values().await?;
        console.flush();
        print_duplicate_preview(&preview);
    }

    let result = orchestrator.commit_duplicate_values().await?.into_result()?;
    console.flush();
    Ok(result)
}

async fn cmd_duplicate_rows(
    orchestrator: &Orchestrator,
    console: &mut Console,
    input: &Path,
) -> CliResult<OperationResult> {
    orchestrator.upload_path(Slot::Duplicate, input).await?;
    console.flush();

    orchestrator.state().enter_duplicate_mode(DuplicateMode::ByRows)?;

    let result = orchestrator.commit_duplicate_rows().await?.into_result()?;
    console.flush();
    Ok(result)
}

// =============================================================================
// Output
// =============================================================================

/// Prints activity entries in the order they were published.
struct Console {
    feed: broadcast::Receiver<LogEntry>,
}

impl Console {
    fn new(feed: broadcast::Receiver<LogEntry>) -> Self {
        Self { feed }
    }

    fn flush(&mut self) {
        loop {
            match self.feed.try_recv() {
                Ok(entry) => eprintln!("{}", entry.render()),
                Err(TryRecvError::Lagged(skipped)) => {
                    eprintln!("   ... {} entries skipped", skipped)
                }
                Err(_) => break,
            }
        }
    }
}

fn print_summary(result: &OperationResult) {
    eprintln!("\n📊 {} results:", result.operation);
    match &result.details {
        Some(OperationDetails::Compare(s)) => {
            eprintln!("   Rows: {} vs {}", s.left_rows, s.right_rows);
            if let Some(label) = &s.compared_columns {
                eprintln!("   Compared: {}", label);
            }
            if let (Some(matched), Some(pct)) = (s.matched, s.match_pct) {
                eprintln!("   ✅ Matched: {} ({:.2}%)", matched, pct);
            }
            eprintln!("   ❌ Unmatched: {}", s.unmatched_count);
            for row in &s.unmatched_sample {
                eprintln!("     - row {}: {}", row.excel_row, serde_json::Value::Object(row.data.clone()));
            }
            if s.has_more_unmatched {
                eprintln!(
                    "     ... and {} more (use --unmatched)",
                    s.unmatched_count - s.unmatched_sample.len()
                );
            }
        }
        Some(OperationDetails::Join(s)) => {
            eprintln!("   Rows: {} + {}", s.left_rows, s.right_rows);
            eprintln!("   ✅ Joined: {} ({:.2}%)", s.joined_rows, s.join_pct);
            eprintln!("   ❌ Not joined: {}", s.unjoined_rows);
            let pairs: Vec<String> = s.join_mapping.iter().map(|(l, r)| format!("{} = {}", l, r)).collect();
            eprintln!("   On: {}", pairs.join(", "));
        }
        Some(OperationDetails::Merge(s)) => {
            eprintln!(
                "   Columns: {} → {} ({} removed)",
                s.original_columns, s.final_columns, s.columns_removed
            );
            for group in &s.groups {
                eprintln!(
                    "   {} = {} [{}]",
                    group.new_column,
                    group.source_columns.join(" + "),
                    separator_label(&group.separator)
                );
            }
        }
        Some(OperationDetails::Split(s)) => {
            eprintln!("   Rows: {} → {} (+{})", s.original_rows, s.final_rows, s.rows_created);
            eprintln!("   Columns: {} → {}", s.original_columns, s.final_columns);
            eprintln!("   Id: {}", s.id_columns.join(", "));
            eprintln!("   Values → {} / {}", s.variable_column_name, s.value_column_name);
        }
        Some(OperationDetails::DuplicateValues(s)) => {
            eprintln!("   Rows checked: {}", s.original_rows);
            eprintln!("   Duplicate rows: {}", s.total_duplicate_rows);
            for column in &s.per_column {
                eprintln!(
                    "   {}: {} duplicates, {} values",
                    column.column, column.total_duplicates, column.unique_duplicate_values
                );
                for group in &column.groups {
                    eprintln!("     - {} ×{} (rows {:?})", group.value, group.count, group.excel_rows);
                }
                if column.group_count > column.groups.len() {
                    eprintln!("     ... and {} more groups", column.group_count - column.groups.len());
                }
            }
        }
        Some(OperationDetails::DuplicateRows(s)) => {
            eprintln!(
                "   Duplicate rows: {} of {} ({:.2}%)",
                s.duplicate_rows, s.original_rows, s.duplicate_pct
            );
            for group in &s.groups {
                eprintln!("     - ×{} (rows {:?})", group.count, group.excel_rows);
            }
            if s.group_count > s.groups.len() {
                eprintln!("     ... and {} more groups", s.group_count - s.groups.len());
            }
        }
        None => {}
    }
    if let Some(note) = &result.note {
        eprintln!("   ℹ️  {}", note);
    }
}

fn print_unmatched(listing: &UnmatchedListing) {
    eprintln!("\n🔍 All unmatched rows ({}):", listing.count);
    for row in &listing.rows {
        eprintln!("   row {}: {}", row.excel_row, serde_json::Value::Object(row.data.clone()));
    }
}

fn print_suggestions(suggestions: &JoinSuggestions) {
    if suggestions.pairs.is_empty() {
        eprintln!("💡 No join columns suggested");
        return;
    }
    eprintln!("💡 Suggested join pairs:");
    for (left, right) in &suggestions.pairs {
        eprintln!("   {} = {}", left, right);
    }
}

fn print_merge_preview(preview: &MergePreview) {
    eprintln!(
        "\n👀 Merge preview: {} → {} columns, {} merge(s)",
        preview.original_column_count, preview.final_column_count, preview.total_operations
    );
    for group in &preview.groups {
        eprintln!(
            "   {} = {} [{}]",
            group.new_column,
            group.original_columns.join(" + "),
            separator_label(&group.separator)
        );
        for sample in &group.samples {
            eprintln!("     {}", sample.new_value);
        }
    }
}

fn print_split_preview(preview: &SplitPreview) {
    eprintln!(
        "\n👀 Split preview: {}×{} → {}×{} (ratio {:.2})",
        preview.original_shape.rows,
        preview.original_shape.columns,
        preview.split_shape.rows,
        preview.split_shape.columns,
        preview.transformation_ratio
    );
    for row in &preview.split_sample {
        eprintln!("   {}", serde_json::Value::Object(row.clone()));
    }
}

fn print_duplicate_preview(preview: &DuplicatePreview) {
    eprintln!("\n👀 Duplicate preview ({} rows sampled):", preview.sample_size);
    if preview.is_clean() {
        eprintln!("   ✅ No duplicates in the sample");
        return;
    }
    for column in &preview.columns {
        eprintln!("   {}: {} duplicates", column.column, column.total_duplicates);
        for sample in &column.samples {
            eprintln!("     - {} ×{}", sample.value, sample.count);
        }
    }
}

async fn save_artifacts(
    orchestrator: &Orchestrator,
    result: &OperationResult,
    dir: &Path,
) -> CliResult<()> {
    tokio::fs::create_dir_all(dir).await?;
    for reference in result.artifact_urls() {
        let bytes = orchestrator.download(reference).await?;
        let name = reference.rsplit('/').next().unwrap_or(reference);
        let path = dir.join(name);
        tokio::fs::write(&path, &bytes).await?;
        eprintln!("   💾 Saved to: {}", path.display());
    }
    Ok(())
}

// =============================================================================
// Argument parsing
// =============================================================================

fn parse_join_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((left, right)) if !left.trim().is_empty() && !right.trim().is_empty() => {
            Ok((left.trim().to_string(), right.trim().to_string()))
        }
        _ => Err(format!("expected LEFT=RIGHT, got '{}'", raw)),
    }
}

fn parse_merge_group(raw: &str) -> Result<(Vec<String>, String), String> {
    let (columns, name) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected COL1,COL2:NEW_NAME, got '{}'", raw))?;
    let columns: Vec<String> = columns
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() || name.trim().is_empty() {
        return Err(format!("expected COL1,COL2:NEW_NAME, got '{}'", raw));
    }
    Ok((columns, name.trim().to_string()))
}
