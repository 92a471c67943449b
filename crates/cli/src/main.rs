//! CLI tool for updating a presentation from a master workbook.

use anyhow::{Context, Result};
use clap::Parser;
use pptsync_core::{AutomationSlot, MarkerIndex, MarkerIndexer, TransformConfig};
use pptsync_pptx::{ChartRefresher, CommandRefresher, PackageTransformer, PresentationDocument};
use pptsync_xlsx::MasterWorkbook;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Serializes chart refreshes started by this process. Separate `pptsync`
/// processes do not share it.
static REFRESH_SLOT: LazyLock<AutomationSlot> = LazyLock::new(AutomationSlot::default);

/// Update embedded chart data and `[[Sheet!Cell]]` placeholders in a
/// PowerPoint file from a master Excel workbook.
#[derive(Parser, Debug)]
#[command(name = "pptsync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input presentation (.pptx or .pptm)
    #[arg(value_name = "PRESENTATION", required_unless_present = "list_markers")]
    presentation: Option<PathBuf>,

    /// Master workbook (.xlsx) holding the marker ranges and placeholder values
    #[arg(short, long)]
    workbook: PathBuf,

    /// Output file (default: <name>_updated.<ext> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rewrite parts in a scratch directory instead of streaming
    #[arg(long)]
    staged: bool,

    /// JSON transform configuration; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the markers found in the workbook and exit
    #[arg(long)]
    list_markers: bool,

    /// Print the marker listing as JSON
    #[arg(long, requires = "list_markers")]
    json: bool,

    /// Program that redraws the charts of the saved presentation
    #[arg(long, value_name = "PROGRAM")]
    refresh_with: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let master = MasterWorkbook::open(&args.workbook)
        .with_context(|| format!("Failed to load workbook {}", args.workbook.display()))?;
    let index = MarkerIndexer::new().index(&master);

    if args.verbose {
        eprintln!("Indexed {} markers in {}", index.len(), args.workbook.display());
    }

    if args.list_markers {
        print!("{}", list_markers(&index, args.json)?);
        return Ok(());
    }

    let input_path = args
        .presentation
        .as_deref()
        .context("No presentation given")?;
    let config = load_config(&args)?;

    let package = std::fs::read(input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let document = PackageTransformer::new(&master, &index)
        .with_config(config)
        .transform(&package)
        .with_context(|| format!("Failed to transform {}", input_path.display()))?;

    report(&document);

    if args.verbose {
        eprintln!(
            "  Found {} slides, {} charts",
            document.slides().len(),
            document.charts().len()
        );
    }

    let output_path = match &args.output {
        Some(path) => path.clone(),
        None => get_output_path(input_path),
    };

    match &args.refresh_with {
        Some(program) => {
            let refresher = CommandRefresher::new(program);
            save_and_refresh(&document, &output_path, &refresher, &REFRESH_SLOT)?;
        }
        None => {
            document
                .save(&output_path)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
        }
    }

    if args.verbose {
        eprintln!("Written to: {}", output_path.display());
    }

    Ok(())
}

/// Configuration from `--config`, overridden by command-line flags.
fn load_config(args: &Args) -> Result<TransformConfig> {
    let config = match &args.config {
        Some(path) => TransformConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TransformConfig::default(),
    };

    if args.staged {
        Ok(config.with_staged_directory(true))
    } else {
        Ok(config)
    }
}

/// Render the marker index sorted by name.
fn list_markers(index: &MarkerIndex, json: bool) -> Result<String> {
    let ranges = index.sorted();

    if json {
        let mut output = serde_json::to_string_pretty(&ranges).context("Failed to serialize markers")?;
        output.push('\n');
        return Ok(output);
    }

    let mut output = String::new();
    for range in ranges {
        output.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            range.name, range.sheet_name, range.start_row, range.end_row
        ));
    }
    Ok(output)
}

/// Warn about content the transform could not fill in.
fn report(document: &PresentationDocument) {
    for (slide, token) in document.unresolved_placeholders() {
        log::warn!(
            "Slide {} still contains placeholder [[{}!{}]]",
            slide,
            token.sheet_name,
            token.cell_ref
        );
    }
    for chart in document.charts_missing_embedding() {
        log::warn!("Chart '{}' has no embedded workbook and was not updated", chart.path);
    }
}

/// Save the document, then hand it to the refresher while holding the
/// automation slot. A failed refresh keeps the saved document.
fn save_and_refresh(
    document: &PresentationDocument,
    output_path: &Path,
    refresher: &dyn ChartRefresher,
    slot: &AutomationSlot,
) -> Result<()> {
    let _guard = slot
        .try_acquire()
        .context("Chart refresh automation is busy")?;

    document
        .save(output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if let Err(e) = refresher.refresh(output_path) {
        log::warn!(
            "{}: charts in {} show stale cached values until refreshed in PowerPoint",
            e,
            output_path.display()
        );
        eprintln!(
            "Warning: chart caches were not recomputed for {}",
            output_path.display()
        );
    }

    Ok(())
}

/// Determine the default output path: `deck.pptx` becomes `deck_updated.pptx`.
fn get_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = match input_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_updated.{}", stem, ext),
        None => format!("{}_updated", stem),
    };

    match input_path.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}
