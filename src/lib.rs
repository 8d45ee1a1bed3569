//! Koma: reading-order annotation for comic text bubbles.
//!
//! Koma turns detected text regions on manga and comic pages into an ordered,
//! editable sequence of text lines. Bubbles are grouped under panels by
//! containment, panels and bubbles are put into reading order by a pluggable
//! sequencing model, the annotator can override that order by clicking, and
//! every image's boxes are stored in one shared JSON document.
//!
//! # Modules
//!
//! - [`ir`]: Boxes, panels, coordinate spaces and file formats
//! - [`store`]: The live box collection of the open image
//! - [`layout`]: Panel containment and reading-order sorting
//! - [`arrange`]: Manual click-order override
//! - [`engines`]: Detector, OCR and sequencer interfaces
//! - [`session`]: Workspace and open-image context
//! - [`pipeline`]: Detect, recognize and order whole pages
//! - [`validation`]: Annotation document checks
//! - [`config`]: `koma.yaml` settings
//! - [`error`]: Error types

pub mod arrange;
pub mod config;
pub mod engines;
pub mod error;
pub mod ir;
pub mod layout;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub use error::KomaError;

use config::Config;
use engines::{
    build_ocr_engine, build_sequencer, LabelFileDetector, LabelFilePanels, NoPanels,
    OcrEngineKind, OcrLanguage, PanelDetector, ReadingDirection,
};
use ir::io_text::{write_report, ReportKind};
use ir::io_yolo::export_yolo_dir;
use ir::BoxId;
use pipeline::{AnnotateOptions, Engines, PageSummary};
use session::{ImageSession, Workspace};

/// The koma CLI application.
#[derive(Parser)]
#[command(name = "koma")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect bubbles, recognize their text and store them in reading order.
    Detect(DetectArgs),
    /// Recompute the reading order of one image's boxes.
    Order(OrderArgs),
    /// Put boxes in the order they are listed, keeping the rest after them.
    Arrange(ArrangeArgs),
    /// Delete one box.
    Delete(DeleteArgs),
    /// Print one image's boxes in reading order.
    Show(ImageArgs),
    /// Write a RAW/TL text report or detection-format label files.
    Export(ExportArgs),
    /// Replace boxes with the rows of detection-format label files.
    ImportYolo(ImportYoloArgs),
    /// Check the annotation document for errors and warnings.
    Validate(ValidateArgs),
}

#[derive(clap::Args)]
struct ImageArgs {
    /// Workspace directory holding the page images.
    dir: PathBuf,

    /// Image file name inside the workspace.
    #[arg(long)]
    image: String,
}

#[derive(clap::Args)]
struct SequencerArgs {
    /// Panel label files; without them every bubble is its own panel.
    #[arg(long)]
    panels: Option<PathBuf>,

    /// Horizontal reading direction.
    #[arg(long, value_enum, env = "KOMA_DIRECTION")]
    direction: Option<ReadingDirection>,
}

#[derive(clap::Args)]
struct DetectArgs {
    /// Workspace directory holding the page images.
    dir: PathBuf,

    /// Bubble label files written by the detector.
    #[arg(long)]
    bubbles: PathBuf,

    /// Only process this image.
    #[arg(long)]
    image: Option<String>,

    /// Keep existing boxes instead of replacing them.
    #[arg(long)]
    append: bool,

    #[arg(long, value_enum, env = "OCR_ENGINE")]
    ocr_engine: Option<OcrEngineKind>,

    /// Language family of the text, selects post-processing.
    #[arg(long, value_enum)]
    language: Option<OcrLanguage>,

    #[command(flatten)]
    sequencer: SequencerArgs,
}

#[derive(clap::Args)]
struct OrderArgs {
    #[command(flatten)]
    target: ImageArgs,

    #[command(flatten)]
    sequencer: SequencerArgs,
}

#[derive(clap::Args)]
struct ArrangeArgs {
    #[command(flatten)]
    target: ImageArgs,

    /// Box ids in the desired order, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    clicks: Vec<u64>,
}

#[derive(clap::Args)]
struct DeleteArgs {
    #[command(flatten)]
    target: ImageArgs,

    /// Id of the box to delete.
    #[arg(long)]
    id: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// Recognized text report.
    Raw,
    /// User text report.
    Tl,
    /// One detection-format label file per image.
    Yolo,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Workspace directory holding the page images.
    dir: PathBuf,

    #[arg(value_enum)]
    format: ExportFormat,

    /// Output file (reports) or directory (yolo).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ImportYoloArgs {
    /// Workspace directory holding the page images.
    dir: PathBuf,

    /// Directory of label files named after the images.
    #[arg(long)]
    labels: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Workspace directory holding the page images.
    dir: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: ReportFormat,
}

/// Run the koma CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), KomaError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Detect(args)) => run_detect(args),
        Some(Commands::Order(args)) => run_order(args),
        Some(Commands::Arrange(args)) => run_arrange(args),
        Some(Commands::Delete(args)) => run_delete(args),
        Some(Commands::Show(args)) => run_show(args),
        Some(Commands::Export(args)) => run_export(args),
        Some(Commands::ImportYolo(args)) => run_import_yolo(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("koma {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Reading-order annotation for comic text bubbles.");
            println!();
            println!("Run 'koma --help' for usage information.");
            Ok(())
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides `verbose`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_workspace(dir: PathBuf, tweak: impl FnOnce(&mut Config)) -> Result<Workspace, KomaError> {
    let mut config = Config::load(&dir)?;
    tweak(&mut config);
    debug!(?config, "effective config");
    Workspace::open(dir, config)
}

fn apply_sequencer_args(config: &mut Config, args: &SequencerArgs) {
    if let Some(direction) = args.direction {
        config.sequencer.direction = direction;
    }
}

fn build_engines(
    config: &Config,
    bubbles: Option<PathBuf>,
    panels: Option<PathBuf>,
) -> Result<Engines, KomaError> {
    let detector = LabelFileDetector::new(bubbles.unwrap_or_default());
    let panels: Box<dyn PanelDetector> = match panels {
        Some(dir) => Box::new(LabelFilePanels::new(dir)),
        None => Box::new(NoPanels),
    };
    Ok(Engines {
        detector: Box::new(detector),
        panels,
        ocr: build_ocr_engine(&config.ocr)?,
        sequencer: build_sequencer(&config.sequencer),
    })
}

fn print_summary(summary: &PageSummary) {
    let note = if summary.degraded {
        " (ordering fell back to detection order)"
    } else {
        ""
    };
    println!(
        "{}: {} box(es) in {} panel(s){}",
        summary.image_id, summary.created, summary.panel_count, note
    );
}

fn run_detect(args: DetectArgs) -> Result<(), KomaError> {
    let mut workspace = open_workspace(args.dir, |config| {
        if let Some(engine) = args.ocr_engine {
            config.ocr.engine = engine;
        }
        if let Some(language) = args.language {
            config.ocr.language = language;
        }
        apply_sequencer_args(config, &args.sequencer);
    })?;

    let mut engines = build_engines(
        workspace.config(),
        Some(args.bubbles),
        args.sequencer.panels,
    )?;
    let options = AnnotateOptions {
        append: args.append,
    };

    match args.image {
        Some(image_id) => {
            let mut session = workspace.open_image(&image_id)?;
            let summary = pipeline::annotate_image(&mut session, &mut engines, options)?;
            workspace.flush(&session)?;
            print_summary(&summary);
        }
        None => {
            for summary in pipeline::annotate_all(&mut workspace, &mut engines, options)? {
                print_summary(&summary);
            }
        }
    }
    Ok(())
}

fn run_order(args: OrderArgs) -> Result<(), KomaError> {
    let mut workspace = open_workspace(args.target.dir, |config| {
        apply_sequencer_args(config, &args.sequencer);
    })?;
    let mut engines = build_engines(workspace.config(), None, args.sequencer.panels)?;

    let mut session = workspace.open_image(&args.target.image)?;
    let summary = pipeline::reorder_image(&mut session, &mut engines)?;
    workspace.flush(&session)?;
    print_order(&session, summary.degraded);
    Ok(())
}

fn print_order(session: &ImageSession, degraded: bool) {
    let ids: Vec<String> = session
        .store
        .ids()
        .iter()
        .map(ToString::to_string)
        .collect();
    let note = if degraded { " (fallback)" } else { "" };
    println!("{}: {}{}", session.image_id(), ids.join(","), note);
}

fn run_arrange(args: ArrangeArgs) -> Result<(), KomaError> {
    let mut workspace = open_workspace(args.target.dir, |_| {})?;
    let mut session = workspace.open_image(&args.target.image)?;

    session.arrange.enter();
    for id in args.clicks {
        session.arrange.record_click(BoxId(id))?;
    }
    session.arrange.commit_to(&mut session.store)?;
    workspace.flush(&session)?;
    print_order(&session, false);
    Ok(())
}

fn run_delete(args: DeleteArgs) -> Result<(), KomaError> {
    let mut workspace = open_workspace(args.target.dir, |_| {})?;
    let mut session = workspace.open_image(&args.target.image)?;

    match session.store.remove(BoxId(args.id)) {
        Some(_) => println!("Deleted box {} from {}", args.id, session.image_id()),
        None => println!("No box {} on {}; nothing deleted", args.id, session.image_id()),
    }
    workspace.flush(&session)?;
    Ok(())
}

fn run_show(args: ImageArgs) -> Result<(), KomaError> {
    let workspace = open_workspace(args.dir, |_| {})?;
    let session = workspace.open_image(&args.image)?;

    println!("{}: {} box(es)", session.image_id(), session.store.len());
    for (index, text_box) in session.store.snapshot().iter().enumerate() {
        let (x, y, w, h) = text_box.coords.to_xywh();
        println!(
            "  {}. box {} at ({}, {}, {}, {})",
            index + 1,
            text_box.id,
            x,
            y,
            w,
            h
        );
        for line in &text_box.lines {
            println!("       {}", line);
        }
        for line in &text_box.user_lines {
            println!("     > {}", line);
        }
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), KomaError> {
    let workspace = open_workspace(args.dir, |_| {})?;
    let image_ids = workspace.image_ids().iter().map(String::as_str);

    match args.format {
        ExportFormat::Raw | ExportFormat::Tl => {
            let kind = match args.format {
                ExportFormat::Raw => ReportKind::Raw,
                _ => ReportKind::Translation,
            };
            let output = args
                .output
                .unwrap_or_else(|| workspace.dir().join(kind.default_file_name()));
            write_report(&output, workspace.document(), image_ids, kind)?;
            println!(
                "Wrote {} page(s) to {}",
                workspace.image_ids().len(),
                output.display()
            );
        }
        ExportFormat::Yolo => {
            let output = args
                .output
                .unwrap_or_else(|| workspace.dir().join("labels"));
            let written = export_yolo_dir(
                &output,
                workspace.document(),
                workspace.config().yolo.class_id,
                |image_id| workspace.dims_for(image_id),
            )?;
            println!("Wrote {} label file(s) to {}", written, output.display());
        }
    }
    Ok(())
}

fn run_import_yolo(args: ImportYoloArgs) -> Result<(), KomaError> {
    let mut workspace = open_workspace(args.dir, |_| {})?;
    let imported = pipeline::import_yolo_labels(&mut workspace, &args.labels)?;
    println!("Imported labels for {} image(s)", imported);
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), KomaError> {
    let workspace = open_workspace(args.dir, |_| {})?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_document(workspace.document(), |image_id| {
        workspace.dims_for(image_id).ok()
    });

    match args.output {
        ReportFormat::Json => {
            let rendered = serde_json::to_string_pretty(&report.to_json_value()).map_err(|source| {
                KomaError::AnnotationWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{}", rendered);
        }
        ReportFormat::Text => print!("{}", report),
    }

    if opts.fails(&report) {
        Err(KomaError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}
