//! boxclust - Cluster the visual boxes of rendered pages
//!
//! A command line tool that reads page documents (page size plus boxes) as
//! JSON and writes the segmentation (clusters and residual boxes) as JSON.

use anyhow::{Context, Result, bail};
use boxclust_core::high_level::{DEFAULT_SEGM_TAG, SegmentOptions, segment_pages};
use boxclust_core::layout::{ClusteringParams, PageInput, SegmentationDocument};
use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// A command line tool for clustering the visual boxes of rendered pages.
#[derive(Parser, Debug)]
#[command(name = "boxclust")]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
    /// One or more page documents, or "-" for stdin
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print version information
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    // === Clustering options ===
    /// JSON file with clustering parameters; flags below override it
    #[arg(short = 'p', long = "params")]
    params: Option<PathBuf>,

    /// Merge relations with similarity up to this value (0.0 to 1.0)
    #[arg(short = 't', long = "threshold")]
    clustering_threshold: Option<f64>,

    /// Iteration after which two clusters may no longer merge
    #[arg(long = "cluster-cap")]
    cluster_iteration_cap: Option<usize>,

    /// Search strip growth step for left/right neighbours
    #[arg(long = "lateral-step")]
    lateral_step: Option<f64>,

    /// Search strip growth step for up/down neighbours
    #[arg(long = "vertical-step")]
    vertical_step: Option<f64>,

    /// Comma-separated overlap limits, one container removal pass each
    #[arg(long = "container-limits", value_delimiter = ',')]
    container_limits: Option<Vec<usize>>,

    /// Amount every rectangle is shrunk by before overlap queries
    #[arg(long)]
    shrink: Option<f64>,

    /// Upper bound on overlap absorption rounds per merge candidate
    #[arg(long = "max-absorption-rounds")]
    max_absorption_rounds: Option<usize>,

    /// Run neighbour discovery on a single thread
    #[arg(long = "no-parallel", action = ArgAction::SetTrue)]
    no_parallel: bool,

    // === Output options ===
    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Implementation tag written into cluster records
    #[arg(short = 's', long, default_value = DEFAULT_SEGM_TAG)]
    segm: String,

    /// Number of pages clustered concurrently
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Build ClusteringParams from the params file and command line flags.
fn build_params(args: &Args) -> Result<ClusteringParams> {
    let mut params = match &args.params {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open params file {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse params file {}", path.display()))?
        }
        None => ClusteringParams::default(),
    };

    if let Some(v) = args.clustering_threshold {
        params.clustering_threshold = v;
    }
    if let Some(v) = args.cluster_iteration_cap {
        params.cluster_iteration_cap = v;
    }
    if let Some(v) = args.lateral_step {
        params.lateral_step = v;
    }
    if let Some(v) = args.vertical_step {
        params.vertical_step = v;
    }
    if let Some(v) = &args.container_limits {
        params.container_limits = v.clone();
    }
    if let Some(v) = args.shrink {
        params.shrink = v;
    }
    if let Some(v) = args.max_absorption_rounds {
        params.max_absorption_rounds = v;
    }
    if args.no_parallel {
        params.parallel_discovery = false;
    }

    params.validate()?;
    Ok(params)
}

fn read_page(path: &Path) -> Result<PageInput> {
    let page = if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        PageInput::from_json(&text)?
    } else {
        if !path.exists() {
            bail!("file not found: {}", path.display());
        }
        let file = File::open(path)?;
        PageInput::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to read page document {}", path.display()))?
    };
    debug!(file = %path.display(), boxes = page.boxes.len(), "loaded page");
    Ok(page)
}

fn write_documents<W: Write>(writer: &mut W, docs: &[SegmentationDocument]) -> Result<()> {
    match docs {
        [single] => serde_json::to_writer_pretty(&mut *writer, single)?,
        _ => serde_json::to_writer_pretty(&mut *writer, docs)?,
    }
    writeln!(writer)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let params = build_params(&args)?;
    let pages = args
        .files
        .iter()
        .map(|path| read_page(path))
        .collect::<Result<Vec<_>>>()?;

    let options = SegmentOptions {
        params: Some(params),
        segm: args.segm.clone(),
        threads: args.threads,
    };
    let docs = segment_pages(&pages, Some(options))?;
    for (path, doc) in args.files.iter().zip(&docs) {
        info!(
            file = %path.display(),
            clusters = doc.clusters().count(),
            residual = doc.boxes().count(),
            iterations = doc.stats.iterations,
            termination = ?doc.stats.termination,
            "segmented"
        );
    }

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };
    write_documents(&mut output, &docs)?;
    output.flush()?;

    Ok(())
}
