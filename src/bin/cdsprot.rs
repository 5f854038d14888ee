use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cdsprot::cli;
use cdsprot::config::ReconstructionConfig;
use cdsprot::fasta::FastaReference;
use cdsprot::feature::{FeatureKind, FeatureTree};
use cdsprot::manager::{ProteinSequenceManager, ProteinSequenceRequest};
use cdsprot::source::InMemoryAnnotations;
use cdsprot::variant::Variation;
use cdsprot::window::TrackWindow;

type Manager = ProteinSequenceManager<InMemoryAnnotations, FastaReference>;

#[derive(Parser)]
#[command(name = "cdsprot", about = "Reconstruct protein sequences from CDS annotations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate every transcript overlapping a window
    Translate {
        #[command(flatten)]
        common: CommonArgs,

        /// Do not stitch a short final codon with bases from the next CDS
        #[arg(long = "no-extend")]
        no_extend: bool,
    },

    /// Enumerate candidate proteins for a set of variations
    Variants {
        #[command(flatten)]
        common: CommonArgs,

        /// JSON array of variations
        #[arg(long = "variants")]
        variants: PathBuf,
    },

    /// Build the protein string of a single gene, mRNA or CDS
    Feature {
        #[command(flatten)]
        common: CommonArgs,

        /// Feature name to look up
        #[arg(long = "feature-id")]
        feature_id: String,

        /// Feature type: gene, mrna or cds
        #[arg(long = "feature-type")]
        feature_type: String,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Reference FASTA (plain or gzip-compressed)
    #[arg(short = 'r', long = "reference")]
    reference: PathBuf,

    /// Gene feature tree as JSON
    #[arg(short = 'f', long = "features")]
    features: PathBuf,

    /// Chromosome name
    #[arg(long = "chrom")]
    chrom: String,

    /// Window start (1-based, inclusive)
    #[arg(long = "start")]
    start: i32,

    /// Window end (1-based, inclusive)
    #[arg(long = "end")]
    end: i32,

    /// Reference genome id
    #[arg(long = "reference-id", default_value_t = 1)]
    reference_id: u64,

    /// Track id reported in the output
    #[arg(long = "track", default_value = "genes")]
    track: String,

    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,
}

impl CommonArgs {
    fn window(&self) -> TrackWindow {
        TrackWindow::new(&self.track, &self.chrom, self.start, self.end)
            .with_reference(self.reference_id)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let start = Instant::now();
    let cli_args = Cli::parse();

    match cli_args.command {
        Command::Translate { common, no_extend } => {
            cli::banner("Translate");
            let manager = load(&common)?;
            let extend = manager.config().extend_across_boundary && !no_extend;
            cli::kv("Extend CDS", &extend.to_string());
            eprintln!();

            cli::section("Reconstruction");
            let window = common.window();
            let mut config = manager.config().clone();
            config.extend_across_boundary = extend;
            let manager = manager.with_config(config);
            let track = manager.load_protein_track(&window)?;
            let residues: usize = track.transcripts.iter().map(|t| t.entries.len()).sum();
            if track.transcripts.is_empty() {
                cli::warning("no transcripts with a transcript_id in the window");
            }
            cli::success(&format!(
                "{} transcripts, {residues} amino acids",
                track.transcripts.len()
            ));
            write_json(&track, common.out.as_deref())?;
        }
        Command::Variants { common, variants } => {
            cli::banner("Variants");
            let manager = load(&common)?;
            let file = File::open(&variants)
                .with_context(|| format!("failed to open variations: {}", variants.display()))?;
            let variations: Vec<Variation> = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse variations: {}", variants.display()))?;
            cli::kv("Variations", &variations.len().to_string());
            eprintln!();

            cli::section("Reconstruction");
            let track = manager.load_protein_variants_track(&common.window(), &variations)?;
            let candidates: usize = track.transcripts.values().map(Vec::len).sum();
            cli::success(&format!(
                "{} transcripts, {candidates} candidate proteins",
                track.transcripts.len()
            ));
            write_json(&track, common.out.as_deref())?;
        }
        Command::Feature {
            common,
            feature_id,
            feature_type,
        } => {
            cli::banner("Feature");
            let manager = load(&common)?;
            cli::kv("Feature", &format!("{feature_type} {feature_id}"));
            eprintln!();

            cli::section("Reconstruction");
            let request = ProteinSequenceRequest {
                window: common.window(),
                feature_id,
                feature_type: FeatureKind::parse(&feature_type),
            };
            let protein = manager.load_protein_sequence(&request)?;
            cli::success(&format!("{} amino acids", protein.sequence.len()));
            write_json(&protein, common.out.as_deref())?;
        }
    }

    cli::print_summary(start);
    Ok(())
}

fn load(common: &CommonArgs) -> Result<Manager> {
    cli::section("Configuration");

    let config = match &common.config {
        Some(path) => {
            cli::kv("Config", &path.display().to_string());
            ReconstructionConfig::from_file(path)?
        }
        None => ReconstructionConfig::default(),
    };
    cli::kv(
        "Window",
        &format!("{}:{}-{}", common.chrom, common.start, common.end),
    );

    let reference = FastaReference::from_path(&common.reference, common.reference_id)
        .with_context(|| format!("failed to load reference: {}", common.reference.display()))?;
    cli::kv(
        "Reference",
        &format!(
            "{} ({} sequences)",
            common.reference.display(),
            reference.len()
        ),
    );

    let file = File::open(&common.features)
        .with_context(|| format!("failed to open features: {}", common.features.display()))?;
    let tree = FeatureTree::from_json(BufReader::new(file))
        .with_context(|| format!("failed to parse features: {}", common.features.display()))?;
    cli::kv(
        "Features",
        &format!("{} ({} features)", common.features.display(), tree.len()),
    );

    Ok(ProteinSequenceManager::new(InMemoryAnnotations::new(tree), reference).with_config(config))
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            cli::kv("Output", &path.display().to_string());
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
