use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use insertion_features::engine::{ExternalEngine, LapperEngine, OverlapEngine, PrecomputedEngine};
use insertion_features::options::{MergeOptions, PipelineConfig};
use insertion_features::pipeline;
use insertion_features::utils::{
    DEFAULT_GENE_COLUMN, DEFAULT_KEY_COLUMN, DEFAULT_STRAND_COLUMN, ENGINE_SCRIPT_FILE,
    OVERLAP_TABLE_FILE,
};
use peak_alloc::PeakAlloc;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// run an external overlap search program (by default `perl gff_genomics.pl -G`)
    External,
    /// search overlaps in-process with interval trees
    Lapper,
    /// replay a saved raw overlap table given with --overlaps
    Table,
}

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    /// directory holding genome_annotation.gff3, insertion_location.gff3, template.csv
    /// and gff_genomics.pl; new_insertion_features.csv is written there too
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// the reference genome annotation (GFF3, optionally gzipped)
    #[arg(long)]
    annotation: Option<PathBuf>,

    /// the insertion locations (GFF3, optionally gzipped)
    #[arg(long)]
    insertions: Option<PathBuf>,

    /// the template feature table (CSV), possibly empty
    #[arg(long)]
    template: Option<PathBuf>,

    /// where the merged feature table (CSV) is written
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// how overlaps between insertions and annotation features are found
    #[arg(long, value_enum, default_value_t = EngineKind::External)]
    engine: EngineKind,

    /// the program run by the external engine
    #[arg(long, default_value = "perl")]
    program: String,

    /// the script passed to the program (defaults to gff_genomics.pl in --dir)
    #[arg(long)]
    script: Option<PathBuf>,

    /// extra arguments placed before the two input files
    #[arg(long = "engine-arg", allow_hyphen_values = true, default_value = "-G")]
    engine_args: Vec<String>,

    /// a saved raw overlap table, used with --engine table
    #[arg(long, required_if_eq("engine", "table"))]
    overlaps: Option<PathBuf>,

    /// also save the raw overlap table, by default as bisearch_overlaps.tab in --dir
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    keep_overlaps: Option<Option<PathBuf>>,

    /// the template column to join on
    #[arg(long, default_value = DEFAULT_KEY_COLUMN)]
    key: String,

    /// the output column receiving gene ids
    #[arg(long, default_value = DEFAULT_GENE_COLUMN)]
    gene_column: String,

    /// the output column receiving strands
    #[arg(long, default_value = DEFAULT_STRAND_COLUMN)]
    strand_column: String,

    /// log debug messages
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::in_dir(&self.dir);
        PipelineConfig::new(
            self.annotation.clone().unwrap_or(defaults.annotation),
            self.insertions.clone().unwrap_or(defaults.insertions),
            self.template.clone().unwrap_or(defaults.template),
            self.output.clone().unwrap_or(defaults.output),
        )
        .with_keep_overlaps(self.keep_overlaps.clone().map(|p| {
            p.unwrap_or_else(|| self.dir.join(OVERLAP_TABLE_FILE))
        }))
        .with_merge_options(MergeOptions::new(
            &self.key,
            &self.gene_column,
            &self.strand_column,
        ))
    }

    fn engine(&self) -> anyhow::Result<Box<dyn OverlapEngine>> {
        let engine: Box<dyn OverlapEngine> = match self.engine {
            EngineKind::External => {
                let script = self
                    .script
                    .clone()
                    .unwrap_or_else(|| self.dir.join(ENGINE_SCRIPT_FILE));
                Box::new(
                    ExternalEngine::new(&self.program)
                        .with_script(script)
                        .with_args(&self.engine_args),
                )
            }
            EngineKind::Lapper => Box::new(LapperEngine::new()),
            EngineKind::Table => {
                let table = self
                    .overlaps
                    .clone()
                    .ok_or_else(|| anyhow!("--engine table needs a saved table via --overlaps"))?;
                Box::new(PrecomputedEngine::new(table))
            }
        };
        Ok(engine)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else if cli.quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    let config = cli.config();
    let engine = cli.engine()?;
    debug!("running with {:?}", config);

    let start = Instant::now();
    let summary = pipeline::run(&config, engine.as_ref())
        .with_context(|| format!("could not build the feature table {:?}", config.output))?;

    info!(
        "Done in {:?}: {} overlap records, {} genes resolved, {} without an insertion id, {} rows written to {:?}",
        start.elapsed(),
        summary.overlap_rows,
        summary.resolved_genes,
        summary.unparsable_keys,
        summary.output_rows,
        config.output
    );
    debug!("peak memory usage: {:.2} MB", PEAK_ALLOC.peak_usage_as_mb());
    Ok(())
}
