//! seqtile CLI entry point
//!
//! Serves nucleotide tiles from an indexed FASTA or a multivec tile service
//! and shows how columns reduce to letters and colors.

use clap::{Args, Parser, Subcommand, ValueEnum};
use seqtile::core::{display_state, visible_tile_ids, zoom_level_for_view, TieBreakKind};
use seqtile::{
    AggregationMode, CancelToken, DataConfig, DataFetcher, FaiIndex, IoStrategy, MetadataResponse,
    TileAssembler, TileBatch, TrackConfig, TrackOptions,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Column aggregation mode (CLI enum)
#[derive(Clone, Copy, Debug, ValueEnum)]
enum AggregationArg {
    /// Only single bases; same as exact
    None,
    /// Only single bases
    Exact,
    /// Dominant symbol
    Max,
    /// Frequency-weighted color blend
    Weighted,
}

impl From<AggregationArg> for AggregationMode {
    fn from(arg: AggregationArg) -> Self {
        match arg {
            AggregationArg::None | AggregationArg::Exact => AggregationMode::Exact,
            AggregationArg::Max => AggregationMode::Max,
            AggregationArg::Weighted => AggregationMode::Weighted,
        }
    }
}

/// Tie-break strategy for the max mode (CLI enum)
#[derive(Clone, Copy, Debug, ValueEnum)]
enum TieBreakArg {
    Random,
    First,
    RoundRobin,
}

impl From<TieBreakArg> for TieBreakKind {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Random => TieBreakKind::Random,
            TieBreakArg::First => TieBreakKind::First,
            TieBreakArg::RoundRobin => TieBreakKind::RoundRobin,
        }
    }
}

#[derive(Parser)]
#[command(name = "seqtile")]
#[command(about = "Tiled nucleotide sequence data for genome browser tracks")]
#[command(version)]
#[command(author = "seqtile Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where tiles come from
#[derive(Args, Clone, Debug)]
struct SourceArgs {
    /// Chromosome sizes table (path or URL)
    #[arg(long)]
    chromsizes: Option<String>,
    /// FASTA file (path or URL)
    #[arg(long)]
    fasta: Option<String>,
    /// FASTA index (default: <fasta>.fai)
    #[arg(long)]
    fai: Option<String>,
    /// Tile service base URL
    #[arg(long)]
    server: Option<String>,
    /// Tileset uid on the tile service
    #[arg(long)]
    uid: Option<String>,
    /// Track configuration JSON; replaces the source flags above
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serve raw sequence only at the deepest zoom
    #[arg(long)]
    fixed_zoom: bool,
    /// Local FASTA access: auto, mmap or buffered
    #[arg(long = "io", default_value = "auto")]
    io_strategy: IoStrategy,
}

#[derive(Subcommand)]
enum Commands {
    /// Print tileset metadata as JSON
    Info {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Fetch tiles and print them as JSON
    Tiles {
        #[command(flatten)]
        source: SourceArgs,
        /// Tile ids, "<zoom>.<index>"
        #[arg(required = true)]
        tile_ids: Vec<String>,
        /// Give up on the batch after this many seconds
        #[arg(long)]
        timeout: Option<f64>,
    },
    /// Reduce tiles to letters and colors
    Colors {
        #[command(flatten)]
        source: SourceArgs,
        /// Tile ids, "<zoom>.<index>"
        #[arg(required = true)]
        tile_ids: Vec<String>,
        /// Color aggregation mode (default: from config, else none)
        #[arg(long)]
        mode: Option<AggregationArg>,
        /// Tie-break strategy for the max mode
        #[arg(long = "tie-break")]
        tie_break: Option<TieBreakArg>,
        /// Seed for random tie-breaking
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Zoom level and tile ids for a view
    View {
        #[command(flatten)]
        source: SourceArgs,
        /// View start (absolute coordinate)
        #[arg(long)]
        start: f64,
        /// View end (absolute coordinate)
        #[arg(long)]
        end: f64,
        /// Track width in pixels
        #[arg(long, default_value = "1024")]
        width: f64,
        /// Also list one neighbouring tile on each side
        #[arg(long)]
        extended_preloading: bool,
    },
    /// Build a FASTA index (.fai)
    Faidx {
        /// Uncompressed FASTA file
        fasta: PathBuf,
        /// Output file (default: <fasta>.fai)
        output: Option<PathBuf>,
    },
}

fn track_config(args: &SourceArgs) -> anyhow::Result<TrackConfig> {
    if let Some(path) = &args.config {
        return TrackConfig::from_json_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load track config {:?}: {}", path, e));
    }

    let data = match (&args.chromsizes, &args.fasta, &args.server, &args.uid) {
        (Some(chromsizes), Some(fasta), _, _) => DataConfig::Raw {
            chrom_sizes_url: chromsizes.clone(),
            fasta_url: fasta.clone(),
            fai_url: args.fai.clone(),
        },
        (_, _, Some(server), Some(uid)) => DataConfig::PreEncoded {
            server: server.clone(),
            tileset_uid: uid.clone(),
        },
        _ => anyhow::bail!("Specify --chromsizes and --fasta, --server and --uid, or --config"),
    };

    let options = TrackOptions {
        fixed_zoom_for_single_resolution: args.fixed_zoom,
        ..TrackOptions::default()
    };
    Ok(TrackConfig { data, options })
}

fn build_assembler(args: &SourceArgs) -> anyhow::Result<(TileAssembler<DataFetcher>, TrackOptions)> {
    let config = track_config(args)?;
    match &config.data {
        DataConfig::Raw { fasta_url, .. } => eprintln!("Sequence source: {}", fasta_url),
        DataConfig::PreEncoded { server, tileset_uid } => {
            eprintln!("Tile service: {} (tileset {})", server, tileset_uid)
        }
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("seqtile/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher = DataFetcher::from_config(client, &config.data, &config.options, args.io_strategy);
    Ok((TileAssembler::new(fetcher), config.options))
}

async fn fetch_batch(
    assembler: &TileAssembler<DataFetcher>,
    tile_ids: &[String],
    timeout: Option<f64>,
) -> anyhow::Result<TileBatch> {
    let Some(seconds) = timeout else {
        return Ok(assembler.resolve_tiles(tile_ids).await);
    };

    let limit = timeout_duration(seconds)?;
    let token = CancelToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        canceller.cancel();
    });

    assembler
        .resolve_tiles_cancellable(tile_ids, &token)
        .await
        .map_err(|e| anyhow::anyhow!("{} (timeout {}s)", e, seconds))
}

/// `--timeout` seconds as a duration; rejects negative or non-finite values
fn timeout_duration(seconds: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| anyhow::anyhow!("Invalid --timeout {}: {}", seconds, e))
}

fn print_batch_stats(batch: &TileBatch, requested: usize, start: Instant) {
    eprintln!("\n=== Tile Statistics ===");
    eprintln!("Requested:       {}", requested);
    eprintln!("Resolved:        {}", batch.tiles.len());
    eprintln!("Failed:          {}", batch.failures.len());
    for (id, err) in &batch.failures {
        eprintln!("  - {}: {}", id, err);
    }
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Info { source } => {
            let (assembler, _) = build_assembler(&source)?;
            let response = assembler.tileset_info_response().await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if let MetadataResponse::Error { error } = response {
                anyhow::bail!(error);
            }
        }

        Commands::Tiles { source, tile_ids, timeout } => {
            let (assembler, _) = build_assembler(&source)?;
            let batch = fetch_batch(&assembler, &tile_ids, timeout).await?;
            println!("{}", serde_json::to_string(&batch.tiles)?);
            print_batch_stats(&batch, tile_ids.len(), start);
        }

        Commands::Colors { source, tile_ids, mode, tie_break, seed } => {
            let (assembler, mut options) = build_assembler(&source)?;
            if let Some(mode) = mode {
                options.color_aggregation_mode = mode.into();
            }
            if let Some(tie_break) = tie_break {
                options.tie_break = tie_break.into();
            }
            if seed.is_some() {
                options.tie_break_seed = seed;
            }
            let reducer = options.reducer()?;

            let batch = fetch_batch(&assembler, &tile_ids, None).await?;
            let mut output = BTreeMap::new();
            for (id, tile) in &batch.tiles {
                match reducer.reduce_columns(&tile.dense) {
                    Ok(reduced) => {
                        let letters: String = reduced.iter().map(|r| r.letter).collect();
                        let colors: Vec<&str> = reduced.iter().map(|r| r.color_key(reducer.scale())).collect();
                        output.insert(id.clone(), serde_json::json!({ "letters": letters, "colors": colors }));
                    }
                    Err(e) => eprintln!("Tile {}: {}", id, e),
                }
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
            eprintln!(
                "Mode: {}, palette size: {}",
                options.color_aggregation_mode.as_str(),
                reducer.palette().len()
            );
            print_batch_stats(&batch, tile_ids.len(), start);
        }

        Commands::View { source, start: view_start, end: view_end, width, extended_preloading } => {
            let (assembler, options) = build_assembler(&source)?;
            let info = match assembler.tileset_info_response().await {
                MetadataResponse::Info(info) => info,
                MetadataResponse::Error { error } => anyhow::bail!(error),
            };

            let zoom = zoom_level_for_view(&info, view_start, view_end, width);
            let state = display_state(
                Some(&info),
                zoom,
                options.color_aggregation_mode,
                &options.notification_text,
            );
            let preload = extended_preloading || options.extended_preloading;
            let tiles = visible_tile_ids(&info, zoom, view_start, view_end, preload);

            println!("zoom\t{}", zoom);
            println!("state\t{:?}", state);
            println!("tiles\t{}", tiles.join(" "));
        }

        Commands::Faidx { fasta, output } => {
            let output_path = output.unwrap_or_else(|| {
                let mut path = fasta.clone().into_os_string();
                path.push(".fai");
                PathBuf::from(path)
            });

            eprintln!("Indexing FASTA file: {:?} -> {:?}", fasta, output_path);
            let bytes = std::fs::read(&fasta)
                .map_err(|e| anyhow::anyhow!("Failed to read FASTA {:?}: {}", fasta, e))?;
            let index = FaiIndex::build(&bytes)?;
            std::fs::write(&output_path, index.to_fai_string())?;

            eprintln!("\n=== Index Statistics ===");
            eprintln!("Sequences:       {}", index.len());
            eprintln!(
                "Total bases:     {}",
                index.records().iter().map(|r| r.length).sum::<u64>()
            );
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
