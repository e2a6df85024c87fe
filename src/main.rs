//! emoji-mosaic CLI - Convert a photo into an emoji mosaic

use clap::{Parser, ValueEnum};
use emoji_mosaic::{
    BackgroundMode, Converter, Crop, MatchWeights, MosaicConfig, MosaicError, Settings,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// One row per line, glyphs concatenated
    Text,
    /// One row per line, glyphs separated by spaces
    Spaced,
    Png,
    Jpg,
    /// Conversion summary with base64 preview
    Json,
}

#[derive(Parser)]
#[command(name = "emoji-mosaic", about = "Convert a photo into an emoji mosaic")]
struct Args {
    /// Input PNG or JPEG
    input: PathBuf,
    /// TOML config (dataset paths, cache sizes, render sizes)
    #[arg(short, long, default_value = "emoji-mosaic.toml")]
    config: PathBuf,
    /// Crop rectangle as x,y,w,h
    #[arg(long)]
    crop: Option<Crop>,
    /// Cap for the longer grid axis (at most 120)
    #[arg(long, default_value = "120")]
    max_dim: u32,
    /// Explicit grid width in cells
    #[arg(long, allow_hyphen_values = true)]
    grid_w: Option<i64>,
    /// Explicit grid height in cells
    #[arg(long, allow_hyphen_values = true)]
    grid_h: Option<i64>,
    #[arg(long)]
    no_lock_aspect: bool,
    /// Request dithering (reserved, currently a no-op)
    #[arg(long)]
    dither: bool,
    /// Resolve ties by lowest index instead of a seeded draw
    #[arg(long)]
    random_ties: bool,
    #[arg(long, default_value = "1.0")]
    color_weight: f32,
    #[arg(long, default_value = "0.2")]
    edge_weight: f32,
    #[arg(long, default_value = "0.1")]
    alpha_weight: f32,
    /// Background: transparent or solid
    #[arg(long, default_value = "transparent")]
    bg: BackgroundMode,
    #[arg(long, default_value = "#ffffff")]
    bg_color: String,
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,
    /// Output file (required for png/jpg)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), MosaicError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = MosaicConfig::load_from_file(&args.config)?;
    let converter = Converter::new(config)?;

    let settings = Settings {
        max_dim: args.max_dim,
        grid_w: args.grid_w,
        grid_h: args.grid_h,
        lock_aspect: !args.no_lock_aspect,
        dithering: args.dither,
        deterministic: !args.random_ties,
        weights: MatchWeights {
            color: args.color_weight,
            edge: args.edge_weight,
            alpha: args.alpha_weight,
        },
        bg_mode: args.bg,
        bg_color: args.bg_color.clone(),
    };

    let bytes = std::fs::read(&args.input)?;
    let conversion = converter.convert(&bytes, &args.crop.unwrap_or_default(), &settings)?;
    for warning in &conversion.result.warnings {
        eprintln!("warning: {warning}");
    }

    let payload = match args.format {
        Format::Text => (converter.export_text(&conversion.hash, false)? + "\n").into_bytes(),
        Format::Spaced => (converter.export_text(&conversion.hash, true)? + "\n").into_bytes(),
        Format::Json => {
            let mut json = serde_json::to_vec_pretty(&conversion.summary())?;
            json.push(b'\n');
            json
        }
        Format::Png => converter.export_png(&conversion.hash, args.bg, &args.bg_color)?,
        Format::Jpg => converter.export_jpeg(&conversion.hash, &args.bg_color)?,
    };

    match (&args.output, args.format) {
        (Some(path), _) => std::fs::write(path, payload)?,
        (None, Format::Png | Format::Jpg) => {
            return Err(MosaicError::Config("binary formats need --output".into()));
        }
        (None, _) => std::io::stdout().write_all(&payload)?,
    }

    Ok(())
}
