//! Command-line host shell.
//!
//! Without `--variable` prints the metadata report; with it renders the
//! variable to a GeoTIFF and prints the layer handoff record.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ncgeo::core::visualize::{CollectingRegistry, LogSink};
use ncgeo::{MetadataReport, NetcdfDataset, VisualizeOptions, Visualizer};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nc-visualize")]
#[command(about = "Render a NetCDF variable as a georeferenced GeoTIFF")]
struct Args {
    /// NetCDF file to open
    file: PathBuf,

    /// Variable to render; omit to print the metadata report
    #[arg(short, long)]
    variable: Option<String>,

    /// Directory for the output raster (default: system temp dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON file with pipeline options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_options(args: &Args) -> Result<VisualizeOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => VisualizeOptions::default(),
    };
    if args.output_dir.is_some() {
        options.output_dir = args.output_dir.clone();
    }
    Ok(options)
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level)).init();

    let options = load_options(&args)?;
    let dataset = NetcdfDataset::open(&args.file)?;

    let Some(variable) = &args.variable else {
        let report = MetadataReport::from_dataset(&dataset);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report);
        }
        return Ok(());
    };

    let sink = LogSink;
    let visualizer = Visualizer::new(&dataset, options, &sink);
    let mut registry = CollectingRegistry::default();
    let outcome = match visualizer.visualize(variable, &mut registry) {
        Ok(outcome) => outcome,
        Err(e) => bail!("[{:?}] {}", e.kind(), e),
    };

    let handoff = outcome.handoff();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&handoff)?);
    } else {
        println!("{}", handoff.path.display());
        println!("{}", handoff.display_name);
        if let Some(georef) = &outcome.georeference {
            println!("geotransform: {:?}", georef.transform.to_gdal());
        } else {
            println!("geotransform: none");
        }
        match &outcome.projection {
            Some(projection) => println!("projection: {:?}", projection),
            None => println!("projection: none"),
        }
    }
    Ok(())
}
