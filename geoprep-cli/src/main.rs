mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use geoprep::commons::output::{
    read_json, write_json_atomic, BuildingsDocument, LandUseDocument, StreetsDocument,
    BUILDINGS_FILE, LANDUSE_FILE, STREETS_FILE,
};
use geoprep::commons::style::{NoStyle, SceneStyle, StyleDecorator};
use geoprep::geo_core::{FrameScale, ReferenceFrame};
use geoprep::geometric::alignment::AlignmentReport;
use geoprep::geometric::anchor::{
    derive_reference_frame, derive_reference_frame_from_local, AnchorCenter,
};
use geoprep::geometric::building::BuildingCollection;
use geoprep::geometric::feature::Feature;
use geoprep::geometric::land_cover::LandCover;
use geoprep::geometric::region::FilterMode;
use geoprep::geometric::road::{Road, Street};

use crate::config::{read_sources, read_sources_with, InputFormat, PipelineConfig, Selection};

/// `geoprep` - converts raw map extracts into the local-metre JSON documents
/// of the downtown Belleville 3D scene.
#[derive(Parser, Debug)]
#[command(name = "geoprep", version, about, long_about = None)]
struct Cli {
    /// JSON pipeline configuration; flags below override it
    #[arg(long, global = true, env = "GEOPREP_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the documents are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long, global = true, allow_hyphen_values = true)]
    center_lat: Option<f64>,

    #[arg(long, global = true, allow_hyphen_values = true)]
    center_lon: Option<f64>,

    /// Use 111320 m and 111320 * cos(lat) m per degree instead of the fixed factors
    #[arg(long, global = true)]
    cosine_scale: bool,

    /// EPSG code of the input coordinates
    #[arg(long, global = true)]
    source_epsg: Option<i32>,

    /// Leave colours unset
    #[arg(long, global = true)]
    no_style: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project footprints into buildings.json
    Buildings {
        input: PathBuf,
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
    },
    /// Project highways into streets.json
    Streets {
        input: PathBuf,
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
    },
    /// Classify land use into landuse.json
    Landuse {
        input: PathBuf,
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
        /// Overture theme of a GeoJSON input: land, water or infrastructure
        #[arg(long)]
        source_type: Option<String>,
    },
    /// Trim streets.json to the building extent plus a margin
    Finalize {
        #[arg(long)]
        margin: Option<f64>,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Compare the extents of buildings.json and streets.json
    Check {
        /// Also report the extent of the streets named like this
        #[arg(long)]
        anchor: Option<String>,
        #[arg(long, default_value_t = 5)]
        nearest: usize,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the frame centred on a named feature
    Anchor {
        name: String,
        /// Source file; without it the current streets.json is searched
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
        #[arg(long)]
        range_midpoint: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Mode {
    Keep,
    Clip,
}

impl From<Mode> for FilterMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Keep => FilterMode::KeepIfAnyPointInRegion,
            Mode::Clip => FilterMode::ClipToRegion,
        }
    }
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(lat) = self.center_lat {
            config.frame.center_latitude = lat;
        }
        if let Some(lon) = self.center_lon {
            config.frame.center_longitude = lon;
        }
        if self.cosine_scale {
            config.frame.scale = FrameScale::Cosine;
        }
        if self.source_epsg.is_some() {
            config.source_epsg = self.source_epsg;
        }
        Ok(config)
    }

    fn style(&self) -> Box<dyn StyleDecorator> {
        if self.no_style {
            Box::new(NoStyle)
        } else {
            Box::new(SceneStyle)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.pipeline_config()?;
    let style = cli.style();

    match &cli.command {
        Command::Buildings { input, format } => {
            // frame and bbox problems abort before reading any data
            let frame = config.reference_frame()?;
            let transform = config.transform()?;
            let mut collection = BuildingCollection::new(frame, config.buildings);
            if let Some(bbox) = config.bbox {
                collection.set_bbox(bbox).context("Invalid bbox configuration")?;
            }

            let format = format.unwrap_or_else(|| InputFormat::detect(input));
            let sources = read_sources(input, format, Some(Selection::Buildings))?;
            let collection = collection.run(&sources, transform.as_ref())?;
            log::info!("Mean building height: {:.1} m", collection.calculate_mean_height());

            let mut buildings = collection.into_buildings();
            style.decorate_buildings(&mut buildings);
            let document = BuildingsDocument { buildings };
            write_json_atomic(config.output_file(BUILDINGS_FILE), &document)?;
        }
        Command::Streets { input, format } => {
            let frame = config.reference_frame()?;
            let region = config.region()?;
            let transform = config.transform()?;

            let format = format.unwrap_or_else(|| InputFormat::detect(input));
            let sources = read_sources(input, format, Some(Selection::Streets))?;
            let mut road = Road::new(frame).run(&sources, transform.as_ref())?;
            if let Some(region) = region {
                road.restrict_to(&region, config.filter_mode)?;
            }
            for (class, count) in road.count_by_type() {
                log::info!("  {}: {}", class.as_str(), count);
            }

            let mut streets = road.into_streets();
            style.decorate_streets(&mut streets);
            write_json_atomic(config.output_file(STREETS_FILE), &StreetsDocument { streets })?;
        }
        Command::Landuse {
            input,
            format,
            source_type,
        } => {
            let frame = config.reference_frame()?;
            let region = config.region()?;
            let transform = config.transform()?;

            let format = format.unwrap_or_else(|| InputFormat::detect(input));
            let selection = Some(Selection::LandUse);
            let sources = read_sources_with(input, format, selection, source_type.as_deref())?;
            let mut cover = LandCover::new(frame).run(&sources, transform.as_ref())?;
            if let Some(region) = region {
                // land use is only ever kept whole
                cover.restrict_to(&region, FilterMode::KeepIfAnyPointInRegion)?;
            }
            for (land_use, count) in cover.count_by_type() {
                log::info!("  {}: {}", land_use.as_str(), count);
            }

            let mut features = cover.into_features();
            style.decorate_land_use(&mut features);
            write_json_atomic(config.output_file(LANDUSE_FILE), &LandUseDocument { features })?;
        }
        Command::Finalize { margin, mode } => {
            let margin = margin.unwrap_or(config.street_margin);
            let mode = mode.map(FilterMode::from).unwrap_or(config.filter_mode);
            let buildings: BuildingsDocument = read_json(config.output_file(BUILDINGS_FILE))
                .context("Failed to read buildings document")?;
            let streets: StreetsDocument = read_json(config.output_file(STREETS_FILE))
                .context("Failed to read streets document")?;

            let before = streets.streets.len();
            let mut road = Road::from_streets(config.reference_frame()?, streets.streets);
            road.restrict_to_buildings(&buildings.buildings, margin, mode)?;
            road.summary().report("finalize");
            log::info!("Kept {} of {} streets", road.streets.len(), before);

            let mut streets = road.into_streets();
            style.decorate_streets(&mut streets);
            write_json_atomic(config.output_file(STREETS_FILE), &StreetsDocument { streets })?;
        }
        Command::Check {
            anchor,
            nearest,
            json,
        } => {
            let buildings: BuildingsDocument = read_json(config.output_file(BUILDINGS_FILE))
                .context("Failed to read buildings document")?;
            let streets: StreetsDocument = read_json(config.output_file(STREETS_FILE))
                .context("Failed to read streets document")?;

            let building_features: Vec<Feature> =
                buildings.buildings.iter().map(|b| b.to_feature()).collect();
            let street_features: Vec<Feature> =
                streets.streets.iter().map(Street::to_feature).collect();

            let mut report = AlignmentReport::compare(
                "buildings",
                &building_features,
                "streets",
                &street_features,
                *nearest,
            );
            if let Some(anchor) = anchor {
                report = report.with_anchor(anchor, &street_features);
            }

            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }
        Command::Anchor {
            name,
            input,
            format,
            range_midpoint,
        } => {
            let center = if *range_midpoint {
                AnchorCenter::RangeMidpoint
            } else {
                AnchorCenter::Centroid
            };
            let frame = anchor_frame(&config, name, input.as_ref(), *format, center)?;
            println!("{}", serde_json::to_string_pretty(&frame)?);
        }
    }

    Ok(())
}

fn anchor_frame(
    config: &PipelineConfig,
    name: &str,
    input: Option<&PathBuf>,
    format: Option<InputFormat>,
    center: AnchorCenter,
) -> Result<ReferenceFrame> {
    match input {
        Some(path) => {
            let format = format.unwrap_or_else(|| InputFormat::detect(path));
            let sources = read_sources(path, format, None)?;
            let transform = config.transform()?;
            Ok(derive_reference_frame(
                name,
                &sources,
                transform.as_ref(),
                config.frame.scale,
                center,
            )?)
        }
        None => {
            let current = config.reference_frame()?;
            let streets: StreetsDocument = read_json(config.output_file(STREETS_FILE))
                .context("Failed to read streets document")?;
            let features: Vec<Feature> = streets.streets.iter().map(Street::to_feature).collect();
            Ok(derive_reference_frame_from_local(name, &features, &current, center)?)
        }
    }
}
