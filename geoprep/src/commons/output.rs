use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::geometric::building::Building;
use crate::geometric::land_cover::LandUseFeature;
use crate::geometric::road::Street;

pub const BUILDINGS_FILE: &str = "buildings.json";
pub const STREETS_FILE: &str = "streets.json";
pub const LANDUSE_FILE: &str = "landuse.json";

/// `{"buildings": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingsDocument {
    pub buildings: Vec<Building>,
}

/// `{"streets": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreetsDocument {
    pub streets: Vec<Street>,
}

/// `{"features": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandUseDocument {
    pub features: Vec<LandUseFeature>,
}

/// Serialize `value` as indented JSON into a temporary file next to `path`,
/// then rename it over `path`. Readers never see a half-written document.
pub fn write_json_atomic<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;

    log::info!("Saved {}", path.display());
    Ok(())
}

pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = fs::File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
