pub mod geojson_source;
pub mod global_variables;
pub mod overpass;
