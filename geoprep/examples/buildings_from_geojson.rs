// Example: Using BuildingCollection with GeoJSON
// This example projects a few Overture-style footprints around Public Square
use anyhow::Result;
use geoprep::collect::geojson_source::GeoJsonReader;
use geoprep::commons::style::{SceneStyle, StyleDecorator};
use geoprep::geo_core::{BoundingBox, ReferenceFrame, Wgs84};
use geoprep::geometric::building::{BuildingCollection, BuildingOptions};

fn main() -> Result<()> {
    println!("=== Example: Loading buildings from GeoJSON ===\n");

    let geojson_data = r#"
    {
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "courthouse",
                "properties": {"names": {"primary": "St. Clair County Courthouse"}, "height": 21.0},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-89.9845, 38.5205],
                        [-89.9840, 38.5205],
                        [-89.9840, 38.5209],
                        [-89.9845, 38.5209],
                        [-89.9845, 38.5205]
                    ]]
                }
            },
            {
                "type": "Feature",
                "id": "shop",
                "properties": {"num_floors": 2},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-89.9835, 38.5195],
                        [-89.9832, 38.5195],
                        [-89.9832, 38.5197],
                        [-89.9835, 38.5197],
                        [-89.9835, 38.5195]
                    ]]
                }
            },
            {
                "type": "Feature",
                "id": "shed",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-89.9830, 38.5190],
                        [-89.98299, 38.5190],
                        [-89.98299, 38.51901],
                        [-89.9830, 38.5190]
                    ]]
                }
            }
        ]
    }
    "#;

    let sources = GeoJsonReader::new().parse(geojson_data)?;
    println!("Records loaded: {}", sources.len());

    let mut collection =
        BuildingCollection::new(ReferenceFrame::belleville(), BuildingOptions::default());
    collection.set_bbox(BoundingBox::belleville())?;
    let collection = collection.run(&sources, &Wgs84)?;

    println!("Buildings kept: {}", collection.len());
    println!("Mean height: {:.1} m", collection.calculate_mean_height());

    let mut buildings = collection.into_buildings();
    SceneStyle.decorate_buildings(&mut buildings);

    println!("\nBuilding details:");
    for b in &buildings {
        println!(
            "  {} {:?}: position [{}, {}], size {:?}, color {}",
            b.id,
            b.name,
            b.position[0],
            b.position[2],
            b.size,
            b.color.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
