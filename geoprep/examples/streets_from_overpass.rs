// Example: Using Road with an Overpass response
// Streets are projected, re-centred on an anchor and trimmed to a region
use anyhow::Result;
use geoprep::collect::overpass::OverpassData;
use geoprep::geo_core::{FrameScale, ReferenceFrame, Wgs84};
use geoprep::geometric::anchor::{derive_reference_frame, AnchorCenter};
use geoprep::geometric::region::{BoundingRegion, FilterMode};
use geoprep::geometric::road::Road;

fn main() -> Result<()> {
    println!("=== Example: Streets from Overpass JSON ===\n");

    let response = r#"
    {
        "elements": [
            {"type": "node", "id": 1, "lat": 38.5200, "lon": -89.9900},
            {"type": "node", "id": 2, "lat": 38.5200, "lon": -89.9839},
            {"type": "node", "id": 3, "lat": 38.5200, "lon": -89.9780},
            {"type": "node", "id": 4, "lat": 38.5250, "lon": -89.9845},
            {"type": "node", "id": 5, "lat": 38.5150, "lon": -89.9845},
            {"type": "way", "id": 100, "nodes": [1, 2, 3], "tags": {"highway": "primary", "name": "Main Street"}},
            {"type": "way", "id": 101, "nodes": [4, 5], "tags": {"highway": "secondary", "name": "Illinois Street"}},
            {"type": "way", "id": 102, "nodes": [5, 42], "tags": {"highway": "service"}}
        ]
    }
    "#;

    let data = OverpassData::parse(response)?;
    let sources = data.streets();

    // Fixed frame on the fountain
    let road = Road::new(ReferenceFrame::belleville()).run(&sources, &Wgs84)?;
    for street in &road.streets {
        println!(
            "  {} {:?} ({}): {:?}",
            street.id,
            street.name,
            street.street_type.as_str(),
            street.points
        );
    }

    // Same data, frame centred on Illinois Street
    let frame = derive_reference_frame(
        "illinois",
        &sources,
        &Wgs84,
        FrameScale::default(),
        AnchorCenter::RangeMidpoint,
    )?;
    println!(
        "\nAnchored frame: lat {:.5}, lon {:.5}",
        frame.center_latitude(),
        frame.center_longitude()
    );

    let mut road = Road::new(frame).run(&sources, &Wgs84)?;
    let region = BoundingRegion::new(-300.0, 300.0, -300.0, 300.0)?;
    road.restrict_to(&region, FilterMode::ClipToRegion)?;

    println!("\nStreets inside 300 m: {}", road.streets.len());
    for street in &road.streets {
        println!("  {} {:?}: {} points", street.id, street.name, street.points.len());
    }
    println!("Dropped: {}", road.summary());

    Ok(())
}
