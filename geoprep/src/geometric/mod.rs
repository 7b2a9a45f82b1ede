pub mod alignment;
pub mod anchor;
pub mod building;
pub mod feature;
pub mod land_cover;
pub mod region;
pub mod road;
