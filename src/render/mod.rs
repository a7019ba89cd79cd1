pub mod json;
pub mod raster;
