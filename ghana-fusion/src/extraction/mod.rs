//! Surface extraction: walks the allocated voxel blocks and emits point
//! clouds for visualization and downstream consumers.

mod clouds;
mod extractor;

pub use clouds::{ColorCloud, IntensityCloud};
pub use extractor::{ExtractionMode, SurfaceExtractor, DEFAULT_SURFACE_DISTANCE_FACTOR};
