//! Georeferencing pipeline

pub mod projection;
pub mod coordinates;
pub mod geotransform;
pub mod normalize;
pub mod metadata;
pub mod visualize;

// Re-export main types
pub use projection::{classify_projection, find_grid_mapping, GridMapping, ProjectionDescriptor, GRID_MAPPING_CANDIDATES};
pub use coordinates::{resolve_coordinates, CoordinateAxis, CoordinatePair, CoordinateSource};
pub use geotransform::{build_georeference, geotransform_from_axes, GridGeoreference};
pub use normalize::{normalize_variable, Decoding, NormalizedGrid};
pub use metadata::MetadataReport;
pub use visualize::{
    DiagnosticSink, LayerHandoff, LayerRegistry, LogSink, MemorySink, VisualizeOptions, VisualizeOutcome, Visualizer,
};
