pub mod bounds;
pub mod capture;
pub mod cli;
pub mod error;
pub mod export;
pub mod loaders;
pub mod math;
pub mod placement;
pub mod render;
pub mod scene;
pub mod sheet;
pub mod style;

pub use bounds::{compute_bounds, try_compute_bounds};
pub use capture::{capture, CaptureContext, CaptureParameters, CaptureResult, ViewportHelpers};
pub use error::{CaptureError, RenderError, SheetError};
pub use placement::{compute_placement, Placement, PlacementStrategy, SourceFormat};
pub use sheet::{compose, Frame, SheetLayout, SpriteSheet};
pub use style::{apply_style, StyleSettings};
