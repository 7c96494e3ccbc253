mod error;
pub mod image;
pub mod nodes;
pub mod report;
pub mod trajectory;

pub use error::OutputError;
pub use image::ImageDump;
pub use nodes::{NodePlacement, load_nodes, pixel_coords_path, resolve_pixel_coords, save_nodes};
pub use report::{AnalysisReport, write_report};
pub use trajectory::{load_trajectory, read_trajectory, save_trajectory, write_trajectory};
