pub mod manifest;

pub use manifest::{Manifest, find_by_id, list_sources, load_file};
