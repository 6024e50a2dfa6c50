pub mod mover;
pub mod naming;

pub use mover::{place, FileRelocator};
pub use naming::{build_filename, category_dir_name};
