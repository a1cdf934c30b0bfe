pub mod collapse;
pub mod walk;

pub use collapse::collapse_into_photos;
pub use walk::discover_files;
