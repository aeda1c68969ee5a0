pub mod blob;
pub mod image_loader;
pub mod player;
pub mod recorder;
pub mod wav;

pub use blob::{BlobStore, BlobUrl};
pub use image_loader::{validate_image_url, HttpImageLoader, ImageCache, ImageLoader};
