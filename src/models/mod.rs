pub mod image;
pub mod name;
pub mod record;
pub mod style;

pub use image::ImageAsset;
pub use name::PersonName;
pub use record::{BatchStatistics, ProcessingRecord};
pub use style::{FontSpec, PageMargins, StyleProfile};
