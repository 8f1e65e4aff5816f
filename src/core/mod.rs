pub mod batch;
pub mod dictionaries;
pub mod etl;
pub mod events;
pub mod fbref;
pub mod fixtures;
pub mod identity;
pub mod normalize;
pub mod payload;
pub mod qualifiers;
pub mod render;
pub mod tables;
pub mod timeline;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
