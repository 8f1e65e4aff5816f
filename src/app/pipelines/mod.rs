pub mod consolidate;
pub mod dictionaries;
pub mod fbref;
pub mod fixtures;
pub mod matchcenter;

pub use consolidate::ConsolidatePipeline;
pub use dictionaries::DictionaryPipeline;
pub use fbref::{FbrefInput, FbrefPipeline};
pub use fixtures::{FixturesInput, FixturesPipeline, FixturesScope};
pub use matchcenter::{MatchCenterPipeline, MatchSource};
