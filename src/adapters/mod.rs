// Adapters: concrete page sources and storage backends behind the domain ports.

pub mod http;
pub mod storage;

pub use http::{FilePageSource, HttpPageSource, RetryPageSource};
pub use storage::LocalStorage;
