use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// File store rooted somewhere on disk; paths are relative to that root.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> bool;
    /// Absolute location of a relative path, for manifests and log lines.
    fn locate(&self, path: &str) -> PathBuf;
}

/// Where match centre and fixtures HTML comes from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Settings every pipeline needs to place its output.
pub trait ConfigProvider: Send + Sync {
    fn base_data_dir(&self) -> PathBuf;
    fn base_url(&self) -> &str;

    fn matchcenter_dir(&self) -> PathBuf {
        self.base_data_dir().join("raw").join("matchcenter")
    }

    fn fixtures_dir(&self) -> PathBuf {
        self.base_data_dir().join("raw").join("fixtures")
    }

    fn dictionaries_dir(&self) -> PathBuf {
        self.base_data_dir().join("dictionaries")
    }

    /// Site root for FBRef stats pages.
    fn fbref_url(&self) -> &str;

    fn fbref_dir(&self) -> PathBuf {
        self.base_data_dir().join("raw").join("fbref")
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Raw: Send;
    type Output: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Raw>;
    async fn transform(&self, raw: Self::Raw) -> Result<Self::Output>;
    async fn load(&self, output: Self::Output) -> Result<String>;
}
