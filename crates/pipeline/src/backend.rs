//! Seams between the pipeline and the external generator.

use async_trait::async_trait;
use framecast_core::job::GenerationParams;
use framecast_framepack::{FramepackApi, FramepackError};

/// Runs image-to-video generation on an external model.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Generate a clip and return a URL it can be downloaded from.
    async fn generate(
        &self,
        image: Vec<u8>,
        filename: &str,
        params: &GenerationParams,
    ) -> Result<String, FramepackError>;

    /// Fetch a generated clip in full.
    async fn download(&self, url: &str) -> Result<Vec<u8>, FramepackError>;
}

/// Answers whether the external generator is currently reachable.
#[async_trait]
pub trait AvailabilityProber: Send + Sync {
    async fn probe(&self) -> bool;
}

#[async_trait]
impl VideoGenerator for FramepackApi {
    async fn generate(
        &self,
        image: Vec<u8>,
        filename: &str,
        params: &GenerationParams,
    ) -> Result<String, FramepackError> {
        self.process(image, filename, params).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FramepackError> {
        FramepackApi::download(self, url).await
    }
}

#[async_trait]
impl AvailabilityProber for FramepackApi {
    async fn probe(&self) -> bool {
        self.is_available().await
    }
}
