// ── Release lookup seam ──

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::Release;

/// Source of the latest published firmware release.
///
/// `Ok(None)` means the channel has nothing newer to offer (or nothing at
/// all); errors are logged by the session and otherwise ignored.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest_release(&self) -> Result<Option<Release>, CoreError>;
}

/// Release source that always reports a fixed descriptor.
#[derive(Debug, Clone, Default)]
pub struct StaticRelease(pub Option<Release>);

#[async_trait]
impl ReleaseSource for StaticRelease {
    async fn latest_release(&self) -> Result<Option<Release>, CoreError> {
        Ok(self.0.clone())
    }
}
