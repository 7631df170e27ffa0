//! Peer messaging: send a message to another agent by address.

use crate::error::SocialError;
use async_trait::async_trait;

#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Deliver `content` to `to`. Returns the relay's message id.
    async fn send(&self, to: &str, content: &str, reply_to: Option<&str>) -> Result<String, SocialError>;
}
