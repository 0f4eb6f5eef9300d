//! [`PeerConnectionFactory`] backed by the `webrtc` crate.

mod rtc_peer;

pub use rtc_peer::RtcPeer;

use crate::error::PeerError;
use crate::peer::{LegContext, PeerConnection, PeerConnectionFactory};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<String>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RtcPeerFactory {
    config: RtcConfig,
}

impl RtcPeerFactory {
    pub fn new(config: RtcConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnectionFactory for RtcPeerFactory {
    async fn create(&self, leg: LegContext) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let peer = RtcPeer::new(leg, &self.config).await?;
        Ok(Arc::new(peer) as Arc<dyn PeerConnection>)
    }
}
