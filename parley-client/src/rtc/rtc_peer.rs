use crate::error::PeerError;
use crate::peer::{LegContext, LegRole, MediaStream, OfferOptions, PeerConnection, PeerEvent};
use crate::rtc::RtcConfig;
use crate::sync::lock;
use async_trait::async_trait;
use parley_core::{IceCandidate, SdpType, SessionDescription, SessionId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// One leg's `RTCPeerConnection`. Local streams go out as an Opus track per
/// stream; remote tracks are reported by stream id.
pub struct RtcPeer {
    session: SessionId,
    role: LegRole,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<String, Arc<RTCRtpSender>>>,
    tracks: Mutex<HashMap<String, Arc<TrackLocalStaticSample>>>,
    remote_streams: Arc<Mutex<HashSet<String>>>,
    receive_video: AtomicBool,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl RtcPeer {
    pub async fn new(leg: LegContext, config: &RtcConfig) -> Result<Self, PeerError> {
        let mut media = MediaEngine::default();
        media
            .register_default_codecs()
            .map_err(|e| PeerError::Setup(e.to_string()))?;
        let registry = register_default_interceptors(Registry::new(), &mut media)
            .map_err(|e| PeerError::Setup(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| PeerError::Setup(e.to_string()))?,
        );
        let remote_streams: Arc<Mutex<HashSet<String>>> = Arc::default();
        let LegContext {
            session,
            role,
            events,
        } = leg;

        let state_events = events.clone();
        let state_streams = remote_streams.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                info!("Peer connection {:?} {} is {:?}", role, session, state);
                if matches!(
                    state,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
                ) {
                    let gone: Vec<String> = lock(&state_streams).drain().collect();
                    for id in gone {
                        let _ = state_events.send(PeerEvent::StreamRemoved {
                            session,
                            role,
                            stream: MediaStream::new(id),
                        });
                    }
                }
                Box::pin(async {})
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            match c.map(|c| c.to_json()).transpose() {
                Ok(init) => {
                    let candidate = init.map(|init| IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                    });
                    let _ = ice_events.send(PeerEvent::IceCandidate {
                        session,
                        role,
                        candidate,
                    });
                }
                Err(e) => debug!("Unserializable local candidate on {}: {}", session, e),
            }
            Box::pin(async {})
        }));

        let track_events = events.clone();
        let track_streams = remote_streams.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let stream_id = track.stream_id();
            if lock(&track_streams).insert(stream_id.clone()) {
                debug!("Remote track {} ({}) on {}", track.id(), stream_id, session);
                let _ = track_events.send(PeerEvent::StreamAdded {
                    session,
                    role,
                    stream: MediaStream::new(stream_id),
                });
            }
            Box::pin(async {})
        }));

        Ok(Self {
            session,
            role,
            peer_connection,
            senders: Mutex::default(),
            tracks: Mutex::default(),
            remote_streams,
            receive_video: AtomicBool::new(false),
            events,
        })
    }

    /// Sample writer for a local stream attached with `add_stream`.
    pub fn local_track(&self, stream: &MediaStream) -> Option<Arc<TrackLocalStaticSample>> {
        lock(&self.tracks).get(&stream.id).cloned()
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn role(&self) -> LegRole {
        self.role
    }
}

#[async_trait]
impl PeerConnection for RtcPeer {
    async fn create_offer(&self, options: &OfferOptions) -> Result<SessionDescription, PeerError> {
        let receive_audio = options.offer_to_receive_audio && lock(&self.senders).is_empty();
        if receive_audio {
            self.add_receiver(RTPCodecType::Audio).await?;
        }
        if options.offer_to_receive_video && !self.receive_video.swap(true, Ordering::SeqCst) {
            self.add_receiver(RTPCodecType::Video).await?;
        }

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| PeerError::negotiation("create offer", e))?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| PeerError::negotiation("create answer", e))?;
        from_rtc(answer)
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.peer_connection
            .set_local_description(to_rtc(description)?)
            .await
            .map_err(|e| PeerError::negotiation("set local description", e))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.peer_connection
            .set_remote_description(to_rtc(description)?)
            .await
            .map_err(|e| PeerError::negotiation("set remote description", e))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| PeerError::negotiation("add ICE candidate", e))
    }

    async fn add_stream(&self, stream: &MediaStream) -> Result<(), PeerError> {
        if lock(&self.senders).contains_key(&stream.id) {
            return Ok(());
        }
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            stream.id.clone(),
        ));
        let sender = self
            .peer_connection
            .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| PeerError::negotiation("add track", e))?;

        lock(&self.senders).insert(stream.id.clone(), sender);
        lock(&self.tracks).insert(stream.id.clone(), track);
        Ok(())
    }

    async fn remove_stream(&self, stream: &MediaStream) -> Result<(), PeerError> {
        lock(&self.tracks).remove(&stream.id);
        let Some(sender) = lock(&self.senders).remove(&stream.id) else {
            return Ok(());
        };
        self.peer_connection
            .remove_track(&sender)
            .await
            .map_err(|e| PeerError::negotiation("remove track", e))
    }

    async fn close(&self) {
        if let Err(e) = self.peer_connection.close().await {
            debug!("Closing peer connection {} failed: {}", self.session, e);
        }
        let gone: Vec<String> = lock(&self.remote_streams).drain().collect();
        for id in gone {
            let _ = self.events.send(PeerEvent::StreamRemoved {
                session: self.session,
                role: self.role,
                stream: MediaStream::new(id),
            });
        }
    }
}

impl RtcPeer {
    async fn add_receiver(&self, kind: RTPCodecType) -> Result<(), PeerError> {
        self.peer_connection
            .add_transceiver_from_kind(
                kind,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map(|_| ())
            .map_err(|e| PeerError::negotiation("add transceiver", e))
    }
}

fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription, PeerError> {
    let sdp = description.sdp;
    match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(sdp),
        SdpType::Answer => RTCSessionDescription::answer(sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(sdp),
        SdpType::Rollback => {
            return Err(PeerError::negotiation(
                "parse description",
                "rollback is not supported",
            ));
        }
    }
    .map_err(|e| PeerError::negotiation("parse description", e))
}

fn from_rtc(description: RTCSessionDescription) -> Result<SessionDescription, PeerError> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => {
            return Err(PeerError::negotiation(
                "read description",
                format!("unexpected type {}", other),
            ));
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: description.sdp,
    })
}
