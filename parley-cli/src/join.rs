use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::*;
use parley::RoomName;
use parley::client::{
    CallConfig, CallEvent, CallSession, ConnectState, ConnectionConfig, ConnectionManager,
    MediaError, MediaSource, MediaStream, OfferMode, RtcConfig, RtcPeerFactory,
    WsTransportFactory,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

pub struct JoinOptions {
    pub url: String,
    pub room: String,
    pub call: bool,
    pub offer_on_accept: bool,
    pub heartbeat: Duration,
    pub ice_servers: Vec<String>,
}

/// Stands in for a microphone: the peer connections send an audio track
/// that never carries samples.
struct SilentMicrophone;

#[async_trait]
impl MediaSource for SilentMicrophone {
    async fn acquire(&self) -> Result<MediaStream, MediaError> {
        Ok(MediaStream::new("parley-cli-audio"))
    }
}

pub async fn run(options: JoinOptions) -> Result<()> {
    let room = RoomName::new(options.room.as_str()).context("Invalid room name")?;

    let connection = ConnectionManager::new(
        Arc::new(WsTransportFactory::new(options.url.clone())),
        ConnectionConfig {
            heartbeat_interval: options.heartbeat,
            ..ConnectionConfig::default()
        },
    );
    connection.start();

    let mut rtc = RtcConfig::default();
    if !options.ice_servers.is_empty() {
        rtc.ice_servers = options.ice_servers;
    }
    let config = CallConfig {
        offer_mode: if options.offer_on_accept {
            OfferMode::OnAccept
        } else {
            OfferMode::Immediate
        },
        ..CallConfig::default()
    };

    let call = CallSession::join(
        connection.clone(),
        room.clone(),
        &SilentMicrophone,
        Arc::new(RtcPeerFactory::new(rtc)),
        config,
    )
    .await
    .with_context(|| format!("Failed to join {} at {}", room, options.url))?;
    println!("{} {}", "Joined room".green().bold(), room);

    let mut events = call.events();
    let mut states = connection.state_stream();

    if options.call {
        let session = call.call().await.context("Failed to start call")?;
        println!("{} {}", "Calling as".cyan(), session);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} call events", missed),
                Err(RecvError::Closed) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                let label = format!("{:?}", state);
                match state {
                    ConnectState::Connected => println!("{} {}", "Relay".dimmed(), label.green()),
                    ConnectState::Connecting => println!("{} {}", "Relay".dimmed(), label.yellow()),
                    ConnectState::Disconnected => println!("{} {}", "Relay".dimmed(), label.red()),
                }
            }
        }
    }

    println!("{}", "Leaving...".yellow());
    if let Err(e) = call.leave().await {
        warn!("Leave failed: {}", e);
    }
    connection.dispose().await;
    Ok(())
}

fn print_event(event: &CallEvent) {
    match event {
        CallEvent::PhaseChanged {
            session,
            role,
            phase,
        } => println!("{:?} {} -> {}", role, session, format!("{:?}", phase).cyan()),
        CallEvent::RemoteStreamAdded(stream) => {
            println!("{} {}", "Stream added".green(), stream.id)
        }
        CallEvent::RemoteStreamRemoved(stream) => {
            println!("{} {}", "Stream removed".yellow(), stream.id)
        }
        CallEvent::LegClosed { session, role } => {
            println!("{:?} {} {}", role, session, "closed".red())
        }
    }
}
