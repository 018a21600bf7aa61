//! MQTT adapter for the ThingsBoard device API.
//!
//! The ESP-IDF client owns the socket and reconnects on its own; this
//! adapter mirrors its session state into an atomic flag plus a session
//! counter (bumped on every connect), and moves every received message
//! into the [`Inbox`], where the channel pump picks it up inside the
//! channel guard.
//!
//! ```text
//!   mqtt-rx thread ──push──▶ INBOX ──drain (pump)──▶ CommandDispatcher
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{debug, info, warn};

use crate::app::ports::ChannelPort;
use crate::config::NetworkConfig;
use crate::error::ChannelError;
use crate::inbox::{Inbox, MAX_INBOUND_PAYLOAD};

static INBOX: Inbox = Inbox::new();

const CLIENT_ID: &str = "nest-node";
const MAX_OUTBOUND_PAYLOAD: usize = 512;
const CONNECT_POLL: Duration = Duration::from_millis(100);
const CONNECT_WAIT_POLLS: u32 = 30;

pub struct MqttChannel {
    client: EspMqttClient<'static>,
    connected: Arc<AtomicBool>,
    /// Bumped by the receiver on every `Connected` event.
    session: Arc<AtomicU32>,
}

impl MqttChannel {
    /// Create the client and spawn its receive thread.
    pub fn start(net: &NetworkConfig) -> anyhow::Result<Self> {
        let conf = MqttClientConfiguration {
            client_id: Some(CLIENT_ID),
            username: (!net.access_token.is_empty()).then_some(net.access_token),
            crt_bundle_attach: Some(esp_idf_sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(net.broker_url, &conf)?;
        let connected = Arc::new(AtomicBool::new(false));
        let session = Arc::new(AtomicU32::new(0));
        spawn_receiver(conn, Arc::clone(&connected), Arc::clone(&session))?;
        info!("MQTT client started for {}", net.broker_url);
        Ok(Self {
            client,
            connected,
            session,
        })
    }
}

fn spawn_receiver(
    mut conn: EspMqttConnection,
    connected: Arc<AtomicBool>,
    session: Arc<AtomicU32>,
) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(6 * 1024)
        .spawn(move || {
            while let Ok(event) = conn.next() {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        // Generation before flag.
                        let n = session.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
                        connected.store(true, Ordering::Release);
                        info!("MQTT session {} up", n);
                    }
                    EventPayload::Disconnected => {
                        connected.store(false, Ordering::Release);
                        warn!("MQTT session down");
                    }
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        details,
                        ..
                    } => {
                        if !matches!(details, Details::Complete) {
                            debug!("Skipping fragmented message on {}", topic);
                            continue;
                        }
                        if data.len() > MAX_INBOUND_PAYLOAD {
                            warn!(
                                "Dropping oversized message on {} ({} bytes)",
                                topic,
                                data.len()
                            );
                            continue;
                        }
                        INBOX.push(topic, data);
                    }
                    EventPayload::Error(e) => warn!("MQTT error: {:?}", e),
                    _ => {}
                }
            }
            connected.store(false, Ordering::Release);
            warn!("MQTT connection closed, receiver exiting");
        })?;
    Ok(())
}

impl ChannelPort for MqttChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn session(&self) -> u32 {
        self.session.load(Ordering::Acquire)
    }

    /// The client reconnects by itself; wait a bounded time for the session.
    fn connect(&mut self) -> Result<(), ChannelError> {
        for _ in 0..CONNECT_WAIT_POLLS {
            if self.is_connected() {
                return Ok(());
            }
            thread::sleep(CONNECT_POLL);
        }
        Err(ChannelError::ConnectFailed)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .map(|_| debug!("Subscribed to {}", topic))
            .map_err(|e| {
                warn!("Subscribe to {} failed: {}", topic, e);
                ChannelError::SubscribeFailed
            })
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        if payload.len() > MAX_OUTBOUND_PAYLOAD {
            return Err(ChannelError::PayloadTooLarge);
        }
        self.client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                debug!("Enqueue on {} failed: {}", topic, e);
                ChannelError::PublishFailed
            })
    }

    fn pump(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        INBOX.drain(on_message);
    }
}
