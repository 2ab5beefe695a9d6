//! Row change subscriptions over the realtime WebSocket

mod message;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

pub use message::*;

use crate::auth::{current_access_token, SharedSession};
use crate::error::Error;

const JOIN_REF: &str = "1";

/// Client for table change subscriptions
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    url: String,
    key: String,
    access_token: Option<String>,
    session: Option<SharedSession>,
    heartbeat_interval: Duration,
    join_timeout: Duration,
}

impl RealtimeClient {
    /// Create a new RealtimeClient
    pub fn new(url: &str, key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            access_token: None,
            session: None,
            heartbeat_interval: Duration::from_secs(30),
            join_timeout: Duration::from_secs(10),
        }
    }

    /// Join channels as the signed-in user
    pub fn with_auth(mut self, access_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self
    }

    /// Join channels as whoever is signed in when `subscribe_table` is called
    pub fn with_session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    fn join_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| self.session.as_ref().and_then(current_access_token))
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Get the WebSocket URL for the realtime API
    pub fn get_url(&self) -> Result<Url, Error> {
        let base = Url::parse(&self.url)?;
        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(Error::realtime(format!("unsupported URL scheme: {}", other))),
        };

        let mut url = base.join("/realtime/v1/websocket")?;
        url.set_scheme(scheme)
            .map_err(|_| Error::realtime("cannot switch URL to a WebSocket scheme"))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    /// Subscribe to inserts, updates and deletes on `schema.table`.
    ///
    /// Resolves once the server accepts the join. The socket lives until the
    /// returned subscription is dropped; it is not reconnected when it closes.
    pub async fn subscribe_table(&self, schema: &str, table: &str) -> Result<TableSubscription, Error> {
        let url = self.get_url()?;
        let topic = format!("realtime:{}:{}", schema, table);

        info!("Connecting realtime socket for {}", topic);
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::realtime(format!("WebSocket connection failed: {}", e)))?;
        let (mut write, mut read) = stream.split();

        let mut config = json!({
            "config": {
                "postgres_changes": [
                    { "event": "*", "schema": schema, "table": table }
                ]
            }
        });
        if let Some(token) = self.join_token() {
            config["access_token"] = json!(token);
        }
        let join = RealtimeMessage::new(&topic, ChannelEvent::PhoenixJoin, config, Some(JOIN_REF.into()));
        write
            .send(Message::Text(serde_json::to_string(&join)?))
            .await
            .map_err(|e| Error::realtime(format!("failed to send join: {}", e)))?;

        let reply = tokio::time::timeout(self.join_timeout, async {
            while let Some(frame) = read.next().await {
                let frame = frame.map_err(|e| Error::realtime(format!("WebSocket read error: {}", e)))?;
                let text = match frame {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                match serde_json::from_str::<RealtimeMessage>(&text) {
                    Ok(msg)
                        if msg.event == ChannelEvent::PhoenixReply
                            && msg.message_ref.as_deref() == Some(JOIN_REF) =>
                    {
                        return Ok(msg);
                    }
                    Ok(msg) => trace!("Ignoring {:?} before join reply", msg.event),
                    Err(e) => warn!("Unparseable realtime frame: {}", e),
                }
            }
            Err(Error::realtime("socket closed before the join was acknowledged"))
        })
        .await
        .map_err(|_| Error::realtime(format!("join of {} timed out", topic)))??;

        if reply.reply_status() != Some("ok") {
            let reason = reply
                .payload
                .pointer("/response/reason")
                .and_then(|v| v.as_str())
                .unwrap_or("join rejected");
            error!("Join of {} rejected: {}", topic, reason);
            return Err(Error::realtime(format!("{}: {}", topic, reason)));
        }
        info!("Joined {}", topic);

        let (tx, rx) = mpsc::unbounded_channel();
        let heartbeat_interval = self.heartbeat_interval;
        let task_topic = topic.clone();
        let task = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(heartbeat_interval);
            heartbeat.tick().await;
            let mut next_ref: u64 = 2;

            loop {
                tokio::select! {
                    frame = read.next() => {
                        let text = match frame {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Realtime socket for {} closed", task_topic);
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                error!("Realtime read error on {}: {}", task_topic, e);
                                break;
                            }
                        };

                        let msg = match serde_json::from_str::<RealtimeMessage>(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("Unparseable realtime frame: {}", e);
                                continue;
                            }
                        };

                        match msg.event {
                            ChannelEvent::PostgresChanges => match ChangeEvent::from_payload(&msg.payload) {
                                Ok(change) => {
                                    debug!("{:?} on {}", change.kind, task_topic);
                                    if tx.send(change).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("{}", e),
                            },
                            ChannelEvent::PhoenixError | ChannelEvent::PhoenixClose => {
                                warn!("Channel {} ended with {:?}", task_topic, msg.event);
                                break;
                            }
                            other => trace!("Ignoring {:?} on {}", other, msg.topic),
                        }
                    }
                    _ = heartbeat.tick() => {
                        let beat = RealtimeMessage::new(
                            "phoenix",
                            ChannelEvent::Heartbeat,
                            json!({}),
                            Some(next_ref.to_string()),
                        );
                        next_ref += 1;
                        let sent = match serde_json::to_string(&beat) {
                            Ok(text) => write.send(Message::Text(text)).await.is_ok(),
                            Err(_) => false,
                        };
                        if !sent {
                            error!("Heartbeat failed on {}", task_topic);
                            break;
                        }
                    }
                }
            }
        });

        Ok(TableSubscription {
            topic,
            receiver: rx,
            task,
        })
    }
}

/// A live table subscription. Dropping it closes the socket.
#[derive(Debug)]
pub struct TableSubscription {
    topic: String,
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl TableSubscription {
    /// The joined channel topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next change; `None` once the socket has closed
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

impl Drop for TableSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
