use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use stxlink_frame::{split_link, FrameWriter, MessageHeader};
use stxlink_transport::{LinkStream, LinkWriteHalf};
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::handler::FrameHandler;
use crate::{keepalive, receive};

/// Frame writer shared by user sends and the keep-alive loop. `None` once
/// the connection has been disconnected.
pub(crate) type SharedWriter = Arc<Mutex<Option<FrameWriter<LinkWriteHalf>>>>;

/// Lifecycle of a client connection. There is no way back from
/// `Disconnected`; connect again to get a new client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

struct Tasks {
    receive: JoinHandle<()>,
    keepalive: JoinHandle<()>,
}

/// A connected client.
///
/// Owns the write half of the stream plus two background tasks: the receive
/// loop (which owns the read half and its reassembly buffer) and the
/// keep-alive loop. Both observe one cancellation token.
pub struct Client {
    peer: SocketAddr,
    writer: SharedWriter,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
    tasks: StdMutex<Option<Tasks>>,
}

impl Client {
    /// Take ownership of a connected link and start the background tasks.
    pub(crate) fn start(
        link: LinkStream,
        config: ClientConfig,
        handler: Arc<dyn FrameHandler>,
    ) -> Self {
        let peer = link.peer_addr();
        let (reader, writer) = split_link(link, config.frame.clone());
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));
        let cancel = CancellationToken::new();
        let (state, _) = watch::channel(ConnectionState::Connected);
        let state = Arc::new(state);

        let receive = tokio::spawn(receive::run(
            reader,
            handler,
            cancel.clone(),
            Arc::clone(&state),
            peer,
        ));
        let keepalive = tokio::spawn(keepalive::run(
            Arc::clone(&writer),
            config.keepalive_interval,
            cancel.clone(),
        ));
        debug!(%peer, keepalive = ?config.keepalive_interval, "client tasks started");

        Self {
            peer,
            writer,
            cancel,
            state,
            tasks: StdMutex::new(Some(Tasks { receive, keepalive })),
        }
    }

    /// Address of the remote service.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Wait until the connection is `Disconnected`, whatever the cause.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx
            .wait_for(|state| *state == ConnectionState::Disconnected)
            .await;
    }

    /// Send a header with a pre-serialized text body.
    ///
    /// Fails with [`ClientError::NotConnected`] without writing anything if
    /// the connection is not established. A disconnect while the frame is
    /// being written abandons the write with the same error. Callers that
    /// only care whether the frame went out can use `.is_ok()`.
    pub async fn send(&self, header: &MessageHeader, body: &str) -> Result<()> {
        let mut guard = self.lock_writer(None).await?;
        let writer = self.connected_writer(&mut guard)?;
        self.until_disconnected(writer.send(header, body)).await
    }

    /// Send a header with a structured body, serialized as JSON.
    pub async fn send_json<B>(&self, header: &MessageHeader, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let mut guard = self.lock_writer(None).await?;
        let writer = self.connected_writer(&mut guard)?;
        self.until_disconnected(writer.send_json(header, body)).await
    }

    /// Like [`Client::send`], but gives up with [`ClientError::Cancelled`] if
    /// `cancel` fires while waiting for the writer.
    ///
    /// Once the write has started only a disconnect interrupts it, so the
    /// caller's token never leaves a partial frame on a live connection.
    pub async fn send_with_cancel(
        &self,
        header: &MessageHeader,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut guard = self.lock_writer(Some(cancel)).await?;
        let writer = self.connected_writer(&mut guard)?;
        self.until_disconnected(writer.send(header, body)).await
    }

    async fn lock_writer(
        &self,
        caller: Option<&CancellationToken>,
    ) -> Result<MutexGuard<'_, Option<FrameWriter<LinkWriteHalf>>>> {
        let caller_cancelled = async {
            match caller {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = caller_cancelled => Err(ClientError::Cancelled),
            _ = self.cancel.cancelled() => Err(ClientError::NotConnected),
            guard = self.writer.lock() => Ok(guard),
        }
    }

    async fn until_disconnected<F>(&self, write: F) -> Result<()>
    where
        F: Future<Output = stxlink_frame::Result<()>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(peer = %self.peer, "write abandoned by disconnect");
                Err(ClientError::NotConnected)
            }
            result = write => result.map_err(Into::into),
        }
    }

    fn connected_writer<'a>(
        &self,
        guard: &'a mut MutexGuard<'_, Option<FrameWriter<LinkWriteHalf>>>,
    ) -> Result<&'a mut FrameWriter<LinkWriteHalf>> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        guard.as_mut().ok_or(ClientError::NotConnected)
    }

    /// Stop both loops and close the stream.
    ///
    /// Any write in flight is abandoned first, so this completes even when
    /// the peer has stopped reading. Idempotent; safe to call repeatedly or concurrently with
    /// [`Client::shutdown`].
    pub async fn disconnect(&self) {
        self.cancel.cancel();
        self.state.send_replace(ConnectionState::Disconnected);

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(err) = writer.shutdown().await {
                debug!(peer = %self.peer, error = %err, "write half shutdown failed");
            }
            info!(peer = %self.peer, "disconnected");
        }
    }

    /// Disconnect, then wait for both background tasks to finish.
    ///
    /// Tasks are joined exactly once; later calls only disconnect.
    pub async fn shutdown(&self) {
        self.disconnect().await;

        let Some(tasks) = self.take_tasks() else {
            return;
        };
        for (name, handle) in [("receive", tasks.receive), ("keepalive", tasks.keepalive)] {
            if let Err(err) = handle.await {
                warn!(task = name, error = %err, "background task ended abnormally");
            }
        }
        debug!(peer = %self.peer, "client tasks joined");
    }

    fn take_tasks(&self) -> Option<Tasks> {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.state.send_replace(ConnectionState::Disconnected);
        if let Some(tasks) = self.take_tasks() {
            tasks.receive.abort();
            tasks.keepalive.abort();
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use bytes::BytesMut;
    use stxlink_frame::{Frame, FrameConfig, FrameReader, KEEP_ALIVE};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::connector::connect_with_config;

    const WAIT: Duration = Duration::from_secs(5);

    async fn connect_pair(
        config: ClientConfig,
    ) -> (Client, TcpStream, mpsc::UnboundedReceiver<Frame>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        let (client, accepted) = tokio::join!(
            connect_with_config("127.0.0.1", port, config, tx),
            listener.accept()
        );
        (client.unwrap(), accepted.unwrap().0, rx)
    }

    fn production_header(uid: &str) -> MessageHeader {
        MessageHeader::new(uid, "getProduction")
            .with_data_type("JSON")
            .with_receiver("Demo")
            .with_type("subscribe")
    }

    fn wire(header: &MessageHeader, body: &str) -> Vec<u8> {
        let mut buf = BytesMut::new();
        stxlink_frame::encode_frame(&header.to_json().unwrap(), body.as_bytes(), &mut buf)
            .unwrap();
        buf.to_vec()
    }

    #[tokio::test]
    async fn send_writes_exact_frame() {
        let (client, mut server, _rx) = connect_pair(ClientConfig::default()).await;

        client
            .send(&production_header("u1"), r#"{"pos":0}"#)
            .await
            .unwrap();

        let expected = wire(&production_header("u1"), r#"{"pos":0}"#);
        let mut received = vec![0u8; expected.len()];
        timeout(WAIT, server.read_exact(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, expected);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_json_body() {
        let (client, server, _rx) = connect_pair(ClientConfig::default()).await;

        client
            .send_json(&production_header("u2"), &serde_json::json!({ "pos": 3 }))
            .await
            .unwrap();

        let mut reader = FrameReader::new(server);
        let frame = timeout(WAIT, reader.read_frame())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(frame.header, production_header("u2"));
        assert_eq!(frame.body_text(), Some(r#"{"pos":3}"#));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn received_frames_reach_handler_in_order() {
        let (client, mut server, mut rx) = connect_pair(ClientConfig::default()).await;

        let first = wire(&production_header("a"), "one");
        let mut batch = first[..4].to_vec();
        server.write_all(&batch).await.unwrap();
        server.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        batch = first[4..].to_vec();
        batch.extend(wire(&production_header("b"), "two"));
        batch.extend(KEEP_ALIVE);
        batch.extend(wire(&production_header("c"), "three"));
        server.write_all(&batch).await.unwrap();

        for (uid, body) in [("a", "one"), ("b", "two"), ("c", "three")] {
            let frame = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            assert_eq!(frame.header.uid(), uid);
            assert_eq!(frame.body_text(), Some(body));
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn undecodable_frame_is_dropped_and_session_continues() {
        let (client, mut server, mut rx) = connect_pair(ClientConfig::default()).await;

        let mut batch = b"\x01not a header\x02x\x03".to_vec();
        batch.extend(wire(&production_header("ok"), "fine"));
        server.write_all(&batch).await.unwrap();

        let frame = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(frame.header.uid(), "ok");
        assert!(client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn keepalive_probes_arrive_periodically() {
        let config = ClientConfig {
            keepalive_interval: Duration::from_millis(30),
            ..ClientConfig::default()
        };
        let (client, mut server, _rx) = connect_pair(config).await;

        for _ in 0..2 {
            let mut probe = [0u8; 3];
            timeout(WAIT, server.read_exact(&mut probe))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(probe, KEEP_ALIVE);
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn peer_close_moves_to_disconnected() {
        let (client, server, _rx) = connect_pair(ClientConfig::default()).await;

        drop(server);
        timeout(WAIT, client.closed()).await.unwrap();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        let err = client
            .send(&production_header("late"), "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_closes_stream() {
        let (client, mut server, _rx) = connect_pair(ClientConfig::default()).await;

        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connected());

        let mut buf = [0u8; 16];
        let n = timeout(WAIT, server.read(&mut buf)).await.unwrap().unwrap();
        assert_eq!(n, 0);

        let err = client.send(&production_header("x"), "{}").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));

        client.shutdown().await;
        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_interrupts_write_to_stalled_peer() {
        let config = ClientConfig {
            keepalive_interval: Duration::from_millis(20),
            frame: FrameConfig {
                max_frame_size: 64 * 1024 * 1024,
                ..FrameConfig::default()
            },
            ..ClientConfig::default()
        };
        let (client, _stalled_server, _rx) = connect_pair(config).await;
        let client = Arc::new(client);

        let sender = {
            let client = Arc::clone(&client);
            let body = "s".repeat(48 * 1024 * 1024);
            tokio::spawn(async move { client.send(&production_header("big"), &body).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!sender.is_finished());

        timeout(WAIT, client.disconnect())
            .await
            .expect("disconnect must not wait for a stalled write");
        let result = timeout(WAIT, sender).await.unwrap().unwrap();
        assert!(matches!(result, Err(ClientError::NotConnected)));

        timeout(WAIT, client.shutdown()).await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn concurrent_disconnect_and_shutdown() {
        let (client, _server, _rx) = connect_pair(ClientConfig::default()).await;

        timeout(
            WAIT,
            async { tokio::join!(client.disconnect(), client.shutdown(), client.disconnect()) },
        )
        .await
        .unwrap();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.take_tasks().is_none());
    }

    #[tokio::test]
    async fn concurrent_sends_never_interleave() {
        let config = ClientConfig {
            keepalive_interval: Duration::from_millis(1),
            ..ClientConfig::default()
        };
        let (client, server, _rx) = connect_pair(config).await;
        let client = Arc::new(client);

        let body = "y".repeat(2048);
        let mut sends = Vec::new();
        for i in 0..32 {
            let client = Arc::clone(&client);
            let body = body.clone();
            sends.push(tokio::spawn(async move {
                client
                    .send(&production_header(&format!("u{i}")), &body)
                    .await
            }));
        }

        let mut reader = FrameReader::new(server);
        let mut seen = HashSet::new();
        while seen.len() < 32 {
            let frame = timeout(WAIT, reader.read_frame())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(frame.body.len(), body.len());
            assert!(seen.insert(frame.header.uid().to_string()));
        }

        for send in sends {
            send.await.unwrap().unwrap();
        }
        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_with_cancelled_token_does_not_write() {
        let (client, mut server, _rx) = connect_pair(ClientConfig::default()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .send_with_cancel(&production_header("c"), "{}", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));

        client.disconnect().await;
        let mut buf = Vec::new();
        timeout(WAIT, server.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(buf.is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_with_live_token_writes() {
        let (client, server, _rx) = connect_pair(ClientConfig::default()).await;
        let cancel = CancellationToken::new();

        client
            .send_with_cancel(&production_header("live"), "{}", &cancel)
            .await
            .unwrap();

        let mut reader = FrameReader::new(server);
        let frame = timeout(WAIT, reader.read_frame())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(frame.header.uid(), "live");

        client.shutdown().await;
    }

    #[tokio::test]
    async fn drop_releases_connection() {
        let (client, mut server, _rx) = connect_pair(ClientConfig::default()).await;

        drop(client);

        let mut buf = [0u8; 16];
        let n = timeout(WAIT, server.read(&mut buf)).await.unwrap().unwrap();
        assert_eq!(n, 0);
    }
}
