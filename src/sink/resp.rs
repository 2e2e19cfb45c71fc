//! Redis-protocol (RESP2) key-value sink over TCP

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::KeyValueSink;
use crate::SinkError;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Sink that issues `SET key value` to a Redis-compatible server
///
/// The connection is opened on the first write and reopened on the write
/// after any failure. Every round trip is bounded by a timeout so a stalled
/// server cannot hold up telemetry delivery for long.
pub struct RespSink {
    address: String,
    timeout: Duration,
    conn: Mutex<Option<BufStream<TcpStream>>>,
}

impl RespSink {
    /// Create a sink for `host:port`. No connection is made yet.
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), timeout: DEFAULT_TIMEOUT, conn: Mutex::new(None) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn round_trip(
        conn: &mut Option<BufStream<TcpStream>>,
        address: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SinkError> {
        if conn.is_none() {
            let tcp = TcpStream::connect(address).await?;
            tcp.set_nodelay(true)?;
            info!(address, "Connected to key-value store");
            *conn = Some(BufStream::new(tcp));
        }
        let Some(stream) = conn.as_mut() else {
            return Err(SinkError::Closed);
        };

        stream.write_all(&encode_set(key, value)).await?;
        stream.flush().await?;

        let mut reply = String::new();
        if stream.read_line(&mut reply).await? == 0 {
            return Err(SinkError::Closed);
        }

        parse_simple_reply(key, reply.trim_end())
    }
}

#[async_trait::async_trait]
impl KeyValueSink for RespSink {
    async fn set(&self, key: &str, value: &str) -> Result<(), SinkError> {
        let mut conn = self.conn.lock().await;

        let result = match tokio::time::timeout(
            self.timeout,
            Self::round_trip(&mut *conn, &self.address, key, value),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("SET {key} timed out after {:?}", self.timeout),
            ))),
        };

        // A failed round trip may leave a half-read reply behind
        if let Err(e) = &result {
            if conn.take().is_some() {
                warn!(address = %self.address, error = %e, "Dropping key-value connection");
            } else {
                debug!(address = %self.address, error = %e, "Key-value store unavailable");
            }
        }

        result
    }
}

/// RESP2 encoding of `SET key value`
pub(crate) fn encode_set(key: &str, value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + key.len() + value.len());
    out.extend_from_slice(b"*3\r\n$3\r\nSET\r\n");
    for arg in [key, value] {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn parse_simple_reply(key: &str, reply: &str) -> Result<(), SinkError> {
    if reply.starts_with('+') {
        Ok(())
    } else {
        Err(SinkError::Protocol { key: key.to_string(), reply: reply.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn encodes_set_as_resp_array() {
        assert_eq!(
            encode_set("speed", "120"),
            b"*3\r\n$3\r\nSET\r\n$5\r\nspeed\r\n$3\r\n120\r\n".to_vec()
        );
        assert_eq!(encode_set("k", ""), b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$0\r\n\r\n".to_vec());
    }

    #[test]
    fn error_replies_are_protocol_errors() {
        assert!(parse_simple_reply("k", "+OK").is_ok());
        let err = parse_simple_reply("k", "-ERR wrong type").unwrap_err();
        assert!(matches!(err, SinkError::Protocol { ref reply, .. } if reply == "-ERR wrong type"));
    }

    /// Accepts one connection, reads `commands` SETs and answers each with `reply`
    async fn fake_server(
        commands: usize,
        reply: &'static str,
    ) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut received = Vec::new();

            for _ in 0..commands {
                // *3, $3, SET, $n, key, $m, value
                for _ in 0..7 {
                    let mut line = Vec::new();
                    reader.read_until(b'\n', &mut line).await.unwrap();
                    received.extend_from_slice(&line);
                }
                reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
            }
            received
        });

        (address, handle)
    }

    #[tokio::test]
    async fn writes_sets_over_one_connection() {
        let (address, server) = fake_server(2, "+OK\r\n").await;
        let sink = RespSink::new(address);

        sink.set("engineRpm", "6500").await.unwrap();
        sink.set("speed", "212").await.unwrap();

        let received = server.await.unwrap();
        let mut expected = encode_set("engineRpm", "6500");
        expected.extend(encode_set("speed", "212"));
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn error_reply_surfaces_and_resets_connection() {
        let (address, server) = fake_server(1, "-ERR read only\r\n").await;
        let sink = RespSink::new(address);

        let err = sink.set("speed", "1").await.unwrap_err();
        assert!(matches!(err, SinkError::Protocol { .. }));
        assert!(sink.conn.lock().await.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_io_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let sink = RespSink::new(address).with_timeout(Duration::from_secs(2));
        let err = sink.set("speed", "1").await.unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            // Read but never answer; hold the socket until the client gives up
            while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
        });

        let sink = RespSink::new(address).with_timeout(Duration::from_millis(50));
        let err = sink.set("speed", "1").await.unwrap_err();
        assert!(matches!(err, SinkError::Io(ref e) if e.kind() == std::io::ErrorKind::TimedOut));

        server.abort();
    }
}
