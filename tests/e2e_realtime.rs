use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::StreamExt;
use stock_dashboard::model::QuoteBatch;
use stock_dashboard::server::{self, ServerConfig};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

const UNIVERSE_SIZE: usize = 120;

async fn start_server(port: u16) -> JoinHandle<()> {
    let config = ServerConfig {
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        refresh_interval: Duration::from_millis(100),
        mock_latency: Duration::from_millis(1),
        universe_size: UNIVERSE_SIZE,
        seed: Some(0xE2E),
        ..ServerConfig::default()
    };

    tokio::spawn(async move {
        let _ = server::run_with_config(config).await;
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn websocket_stream_emits_quote_batches() {
    let handle = start_server(9137).await;

    let connect_addr = "ws://127.0.0.1:9137/ws";
    let (mut ws, _) = loop {
        match tokio_tungstenite::connect_async(connect_addr).await {
            Ok(conn) => break conn,
            Err(err) => {
                if let tokio_tungstenite::tungstenite::Error::Io(io) = &err {
                    if matches!(io.kind(), std::io::ErrorKind::ConnectionRefused) {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                }
                panic!("failed to connect to server: {err}");
            }
        }
    };

    let mut total_batches = 0usize;

    while total_batches < 3 {
        let maybe_message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("websocket message timeout");

        match maybe_message {
            Some(Ok(Message::Text(payload))) => {
                let batch: QuoteBatch = serde_json::from_str(&payload).expect("valid payload");
                assert_eq!(batch.version, 1, "unexpected batch version");
                assert_eq!(
                    batch.quotes.len(),
                    UNIVERSE_SIZE,
                    "every refresh covers the whole universe"
                );
                let unique: HashSet<_> =
                    batch.quotes.iter().map(|q| q.symbol.as_str()).collect();
                assert_eq!(unique.len(), UNIVERSE_SIZE, "no duplicate symbols in a batch");
                total_batches += 1;
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => panic!("websocket error: {err}"),
            None => break,
        }
    }

    assert_eq!(total_batches, 3, "expected three full batches");

    let _ = ws.close(None).await;
    handle.abort();
}
