//! In-memory tool provider for unit tests

use std::sync::{Arc, Mutex, PoisonError};

use chorus_core::observe::{Event, Observer};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};

use crate::transport::Transport;

/// Far end of a transport built over in-memory pipes
pub struct FakeServer {
    requests: Lines<BufReader<DuplexStream>>,
    responses: DuplexStream,
}

impl FakeServer {
    /// Next frame the client wrote
    pub async fn next_request(&mut self) -> Value {
        let line = self
            .requests
            .next_line()
            .await
            .unwrap()
            .expect("client closed its side");
        serde_json::from_str(&line).unwrap()
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.responses.write_all(bytes).await.unwrap();
        self.responses.flush().await.unwrap();
    }

    pub async fn send_json(&mut self, frame: Value) {
        let mut line = serde_json::to_vec(&frame).unwrap();
        line.push(b'\n');
        self.send_raw(&line).await;
    }

    pub async fn respond(&mut self, request: &Value, result: Value) {
        self.send_json(json!({"jsonrpc": "2.0", "id": request["id"], "result": result}))
            .await;
    }
}

pub fn fake_server() -> (Transport, FakeServer) {
    fake_server_with(Arc::new(RecordingObserver::default()))
}

pub fn fake_server_with(observer: Arc<dyn Observer>) -> (Transport, FakeServer) {
    let (client_out, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, client_in) = tokio::io::duplex(64 * 1024);
    let transport = Transport::from_streams("fake", client_in, client_out, observer);
    let server = FakeServer {
        requests: BufReader::new(server_in).lines(),
        responses: server_out,
    };
    (transport, server)
}

/// Transport whose far end answers every request with `handler`.
/// Notifications are read and ignored.
pub fn scripted_provider<F>(handler: F) -> Transport
where
    F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    let (transport, mut server) = fake_server();
    tokio::spawn(async move {
        while let Ok(Some(line)) = server.requests.next_line().await {
            let Ok(request) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            let Some(id) = request.get("id").cloned() else {
                continue;
            };
            let method = request["method"].as_str().unwrap_or_default();
            let frame = match handler(method, &request["params"]) {
                Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err((code, message)) => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": code, "message": message}
                }),
            };
            server.send_json(frame).await;
        }
    });
    transport
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
    discarded: Mutex<usize>,
}

impl RecordingObserver {
    pub fn discarded(&self) -> usize {
        *self.discarded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &Event<'_>) {
        if matches!(event, Event::FrameDiscarded { .. }) {
            *self.discarded.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.to_string());
    }
}
