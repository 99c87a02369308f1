// JSON Lines request boundary.
//
// Each input line is `{"text": "..."}`; each output line is either the
// four-field verdict or `{"error": "..."}`. Requests run concurrently, one task
// each, but responses are written in the order the requests arrived. The
// in-flight window is bounded so a fast producer can't queue unbounded work.

use crate::core::ai::AiProvider;
use crate::core::moderation::{ModerationRequest, ModerationService};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

fn error_body(message: &str) -> String {
    json!({ "error": message }).to_string()
}

/// Turn one request line into one response line (without the newline).
pub async fn respond<P: AiProvider>(service: &ModerationService<P>, line: &str) -> String {
    let request: ModerationRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return error_body(&format!("Invalid request body: {}", e)),
    };

    match service.handle_request(&request).await {
        Ok(verdict) => serde_json::to_string(&verdict)
            .unwrap_or_else(|e| error_body(&format!("Failed to encode verdict: {}", e))),
        Err(e) => error_body(&e.to_string()),
    }
}

/// Decode one raw input line. `None` for blank lines, which get no response.
fn decode_line(raw: &[u8]) -> Option<Result<String, String>> {
    match std::str::from_utf8(raw) {
        Ok(line) => {
            let line = line.trim();
            (!line.is_empty()).then(|| Ok(line.to_string()))
        }
        Err(e) => Some(Err(error_body(&format!("Invalid request body: {}", e)))),
    }
}

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// At most `max_in_flight` requests are being moderated at once. A line that
/// can't be decoded is answered with an error and the loop keeps going.
pub async fn run<P, R, W>(
    service: Arc<ModerationService<P>>,
    mut reader: R,
    writer: &mut W,
    max_in_flight: usize,
) -> anyhow::Result<()>
where
    P: AiProvider + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let max_in_flight = max_in_flight.max(1);
    let permits = Arc::new(Semaphore::new(max_in_flight));
    let (tx, mut rx) = mpsc::channel::<JoinHandle<String>>(max_in_flight);

    let produce = async move {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let Some(decoded) = decode_line(&buf) else {
                continue;
            };

            // Held by the task until its response is ready
            let permit = Arc::clone(&permits).acquire_owned().await?;
            let service = Arc::clone(&service);
            let handle = tokio::spawn(async move {
                let response = match decoded {
                    Ok(line) => respond(&service, &line).await,
                    Err(response) => response,
                };
                drop(permit);
                response
            });

            // Receiver gone means the writer failed; stop reading.
            if tx.send(handle).await.is_err() {
                break;
            }
        }

        Ok::<(), anyhow::Error>(())
    };

    let consume = async {
        while let Some(handle) = rx.recv().await {
            let response = match handle.await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Moderation task failed: {}", e);
                    error_body("Internal error")
                }
            };

            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        Ok::<(), std::io::Error>(())
    };

    let (produced, consumed) = tokio::join!(produce, consume);
    consumed?;
    produced?;

    Ok(())
}
