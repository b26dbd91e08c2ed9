//! Live analysis update signal.
//!
//! The backend pushes on `/ws/analysis/{id}` while a run is pending or
//! processing. There is no payload contract: each message arrival is purely a
//! "something changed, re-fetch" nudge, forwarded here as a unit value.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::error::ApiError;

/// Derive the websocket endpoint for an analysis from the HTTP base URL.
///
/// # Errors
///
/// [`ApiError::InvalidBaseUrl`] when the base URL has no http(s) scheme.
pub fn ws_url(base_url: &str, analysis_id: Uuid) -> Result<String, ApiError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws/analysis/{analysis_id}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws/analysis/{analysis_id}"));
    }
    Err(ApiError::InvalidBaseUrl(base_url.to_owned()))
}

/// Subscribe to change nudges for one analysis. The channel closes when the
/// backend closes the socket or the connection drops; callers re-fetch the
/// result on every nudge.
///
/// # Errors
///
/// [`ApiError::WsConnect`] when the upgrade fails.
pub async fn watch_analysis(
    base_url: &str,
    analysis_id: Uuid,
) -> Result<mpsc::Receiver<()>, ApiError> {
    let url = ws_url(base_url, analysis_id)?;
    let (stream, _) = connect_async(url)
        .await
        .map_err(|error| ApiError::WsConnect(Box::new(error)))?;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let (_write, mut read) = stream.split();
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                // Ping/pong is handled by the protocol layer.
                Ok(_) => {}
            }
        }
    });

    Ok(rx)
}

#[cfg(test)]
#[path = "live_test.rs"]
mod tests;
