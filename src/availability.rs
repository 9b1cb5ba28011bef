//! Best-effort existence checks against YouTube's public oEmbed endpoint.
//!
//! A probe never hides a video because of a network problem: only a clear
//! "not found"-style answer marks it unavailable.

use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tracing::debug;

use crate::constants::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Availability {
  Available,
  Unavailable,
}

/// Result of probing one video id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
  pub video_id: String,
  pub availability: Availability,
}

/// Map an oEmbed response status to an availability verdict.
pub fn classify_status(status: StatusCode) -> Availability {
  if status.is_success() {
    return Availability::Available;
  }
  match status {
    StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
      Availability::Unavailable
    }
    _ => Availability::Available,
  }
}

async fn probe_url(client: &Client, url: &str) -> Availability {
  match client.get(url).send().await {
    Ok(response) => classify_status(response.status()),
    Err(e) => {
      debug!(url = %url, err = %e, "probe: request failed, treating as available");
      Availability::Available
    }
  }
}

/// Probe every id against the oEmbed endpoint with bounded concurrency,
/// sending each verdict through `tx` as it arrives. Stops early if the
/// receiver is gone.
pub async fn probe_all(client: Client, video_ids: Vec<String>, tx: mpsc::Sender<ProbeResult>) {
  probe_all_at(client, video_ids, tx, |id| constants().oembed_url_for(id)).await
}

async fn probe_all_at<F>(client: Client, video_ids: Vec<String>, tx: mpsc::Sender<ProbeResult>, url_for: F)
where
  F: Fn(&str) -> String,
{
  stream::iter(video_ids)
    .map(|video_id| {
      let client = client.clone();
      let tx = tx.clone();
      let url = url_for(&video_id);
      async move {
        if tx.is_closed() {
          return;
        }
        let availability = probe_url(&client, &url).await;
        let _ = tx.send(ProbeResult { video_id, availability }).await;
      }
    })
    .buffer_unordered(constants().probe_concurrency.max(1))
    .collect::<()>()
    .await;
}
