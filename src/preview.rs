//! Thumbnail previews for the playback modal.

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};
use reqwest::Client;
use tracing::debug;

use crate::constants::constants;
use crate::display::DisplayMode;

async fn fetch_image(client: &Client, url: &str) -> Result<DynamicImage> {
  let response = client.get(url).send().await.with_context(|| format!("Failed to request {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("HTTP {} for {}", response.status().as_u16(), url));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image (URL: {})", url))
}

/// Fetch a card's thumbnail, substituting the placeholder image when the
/// real one can't be fetched or decoded.
pub async fn fetch_thumbnail(client: &Client, url: &str) -> Result<DynamicImage> {
  fetch_or_placeholder(client, url, &constants().placeholder_thumbnail).await
}

async fn fetch_or_placeholder(client: &Client, url: &str, placeholder: &str) -> Result<DynamicImage> {
  match fetch_image(client, url).await {
    Ok(image) => Ok(image),
    Err(e) => {
      debug!(err = %format!("{:#}", e), "preview: thumbnail failed, using placeholder");
      fetch_image(client, placeholder).await
    }
  }
}

/// The last fetched thumbnail plus a copy resized for the current area.
pub struct ThumbnailCache {
  pub key: String,
  image: DynamicImage,
  resized: Option<(u16, u16, DynamicImage)>,
}

impl ThumbnailCache {
  pub fn new(key: String, image: DynamicImage) -> Self {
    Self { key, image, resized: None }
  }

  /// The image scaled to fill `area`, resizing only when the area changes.
  pub fn fitted(&mut self, area: Rect, mode: DisplayMode) -> &DynamicImage {
    let stale = !matches!(self.resized, Some((w, h, _)) if w == area.width && h == area.height);
    if stale {
      let target_w = area.width.max(1) as u32;
      // Half-blocks pack two pixel rows into each cell.
      let target_h = match mode {
        DisplayMode::Direct => area.height as u32 * 2,
        _ => area.height as u32,
      };
      let resized = self.image.resize(target_w, target_h.max(1), FilterType::Triangle);
      self.resized = Some((area.width, area.height, resized));
    }
    match self.resized {
      Some((_, _, ref img)) => img,
      None => &self.image,
    }
  }
}

const ASCII_RAMP: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

pub struct ThumbnailWidget<'a> {
  pub image: &'a DynamicImage,
  pub mode: DisplayMode,
}

impl Widget for ThumbnailWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.mode {
      DisplayMode::Direct => render_half_blocks(self.image, area, buf),
      DisplayMode::Ascii => render_ascii(self.image, area, buf),
      DisplayMode::Off => {}
    }
  }
}

/// Offset that centers `inner` cells inside `outer`.
fn centered(outer: u16, inner: u32) -> u16 {
  (outer as u32).saturating_sub(inner).min(u16::MAX as u32) as u16 / 2
}

fn render_half_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let img_w = rgb.width().min(area.width as u32);
  let img_h = rgb.height();
  let rows = img_h.div_ceil(2).min(area.height as u32);
  let x0 = area.x + centered(area.width, img_w);
  let y0 = area.y + centered(area.height, rows);

  for row in 0..rows {
    for col in 0..img_w {
      let upper = rgb.get_pixel(col, row * 2);
      let bg = if row * 2 + 1 < img_h {
        let lower = rgb.get_pixel(col, row * 2 + 1);
        Color::Rgb(lower[0], lower[1], lower[2])
      } else {
        Color::Reset
      };
      buf.set_string(
        x0 + col as u16,
        y0 + row as u16,
        "▀",
        Style::default().fg(Color::Rgb(upper[0], upper[1], upper[2])).bg(bg),
      );
    }
  }
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let img_w = luma.width().min(area.width as u32);
  let img_h = luma.height().min(area.height as u32);
  let x0 = area.x + centered(area.width, img_w);
  let y0 = area.y + centered(area.height, img_h);

  for y in 0..img_h {
    for x in 0..img_w {
      let level = luma.get_pixel(x, y)[0] as usize * (ASCII_RAMP.len() - 1) / 255;
      buf.set_string(x0 + x as u16, y0 + y as u16, ASCII_RAMP[level], Style::default());
    }
  }
}
