use std::io::Cursor;

use ab_glyph::{FontRef, PxScale};
use anyhow::{Result, anyhow};
use axum::{
    extract::Query,
    http::header,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use serde::Deserialize;
use tracing::error;

use crate::error::{ApiError, ApiResult};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 630;
const PADDING: u32 = 40;
const LINE_GAP: u32 = 20;

const TITLE_SIZE: f32 = 64.0;
const SUBTITLE_SIZE: f32 = 32.0;

const BACKGROUND: Rgb<u8> = Rgb([0xFF, 0xF8, 0xE1]);
const TITLE_COLOR: Rgb<u8> = Rgb([0x33, 0x33, 0x33]);
const SUBTITLE_COLOR: Rgb<u8> = Rgb([0x66, 0x66, 0x66]);

/// DejaVu Sans, see `assets/DejaVuSans-LICENSE`.
const FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub username: Option<String>,
    #[serde(rename = "songCount")]
    pub song_count: Option<String>,
}

/// GET /api/og?username&songCount
///
/// Share-preview card for a profile, as a PNG.
pub async fn share_image(
    WithRejection(Query(query), _): WithRejection<Query<ShareQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let username = query.username.unwrap_or_default();
    let song_count = query
        .song_count
        .and_then(|c| c.parse::<u64>().ok())
        .unwrap_or(0);

    let png = tokio::task::spawn_blocking(move || render_card(&username, song_count))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|rendered| rendered)
        .map_err(|e| {
            error!("OG image generation error: {}", e);
            ApiError::Internal("Failed to generate image")
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        png,
    ))
}

/// Draw the 1200x630 card: "{username}'s Music Scrapbook" over
/// "{count} songs meant something", centered on a cream background.
pub fn render_card(username: &str, song_count: u64) -> Result<Vec<u8>> {
    let font = FontRef::try_from_slice(FONT).map_err(|_| anyhow!("bundled font is unreadable"))?;
    let mut card = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let title = format!("{}'s Music Scrapbook", username);
    let subtitle = format!("{} songs meant something", song_count);

    let title_scale = fit_width(&font, &title, TITLE_SIZE);
    let subtitle_scale = fit_width(&font, &subtitle, SUBTITLE_SIZE);
    let (title_w, title_h) = text_size(title_scale, &font, &title);
    let (subtitle_w, subtitle_h) = text_size(subtitle_scale, &font, &subtitle);

    let top = HEIGHT.saturating_sub(title_h + LINE_GAP + subtitle_h) / 2;
    draw_text_mut(
        &mut card,
        TITLE_COLOR,
        centered(title_w),
        top as i32,
        title_scale,
        &font,
        &title,
    );
    draw_text_mut(
        &mut card,
        SUBTITLE_COLOR,
        centered(subtitle_w),
        (top + title_h + LINE_GAP) as i32,
        subtitle_scale,
        &font,
        &subtitle,
    );

    let mut png = Vec::new();
    card.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Shrink `size` until `text` fits between the side paddings.
fn fit_width(font: &FontRef<'_>, text: &str, size: f32) -> PxScale {
    let max_width = WIDTH - 2 * PADDING;
    let (width, _) = text_size(PxScale::from(size), font, text);
    if width <= max_width {
        PxScale::from(size)
    } else {
        PxScale::from(size * max_width as f32 / width as f32)
    }
}

fn centered(width: u32) -> i32 {
    (WIDTH.saturating_sub(width) / 2) as i32
}
