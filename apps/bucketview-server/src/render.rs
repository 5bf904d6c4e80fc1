//! HTML rendering for the image grid.
//!
//! Image URLs point at the image-resizing service on the static domain; the
//! `width`/`height`/`fit`/`quality` parameters are that service's contract
//! and must not change.

use bucketview_listing::keys::IMAGE_EXTENSIONS;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use quick_xml::escape::escape;

/// Page shell with a `{template_images}` placeholder for the grid.
pub const TEMPLATE: &str = include_str!("../templates/index.html");

/// Placeholder in [`TEMPLATE`] replaced by the rendered grid.
pub const PLACEHOLDER: &str = "{template_images}";

/// Thumbnail width requested from the resizer.
pub const DEFAULT_IMAGE_WIDTH: u32 = 300;

/// Thumbnail height requested from the resizer.
pub const DEFAULT_IMAGE_HEIGHT: u32 = 200;

/// Card colors, cycled in order.
const CARD_COLORS: [&str; 8] = [
    "primary",
    "secondary",
    "success",
    "info",
    "warning",
    "danger",
    "dark",
    "light",
];

/// Characters kept literal when a key is placed in a URL path.
const KEY_PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// One image card in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Last path segment of the key, shown as the card title.
    pub filename: String,
    /// Grid-sized rendition.
    pub thumbnail_url: String,
    /// Large rendition opened in the modal.
    pub full_size_url: String,
}

impl ImageEntry {
    /// Build the card for `key` served from `static_domain`.
    #[must_use]
    pub fn new(static_domain: &str, key: &str) -> Self {
        let base = format!(
            "{}/{}",
            static_domain.trim_end_matches('/'),
            utf8_percent_encode(key, KEY_PATH_ENCODE_SET)
        );
        let filename = key
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(key)
            .to_owned();

        Self {
            filename,
            thumbnail_url: format!(
                "{base}?width={DEFAULT_IMAGE_WIDTH}&height={DEFAULT_IMAGE_HEIGHT}"
            ),
            full_size_url: format!("{base}?width=1500&height=1500&fit=bounds&quality=75"),
        }
    }
}

/// Render the grid of image cards, or the empty-state panel when there are none.
#[must_use]
pub fn render_grid(entries: &[ImageEntry], bucket: &str) -> String {
    if entries.is_empty() {
        return render_empty_panel(bucket);
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| render_card(index, entry))
        .collect()
}

/// Render the panel shown when the listing failed.
#[must_use]
pub fn render_error_panel(message: &str) -> String {
    format!(
        r#"<div class="col-12">
  <div class="alert alert-danger text-center">
    <h4>Error loading images</h4>
    <p>Unable to fetch images from object storage: {}</p>
  </div>
</div>"#,
        escape(message)
    )
}

/// Substitute `content` into the page template.
#[must_use]
pub fn render_page(content: &str) -> String {
    TEMPLATE.replacen(PLACEHOLDER, content, 1)
}

fn render_empty_panel(bucket: &str) -> String {
    let formats = IMAGE_EXTENSIONS
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"<div class="col-12">
  <div class="alert alert-info text-center">
    <h4>No Images Found</h4>
    <p>The '{}' bucket is empty or contains no image files.</p>
    <p>Supported formats: {formats}</p>
  </div>
</div>"#,
        escape(bucket)
    )
}

fn render_card(index: usize, entry: &ImageEntry) -> String {
    let color = CARD_COLORS[index % CARD_COLORS.len()];
    let text = if color == "warning" || color == "light" {
        "dark"
    } else {
        "white"
    };
    let filename = escape(entry.filename.as_str());

    format!(
        r#"
<div class="col-12 col-md-6 col-lg-3 mb-3">
  <div class="card h-100 bg-{color} text-{text}">
    <img src="{thumbnail}" class="card-img-top image-clickable" alt="{filename}" style="height: 200px; object-fit: cover; cursor: pointer;" data-full-url="{full}" data-filename="{filename}">
    <div class="card-body">
      <h6 class="card-title text-truncate">{filename}</h6>
      <p class="card-text small">Image from Object Storage</p>
    </div>
  </div>
</div>"#,
        thumbnail = entry.thumbnail_url,
        full = entry.full_size_url,
    )
}
