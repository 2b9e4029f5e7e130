//! Compositing of the image shown on the device.
//!
//! The compositor is a pure function of its inputs: identical artwork and
//! text always produce identical pixels, which is what makes render-hash
//! deduplication in the sync loop sound.

mod layout;

pub use layout::TextLayout;

use std::fmt::Write as _;
use std::sync::Arc;

use base64::Engine;
use image::RgbaImage;
use resvg::tiny_skia::Pixmap;
use resvg::usvg::{self, Transform, fontdb};
use tracing::{debug, info};

use crate::device::DisplaySpec;
use crate::error::{Result, TagError};
use crate::image_ops::{ResizeStrategy, encode_png, fit_to};

/// Left margin of the text band.
const TEXT_X: u32 = 12;

const TITLE_FILL: &str = "#FFFFFF";
const ARTIST_FILL: &str = "#808080";

/// Turns artwork plus track text into the device image.
pub trait Compositor: Send + Sync {
    fn render(&self, artwork: &RgbaImage, title: &str, artist: &str) -> Result<RgbaImage>;
}

impl<T: Compositor + ?Sized> Compositor for Box<T> {
    fn render(&self, artwork: &RgbaImage, title: &str, artist: &str) -> Result<RgbaImage> {
        (**self).render(artwork, title, artist)
    }
}

/// Renders through an SVG document rasterized with resvg.
pub struct SvgCompositor {
    fontdb: Arc<fontdb::Database>,
    spec: DisplaySpec,
    resize: ResizeStrategy,
    font_family: String,
}

impl std::fmt::Debug for SvgCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgCompositor")
            .field("spec", &self.spec)
            .field("resize", &self.resize)
            .field("font_family", &self.font_family)
            .field("fonts", &self.fontdb.len())
            .finish()
    }
}

impl SvgCompositor {
    /// Create a compositor using the system fonts.
    pub fn new(spec: DisplaySpec) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        info!(font_count = db.len(), "Loaded fonts for text rendering");
        Self::with_fontdb(spec, db)
    }

    /// Create a compositor with a prepared font database.
    pub fn with_fontdb(spec: DisplaySpec, fontdb: fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(fontdb),
            spec,
            resize: ResizeStrategy::default(),
            font_family: "sans-serif".to_string(),
        }
    }

    #[must_use]
    pub fn resize(mut self, strategy: ResizeStrategy) -> Self {
        self.resize = strategy;
        self
    }

    #[must_use]
    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Build the SVG document for one frame.
    pub fn build_svg(&self, artwork: &RgbaImage, title: &str, artist: &str) -> Result<String> {
        let DisplaySpec {
            width,
            height,
            art_height,
            ..
        } = self.spec;

        let art = fit_to(artwork, width, art_height, self.resize);
        let art_b64 = base64::engine::general_purpose::STANDARD.encode(encode_png(&art)?);

        let layout = TextLayout::for_title(title);
        let (title_baselines, artist_baseline) = layout.baselines(art_height);
        let family = escape_xml(&self.font_family);

        let mut svg = String::with_capacity(art_b64.len() + 1024);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        let _ = write!(svg, r##"<rect width="{width}" height="{height}" fill="#000000"/>"##);
        let _ = write!(
            svg,
            r#"<image x="0" y="0" width="{width}" height="{art_height}" xlink:href="data:image/png;base64,{art_b64}"/>"#
        );
        for (line, y) in layout.title_lines.iter().zip(title_baselines) {
            let _ = write!(
                svg,
                r#"<text x="{TEXT_X}" y="{y}" font-family="{family}" font-size="{}" font-weight="bold" fill="{TITLE_FILL}">{}</text>"#,
                layout.title_size,
                escape_xml(line)
            );
        }
        let _ = write!(
            svg,
            r#"<text x="{TEXT_X}" y="{artist_baseline}" font-family="{family}" font-size="{}" fill="{ARTIST_FILL}">{}</text>"#,
            layout.artist_size,
            escape_xml(artist)
        );
        svg.push_str("</svg>");
        Ok(svg)
    }

    fn rasterize(&self, svg: &str) -> Result<RgbaImage> {
        let options = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree =
            usvg::Tree::from_str(svg, &options).map_err(|e| TagError::Render(e.to_string()))?;

        let mut pixmap = Pixmap::new(self.spec.width, self.spec.height)
            .ok_or_else(|| TagError::Render("Failed to allocate pixmap".to_string()))?;
        pixmap.fill(resvg::tiny_skia::Color::BLACK);
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        // The background is opaque, so premultiplied and straight alpha agree.
        RgbaImage::from_raw(self.spec.width, self.spec.height, pixmap.take())
            .ok_or_else(|| TagError::Render("Pixmap size mismatch".to_string()))
    }
}

impl Compositor for SvgCompositor {
    fn render(&self, artwork: &RgbaImage, title: &str, artist: &str) -> Result<RgbaImage> {
        let svg = self.build_svg(artwork, title, artist)?;
        let image = self.rasterize(&svg)?;
        debug!(title, artist, "Rendered device image");
        Ok(image)
    }
}

/// Artwork only, no text band.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtworkCompositor {
    pub spec: DisplaySpec,
    pub resize: ResizeStrategy,
}

impl Compositor for ArtworkCompositor {
    fn render(&self, artwork: &RgbaImage, _title: &str, _artist: &str) -> Result<RgbaImage> {
        let mut canvas = RgbaImage::from_pixel(
            self.spec.width,
            self.spec.height,
            image::Rgba([0, 0, 0, 255]),
        );
        let art = fit_to(artwork, self.spec.width, self.spec.art_height, self.resize);
        image::imageops::overlay(&mut canvas, &art, 0, 0);
        Ok(canvas)
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
