//! Variant Encoder
//!
//! Decodes one upload and produces the three stored encodings from that
//! single decode:
//! - **main**: full resolution at the storage quality
//! - **thumbnail**: small bounded encode, also the annotator payload
//! - **preview**: bounded to the interactive viewing box
//!
//! GIF and SVG sources pass through so motion and vector data survive.
//! Every other raster format is normalized to JPEG.
//!
//! CPU-bound; callers run it under `tokio::task::spawn_blocking`.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pixstash_common::config::EncodingConfig;
use std::io::Cursor;

use crate::error::{IngestError, IngestResult};

/// Raster decoders tried before the generic fallback, in order
const DECODE_PRIORITY: [ImageFormat; 3] = [ImageFormat::WebP, ImageFormat::Gif, ImageFormat::Png];

/// Bytes inspected when sniffing for an SVG root element
const SVG_SNIFF_LEN: usize = 1024;

/// Source format selected by the first decoder that accepted the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Svg,
    Raster(ImageFormat),
}

/// Stored output family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Normalized lossy encoding for every non-passthrough source
    Jpeg,
    Gif,
    Svg,
}

impl OutputFormat {
    /// Extension of the main and thumbnail variants
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Gif => ".gif",
            OutputFormat::Svg => ".svg",
        }
    }

    /// Extension of the preview variant
    pub fn preview_extension(&self) -> &'static str {
        match self {
            OutputFormat::Svg => ".svg",
            OutputFormat::Jpeg | OutputFormat::Gif => ".jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Svg => "image/svg+xml",
        }
    }
}

/// Three encodings of one source, produced together
#[derive(Debug, Clone)]
pub struct VariantSet {
    pub main: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub preview: Vec<u8>,
    /// Natural dimensions of the source
    pub width: u32,
    pub height: u32,
    pub source: SourceFormat,
    pub output: OutputFormat,
}

impl VariantSet {
    pub fn mime_type(&self) -> &'static str {
        self.output.mime_type()
    }
}

/// Encodes variant sets under one quality/size policy
#[derive(Debug, Clone)]
pub struct VariantEncoder {
    config: EncodingConfig,
}

impl Default for VariantEncoder {
    fn default() -> Self {
        Self::new(EncodingConfig::default())
    }
}

impl VariantEncoder {
    pub fn new(config: EncodingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Decode `data` and produce its variant set
    ///
    /// `hint` is the declared original extension or MIME type, if any.
    /// Either the whole set is returned or an error; never a partial set.
    pub fn encode(&self, data: &[u8], hint: Option<&str>) -> IngestResult<VariantSet> {
        if is_svg(data, hint)? {
            return Ok(self.encode_svg(data));
        }

        let (image, format) = decode(data)?;
        let (width, height) = (image.width(), image.height());

        tracing::debug!(?format, width, height, "Decoded source image");

        let set = if format == ImageFormat::Gif {
            VariantSet {
                main: data.to_vec(),
                thumbnail: self.encode_gif_thumbnail(&image)?,
                preview: self.encode_preview(&image)?,
                width,
                height,
                source: SourceFormat::Raster(format),
                output: OutputFormat::Gif,
            }
        } else {
            VariantSet {
                main: encode_jpeg(&image, self.config.main_quality)?,
                thumbnail: self.encode_jpeg_thumbnail(&image)?,
                preview: self.encode_preview(&image)?,
                width,
                height,
                source: SourceFormat::Raster(format),
                output: OutputFormat::Jpeg,
            }
        };

        Ok(set)
    }

    /// Preview policy on an already-decoded image
    pub fn encode_preview(&self, image: &DynamicImage) -> IngestResult<Vec<u8>> {
        let resized = resize_to_fit(
            image,
            self.config.preview_max_width,
            self.config.preview_max_height,
        );
        encode_jpeg(&resized, self.config.preview_quality)
    }

    /// Decode arbitrary raster bytes and apply the preview policy
    pub fn preview_from_bytes(&self, data: &[u8]) -> IngestResult<Vec<u8>> {
        let (image, _) = decode(data)?;
        self.encode_preview(&image)
    }

    fn encode_jpeg_thumbnail(&self, image: &DynamicImage) -> IngestResult<Vec<u8>> {
        let max = self.config.thumbnail_max_dimension;
        encode_jpeg(&resize_to_fit(image, max, max), self.config.thumbnail_quality)
    }

    /// First frame, resized, kept in the GIF family
    fn encode_gif_thumbnail(&self, image: &DynamicImage) -> IngestResult<Vec<u8>> {
        let max = self.config.thumbnail_max_dimension;
        let thumb = DynamicImage::ImageRgba8(resize_to_fit(image, max, max).to_rgba8());

        let mut buf = Vec::new();
        thumb
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
            .map_err(|e| IngestError::Encode(format!("gif thumbnail: {}", e)))?;
        Ok(buf)
    }

    fn encode_svg(&self, data: &[u8]) -> VariantSet {
        let (width, height) = svg_dimensions(data);
        VariantSet {
            main: data.to_vec(),
            thumbnail: data.to_vec(),
            preview: data.to_vec(),
            width,
            height,
            source: SourceFormat::Svg,
            output: OutputFormat::Svg,
        }
    }
}

/// Largest size fitting `max_width` x `max_height` with the source aspect ratio
///
/// Never upscales; each side is at least 1 pixel.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    let w = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (w, h)
}

fn resize_to_fit(image: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (w, h) = fit_within(image.width(), image.height(), max_width, max_height);
    if (w, h) == (image.width(), image.height()) {
        image.clone()
    } else {
        image.resize_exact(w, h, FilterType::Lanczos3)
    }
}

/// Try the priority decoders, then the generic sniffing decoder
fn decode(data: &[u8]) -> IngestResult<(DynamicImage, ImageFormat)> {
    for format in DECODE_PRIORITY {
        if let Ok(image) = image::load_from_memory_with_format(data, format) {
            return Ok((image, format));
        }
    }

    let format = image::guess_format(data)
        .map_err(|e| IngestError::Decode(format!("unrecognized image data: {}", e)))?;
    let image = image::load_from_memory_with_format(data, format)
        .map_err(|e| IngestError::Decode(format!("{:?}: {}", format, e)))?;
    Ok((image, format))
}

/// JPEG has no alpha channel; transparent pixels are composited onto white
fn encode_jpeg(image: &DynamicImage, quality: u8) -> IngestResult<Vec<u8>> {
    let rgb = if image.color().has_alpha() {
        flatten_onto_white(image)
    } else {
        image.to_rgb8()
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| IngestError::Encode(format!("jpeg: {}", e)))?;
    Ok(buf)
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn hint_is_svg(hint: Option<&str>) -> bool {
    hint.map(|h| {
        let h = h.trim().to_ascii_lowercase();
        h == ".svg" || h == "svg" || h.starts_with("image/svg")
    })
    .unwrap_or(false)
}

/// Markup document (after an optional BOM and whitespace) with an SVG root
/// near the start
fn sniff_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SVG_SNIFF_LEN)];
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let text = String::from_utf8_lossy(head);
    text.trim_start().starts_with('<') && text.contains("<svg")
}

/// SVG is detected by sniffing; a declared SVG must actually contain an SVG root
fn is_svg(data: &[u8], hint: Option<&str>) -> IngestResult<bool> {
    if hint_is_svg(hint) {
        if String::from_utf8_lossy(data).contains("<svg") {
            return Ok(true);
        }
        return Err(IngestError::Decode("declared SVG has no <svg> element".to_string()));
    }
    Ok(sniff_svg(data))
}

/// Dimensions from the root element's width/height, else its viewBox, else zero
fn svg_dimensions(data: &[u8]) -> (u32, u32) {
    let text = String::from_utf8_lossy(data);
    let Some(start) = text.find("<svg") else {
        return (0, 0);
    };
    let tag = match text[start..].find('>') {
        Some(end) => &text[start..start + end],
        None => &text[start..],
    };

    let width = svg_attribute(tag, "width").and_then(parse_length);
    let height = svg_attribute(tag, "height").and_then(parse_length);
    if let (Some(w), Some(h)) = (width, height) {
        return (w, h);
    }

    svg_attribute(tag, "viewBox")
        .and_then(|view_box| {
            let parts: Vec<f64> = view_box
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|p| !p.is_empty())
                .filter_map(|p| p.parse().ok())
                .collect();
            match parts.as_slice() {
                [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((w.round() as u32, h.round() as u32)),
                _ => None,
            }
        })
        .unwrap_or((0, 0))
}

fn svg_attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(offset) = tag[search_from..].find(name) {
        let pos = search_from + offset;
        search_from = pos + name.len();

        let preceded_by_space = tag[..pos].ends_with(|c: char| c.is_whitespace());
        let rest = tag[search_from..].trim_start();
        if !preceded_by_space || !rest.starts_with('=') {
            continue;
        }

        let value = rest[1..].trim_start();
        let quote = value.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let value = &value[1..];
        return value.find(quote).map(|end| &value[..end]);
    }
    None
}

/// Absolute lengths only ("120", "120px", "120.5"); percentages are rejected
fn parse_length(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let numeric: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0)
        .map(|v| v.round() as u32)
}
