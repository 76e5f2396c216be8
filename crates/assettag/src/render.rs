//! QR rendering.
//!
//! Payload text goes in, a scannable image comes out. Any standards-compliant
//! encoder satisfies [`QrRenderer`]; the two provided here share the module
//! matrix from the `qrcode` crate and differ only in output format.

use std::fmt::Write as _;
use std::io::Cursor;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};

/// Prefix of a PNG data URL.
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Largest rendered side length, in pixels.
pub const MAX_SIZE: u32 = 4096;

/// QR error-correction level, trading density for damage tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EcLevel {
    /// Recovers ~7% damage.
    L,
    /// Recovers ~15% damage.
    #[default]
    M,
    /// Recovers ~25% damage.
    Q,
    /// Recovers ~30% damage.
    H,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::L => Self::L,
            EcLevel::M => Self::M,
            EcLevel::Q => Self::Q,
            EcLevel::H => Self::H,
        }
    }
}

impl FromStr for EcLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            _ => Err(format!("unknown error correction level: {s}")),
        }
    }
}

/// An opaque RGB color, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Pure black.
    pub const BLACK: Self = Self([0, 0, 0]);
    /// Pure white.
    pub const WHITE: Self = Self([0xFF, 0xFF, 0xFF]);

    /// Format as `#RRGGBB`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02X}{g:02X}{b:02X}")
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color must start with '#': {s}"))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid color: {s}"))
        };
        match hex.len() {
            6 if hex.is_ascii() => Ok(Self([channel(0)?, channel(2)?, channel(4)?])),
            _ => Err(format!("color must be #RRGGBB: {s}")),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

/// Output format of a rendered QR image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrFormat {
    /// PNG raster as a `data:image/png;base64,` URL.
    #[default]
    Png,
    /// Inline SVG document.
    Svg,
}

impl std::fmt::Display for QrFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Svg => write!(f, "svg"),
        }
    }
}

/// Visual parameters for a rendered code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Output width and height in pixels.
    pub size: u32,
    /// Quiet zone around the code, in modules.
    pub margin: u32,
    /// Module color.
    pub dark_color: Rgb,
    /// Background color.
    pub light_color: Rgb,
    /// Error-correction level.
    pub error_correction: EcLevel,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            size: 200,
            margin: 2,
            dark_color: Rgb::BLACK,
            light_color: Rgb::WHITE,
            error_correction: EcLevel::M,
        }
    }
}

/// A rendered QR code together with the exact text it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrImage {
    /// Output format.
    pub format: QrFormat,
    /// The embeddable blob: a data URL for PNG, the document for SVG.
    pub data: String,
    /// The payload text encoded in the image.
    pub text: String,
    /// Rendered width and height in pixels.
    pub size: u32,
}

impl QrImage {
    /// Raw file bytes of the image.
    ///
    /// # Errors
    ///
    /// Returns an error if a PNG data URL is malformed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self.format {
            QrFormat::Png => decode_png_data_url(&self.data),
            QrFormat::Svg => Ok(self.data.clone().into_bytes()),
        }
    }
}

/// File bytes of a stored `qr_code` blob: PNG for a data URL, otherwise the
/// SVG document itself.
///
/// # Errors
///
/// Returns an error if a PNG data URL has an invalid body.
pub fn stored_qr_bytes(qr_code: &str) -> Result<Vec<u8>> {
    if qr_code.starts_with(PNG_DATA_URL_PREFIX) {
        decode_png_data_url(qr_code)
    } else {
        Ok(qr_code.as_bytes().to_vec())
    }
}

/// File extension for a stored `qr_code` blob.
#[must_use]
pub fn stored_qr_format(qr_code: &str) -> QrFormat {
    if qr_code.starts_with(PNG_DATA_URL_PREFIX) {
        QrFormat::Png
    } else {
        QrFormat::Svg
    }
}

/// Decode a `data:image/png;base64,` URL into PNG bytes.
///
/// # Errors
///
/// Returns an error if the prefix is missing or the base64 body is invalid.
pub fn decode_png_data_url(data_url: &str) -> Result<Vec<u8>> {
    let body = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| Error::internal("not a PNG data URL"))?;
    STANDARD
        .decode(body)
        .map_err(|e| Error::internal(format!("invalid base64 in data URL: {e}")))
}

/// Something that can turn payload text into a QR image.
pub trait QrRenderer: Send + Sync + std::fmt::Debug {
    /// The format this renderer produces.
    fn format(&self) -> QrFormat;

    /// Render `text` with the given visual parameters.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the text exceeds the capacity of the
    /// requested error-correction level, or if image encoding fails.
    fn render(&self, text: &str, options: &QrOptions) -> Result<QrImage>;
}

/// Get the built-in renderer for a format.
#[must_use]
pub fn renderer_for(format: QrFormat) -> std::sync::Arc<dyn QrRenderer> {
    match format {
        QrFormat::Png => std::sync::Arc::new(PngRenderer),
        QrFormat::Svg => std::sync::Arc::new(SvgRenderer),
    }
}

/// The dark/light module matrix of an encoded symbol, plus quiet zone.
#[derive(Debug)]
struct ModuleGrid {
    width: usize,
    margin: usize,
    dark: Vec<bool>,
}

impl ModuleGrid {
    fn encode(text: &str, options: &QrOptions) -> Result<Self> {
        if options.size > MAX_SIZE {
            return Err(Error::encoding(format!(
                "size {} exceeds the {MAX_SIZE} px limit",
                options.size
            )));
        }
        let code = qrcode::QrCode::with_error_correction_level(
            text.as_bytes(),
            options.error_correction.into(),
        )
        .map_err(|e| {
            Error::encoding(format!(
                "{e} ({} bytes at error correction {:?})",
                text.len(),
                options.error_correction
            ))
        })?;
        let width = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        trace!("encoded {} bytes into {width}x{width} modules", text.len());
        let grid = Self {
            width,
            margin: options.margin as usize,
            dark,
        };
        if grid.total() > MAX_SIZE as usize {
            return Err(Error::encoding(format!(
                "{} modules with margin {} exceeds the {MAX_SIZE} px limit",
                grid.total(),
                options.margin
            )));
        }
        Ok(grid)
    }

    /// Side length including the quiet zone on both sides.
    fn total(&self) -> usize {
        self.width + 2 * self.margin
    }

    /// Whether the module at (x, y), in quiet-zone coordinates, is dark.
    fn is_dark(&self, x: usize, y: usize) -> bool {
        let (Some(x), Some(y)) = (x.checked_sub(self.margin), y.checked_sub(self.margin)) else {
            return false;
        };
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }
}

/// Renders PNG data URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngRenderer;

impl QrRenderer for PngRenderer {
    fn format(&self) -> QrFormat {
        QrFormat::Png
    }

    fn render(&self, text: &str, options: &QrOptions) -> Result<QrImage> {
        let grid = ModuleGrid::encode(text, options)?;
        let total = grid.total();
        // Never go below one pixel per module.
        let size = (options.size as usize).max(total);
        let side = u32::try_from(size).map_err(|_| Error::encoding("image too large"))?;

        let dark = image::Rgb(options.dark_color.0);
        let light = image::Rgb(options.light_color.0);
        let img = image::RgbImage::from_fn(side, side, |px, py| {
            let mx = px as usize * total / size;
            let my = py as usize * total / size;
            if grid.is_dark(mx, my) {
                dark
            } else {
                light
            }
        });

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| Error::encoding(format!("PNG encoding failed: {e}")))?;

        Ok(QrImage {
            format: QrFormat::Png,
            data: format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(&png)),
            text: text.to_string(),
            size: side,
        })
    }
}

/// Renders standalone SVG documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl QrRenderer for SvgRenderer {
    fn format(&self) -> QrFormat {
        QrFormat::Svg
    }

    fn render(&self, text: &str, options: &QrOptions) -> Result<QrImage> {
        let grid = ModuleGrid::encode(text, options)?;
        let total = grid.total();

        let mut path = String::new();
        for y in 0..total {
            for x in 0..total {
                if grid.is_dark(x, y) {
                    // Writing to a String cannot fail.
                    let _ = write!(path, "M{x},{y}h1v1h-1z");
                }
            }
        }

        let data = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" "#,
                r#"viewBox="0 0 {total} {total}" shape-rendering="crispEdges">"#,
                r#"<rect width="{total}" height="{total}" fill="{light}"/>"#,
                r#"<path fill="{dark}" d="{path}"/></svg>"#
            ),
            size = options.size,
            total = total,
            light = options.light_color.to_hex(),
            dark = options.dark_color.to_hex(),
            path = path,
        );

        Ok(QrImage {
            format: QrFormat::Svg,
            data,
            text: text.to_string(),
            size: options.size,
        })
    }
}
