//! Decoding QR codes from raster images.
//!
//! Camera capture is left to the embedder: it hands greyscale [`Frame`]s to a
//! [`FrameDecoder`] one at a time and stops at the first decoded text.
//! [`RqrrDecoder`] is the built-in decoder.

use tracing::debug;

use crate::error::{Error, Result};

/// An 8-bit greyscale raster, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl Frame {
    /// Wrap a greyscale buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `luma` does not hold exactly `width * height`
    /// samples.
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Result<Self> {
        let expected = u64::from(width) * u64::from(height);
        if luma.len() as u64 != expected {
            return Err(Error::internal(format!(
                "frame buffer holds {} samples, expected {expected}",
                luma.len()
            )));
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// Decode an encoded image file (PNG or JPEG) into a greyscale frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a supported image.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::internal(format!("failed to read image: {e}")))?
            .to_luma8();
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    fn luma_at(&self, x: usize, y: usize) -> u8 {
        let width = self.width as usize;
        self.luma.get(y * width + x).copied().unwrap_or(u8::MAX)
    }
}

/// Extracts QR text from a single frame.
pub trait FrameDecoder: Send + Sync {
    /// Return the text of the first readable code in `frame`, if any.
    fn decode(&self, frame: &Frame) -> Option<String>;
}

/// [`FrameDecoder`] backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl FrameDecoder for RqrrDecoder {
    fn decode(&self, frame: &Frame) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width as usize,
            frame.height as usize,
            |x, y| frame.luma_at(x, y),
        );
        let grids = prepared.detect_grids();
        debug!("Found {} candidate grids in frame", grids.len());
        grids.iter().find_map(|grid| match grid.decode() {
            Ok((_, text)) => Some(text),
            Err(e) => {
                debug!("Grid failed to decode: {e:?}");
                None
            }
        })
    }
}

/// Feed frames to `decoder` until one yields text.
pub fn scan_frames<I>(decoder: &dyn FrameDecoder, frames: I) -> Option<String>
where
    I: IntoIterator<Item = Frame>,
{
    frames
        .into_iter()
        .enumerate()
        .find_map(|(index, frame)| {
            let text = decoder.decode(&frame);
            if text.is_some() {
                debug!("Decoded QR code from frame {index}");
            }
            text
        })
}

/// Decode the QR code in an encoded image file with [`RqrrDecoder`].
///
/// Returns `Ok(None)` when the image holds no readable code.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<Option<String>> {
    let frame = Frame::from_image_bytes(bytes)?;
    Ok(RqrrDecoder.decode(&frame))
}
