// loader.rs — 读取并解码全景图，解析 XMP，生成可渲染画布

use crate::error::{Result, ViewerError};
use crate::panorama::{build_buffer, PanoBuffer, PanoDescriptor};
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;

/// Where the panorama bytes come from.
#[derive(Debug, Clone)]
pub enum PanoramaSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl PanoramaSource {
    fn read(&self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => std::fs::read(path)
                .map_err(|e| ViewerError::AssetLoad(format!("{}: {e}", path.display()))),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A decoded panorama ready for upload.
pub struct LoadedPanorama {
    /// 原始 GPano 元数据（若有）
    pub pano_data: Option<PanoDescriptor>,
    pub buffer: PanoBuffer,
    pub canvas: RgbaImage,
}

impl std::fmt::Debug for LoadedPanorama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPanorama")
            .field("pano_data", &self.pano_data)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

/// Loads, decodes and lays out a panorama. Blocking; run it off the event loop.
///
/// Malformed metadata never fails the load: the image is then treated as a
/// complete panorama.
pub fn load_panorama(
    source: &PanoramaSource,
    max_texture_width: u32,
    use_xmp: bool,
) -> Result<LoadedPanorama> {
    let bytes = source.read()?;

    let mut reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| ViewerError::AssetLoad(e.to_string()))?;
    reader.no_limits();
    let img = reader.decode()?;
    let (w, h) = img.dimensions();
    log::info!("decoded panorama {w}x{h}");

    let pano_data = if use_xmp {
        match PanoDescriptor::from_xmp(&bytes) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("ignoring panorama metadata: {e}");
                None
            }
        }
    } else {
        None
    };

    let (pano_data, buffer) = match build_buffer(w, h, pano_data.as_ref(), max_texture_width) {
        Ok(buffer) => (pano_data, buffer),
        Err(e) if pano_data.is_some() => {
            log::warn!("falling back to full-image layout: {e}");
            (None, build_buffer(w, h, None, max_texture_width)?)
        }
        Err(e) => return Err(e),
    };

    let canvas = buffer.compose(&img);
    log::info!(
        "panorama canvas {}x{} (crop {}x{} at {},{})",
        buffer.full_width,
        buffer.full_height,
        buffer.cropped_width,
        buffer.cropped_height,
        buffer.cropped_x,
        buffer.cropped_y
    );

    Ok(LoadedPanorama { pano_data, buffer, canvas })
}
