// panorama.rs — 全景纹理布局：XMP (GPano) 元数据、裁剪区域缩放、画布合成

use crate::error::{Result, ViewerError};
use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;

/// Where a captured (possibly partial) equirectangular image sits inside the
/// full 360°×180° sphere texture. Values are pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanoDescriptor {
    pub full_width: f64,
    pub full_height: f64,
    pub cropped_width: f64,
    pub cropped_height: f64,
    pub cropped_x: f64,
    pub cropped_y: f64,
}

/// The scaled layout handed to the renderer: a `full_width × full_height`
/// canvas with the source image drawn into the cropped rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanoBuffer {
    pub full_width: u32,
    pub full_height: u32,
    pub cropped_width: u32,
    pub cropped_height: u32,
    pub cropped_x: u32,
    pub cropped_y: u32,
}

const XMP_OPEN: &str = "<x:xmpmeta";
const XMP_CLOSE: &str = "</x:xmpmeta>";
const GPANO_MARKER: &str = "GPano:";

const GPANO_FIELDS: [&str; 6] = [
    "FullPanoWidthPixels",
    "FullPanoHeightPixels",
    "CroppedAreaImageWidthPixels",
    "CroppedAreaImageHeightPixels",
    "CroppedAreaLeftPixels",
    "CroppedAreaTopPixels",
];

// 属性写法 GPano:Name="123" 或元素写法 <GPano:Name>123</GPano:Name>
static GPANO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"GPano:(\w+)\s*(?:=\s*["']\s*([^"']*?)\s*["']|>\s*([^<]*?)\s*</GPano:)"#).unwrap()
});

impl PanoDescriptor {
    /// Full image, no cropping.
    pub fn full_image(width: u32, height: u32) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        Self {
            full_width: w,
            full_height: h,
            cropped_width: w,
            cropped_height: h,
            cropped_x: 0.0,
            cropped_y: 0.0,
        }
    }

    /// Extracts GPano crop data from raw file bytes.
    ///
    /// `Ok(None)` when there is no XMP packet or it carries no GPano data.
    /// A packet that names GPano but lacks one of the six fields is malformed.
    pub fn from_xmp(bytes: &[u8]) -> Result<Option<Self>> {
        let text = String::from_utf8_lossy(bytes);

        let Some(start) = text.find(XMP_OPEN) else {
            return Ok(None);
        };
        let Some(len) = text[start..].find(XMP_CLOSE) else {
            return Ok(None);
        };
        let packet = &text[start..start + len + XMP_CLOSE.len()];
        if !packet.contains(GPANO_MARKER) {
            return Ok(None);
        }

        let mut values = [None; 6];
        for caps in GPANO_RE.captures_iter(packet) {
            let name = &caps[1];
            let Some(idx) = GPANO_FIELDS.iter().position(|f| *f == name) else {
                continue;
            };
            let raw = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            let value: f64 = raw.parse().map_err(|_| {
                ViewerError::metadata(format!("GPano:{name} is not a number: {raw:?}"))
            })?;
            values[idx] = Some(value);
        }

        let field = |idx: usize| {
            values[idx].ok_or_else(|| {
                ViewerError::metadata(format!("missing GPano:{}", GPANO_FIELDS[idx]))
            })
        };

        let descriptor = Self {
            full_width: field(0)?,
            full_height: field(1)?,
            cropped_width: field(2)?,
            cropped_height: field(3)?,
            cropped_x: field(4)?,
            cropped_y: field(5)?,
        };
        log::debug!("GPano metadata: {descriptor:?}");
        Ok(Some(descriptor))
    }

    fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("full_width", self.full_width),
            ("full_height", self.full_height),
            ("cropped_width", self.cropped_width),
            ("cropped_height", self.cropped_height),
            ("cropped_x", self.cropped_x),
            ("cropped_y", self.cropped_y),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in self.fields() {
            if !v.is_finite() || v < 0.0 {
                return Err(ViewerError::metadata(format!("{name} = {v}")));
            }
        }
        if self.full_width == 0.0 || self.full_height == 0.0 {
            return Err(ViewerError::metadata("full panorama size is zero"));
        }
        // 等距柱状投影的完整画面最多 1:1（通常 2:1）
        if self.full_height > self.full_width {
            return Err(ViewerError::metadata(format!(
                "full panorama {}x{} is taller than it is wide",
                self.full_width, self.full_height
            )));
        }
        if self.cropped_width > self.full_width || self.cropped_height > self.full_height {
            return Err(ViewerError::metadata("cropped area larger than full panorama"));
        }
        if self.cropped_x + self.cropped_width > self.full_width
            || self.cropped_y + self.cropped_height > self.full_height
        {
            return Err(ViewerError::metadata("cropped area outside of full panorama"));
        }
        Ok(())
    }
}

/// Computes the renderable buffer layout for an image.
///
/// Without metadata the whole image is the panorama. The width is capped at
/// `max_texture_width`; every other dimension is scaled by the same ratio.
pub fn build_buffer(
    image_width: u32,
    image_height: u32,
    pano_data: Option<&PanoDescriptor>,
    max_texture_width: u32,
) -> Result<PanoBuffer> {
    if image_width == 0 || image_height == 0 {
        return Err(ViewerError::AssetLoad("image has zero size".into()));
    }
    if max_texture_width == 0 {
        return Err(ViewerError::config("max_texture_width must be positive"));
    }

    let data = match pano_data {
        Some(d) => {
            d.validate()?;
            *d
        }
        None => PanoDescriptor::full_image(image_width, image_height),
    };

    let r = data.full_width.min(f64::from(max_texture_width)) / data.full_width;
    let scale = |v: f64| (v * r).round() as u32;

    let buffer = PanoBuffer {
        full_width: scale(data.full_width).clamp(1, max_texture_width),
        full_height: scale(data.full_height).max(1),
        cropped_width: scale(data.cropped_width),
        cropped_height: scale(data.cropped_height),
        cropped_x: scale(data.cropped_x),
        cropped_y: scale(data.cropped_y),
    };
    if buffer.full_height > max_texture_width {
        let msg = format!(
            "canvas height {} exceeds texture limit {max_texture_width}",
            buffer.full_height
        );
        return Err(match pano_data {
            Some(_) => ViewerError::metadata(msg),
            None => ViewerError::AssetLoad(msg),
        });
    }
    log::debug!("panorama buffer: ratio {r:.4}, {buffer:?}");
    Ok(buffer)
}

impl PanoBuffer {
    pub fn is_cropped(&self) -> bool {
        self.cropped_width != self.full_width || self.cropped_height != self.full_height
    }

    /// Draws `img` into a transparent canvas at the cropped rectangle.
    pub fn compose(&self, img: &DynamicImage) -> RgbaImage {
        let (src_w, src_h) = img.dimensions();
        let cw = self.cropped_width.max(1);
        let ch = self.cropped_height.max(1);

        let scaled = if (src_w, src_h) == (cw, ch) {
            img.to_rgba8()
        } else {
            img.resize_exact(cw, ch, imageops::FilterType::Triangle).to_rgba8()
        };

        if !self.is_cropped() && self.cropped_x == 0 && self.cropped_y == 0 {
            return scaled;
        }

        // 裁剪区域之外保持透明
        let mut canvas = RgbaImage::new(self.full_width, self.full_height);
        imageops::overlay(
            &mut canvas,
            &scaled,
            i64::from(self.cropped_x),
            i64::from(self.cropped_y),
        );
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const XMP_ATTR: &str = r#"....<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:Description
        GPano:FullPanoWidthPixels="4000"
        GPano:FullPanoHeightPixels="2000"
        GPano:CroppedAreaImageWidthPixels="2000"
        GPano:CroppedAreaImageHeightPixels="1000"
        GPano:CroppedAreaLeftPixels="1000"
        GPano:CroppedAreaTopPixels="500"
        GPano:ProjectionType="equirectangular"/></x:xmpmeta>...."#;

    #[test]
    fn no_metadata_caps_width() {
        let b = build_buffer(4096, 2048, None, 2048).unwrap();
        assert_eq!(
            b,
            PanoBuffer {
                full_width: 2048,
                full_height: 1024,
                cropped_width: 2048,
                cropped_height: 1024,
                cropped_x: 0,
                cropped_y: 0,
            }
        );
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let b = build_buffer(1000, 500, None, 2048).unwrap();
        assert_eq!((b.full_width, b.full_height), (1000, 500));
    }

    #[test]
    fn cropped_metadata_scales_uniformly() {
        let data = PanoDescriptor {
            full_width: 4000.0,
            full_height: 2000.0,
            cropped_width: 2000.0,
            cropped_height: 1000.0,
            cropped_x: 1000.0,
            cropped_y: 500.0,
        };
        let b = build_buffer(2000, 1000, Some(&data), 2048).unwrap();
        assert_eq!(b.full_width, 2048);
        assert_eq!(b.full_height, 1024);
        assert_eq!(b.cropped_width, 1024);
        assert_eq!(b.cropped_height, 512);
        assert_eq!(b.cropped_x, 512);
        assert_eq!(b.cropped_y, 256);
        assert!(b.is_cropped());
    }

    #[test]
    fn malformed_metadata_fails() {
        let mut data = PanoDescriptor::full_image(100, 50);
        data.cropped_x = -1.0;
        assert!(build_buffer(100, 50, Some(&data), 64).is_err());

        data = PanoDescriptor::full_image(100, 50);
        data.full_height = f64::NAN;
        assert!(build_buffer(100, 50, Some(&data), 64).is_err());

        data = PanoDescriptor::full_image(100, 50);
        data.full_width = 0.0;
        assert!(build_buffer(100, 50, Some(&data), 64).is_err());

        data = PanoDescriptor::full_image(100, 50);
        data.cropped_x = 10.0;
        assert!(build_buffer(100, 50, Some(&data), 64).is_err());
    }

    #[test]
    fn unbounded_height_is_malformed() {
        let data = PanoDescriptor {
            full_width: 100.0,
            full_height: 1e7,
            cropped_width: 100.0,
            cropped_height: 50.0,
            cropped_x: 0.0,
            cropped_y: 0.0,
        };
        assert!(matches!(
            build_buffer(100, 50, Some(&data), 4096),
            Err(ViewerError::MalformedMetadata(_))
        ));

        let square = PanoDescriptor { full_height: 100.0, ..data };
        let b = build_buffer(100, 50, Some(&square), 4096).unwrap();
        assert_eq!((b.full_width, b.full_height), (100, 100));
    }

    #[test]
    fn tall_plain_image_over_texture_limit_fails() {
        assert!(matches!(build_buffer(10, 100, None, 64), Err(ViewerError::AssetLoad(_))));
        assert!(build_buffer(10, 60, None, 64).is_ok());
    }

    #[test]
    fn zero_sized_image_fails() {
        assert!(build_buffer(0, 10, None, 64).is_err());
    }

    #[test]
    fn xmp_attribute_form() {
        let d = PanoDescriptor::from_xmp(XMP_ATTR.as_bytes()).unwrap().unwrap();
        assert_eq!(d.full_width, 4000.0);
        assert_eq!(d.cropped_height, 1000.0);
        assert_eq!(d.cropped_x, 1000.0);
        assert_eq!(d.cropped_y, 500.0);
    }

    #[test]
    fn xmp_element_form() {
        let xmp = r#"<x:xmpmeta><rdf:Description>
            <GPano:FullPanoWidthPixels>8000</GPano:FullPanoWidthPixels>
            <GPano:FullPanoHeightPixels>4000</GPano:FullPanoHeightPixels>
            <GPano:CroppedAreaImageWidthPixels>8000</GPano:CroppedAreaImageWidthPixels>
            <GPano:CroppedAreaImageHeightPixels>2000</GPano:CroppedAreaImageHeightPixels>
            <GPano:CroppedAreaLeftPixels>0</GPano:CroppedAreaLeftPixels>
            <GPano:CroppedAreaTopPixels>1000</GPano:CroppedAreaTopPixels>
            </rdf:Description></x:xmpmeta>"#;
        let d = PanoDescriptor::from_xmp(xmp.as_bytes()).unwrap().unwrap();
        assert_eq!(d.full_height, 4000.0);
        assert_eq!(d.cropped_y, 1000.0);
    }

    #[test]
    fn xmp_absent_is_not_an_error() {
        assert_eq!(PanoDescriptor::from_xmp(b"\xff\xd8 plain jpeg").unwrap(), None);
        let no_gpano = b"<x:xmpmeta><rdf:Description dc:title=\"x\"/></x:xmpmeta>";
        assert_eq!(PanoDescriptor::from_xmp(no_gpano).unwrap(), None);
    }

    #[test]
    fn xmp_missing_field_is_malformed() {
        let xmp = r#"<x:xmpmeta GPano:FullPanoWidthPixels="10"></x:xmpmeta>"#;
        assert!(matches!(
            PanoDescriptor::from_xmp(xmp.as_bytes()),
            Err(ViewerError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn compose_places_crop_on_transparent_canvas() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255])));
        let b = PanoBuffer {
            full_width: 8,
            full_height: 4,
            cropped_width: 4,
            cropped_height: 2,
            cropped_x: 2,
            cropped_y: 1,
        };
        let canvas = b.compose(&src);
        assert_eq!(canvas.dimensions(), (8, 4));
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
        assert_eq!(*canvas.get_pixel(2, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(5, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(6, 2)[3], 0);
    }
}
