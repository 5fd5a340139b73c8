use std::io::Cursor;

use image::{io::Reader, GrayImage, ImageFormat, Luma, RgbaImage};

use crate::{Error, Result};

/// 词云掩模, 只接受 PNG
#[derive(Clone, Debug)]
pub struct MaskImage {
    rgba: RgbaImage,
}

impl MaskImage {
    /// 解码前先看尺寸, 超过 max_pixels 的不解码
    pub fn from_png_bytes(bytes: &[u8], max_pixels: u64) -> Result<Self> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => {}
            Ok(other) => return Err(Error::invalid_image(format!("{other:?}"))),
            Err(e) => return Err(Error::invalid_image(e.to_string())),
        }

        let (width, height) = Reader::with_format(Cursor::new(bytes), ImageFormat::Png)
            .into_dimensions()
            .map_err(|e| Error::invalid_image(e.to_string()))?;
        if width as u64 * height as u64 > max_pixels {
            return Err(Error::invalid_image(format!(
                "{width}x{height} exceeds {max_pixels} pixels"
            )));
        }

        let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| Error::invalid_image(e.to_string()))?
            .to_rgba8();

        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(Error::invalid_image("empty image"));
        }

        Ok(MaskImage { rgba })
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// 白色或全透明的像素不能放字, 标为 1
    pub fn to_occupancy(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b, a] = self.rgba.get_pixel(x, y).0;
            let blocked = a == 0 || (r == 255 && g == 255 && b == 255);
            Luma([blocked as u8])
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, GrayImage, ImageOutputFormat, Rgba, RgbaImage};

    use super::MaskImage;
    use crate::Error;

    const LIMIT: u64 = 4_000_000;

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_png_to_rgba() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let mask = MaskImage::from_png_bytes(&png_bytes(img), LIMIT).unwrap();

        assert_eq!((mask.width(), mask.height()), (4, 3));
        assert_eq!(mask.rgba().get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn jpeg_is_rejected() {
        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
        let err = MaskImage::from_png_bytes(&jpeg_header, LIMIT).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            MaskImage::from_png_bytes(b"definitely not an image", LIMIT),
            Err(Error::InvalidImage(_))
        ));
        assert!(matches!(
            MaskImage::from_png_bytes(&[], LIMIT),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let bytes = png_bytes(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let err = MaskImage::from_png_bytes(&bytes[..bytes.len() / 2], LIMIT).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn white_and_transparent_pixels_are_blocked() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        img.put_pixel(2, 0, Rgba([0, 0, 0, 0]));

        let occupancy = MaskImage::from_png_bytes(&png_bytes(img), LIMIT)
            .unwrap()
            .to_occupancy();

        assert_eq!(occupancy.as_raw(), &vec![0, 1, 1]);
    }

    #[test]
    fn oversized_mask_is_rejected_before_decoding() {
        // 2100x2000 的空白灰度图压缩后很小, 解码后超过默认上限
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::new(2100, 2000))
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        assert!(bytes.len() < 1024 * 1024);

        let err = MaskImage::from_png_bytes(&bytes, LIMIT).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(msg) if msg.contains("2100x2000")));
    }

    #[test]
    fn mask_at_the_limit_is_accepted() {
        let bytes = png_bytes(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])));

        assert!(MaskImage::from_png_bytes(&bytes, 100).is_ok());
        assert!(matches!(
            MaskImage::from_png_bytes(&bytes, 99),
            Err(Error::InvalidImage(_))
        ));
    }
}
