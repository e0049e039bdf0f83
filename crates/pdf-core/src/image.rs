//! Image handling for PDF documents

use crate::{PdfError, Result};
use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray")
    pub color_space: String,
    /// Bits per component
    pub bits_per_component: u8,
    /// PDF filter ("FlateDecode")
    pub filter: String,
    /// Raw image data (compressed)
    pub data: Vec<u8>,
    /// Compressed 8-bit alpha channel, embedded as a DeviceGray soft mask
    pub soft_mask: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Decode an encoded bitmap (PNG or JPEG) and build an XObject
    pub fn from_encoded(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)?;
        Self::from_image(&image)
    }

    /// Create XObject from a decoded image
    ///
    /// Color samples are stored as Flate-compressed RGB (or gray). When the
    /// image carries an alpha channel with any non-opaque pixel, the alpha
    /// samples become a soft mask so transparent areas stay transparent on
    /// the page.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(PdfError::ImageError("Image has no pixels".to_string()));
        }

        let color = image.color();
        let (raw_data, color_space) = if color.has_color() {
            (image.to_rgb8().into_raw(), "DeviceRGB")
        } else {
            (image.to_luma8().into_raw(), "DeviceGray")
        };

        let soft_mask = if color.has_alpha() {
            let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p[3]).collect();
            if alpha.iter().all(|&a| a == u8::MAX) {
                None
            } else {
                Some(deflate(&alpha)?)
            }
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: deflate(&raw_data)?,
            soft_mask,
        })
    }

    /// Convert to lopdf Stream object (without the soft mask reference)
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        dict.set("Length", self.data.len() as i64);

        Stream::new(dict, self.data.clone())
    }

    /// Add the image (and its soft mask, if any) to a document
    pub(crate) fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut stream = self.to_pdf_stream();

        if let Some(mask) = &self.soft_mask {
            let mut mask_dict = Dictionary::new();
            mask_dict.set("Type", Object::Name(b"XObject".to_vec()));
            mask_dict.set("Subtype", Object::Name(b"Image".to_vec()));
            mask_dict.set("Width", self.width as i64);
            mask_dict.set("Height", self.height as i64);
            mask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            mask_dict.set("BitsPerComponent", 8i64);
            mask_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            mask_dict.set("Length", mask.len() as i64);
            let mask_id = doc.add_object(Stream::new(mask_dict, mask.clone()));
            stream.dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(stream)
    }
}

/// Compress bytes with zlib for a FlateDecode stream
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Generate operators to draw image at position
///
/// # Arguments
/// * `image_name` - Image resource name (e.g., "Im1")
/// * `x` - X coordinate in points
/// * `y` - Y coordinate in points (from bottom, PDF coordinates)
/// * `width` - Image width in points
/// * `height` - Image height in points
///
/// # Returns
/// PDF content stream operators as bytes
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    // q / scale+translate / draw / Q
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn inflate(data: &[u8]) -> Vec<u8> {
        use std::io::Read;
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_generate_image_operators() {
        let ops = generate_image_operators("Im1", 100.0, 200.0, 50.0, 75.0);
        let ops_str = String::from_utf8(ops).unwrap();

        assert_eq!(ops_str, "q\n50 0 0 75 100 200 cm\n/Im1 Do\nQ\n");
    }

    #[test]
    fn test_from_encoded_rgb_png() {
        let png = encode_png(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            4,
            2,
            Rgb([10, 20, 30]),
        )));

        let xobject = ImageXObject::from_encoded(&png).unwrap();
        assert_eq!((xobject.width, xobject.height), (4, 2));
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.filter, "FlateDecode");
        assert!(xobject.soft_mask.is_none());
        assert_eq!(inflate(&xobject.data).len(), 4 * 2 * 3);
        assert_eq!(&inflate(&xobject.data)[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_transparent_png_gets_soft_mask() {
        let mut rgba = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(0, 0, Rgba([0, 0, 255, 255]));
        let png = encode_png(DynamicImage::ImageRgba8(rgba));

        let xobject = ImageXObject::from_encoded(&png).unwrap();
        let mask = inflate(xobject.soft_mask.as_ref().unwrap());
        assert_eq!(mask, vec![255, 0, 0, 0]);
    }

    #[test]
    fn test_opaque_rgba_has_no_soft_mask() {
        let rgba = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let xobject = ImageXObject::from_image(&DynamicImage::ImageRgba8(rgba)).unwrap();
        assert!(xobject.soft_mask.is_none());
    }

    #[test]
    fn test_grayscale_image() {
        let gray = image::GrayImage::from_pixel(5, 1, image::Luma([128]));
        let xobject = ImageXObject::from_image(&DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(xobject.color_space, "DeviceGray");
        assert_eq!(inflate(&xobject.data), vec![128; 5]);
    }

    #[test]
    fn test_invalid_image_bytes() {
        let result = ImageXObject::from_encoded(b"definitely not an image");
        assert!(matches!(result, Err(PdfError::ImageError(_))));
    }

    #[test]
    fn test_image_xobject_to_pdf_stream() {
        let xobject = ImageXObject {
            width: 100,
            height: 50,
            color_space: "DeviceRGB".to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: vec![1, 2, 3, 4, 5],
            soft_mask: None,
        };

        let stream = xobject.to_pdf_stream();
        let dict = stream.dict;

        assert_eq!(dict.get(b"Type").unwrap().as_name().unwrap(), b"XObject");
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 100);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), 50);
        assert_eq!(
            dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
        assert_eq!(dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(), 8);
        assert_eq!(stream.content, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_embed_links_soft_mask() {
        let mut rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 10]));
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 10]));
        let xobject = ImageXObject::from_image(&DynamicImage::ImageRgba8(rgba)).unwrap();

        let mut doc = Document::with_version("1.7");
        let id = xobject.embed(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(
            mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }
}
