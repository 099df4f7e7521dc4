use image::imageops::{self, FilterType};
use image::DynamicImage;

use crate::model::architecture::{INPUT_CHANNELS, INPUT_SIZE};
use crate::{Result, Tensor, Timer};

/// Decodes uploaded image bytes into a `[1, 224, 224, 3]` RGB tensor scaled
/// to `[0, 1]`.
pub fn preprocess_image(data: &[u8]) -> Result<Tensor> {
    let mut t = Timer::new_start("Load image from memory");
    let image = image::load_from_memory(data)?;
    t.stop();

    image_to_tensor(&image)
}

/// Resizes a decoded image to the classifier input, ignoring aspect ratio.
pub fn image_to_tensor(image: &DynamicImage) -> Result<Tensor> {
    let mut t = Timer::new_start("Resizing image");

    let rgb = image.to_rgb8();
    let size = INPUT_SIZE as u32;
    let resized = imageops::resize(&rgb, size, size, FilterType::Triangle);

    let raw: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|x| x as f32 / 255f32)
        .collect();

    t.stop();

    Tensor::from_vec(raw, &[1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use image::{ImageBuffer, ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn encode(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let buffer = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn any_size_becomes_224_square() {
        for &(w, h) in &[(1, 1), (50, 300), (224, 224), (640, 480)] {
            let tensor = preprocess_image(&encode(w, h, ImageOutputFormat::Png)).unwrap();
            assert_eq!(tensor.shape(), &[1, 224, 224, 3], "source {}x{}", w, h);
        }
    }

    #[test]
    fn values_are_normalised() {
        let tensor = preprocess_image(&encode(32, 17, ImageOutputFormat::Jpeg(90))).unwrap();
        assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn channels_stay_in_rgb_order() {
        let buffer = ImageBuffer::from_pixel(8, 8, Rgb([255u8, 0, 51]));
        let tensor = image_to_tensor(&DynamicImage::ImageRgb8(buffer)).unwrap();

        let data = tensor.data();
        assert!((data[[0, 100, 100, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(data[[0, 100, 100, 1]], 0.0);
        assert!((data[[0, 100, 100, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = preprocess_image(b"not an image").unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }
}
