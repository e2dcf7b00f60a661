use crate::error::{Error, Result};
use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;

/// Decodes an encoded image, sniffing the format from its bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| Error::DecodeFailed(e.to_string()))
}

/// Resizes to fill a `size`x`size` square, then returns a normalized
/// `(3, size, size)` f32 tensor.
pub fn to_tensor(
    image: &DynamicImage,
    size: usize,
    mean: &[f32; 3],
    std: &[f32; 3],
    device: &Device,
) -> candle_core::Result<Tensor> {
    let side = size as u32;
    let rgb = image
        .resize_to_fill(side, side, FilterType::Triangle)
        .to_rgb8();
    let data = rgb.into_raw();

    let pixels = Tensor::from_vec(data, (size, size, 3), device)?.permute((2, 0, 1))?;
    let mean = Tensor::new(mean, device)?.reshape((3, 1, 1))?;
    let std = Tensor::new(std, device)?.reshape((3, 1, 1))?;

    (pixels.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn normalizes_to_channel_first() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([255, 0, 51])));

        let tensor = to_tensor(&image, 8, &[0.5, 0.0, 0.0], &[0.5, 1.0, 0.2], &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, 8, 8]);

        let values = tensor.flatten_from(1).unwrap().to_vec2::<f32>().unwrap();
        assert!((values[0][0] - 1.0).abs() < 1e-5);
        assert!(values[1][0].abs() < 1e-5);
        assert!((values[2][0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(Error::DecodeFailed(_))
        ));
    }
}
