use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;

/// Side length both pose models expect their input squished to.
pub const INPUT_SIZE: u32 = 256;

/// Scale the frame to `size`x`size`, ignoring aspect ratio, and lay it out as
/// a `[1, size, size, 3]` tensor with channel values in `[0, 1]`.
pub fn nhwc_tensor(frame: &RgbImage, size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);
    let size = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, y as usize, x as usize, channel]] = pixel[channel] as f32 / 255.0;
        }
    }
    tensor
}

/// Same as [`nhwc_tensor`] but channels first, `[1, 3, size, size]`.
pub fn nchw_tensor(frame: &RgbImage, size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);
    let size = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
        }
    }
    tensor
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    #[test]
    fn nhwc_shape_and_values() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
        let tensor = nhwc_tensor(&frame, 4);
        assert_eq!(&[1, 4, 4, 3], tensor.shape());
        assert_eq!(1.0, tensor[[0, 2, 3, 0]]);
        assert_eq!(0.0, tensor[[0, 2, 3, 1]]);
        assert_eq!(0.2, tensor[[0, 2, 3, 2]]);
    }

    #[test]
    fn nchw_shape_and_values() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
        let tensor = nchw_tensor(&frame, 4);
        assert_eq!(&[1, 3, 4, 4], tensor.shape());
        assert_eq!(1.0, tensor[[0, 0, 2, 3]]);
        assert_eq!(0.0, tensor[[0, 1, 2, 3]]);
        assert_eq!(0.2, tensor[[0, 2, 2, 3]]);
    }

    #[test]
    fn frames_are_scaled_to_the_model_size() {
        let frame = RgbImage::from_pixel(640, 360, Rgb([128, 128, 128]));
        let tensor = nhwc_tensor(&frame, INPUT_SIZE);
        let size = INPUT_SIZE as usize;
        assert_eq!(&[1, size, size, 3], tensor.shape());
    }

    #[test]
    fn sigmoid_squashes_into_unit_range() {
        assert_eq!(0.5, sigmoid(0.0));
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
