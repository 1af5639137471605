use image::RgbaImage;
use rayon::prelude::*;

use crate::state::FilterParams;

// ITU-R BT.709 luma coefficients
pub const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Applies saturation, brightness, and contrast (in that order) to
/// normalized RGB. The result is not clamped.
pub fn adjust_rgb(rgb: [f32; 3], params: &FilterParams) -> [f32; 3] {
    let luma = LUMA[0] * rgb[0] + LUMA[1] * rgb[1] + LUMA[2] * rgb[2];
    rgb.map(|c| {
        let c = luma + (c - luma) * params.saturation;
        let c = c + params.brightness;
        (c - 0.5) * params.contrast + 0.5
    })
}

/// CPU render of the color-controls node. Alpha is left untouched.
pub fn apply(src: &RgbaImage, params: &FilterParams) -> RgbaImage {
    let mut out = src.clone();
    out.par_chunks_mut(4).for_each(|px| {
        let rgb = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ];
        let adjusted = adjust_rgb(rgb, params);
        for c in 0..3 {
            px[c] = (adjusted[c].clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgba, RgbaImage};

    use crate::state::FilterParams;

    use super::apply;

    fn one_pixel(px: [u8; 4]) -> RgbaImage {
        ImageBuffer::from_pixel(1, 1, Rgba(px))
    }

    fn first(img: &RgbaImage) -> [u8; 4] {
        img.get_pixel(0, 0).0
    }

    #[test]
    fn positive_brightness_lifts_every_channel() {
        let params = FilterParams {
            brightness: 0.2,
            ..FilterParams::default()
        };
        let out = first(&apply(&one_pixel([100, 50, 20, 255]), &params));
        assert!(out[0] > 100 && out[1] > 50 && out[2] > 20);
    }

    #[test]
    fn zero_saturation_produces_gray() {
        let params = FilterParams {
            saturation: 0.0,
            ..FilterParams::default()
        };
        let out = first(&apply(&one_pixel([200, 40, 90, 255]), &params));
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
    }

    #[test]
    fn higher_contrast_pushes_away_from_mid_gray() {
        let params = FilterParams {
            contrast: 2.0,
            ..FilterParams::default()
        };
        let dark = first(&apply(&one_pixel([64, 64, 64, 255]), &params));
        let bright = first(&apply(&one_pixel([192, 192, 192, 255]), &params));
        assert!(dark[0] < 64);
        assert!(bright[0] > 192);
    }

    #[test]
    fn alpha_is_preserved() {
        let params = FilterParams {
            brightness: 1.0,
            contrast: 3.0,
            saturation: 2.0,
        };
        let out = first(&apply(&one_pixel([10, 20, 30, 77]), &params));
        assert_eq!(out[3], 77);
        assert_eq!(out[0], 255);
    }
}
