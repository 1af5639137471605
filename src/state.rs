use std::ops::RangeInclusive;

pub const BRIGHTNESS_RANGE: RangeInclusive<f32> = -1.0..=1.0;
pub const CONTRAST_RANGE: RangeInclusive<f32> = 0.25..=4.0;
pub const SATURATION_RANGE: RangeInclusive<f32> = 0.0..=2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Slider values fed to the color-controls filter.
///
/// Brightness is additive, contrast and saturation are multipliers. The
/// defaults leave an image unchanged.
pub struct FilterParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl FilterParams {
    /// Returns `true` when every value sits at its neutral default.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the first non-finite parameter, if any.
    pub fn first_non_finite(&self) -> Option<(&'static str, f32)> {
        [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
    }
}
