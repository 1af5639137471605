//! Color-controls filter graph.
//!
//! A bitmap is converted into a [`FilterInput`], wrapped by a single
//! [`ColorControls`] node, evaluated into a deferred [`FilterOutput`], and
//! only turned into pixels when a [`RenderContext`] renders it.

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

use super::{color_controls, gpu_pipeline};
use crate::state::FilterParams;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("image has no pixel data to filter ({width}x{height})")]
    EmptyExtent { width: u32, height: u32 },
    #[error("{name} is not a finite value ({value})")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("no GPU render context is available")]
    GpuUnavailable,
    #[error("render failed: {0}")]
    Render(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderBackend {
    /// GPU when an adapter is available, CPU otherwise.
    Auto,
    Cpu,
    Gpu,
}

impl RenderBackend {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => RenderBackend::Cpu,
            "gpu" | "wgpu" => RenderBackend::Gpu,
            _ => RenderBackend::Auto,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderBackend::Auto => "auto",
            RenderBackend::Cpu => "cpu",
            RenderBackend::Gpu => "gpu",
        }
    }
}

/// Pixel data lifted out of a bitmap, ready to feed a filter node.
#[derive(Clone, Debug)]
pub struct FilterInput {
    pixels: RgbaImage,
}

impl FilterInput {
    pub fn from_image(img: &DynamicImage) -> Result<Self, FilterError> {
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(FilterError::EmptyExtent { width, height });
        }
        Ok(Self {
            pixels: img.to_rgba8(),
        })
    }

    pub fn extent(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

pub struct ColorControls {
    input: FilterInput,
    params: FilterParams,
}

impl ColorControls {
    pub fn new(input: FilterInput, params: FilterParams) -> Self {
        Self { input, params }
    }

    /// Evaluates the node into a deferred output. No pixels are touched yet.
    pub fn output(self) -> Result<FilterOutput, FilterError> {
        if let Some((name, value)) = self.params.first_non_finite() {
            return Err(FilterError::InvalidParameter { name, value });
        }
        Ok(FilterOutput {
            input: self.input,
            params: self.params,
        })
    }
}

/// A filter recipe that has not been rendered yet.
pub struct FilterOutput {
    input: FilterInput,
    params: FilterParams,
}

impl FilterOutput {
    pub fn extent(&self) -> (u32, u32) {
        self.input.extent()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderContext {
    backend: RenderBackend,
}

impl RenderContext {
    pub fn new(backend: RenderBackend) -> Self {
        Self { backend }
    }

    /// Renders `output` over its full extent.
    pub fn create_image(&self, output: &FilterOutput) -> Result<RgbaImage, FilterError> {
        let rendered = self.render_pixels(output)?;
        if rendered.dimensions() != output.extent() {
            return Err(FilterError::Render(format!(
                "rendered {:?} but the source extent is {:?}",
                rendered.dimensions(),
                output.extent()
            )));
        }
        Ok(rendered)
    }

    fn render_pixels(&self, output: &FilterOutput) -> Result<RgbaImage, FilterError> {
        let src = &output.input.pixels;
        match self.backend {
            RenderBackend::Cpu => Ok(color_controls::apply(src, &output.params)),
            RenderBackend::Gpu => gpu_pipeline::render(src, &output.params),
            RenderBackend::Auto => match gpu_pipeline::render(src, &output.params) {
                Ok(img) => Ok(img),
                Err(FilterError::GpuUnavailable) => Ok(color_controls::apply(src, &output.params)),
                Err(err) => {
                    tracing::debug!(%err, "gpu render failed; rendering on cpu");
                    Ok(color_controls::apply(src, &output.params))
                }
            },
        }
    }
}

/// Runs `img` through the color-controls graph.
pub fn render(
    img: &DynamicImage,
    params: &FilterParams,
    ctx: &RenderContext,
) -> Result<DynamicImage, FilterError> {
    let input = FilterInput::from_image(img)?;
    let output = ColorControls::new(input, *params).output()?;
    let rendered = ctx.create_image(&output)?;
    Ok(DynamicImage::ImageRgba8(rendered))
}

/// Like [`render`], but logs any failure and hands back the unfiltered image.
pub fn image_by_filtering(
    img: &DynamicImage,
    params: &FilterParams,
    ctx: &RenderContext,
) -> DynamicImage {
    match render(img, params, ctx) {
        Ok(out) => out,
        Err(err) => {
            tracing::warn!(%err, "filtering failed; showing the unfiltered image");
            img.clone()
        }
    }
}
