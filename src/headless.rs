//! Run a [`ScreenEffect`] over a CPU image without a window.
//!
//! The image is uploaded to an `Rgba8Unorm` texture, the effect writes a second
//! texture of the same size, and the result is read back with row padding
//! stripped. This is the host behind `pixelate image` and the GPU integration
//! tests.

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::effect::{FrameOutcome, OutputDescriptor, PassthroughReason, ScreenEffect};
use crate::error::{PixelateError, PixelateResult};
use crate::gpu::{GpuContext, HEADLESS_FORMAT};
use crate::render_graph::{FrameImage, RenderContext, ViewKind};

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a `width`-pixel readback, rounded up to the copy row alignment (256 bytes).
fn padded_bytes_per_row(width: u32) -> u32 {
    (width * BYTES_PER_PIXEL).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Reject frames larger than the device's 2D texture limit.
fn check_dimensions(width: u32, height: u32, max_dimension: u32) -> PixelateResult<()> {
    if width > max_dimension || height > max_dimension {
        return Err(PixelateError::Allocation {
            label: "headless frame",
            width,
            height,
            reason: format!("exceeds the device limit of {}px per side", max_dimension),
        });
    }
    Ok(())
}

/// Create the source (filled from `image`) and destination textures inside
/// out-of-memory and validation error scopes.
fn create_frames(gpu: &GpuContext, image: &RgbaImage) -> PixelateResult<(wgpu::Texture, wgpu::Texture)> {
    let (width, height) = image.dimensions();
    check_dimensions(width, height, gpu.device.limits().max_texture_dimension_2d)?;

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

    let source = gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some("Headless Source"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HEADLESS_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        image.as_raw(),
    );

    let destination = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Destination"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HEADLESS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let validation = pollster::block_on(gpu.device.pop_error_scope());
    let out_of_memory = pollster::block_on(gpu.device.pop_error_scope());

    if let Some(err) = out_of_memory.or(validation) {
        return Err(PixelateError::Allocation {
            label: "headless frame",
            width,
            height,
            reason: err.to_string(),
        });
    }
    Ok((source, destination))
}

/// Apply `effect` to `image` as a game view.
pub fn process_image<E: ScreenEffect>(
    gpu: &GpuContext,
    effect: &mut E,
    image: &RgbaImage,
) -> PixelateResult<(RgbaImage, FrameOutcome)> {
    process_image_as(gpu, effect, image, ViewKind::Game)
}

/// Apply `effect` to `image` as if rendering a view of kind `view`.
pub fn process_image_as<E: ScreenEffect>(
    gpu: &GpuContext,
    effect: &mut E,
    image: &RgbaImage,
    view: ViewKind,
) -> PixelateResult<(RgbaImage, FrameOutcome)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Ok((image.clone(), FrameOutcome::Passthrough(PassthroughReason::EmptyFrame)));
    }

    let (source, destination) = create_frames(gpu, image)?;
    let source_view = source.create_view(&wgpu::TextureViewDescriptor::default());
    let destination_view = destination.create_view(&wgpu::TextureViewDescriptor::default());

    let source_frame = FrameImage::new(&source, &source_view);
    let destination_frame = FrameImage::new(&destination, &destination_view);

    if let Err(err) = effect.prepare(gpu, &OutputDescriptor::of(&destination_frame)) {
        log::debug!("prepare reported: {}", err);
    }

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Headless Encoder"),
        });

    let outcome = {
        let mut ctx = RenderContext {
            gpu,
            encoder: &mut encoder,
            time: 0.0,
            view,
        };
        effect.apply(&mut ctx, source_frame, destination_frame)
    };

    gpu.queue.submit(std::iter::once(encoder.finish()));

    let pixels = read_rgba(gpu, &destination, width, height)?;
    let result = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| PixelateError::readback("readback size does not match image"))?;

    Ok((result, outcome))
}

/// Copy an `Rgba8Unorm` texture back to tightly packed rows.
pub fn read_rgba(gpu: &GpuContext, texture: &wgpu::Texture, width: u32, height: u32) -> PixelateResult<Vec<u8>> {
    let tight_bpr = (width * BYTES_PER_PIXEL) as usize;
    let padded_bpr = padded_bytes_per_row(width);

    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size: padded_bpr as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(PixelateError::readback)?;
    receiver
        .recv()
        .map_err(|_| PixelateError::readback("map_async callback dropped"))?
        .map_err(PixelateError::readback)?;

    let data = slice.get_mapped_range();
    let mut tight = Vec::with_capacity(tight_bpr * height as usize);
    for row in data.chunks_exact(padded_bpr as usize) {
        tight.extend_from_slice(&row[..tight_bpr]);
    }
    drop(data);
    staging.unmap();

    Ok(tight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(801), 3328);
    }

    #[test]
    fn oversized_frames_are_rejected() {
        assert!(check_dimensions(8192, 8192, 8192).is_ok());
        assert!(matches!(
            check_dimensions(9000, 2, 8192),
            Err(PixelateError::Allocation { width: 9000, height: 2, .. })
        ));
        assert!(check_dimensions(2, 8193, 8192).is_err());
    }
}
