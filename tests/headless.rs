//! GPU round trips through the headless runner. Each test returns early when no
//! adapter is available (CI machines without a GPU or software rasterizer).

use image::{Rgba, RgbaImage};
use pixelate::{
    BlockSize, ComputeKernel, FrameImage, FrameOutcome, GpuContext, GpuScratchAllocator,
    OutputDescriptor, PassthroughReason, PixelateConfig, PixelateEffect, PixelateError,
    RenderContext, ScratchAllocator, ScreenEffect, ViewKind, headless, reference,
};

fn gpu() -> Option<GpuContext> {
    match GpuContext::headless(64, 64) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

/// A frame where neighbouring pixels always differ.
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8, 255])
    })
}

fn effect(block: u32) -> PixelateEffect {
    PixelateEffect::with_builtin_kernel(PixelateConfig::default().with_block_size(block)).unwrap()
}

#[test]
fn gpu_matches_cpu_reference() {
    let Some(gpu) = gpu() else { return };
    let image = gradient(97, 61);

    for block in [2, 3, 8, 40] {
        let mut effect = effect(block);
        let (result, outcome) = headless::process_image(&gpu, &mut effect, &image).unwrap();
        assert!(outcome.is_pixelated(), "block {block}: {outcome:?}");
        assert_eq!(result, reference::pixelate(&image, BlockSize::new(block)), "block {block}");
    }
}

#[test]
fn partial_edge_blocks_are_covered() {
    let Some(gpu) = gpu() else { return };
    let image = gradient(801, 600);
    let mut effect = effect(40);

    let (result, outcome) = headless::process_image(&gpu, &mut effect, &image).unwrap();
    let FrameOutcome::Pixelated(groups) = outcome else {
        panic!("expected a dispatch, got {outcome:?}");
    };
    assert_eq!((groups.x, groups.y), (3, 2));

    // Column 800 is a 1px-wide block sampling itself.
    assert_eq!(result.get_pixel(800, 0), image.get_pixel(800, 0));
    assert_eq!(result.get_pixel(800, 599), image.get_pixel(800, 560));
    assert_eq!(result, reference::pixelate(&image, BlockSize::new(40)));
}

#[test]
fn missing_kernel_is_bit_exact_passthrough() {
    let Some(gpu) = gpu() else { return };
    let image = gradient(33, 17);
    let mut effect = PixelateEffect::new(PixelateConfig::default(), None);

    let (result, outcome) = headless::process_image(&gpu, &mut effect, &image).unwrap();
    assert_eq!(outcome, FrameOutcome::Passthrough(PassthroughReason::Disabled));
    assert_eq!(result, image);
}

#[test]
fn unknown_entry_point_passes_through() {
    let Some(gpu) = gpu() else { return };
    let image = gradient(20, 20);
    let mut effect = PixelateEffect::new(
        PixelateConfig::default().with_kernel_name("DoesNotExist"),
        Some(ComputeKernel::builtin().unwrap()),
    );

    let (result, outcome) = headless::process_image(&gpu, &mut effect, &image).unwrap();
    assert_eq!(outcome, FrameOutcome::Passthrough(PassthroughReason::KernelUnavailable));
    assert_eq!(result, image);

    // Renaming back to a real entry point recovers on the next frame.
    effect.set_kernel_name(pixelate::DEFAULT_KERNEL_NAME);
    let (_, outcome) = headless::process_image(&gpu, &mut effect, &image).unwrap();
    assert!(outcome.is_pixelated());
}

#[test]
fn preview_views_and_bypass_skip_the_effect() {
    let Some(gpu) = gpu() else { return };
    let image = gradient(24, 24);
    let mut effect = effect(4);

    let (result, outcome) =
        headless::process_image_as(&gpu, &mut effect, &image, ViewKind::Preview).unwrap();
    assert_eq!(outcome, FrameOutcome::Passthrough(PassthroughReason::PreviewView));
    assert_eq!(result, image);

    effect.set_bypass(true);
    let (result, outcome) = headless::process_image(&gpu, &mut effect, &image).unwrap();
    assert_eq!(outcome, FrameOutcome::Passthrough(PassthroughReason::Bypassed));
    assert_eq!(result, image);
}

#[test]
fn scratch_follows_resolution_changes() {
    let Some(gpu) = gpu() else { return };
    let mut effect = effect(3);

    let small = gradient(80, 60);
    let large = gradient(192, 108);
    for _ in 0..3 {
        headless::process_image(&gpu, &mut effect, &small).unwrap();
    }
    assert_eq!(effect.scratch_reallocations(), 1);

    headless::process_image(&gpu, &mut effect, &large).unwrap();
    headless::process_image(&gpu, &mut effect, &large).unwrap();
    assert_eq!(effect.scratch_reallocations(), 2);
    assert_eq!(effect.scratch_size(), Some((192, 108)));
}

#[test]
fn oversized_image_is_an_error_not_a_panic() {
    let Some(gpu) = gpu() else { return };
    let max = gpu.device.limits().max_texture_dimension_2d;
    let image = RgbaImage::from_pixel(max + 1, 2, Rgba([10, 20, 30, 255]));
    let mut effect = effect(4);

    let result = headless::process_image(&gpu, &mut effect, &image);
    assert!(matches!(result, Err(PixelateError::Allocation { .. })), "{:?}", result.err());

    // 9000 px exceeds the default 8192 limit the headless device requests.
    let wide = RgbaImage::from_pixel(9000, 2, Rgba([0, 0, 0, 255]));
    assert!(headless::process_image(&gpu, &mut effect, &wide).is_err());

    // The effect is still usable afterwards.
    let (_, outcome) = headless::process_image(&gpu, &mut effect, &gradient(16, 16)).unwrap();
    assert!(outcome.is_pixelated());
}

#[test]
fn scratch_allocation_failure_is_reported() {
    let Some(gpu) = gpu() else { return };
    let result = GpuScratchAllocator::new(&gpu).allocate(100_000, 4);
    assert!(matches!(
        result,
        Err(PixelateError::Allocation { width: 100_000, height: 4, .. })
    ));
}

fn render_target(gpu: &GpuContext, label: &str, width: u32, height: u32) -> wgpu::Texture {
    gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: pixelate::HEADLESS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

#[test]
fn two_applications_in_one_submission_keep_their_block_sizes() {
    let Some(gpu) = gpu() else { return };
    let (width, height) = (48, 32);
    let image = gradient(width, height);

    let source = render_target(&gpu, "source", width, height);
    gpu.queue.write_texture(
        source.as_image_copy(),
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        source.size(),
    );
    let fine = render_target(&gpu, "fine", width, height);
    let coarse = render_target(&gpu, "coarse", width, height);
    let views: Vec<_> = [&source, &fine, &coarse]
        .iter()
        .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
        .collect();

    let mut effect = effect(2);
    effect
        .prepare(&gpu, &OutputDescriptor::new(width, height, pixelate::HEADLESS_FORMAT))
        .unwrap();

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let mut ctx = RenderContext {
            gpu: &gpu,
            encoder: &mut encoder,
            time: 0.0,
            view: ViewKind::Game,
        };
        let src = FrameImage::new(&source, &views[0]);
        assert!(effect.apply(&mut ctx, src, FrameImage::new(&fine, &views[1])).is_pixelated());
        effect.set_block_size(8);
        assert!(effect.apply(&mut ctx, src, FrameImage::new(&coarse, &views[2])).is_pixelated());
    }
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let read = |texture: &wgpu::Texture| {
        RgbaImage::from_raw(width, height, headless::read_rgba(&gpu, texture, width, height).unwrap()).unwrap()
    };
    assert_eq!(read(&fine), reference::pixelate(&image, BlockSize::new(2)));
    assert_eq!(read(&coarse), reference::pixelate(&image, BlockSize::new(8)));
}
