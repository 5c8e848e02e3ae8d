//! The scratch texture the kernel writes into, kept at the frame's resolution.
//!
//! [`ScratchBuffer`] owns at most one target and compares its size against the
//! requested size on every call to [`ensure`](ScratchBuffer::ensure). A mismatch,
//! including the very first call, drops the old target and asks a
//! [`ScratchAllocator`] for a new one. Matching sizes reuse the existing target,
//! so steady-state frames allocate nothing.
//!
//! The allocator is a trait so the lifecycle can be driven without a GPU; the
//! effect uses [`GpuScratchAllocator`].

use crate::error::{PixelateError, PixelateResult};
use crate::gpu::GpuContext;

/// Format of the scratch texture. Storage-writable on every wgpu backend and
/// precise enough to round-trip 8-bit colour.
pub const SCRATCH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Creates scratch targets of a given size.
pub trait ScratchAllocator {
    type Target;

    fn allocate(&mut self, width: u32, height: u32) -> PixelateResult<Self::Target>;
}

struct Slot<T> {
    width: u32,
    height: u32,
    target: T,
}

/// A resolution-tracking scratch target.
pub struct ScratchBuffer<T> {
    slot: Option<Slot<T>>,
    reallocations: u64,
}

impl<T> Default for ScratchBuffer<T> {
    fn default() -> Self {
        Self {
            slot: None,
            reallocations: 0,
        }
    }
}

impl<T> ScratchBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the target is `width x height`, reallocating if it is not.
    ///
    /// On allocation failure the slot is left empty, so the next call retries.
    pub fn ensure<A>(&mut self, allocator: &mut A, width: u32, height: u32) -> PixelateResult<&T>
    where
        A: ScratchAllocator<Target = T>,
    {
        let matches = matches!(&self.slot, Some(slot) if slot.width == width && slot.height == height);

        if !matches {
            // Release before allocating so both never coexist on the GPU.
            self.slot = None;
            let target = allocator.allocate(width, height)?;
            self.reallocations += 1;
            log::debug!("scratch target allocated at {}x{}", width, height);
            self.slot = Some(Slot {
                width,
                height,
                target,
            });
        }

        self.slot
            .as_ref()
            .map(|slot| &slot.target)
            .ok_or_else(|| PixelateError::Allocation {
                label: "scratch target",
                width,
                height,
                reason: "slot empty after allocation".to_string(),
            })
    }

    /// The current target, if one is allocated.
    pub fn get(&self) -> Option<&T> {
        self.slot.as_ref().map(|slot| &slot.target)
    }

    /// Dimensions of the current target.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.slot.as_ref().map(|slot| (slot.width, slot.height))
    }

    /// How many times a target has been (re)allocated.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    /// Drop the current target.
    pub fn release(&mut self) {
        self.slot = None;
    }
}

/// A GPU scratch texture with a nearest-neighbour sampler.
pub struct ScratchTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Nearest filtering keeps hard block edges when the target is blitted.
    pub sampler: wgpu::Sampler,
}

/// Allocates [`ScratchTexture`]s on a device.
///
/// Creation runs inside out-of-memory and validation error scopes, so failures
/// surface as [`PixelateError::Allocation`] rather than a device panic.
pub struct GpuScratchAllocator<'a> {
    gpu: &'a GpuContext,
}

impl<'a> GpuScratchAllocator<'a> {
    pub fn new(gpu: &'a GpuContext) -> Self {
        Self { gpu }
    }
}

impl ScratchAllocator for GpuScratchAllocator<'_> {
    type Target = ScratchTexture;

    fn allocate(&mut self, width: u32, height: u32) -> PixelateResult<ScratchTexture> {
        let device = &self.gpu.device;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pixelate Scratch"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCRATCH_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        if let Some(err) = out_of_memory.or(validation) {
            return Err(PixelateError::Allocation {
                label: "scratch target",
                width,
                height,
                reason: err.to_string(),
            });
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Pixelate Scratch Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(ScratchTexture {
            texture,
            view,
            sampler,
        })
    }
}
