//! Compute kernel loading, entry point resolution and dispatch.
//!
//! A [`ComputeKernel`] is a WGSL module reflected with naga at load time, so
//! entry points can be looked up by name and their declared workgroup size read
//! without touching the GPU. [`ComputeKernel::resolve`] turns one entry point
//! into a [`ResolvedKernel`]: a compute pipeline created once and reused every
//! frame.
//!
//! # Kernel contract
//!
//! ```wgsl
//! struct Params {
//!     block_size: u32,
//!     result_width: u32,
//!     result_height: u32,
//!     _padding: u32,
//! }
//! @group(0) @binding(0) var<uniform> params: Params;
//! @group(0) @binding(1) var source_frame: texture_2d<f32>;
//! @group(0) @binding(2) var result_frame: texture_storage_2d<rgba16float, write>;
//! ```
//!
//! The kernel runs one invocation per block and must bounds-check its writes
//! against `result_width`/`result_height`.

use std::path::Path;

use wgpu::util::DeviceExt;

use crate::dispatch::DispatchSize;
use crate::error::{PixelateError, PixelateResult};
use crate::gpu::GpuContext;
use crate::scratch::SCRATCH_FORMAT;

/// Entry point invoked when no other name is configured.
pub const DEFAULT_KERNEL_NAME: &str = "Pixelate";

/// WGSL source of the built-in pixelation kernel.
pub const PIXELATE_WGSL: &str = include_str!("shaders/pixelate.wgsl");

/// Parameters uploaded to the kernel before each dispatch.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub block_size: u32,
    pub result_width: u32,
    pub result_height: u32,
    pub _padding: u32,
}

impl KernelParams {
    pub fn new(block_size: u32, result_width: u32, result_height: u32) -> Self {
        Self {
            block_size,
            result_width,
            result_height,
            _padding: 0,
        }
    }
}

/// A compute entry point found in a kernel module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelEntry {
    name: String,
    workgroup_size: [u32; 3],
}

impl KernelEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared `@workgroup_size` as `[x, y, z]`.
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }
}

#[derive(Debug, Clone)]
struct EntryInfo {
    name: String,
    stage: naga::ShaderStage,
    workgroup_size: [u32; 3],
}

/// A WGSL kernel module with its entry points reflected.
#[derive(Debug, Clone)]
pub struct ComputeKernel {
    label: String,
    source: String,
    entries: Vec<EntryInfo>,
}

impl ComputeKernel {
    /// Parse WGSL source and record its entry points.
    pub fn from_wgsl(label: impl Into<String>, source: impl Into<String>) -> PixelateResult<Self> {
        let label = label.into();
        let source = source.into();

        let module = naga::front::wgsl::parse_str(&source)
            .map_err(|e| PixelateError::KernelParse(e.emit_to_string(&source)))?;

        let entries = module
            .entry_points
            .iter()
            .map(|ep| EntryInfo {
                name: ep.name.clone(),
                stage: ep.stage,
                workgroup_size: ep.workgroup_size,
            })
            .collect();

        Ok(Self {
            label,
            source,
            entries,
        })
    }

    /// The kernel shipped with the crate (`shaders/pixelate.wgsl`).
    pub fn builtin() -> PixelateResult<Self> {
        Self::from_wgsl("pixelate.wgsl", PIXELATE_WGSL)
    }

    /// Load a kernel from a WGSL file.
    pub fn from_file(path: impl AsRef<Path>) -> PixelateResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Self::from_wgsl(path.display().to_string(), source)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of all entry points in the module, in declaration order.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Look up a compute entry point by name.
    pub fn find_kernel(&self, name: &str) -> PixelateResult<KernelEntry> {
        let info = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| PixelateError::EntryPointNotFound(name.to_string()))?;

        if info.stage != naga::ShaderStage::Compute {
            return Err(PixelateError::NotCompute(name.to_string()));
        }

        Ok(KernelEntry {
            name: info.name.clone(),
            workgroup_size: info.workgroup_size.map(|n| n.max(1)),
        })
    }

    /// Resolve `name` and build its compute pipeline.
    ///
    /// Pipeline creation runs inside a validation error scope, so a kernel whose
    /// bindings do not match the contract yields an error instead of a panic.
    pub fn resolve(&self, gpu: &GpuContext, name: &str) -> PixelateResult<ResolvedKernel> {
        let entry = self.find_kernel(name)?;
        let device = &gpu.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pixelate Bind Group Layout"),
            entries: &[
                // Params
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Source frame
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Result (scratch)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: SCRATCH_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pixelate Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Pixelate Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(entry.name()),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(PixelateError::Pipeline(err.to_string()));
        }

        log::info!(
            "resolved kernel '{}' from {} (workgroup {:?})",
            entry.name(),
            self.label,
            entry.workgroup_size()
        );

        Ok(ResolvedKernel {
            entry,
            pipeline,
            bind_group_layout,
        })
    }
}

/// A kernel entry point with its pipeline, ready to dispatch.
pub struct ResolvedKernel {
    entry: KernelEntry,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ResolvedKernel {
    pub fn entry(&self) -> &KernelEntry {
        &self.entry
    }

    /// Record one dispatch reading `source` and writing `result`.
    ///
    /// Each dispatch gets its own parameter buffer, initialised at creation, so
    /// several dispatches recorded into one submission keep their own values.
    pub fn dispatch(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        result: &wgpu::TextureView,
        params: KernelParams,
        groups: DispatchSize,
    ) {
        let params_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pixelate Params"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pixelate Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(result),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Pixelate Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(groups.x, groups.y, groups.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED_STAGES: &str = r#"
        @vertex
        fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
            return vec4f(f32(vi), 0.0, 0.0, 1.0);
        }

        @compute @workgroup_size(16, 4)
        fn Blocky(@builtin(global_invocation_id) id: vec3<u32>) {
        }
    "#;

    #[test]
    fn builtin_kernel_resolves_default_entry_point() {
        let kernel = ComputeKernel::builtin().unwrap();
        let entry = kernel.find_kernel(DEFAULT_KERNEL_NAME).unwrap();
        assert_eq!(entry.name(), "Pixelate");
        assert_eq!(entry.workgroup_size(), [8, 8, 1]);
    }

    #[test]
    fn unknown_entry_point_is_reported_by_name() {
        let kernel = ComputeKernel::builtin().unwrap();
        match kernel.find_kernel("Blur") {
            Err(PixelateError::EntryPointNotFound(name)) => assert_eq!(name, "Blur"),
            other => panic!("expected EntryPointNotFound, got {:?}", other.map(|e| e.name().to_string())),
        }
    }

    #[test]
    fn non_compute_entry_point_is_rejected() {
        let kernel = ComputeKernel::from_wgsl("mixed", MIXED_STAGES).unwrap();
        assert!(matches!(
            kernel.find_kernel("vs"),
            Err(PixelateError::NotCompute(_))
        ));
    }

    #[test]
    fn workgroup_size_is_read_from_declaration() {
        let kernel = ComputeKernel::from_wgsl("mixed", MIXED_STAGES).unwrap();
        let entry = kernel.find_kernel("Blocky").unwrap();
        assert_eq!(entry.workgroup_size(), [16, 4, 1]);
        assert_eq!(kernel.entry_points().collect::<Vec<_>>(), vec!["vs", "Blocky"]);
    }

    #[test]
    fn invalid_source_fails_to_parse() {
        let result = ComputeKernel::from_wgsl("broken", "fn Pixelate( {");
        assert!(matches!(result, Err(PixelateError::KernelParse(_))));
    }

    #[test]
    fn params_layout_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 16);
        let params = KernelParams::new(4, 800, 600);
        assert_eq!(bytemuck::cast_slice::<KernelParams, u32>(&[params]), &[4, 800, 600, 0]);
    }
}
