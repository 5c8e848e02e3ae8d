//! Fullscreen shader passes that generate an image from time and resolution.
//!
//! The viewer uses an [`EffectPass`] running the built-in animated test scene
//! as the frame source for the pixelation effect. Any WGSL module defining
//! `vs` and `fs` and reading the uniforms below works:
//!
//! ```wgsl
//! struct Uniforms { resolution: vec2f, time: f32 }
//! @group(0) @binding(0) var<uniform> u: Uniforms;
//! ```

use crate::gpu::GpuContext;

/// WGSL source of the built-in animated test scene.
pub const SCENE_WGSL: &str = include_str!("shaders/scene.wgsl");

/// Uniforms bound at `@group(0) @binding(0)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenUniforms {
    /// Render target resolution in pixels `[width, height]`.
    pub resolution: [f32; 2],
    /// Elapsed time in seconds since application start.
    pub time: f32,
    pub _padding: f32,
}

impl ScreenUniforms {
    pub fn new(width: u32, height: u32, time: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time,
            _padding: 0.0,
        }
    }
}

/// A fullscreen shader effect pass writing targets of one format.
pub struct EffectPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl EffectPass {
    /// Create a pass from WGSL source, writing targets of the context's format.
    pub fn new(gpu: &GpuContext, shader_source: &str) -> Self {
        Self::with_format(gpu, shader_source, gpu.format())
    }

    /// Create a pass running the built-in test scene.
    pub fn scene(gpu: &GpuContext) -> Self {
        Self::new(gpu, SCENE_WGSL)
    }

    pub fn with_format(gpu: &GpuContext, shader_source: &str, format: wgpu::TextureFormat) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Effect Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Effect Uniforms"),
            size: std::mem::size_of::<ScreenUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Effect Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Effect Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Effect Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Effect Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
        }
    }

    /// Upload uniforms for a `width x height` target and draw the fullscreen
    /// triangle into `render_pass`.
    pub fn render(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        width: u32,
        height: u32,
        time: f32,
    ) {
        let uniforms = ScreenUniforms::new(width, height, time);
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<ScreenUniforms>(), 16);
        let u = ScreenUniforms::new(800, 600, 1.5);
        assert_eq!(u.resolution, [800.0, 600.0]);
        assert_eq!(u.time, 1.5);
    }

    #[test]
    fn scene_shader_has_vertex_and_fragment_entries() {
        let module = naga::front::wgsl::parse_str(SCENE_WGSL).unwrap();
        let names: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"vs"));
        assert!(names.contains(&"fs"));
    }
}
