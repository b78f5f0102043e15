//! Motion-compensated frame interpolation: synthesizes an in-between frame
//! from two upscaled frames. Built the same way as the upscalers (texture
//! upload, compute dispatch, padded readback), grounded on the same
//! `core::capture::read_render_target_pixels` readback shape.

mod shaders;

use std::sync::Arc;
use std::time::Instant;

use bytemuck::{Pod, Zeroable};

use crate::buffer_pool::{BufferKind, BufferPool};
use crate::error::PipelineError;
use crate::gpu::GpuContext;

const SEARCH_RADIUS: u32 = 3;

/// A synthesized in-between frame.
#[derive(Clone)]
pub struct InterpolatedFrame {
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Sequence of the earlier of the two source frames this was derived from.
    pub source_sequence: u64,
    pub gpu_ms: Option<f32>,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Params {
    width: u32,
    height: u32,
    t_fixed: u32,
    search_radius: u32,
}

struct GpuResources {
    pipeline: wgpu::ComputePipeline,
    tex_a: wgpu::Texture,
    tex_b: wgpu::Texture,
    tex_out: wgpu::Texture,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

pub struct FrameInterpolator {
    resources: Option<GpuResources>,
}

impl FrameInterpolator {
    pub fn new() -> FrameInterpolator {
        FrameInterpolator { resources: None }
    }

    pub fn initialize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> Result<(), PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions { width, height });
        }
        if let Some(r) = &self.resources {
            if r.width == width && r.height == height {
                return Ok(());
            }
        }
        self.resources = None;

        let device = gpu.device();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("upscale-engine interpolation shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MAIN.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("upscale-engine interpolation bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("upscale-engine interpolation pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("upscale-engine interpolation pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let make_texture = |label: &str, usage: wgpu::TextureUsages| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage,
                view_formats: &[],
            })
        };

        let tex_a = make_texture(
            "upscale-engine interpolation frame A",
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let tex_b = make_texture(
            "upscale-engine interpolation frame B",
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let tex_out = make_texture(
            "upscale-engine interpolation output",
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("upscale-engine interpolation params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let view_a = tex_a.create_view(&wgpu::TextureViewDescriptor::default());
        let view_b = tex_b.create_view(&wgpu::TextureViewDescriptor::default());
        let view_out = tex_out.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("upscale-engine interpolation bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view_a) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&view_b) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&view_out) },
                wgpu::BindGroupEntry { binding: 3, resource: uniform_buffer.as_entire_binding() },
            ],
        });

        self.resources = Some(GpuResources {
            pipeline,
            tex_a,
            tex_b,
            tex_out,
            uniform_buffer,
            bind_group,
            width,
            height,
        });

        Ok(())
    }

    /// Synthesizes a frame at `t` between `a` (t=0) and `b` (t=1). Bypasses
    /// the GPU entirely at the bypass points.
    #[allow(clippy::too_many_arguments)]
    pub fn interpolate(
        &mut self,
        gpu: &GpuContext,
        pool: &Arc<BufferPool>,
        a_bytes: &[u8],
        a_width: u32,
        a_height: u32,
        b_bytes: &[u8],
        b_width: u32,
        b_height: u32,
        source_sequence: u64,
        t: f32,
    ) -> Result<InterpolatedFrame, PipelineError> {
        if a_width != b_width || a_height != b_height {
            return Err(PipelineError::DimensionMismatch {
                a_width,
                a_height,
                b_width,
                b_height,
            });
        }
        let (width, height) = (a_width, a_height);
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions { width, height });
        }

        if t <= 0.0 {
            return Ok(InterpolatedFrame {
                bytes: Arc::from(a_bytes.to_vec().into_boxed_slice()),
                width,
                height,
                source_sequence,
                gpu_ms: None,
            });
        }
        if t >= 1.0 {
            return Ok(InterpolatedFrame {
                bytes: Arc::from(b_bytes.to_vec().into_boxed_slice()),
                width,
                height,
                source_sequence,
                gpu_ms: None,
            });
        }

        self.initialize(gpu, width, height)?;
        let resources = self.resources.as_ref().unwrap();
        if resources.width != width || resources.height != height {
            return Err(PipelineError::DimensionMismatch {
                a_width: width,
                a_height: height,
                b_width: resources.width,
                b_height: resources.height,
            });
        }

        let device = gpu.device();
        let queue = gpu.queue();
        let started = Instant::now();

        let params = Params {
            width,
            height,
            t_fixed: (t.clamp(0.0, 1.0) * 1000.0).round() as u32,
            search_radius: SEARCH_RADIUS,
        };
        queue.write_buffer(&resources.uniform_buffer, 0, bytemuck::bytes_of(&params));

        let layout = wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        };
        let extent = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &resources.tex_a,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            a_bytes,
            layout,
            extent,
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &resources.tex_b,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            b_bytes,
            layout,
            extent,
        );

        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        let buffer_size = (padded_bytes_per_row * height) as u64;
        let staging = pool.acquire(BufferKind::StagingDownload, buffer_size)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("upscale-engine interpolation encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("upscale-engine interpolation pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&resources.pipeline);
            pass.set_bind_group(0, &resources.bind_group, &[]);
            pass.dispatch_workgroups(width.div_ceil(8), height.div_ceil(8), 1);
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &resources.tex_out,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging.buffer(),
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.buffer().slice(..buffer_size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|_| PipelineError::GpuTimeout)?;
        rx.recv()
            .map_err(|_| PipelineError::GpuTimeout)?
            .map_err(|_| PipelineError::DeviceLost)?;

        let mapped = slice.get_mapped_range();
        let mut out_bytes = Vec::with_capacity((width * height * bytes_per_pixel) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + (width * bytes_per_pixel) as usize;
            out_bytes.extend_from_slice(&mapped[start..end]);
        }
        drop(mapped);
        staging.buffer().unmap();
        pool.release(staging);

        Ok(InterpolatedFrame {
            bytes: Arc::from(out_bytes.into_boxed_slice()),
            width,
            height,
            source_sequence,
            gpu_ms: Some(started.elapsed().as_secs_f32() * 1000.0),
        })
    }
}

impl Default for FrameInterpolator {
    fn default() -> FrameInterpolator {
        FrameInterpolator::new()
    }
}
