//! Shared GPU plumbing for the texture-based upscalers (nearest, bilinear,
//! lanczos). Each algorithm differs only in its compute shader body; the
//! texture upload, dispatch and padded readback are identical, so they live
//! here once. Modeled on `nethercore_core::capture::read_render_target_pixels`
//! for the readback half and `nethercore_zx::graphics::epu::pipelines` for
//! the shader-module/bind-group construction half.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::buffer_pool::{BufferKind, BufferPool};
use crate::config::{Quality, UpscalerConfig};
use crate::error::PipelineError;
use crate::gpu::GpuContext;

use super::quality_controller::AdaptiveQualityController;
use super::{UpscaledFrame, shaders};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Params {
    in_width: u32,
    in_height: u32,
    out_width: u32,
    out_height: u32,
    half_taps: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

pub(crate) enum Kernel {
    Nearest,
    Bilinear,
    Lanczos,
}

impl Kernel {
    fn shader_source(&self) -> String {
        match self {
            Kernel::Nearest => format!("{}{}", shaders::COMMON, shaders::NEAREST_MAIN),
            Kernel::Bilinear => format!("{}{}", shaders::COMMON, shaders::BILINEAR_MAIN),
            Kernel::Lanczos => format!("{}{}", shaders::COMMON, shaders::LANCZOS_MAIN),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Kernel::Nearest => "nearest",
            Kernel::Bilinear => "bilinear",
            Kernel::Lanczos => "lanczos",
        }
    }
}

struct GpuResources {
    pipeline: wgpu::ComputePipeline,
    input_texture: wgpu::Texture,
    output_texture: wgpu::Texture,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    in_width: u32,
    in_height: u32,
    out_width: u32,
    out_height: u32,
}

pub(crate) struct ComputeUpscalerCore {
    kernel: Kernel,
    resources: Option<GpuResources>,
    quality: AdaptiveQualityController,
}

impl ComputeUpscalerCore {
    pub(crate) fn new(kernel: Kernel, quality: Quality, adaptive: bool) -> ComputeUpscalerCore {
        ComputeUpscalerCore {
            kernel,
            resources: None,
            quality: AdaptiveQualityController::new(quality, adaptive),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.kernel.name()
    }

    pub(crate) fn current_quality(&self) -> Quality {
        self.quality.current()
    }

    pub(crate) fn quality_controller_mut(&mut self) -> &mut AdaptiveQualityController {
        &mut self.quality
    }

    pub(crate) fn initialize(
        &mut self,
        gpu: &GpuContext,
        config: &UpscalerConfig,
    ) -> Result<(), PipelineError> {
        if config.input_width == 0
            || config.input_height == 0
            || config.output_width == 0
            || config.output_height == 0
        {
            return Err(PipelineError::InvalidDimensions {
                width: config.input_width,
                height: config.input_height,
            });
        }

        if let Some(r) = &self.resources {
            if r.in_width == config.input_width
                && r.in_height == config.input_height
                && r.out_width == config.output_width
                && r.out_height == config.output_height
            {
                return Ok(());
            }
        }

        // Re-initializing with different dimensions drops the prior
        // resources; wgpu deallocates them once the last handle is dropped.
        self.resources = None;

        let device = gpu.device();
        let shader_source = self.kernel.shader_source();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("upscale-engine compute shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("upscale-engine bind group layout"),
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
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
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
            label: Some("upscale-engine pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("upscale-engine compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let input_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("upscale-engine input texture"),
            size: wgpu::Extent3d {
                width: config.input_width,
                height: config.input_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let output_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("upscale-engine output texture"),
            size: wgpu::Extent3d {
                width: config.output_width,
                height: config.output_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("upscale-engine params buffer"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let input_view = input_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("upscale-engine bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        self.resources = Some(GpuResources {
            pipeline,
            input_texture,
            output_texture,
            uniform_buffer,
            bind_group,
            in_width: config.input_width,
            in_height: config.input_height,
            out_width: config.output_width,
            out_height: config.output_height,
        });

        tracing::debug!(
            kernel = self.kernel.name(),
            in_w = config.input_width,
            in_h = config.input_height,
            out_w = config.output_width,
            out_h = config.output_height,
            "upscaler (re)initialized"
        );

        Ok(())
    }

    pub(crate) fn upscale(
        &mut self,
        gpu: &GpuContext,
        pool: &Arc<BufferPool>,
        rgba: &[u8],
        width: u32,
        height: u32,
        sequence: u64,
    ) -> Result<UpscaledFrame, PipelineError> {
        let resources = self.resources.as_ref().ok_or(PipelineError::PipelineNotRunning)?;
        if width != resources.in_width || height != resources.in_height {
            return Err(PipelineError::DimensionMismatch {
                a_width: width,
                a_height: height,
                b_width: resources.in_width,
                b_height: resources.in_height,
            });
        }

        let device = gpu.device();
        let queue = gpu.queue();

        let params = Params {
            in_width: resources.in_width,
            in_height: resources.in_height,
            out_width: resources.out_width,
            out_height: resources.out_height,
            half_taps: self.quality.current().lanczos_half_taps(),
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        };
        queue.write_buffer(&resources.uniform_buffer, 0, bytemuck::bytes_of(&params));

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &resources.input_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = resources.out_width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        let buffer_size = (padded_bytes_per_row * resources.out_height) as u64;

        let staging = pool.acquire(BufferKind::StagingDownload, buffer_size)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("upscale-engine compute encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("upscale-engine compute pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&resources.pipeline);
            pass.set_bind_group(0, &resources.bind_group, &[]);
            let groups_x = resources.out_width.div_ceil(8);
            let groups_y = resources.out_height.div_ceil(8);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &resources.output_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging.buffer(),
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(resources.out_height),
                },
            },
            wgpu::Extent3d {
                width: resources.out_width,
                height: resources.out_height,
                depth_or_array_layers: 1,
            },
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
        let mut out_bytes = Vec::with_capacity((resources.out_width * resources.out_height * bytes_per_pixel) as usize);
        for row in 0..resources.out_height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + (resources.out_width * bytes_per_pixel) as usize;
            out_bytes.extend_from_slice(&mapped[start..end]);
        }
        drop(mapped);
        staging.buffer().unmap();
        let out_width = resources.out_width;
        let out_height = resources.out_height;
        pool.release(staging);

        Ok(UpscaledFrame {
            bytes: Arc::from(out_bytes.into_boxed_slice()),
            width: out_width,
            height: out_height,
            source_sequence: sequence,
            upscaler_name: self.kernel.name(),
        })
    }
}
