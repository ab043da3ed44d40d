use std::collections::HashMap;

use glam::Vec2;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BufferBindingType, ColorTargetState,
    Device, FragmentState, MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor,
    PrimitiveState, RenderPass, RenderPipeline, Sampler, SamplerBindingType, ShaderModule,
    ShaderStages, TextureFormat, TextureSampleType, TextureViewDimension, VertexState,
};

use super::renderer::DrawCall;
use super::texture::TextureRegistry;
use super::uniforms::MovieUniforms;
use crate::render::BlendMode;
use crate::shader::ShaderQuality;

pub const MOVIE_SHADER_SOURCE: &str = include_str!("../../assets/shaders/movie_yuva.wgsl");

fn fragment_entry(quality: ShaderQuality) -> &'static str {
    match quality {
        ShaderQuality::Fast => "fs_fast",
        ShaderQuality::HighQuality => "fs_hq",
    }
}

fn blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Disabled => None,
        BlendMode::PremultipliedAlpha => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
    }
}

/// Render pipelines for every shader quality and blend mode, sharing one
/// bind group layout: uniforms, YA texture, UV texture, sampler.
pub struct MoviePipeline {
    pipelines: HashMap<(ShaderQuality, BlendMode), RenderPipeline>,
    pub bind_group_layout: BindGroupLayout,
    sampler: Sampler,
}

impl MoviePipeline {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let bind_group_layout = Self::create_bind_group_layout(device);
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("movie-shader"),
            source: wgpu::ShaderSource::Wgsl(MOVIE_SHADER_SOURCE.into()),
        });

        let mut pipelines = HashMap::new();
        for &quality in ShaderQuality::ALL {
            for &blend in BlendMode::ALL {
                let pipeline = Self::create_pipeline(
                    device,
                    format,
                    &bind_group_layout,
                    &shader_module,
                    quality,
                    blend,
                );
                pipelines.insert((quality, blend), pipeline);
            }
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("movie-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Self {
            pipelines,
            bind_group_layout,
            sampler,
        }
    }

    fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("movie-bind-group-layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX_FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                tex_entry(1),
                tex_entry(2),
                BindGroupLayoutEntry {
                    binding: 3,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_pipeline(
        device: &Device,
        format: TextureFormat,
        bind_group_layout: &BindGroupLayout,
        shader_module: &ShaderModule,
        quality: ShaderQuality,
        blend: BlendMode,
    ) -> RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("movie-pipeline-layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("movie-render-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: shader_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: shader_module,
                entry_point: Some(fragment_entry(quality)),
                targets: &[Some(ColorTargetState {
                    format,
                    blend: blend_state(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Replay recorded draws into `pass`. Returns how many were drawn;
    /// draws made with a non-movie program or referencing released
    /// textures are skipped.
    pub fn encode(
        &self,
        device: &Device,
        registry: &TextureRegistry,
        pass: &mut RenderPass<'_>,
        calls: &[DrawCall],
        viewport: Vec2,
    ) -> usize {
        let mut drawn = 0;
        for call in calls {
            let Some(quality) = call.quality() else {
                log::debug!("Skipping sprite draw without the movie shader");
                continue;
            };
            let Some(pipeline) = self.pipelines.get(&(quality, call.sprite.blend)) else {
                continue;
            };
            let frame = call.sprite.frame;
            let (Some(ya), Some(uv)) = (registry.view(frame.ya), registry.view(frame.uv)) else {
                log::debug!("Skipping movie draw with released textures");
                continue;
            };

            let uniforms = MovieUniforms::new(&call.sprite, viewport, call.uv_scale);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("movie-uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = device.create_bind_group(&BindGroupDescriptor {
                label: Some("movie-bind-group"),
                layout: &self.bind_group_layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::TextureView(&ya),
                    },
                    BindGroupEntry {
                        binding: 2,
                        resource: BindingResource::TextureView(&uv),
                    },
                    BindGroupEntry {
                        binding: 3,
                        resource: BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..4, 0..1);
            drawn += 1;
        }
        drawn
    }
}

fn tex_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_declares_every_entry_point() {
        assert!(MOVIE_SHADER_SOURCE.contains("fn vs_main"));
        for &quality in ShaderQuality::ALL {
            assert!(MOVIE_SHADER_SOURCE.contains(&format!("fn {}", fragment_entry(quality))));
        }
    }

    #[test]
    fn opaque_movies_do_not_blend() {
        assert!(blend_state(BlendMode::Disabled).is_none());
        assert_eq!(
            blend_state(BlendMode::PremultipliedAlpha),
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING)
        );
    }
}
