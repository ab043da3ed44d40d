use anyhow::Result;
use std::sync::Arc;
use wgpu::{
    Adapter, Device, DeviceDescriptor, ExperimentalFeatures, Instance, InstanceDescriptor,
    MemoryHints, PowerPreference, Queue, RequestAdapterOptions, TextureFormat, Trace,
};

use super::pipeline::MoviePipeline;
use super::texture::{TextureRegistry, WgpuTextureFactory};

/// Device and queue without a window surface. Hosts with their own
/// device build a [`WgpuTextureFactory`] directly instead.
pub struct HeadlessGpu {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub registry: Arc<TextureRegistry>,
}

impl HeadlessGpu {
    pub fn new() -> Result<Self> {
        let instance = Instance::new(&InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("movie-sprite-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: ExperimentalFeatures::default(),
            memory_hints: MemoryHints::Performance,
            trace: Trace::Off,
        }))?;

        log::info!(
            "GPU initialized: {} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            registry: Arc::new(TextureRegistry::new()),
        })
    }

    pub fn texture_factory(&self) -> WgpuTextureFactory {
        WgpuTextureFactory::new(self.device.clone(), self.queue.clone(), self.registry.clone())
    }

    pub fn pipeline(&self, format: TextureFormat) -> MoviePipeline {
        MoviePipeline::new(&self.device, format)
    }
}
