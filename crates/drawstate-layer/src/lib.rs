//! DrawState validation layer.
//!
//! Sits between the application and the next layer (or driver), shadows
//! every pipeline, descriptor, render-pass and command-buffer object of each
//! device, and checks draw-time state before letting a call through. Calls
//! that fail a blocking check are reported and dropped.
//!
//! The next layer is reached through [`NextLayer`]; loader glue wraps the
//! real dispatch table in it and routes each intercepted entry point to the
//! matching [`DrawStateDevice`] method.

pub mod device;
pub mod dispatch;
pub mod proc_addr;
pub mod properties;

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk::{self, Handle};
use dashmap::DashMap;
use drawstate_core::{raw, DiagnosticSink, DrawStateConfig, TeardownSummary, TracingSink};

pub use device::{DrawStateDevice, VALIDATION_FAILED};
pub use dispatch::NextLayer;
pub use proc_addr::ProcAddr;

/// Process-wide layer state: configuration, the report sink, and one
/// [`DrawStateDevice`] per created device.
pub struct DrawStateLayer<N: NextLayer> {
    config: DrawStateConfig,
    sink: Arc<dyn DiagnosticSink>,
    devices: DashMap<u64, Arc<DrawStateDevice<N>>>,
}

impl<N: NextLayer> DrawStateLayer<N> {
    /// Reports go to `tracing`, filtered by `config.report`.
    pub fn new(config: DrawStateConfig) -> Self {
        drawstate_common::try_init_logging(config.report.log_file.as_deref());
        let sink = Arc::new(TracingSink::new(&config.report));
        Self::with_sink(config, sink)
    }

    /// Reports go to `sink` instead of the default tracing sink.
    pub fn with_sink(config: DrawStateConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            config,
            sink,
            devices: DashMap::new(),
        }
    }

    /// Configuration from the platform search path, or defaults.
    pub fn from_environment() -> Self {
        Self::new(DrawStateConfig::discover())
    }

    pub fn config(&self) -> &DrawStateConfig {
        &self.config
    }

    /// Start tracking a device the next layer has just created.
    ///
    /// # Safety
    /// `info.pp_enabled_extension_names` must be valid for
    /// `info.enabled_extension_count` nul-terminated strings.
    pub unsafe fn create_device(
        &self,
        next: N,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> Arc<DrawStateDevice<N>> {
        let names = unsafe {
            raw::slice(info.pp_enabled_extension_names, info.enabled_extension_count)
        };
        let debug_marker = properties::debug_marker_requested(
            names
                .iter()
                .filter(|p| !p.is_null())
                .map(|&p| unsafe { CStr::from_ptr(p) }),
        );
        let device = Arc::new(DrawStateDevice::new(
            next,
            &self.config,
            self.sink.clone(),
            debug_marker,
        ));
        let handle = device.handle().as_raw();
        if self.devices.insert(handle, device.clone()).is_some() {
            tracing::warn!(device = format_args!("{:#x}", handle), "device handle reused, old state dropped");
        }
        tracing::info!(
            device = format_args!("{:#x}", handle),
            devices = self.devices.len(),
            "device created"
        );
        device
    }

    pub fn device(&self, device: vk::Device) -> Option<Arc<DrawStateDevice<N>>> {
        self.devices.get(&device.as_raw()).map(|d| d.value().clone())
    }

    /// Forward the destroy and drop the device's shadow state.
    ///
    /// # Safety
    /// The device must not be in use by any other thread.
    pub unsafe fn destroy_device(&self, device: vk::Device) -> Option<TeardownSummary> {
        let (_, state) = self.devices.remove(&device.as_raw())?;
        let summary = unsafe { state.destroy() };
        tracing::info!(
            device = format_args!("{:#x}", device.as_raw()),
            ?summary,
            "device destroyed"
        );
        Some(summary)
    }

    /// Resolve a device-level entry point. Unknown devices resolve nothing.
    pub fn get_device_proc_addr(&self, device: vk::Device, name: &CStr) -> Option<ProcAddr> {
        self.device(device).map(|d| d.get_device_proc_addr(name))
    }

    /// Resolve an instance-level entry point; `None` means ask the next layer.
    pub fn get_instance_proc_addr(&self, name: &CStr) -> Option<&'static str> {
        name.to_str().ok().and_then(proc_addr::lookup_instance)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
