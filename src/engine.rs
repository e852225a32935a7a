//! OstinatoEngine: one handle over the controller, the scheduler and the device.

use crate::core::{
    Controller, DiagnosticsSnapshot, Edge, EngineConfig, LoadMetrics, NodeId, NodeKind, ParamKey,
    ParameterStore, Rejection, Scheduler, TransportReader,
};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "device")]
use crate::core::AudioDevice;
#[cfg(feature = "device")]
use tracing::{info, warn};

/// Real-time audio signal graph engine.
///
/// Wraps the kernel's [`Controller`] and [`Scheduler`] pair. Until a device is
/// started the scheduler stays inside the engine and [`render`](Self::render)
/// pulls blocks offline; [`start`](Self::start) (feature `"device"`) hands it
/// to the audio callback for good.
///
/// # Example
///
/// ```
/// use ostinato::prelude::*;
///
/// let engine = OstinatoEngine::builder().build()?;
///
/// let out = engine.graph(|g| -> ostinato::Result<NodeId> {
///     let osc = g.add_node(NodeKind::sine(440.0))?;
///     let out = g.add_node(NodeKind::sink(1))?;
///     g.connect(Edge::mono(osc, out))?;
///     Ok(out)
/// })?;
///
/// let audio = engine.render(128)?;
/// assert_eq!(audio.len(), 128 * engine.channels());
/// assert!(engine.contains(out));
/// # Ok::<(), ostinato::Error>(())
/// ```
pub struct OstinatoEngine {
    controller: Mutex<Controller>,

    /// Present until a device takes it.
    scheduler: Mutex<Option<Scheduler>>,

    config: EngineConfig,
    params: Arc<ParameterStore>,
    transport: TransportReader,

    #[cfg(feature = "device")]
    device: Mutex<Option<AudioDevice>>,
}

impl OstinatoEngine {
    pub fn builder() -> crate::OstinatoEngineBuilder {
        crate::OstinatoEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        controller: Controller,
        scheduler: Scheduler,
        #[cfg(feature = "device")] device: Option<AudioDevice>,
    ) -> Self {
        Self {
            config: controller.config().clone(),
            params: Arc::clone(controller.parameters()),
            transport: controller.transport(),
            controller: Mutex::new(controller),
            scheduler: Mutex::new(Some(scheduler)),
            #[cfg(feature = "device")]
            device: Mutex::new(device),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.config.channels
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutate the graph through the controller.
    ///
    /// Changes are queued and take effect at the next block boundary.
    pub fn graph<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Controller) -> R,
    {
        f(&mut self.controller.lock())
    }

    pub fn add_node(&self, kind: NodeKind) -> Result<NodeId> {
        Ok(self.controller.lock().add_node(kind)?)
    }

    pub fn remove_node(&self, id: NodeId) -> Result<()> {
        Ok(self.controller.lock().remove_node(id)?)
    }

    pub fn connect(&self, edge: Edge) -> Result<()> {
        Ok(self.controller.lock().connect(edge)?)
    }

    pub fn disconnect(&self, edge: Edge) -> Result<()> {
        Ok(self.controller.lock().disconnect(edge)?)
    }

    /// Whether the control side still considers `id` live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.controller.lock().contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.controller.lock().node_count()
    }

    /// Ramp a parameter over the configured default window.
    pub fn set_parameter(&self, key: ParamKey, value: f32) -> Result<()> {
        Ok(self.controller.lock().set_parameter(key, value)?)
    }

    pub fn set_parameter_smoothed(&self, key: ParamKey, value: f32, blocks: u32) -> Result<()> {
        Ok(self
            .controller
            .lock()
            .set_parameter_smoothed(key, value, blocks)?)
    }

    /// Lock-free; safe to call from any thread, including while audio runs.
    pub fn read_parameter(&self, key: ParamKey) -> Option<f32> {
        self.params.read(&key)
    }

    /// Shared parameter map for UI threads.
    pub fn parameters(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.params)
    }

    /// Mutations the audio thread refused since the last call.
    pub fn poll_rejections(&self) -> Vec<Rejection> {
        self.controller.lock().poll_rejections()
    }

    pub fn transport(&self) -> TransportReader {
        self.transport.clone()
    }

    /// Frames rendered since the engine was built.
    pub fn position(&self) -> u64 {
        self.transport.position()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.controller.lock().diagnostics()
    }

    pub fn load(&self) -> LoadMetrics {
        self.controller.lock().diagnostics_handle().load().metrics()
    }

    /// Render `frames` frames offline. Returns interleaved samples, `channels()` wide.
    pub fn render(&self, frames: usize) -> Result<Vec<f32>> {
        let mut buffer = vec![0.0f32; frames * self.config.channels];
        self.render_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Render into an interleaved buffer, `channels()` samples per frame.
    pub fn render_into(&self, buffer: &mut [f32]) -> Result<()> {
        let mut scheduler = self.scheduler.lock();
        let scheduler = scheduler.as_mut().ok_or(Error::SchedulerDetached)?;
        scheduler.request_block(buffer, self.config.channels, self.config.sample_rate);
        debug!(frames = buffer.len() / self.config.channels, "Rendered offline");
        Ok(())
    }

    /// Whether the scheduler is still available for offline rendering.
    pub fn is_offline(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    /// Start streaming to the output device, opening the default one if the
    /// builder did not. The scheduler moves into the audio callback.
    #[cfg(feature = "device")]
    pub fn start(&self) -> Result<()> {
        let mut slot = self.device.lock();
        if slot.as_ref().is_some_and(|device| device.is_running()) {
            return Ok(());
        }
        let mut device = match slot.take() {
            Some(device) => device,
            None => AudioDevice::open(None)?,
        };
        let Some(scheduler) = self.scheduler.lock().take() else {
            *slot = Some(device);
            return Err(Error::SchedulerDetached);
        };
        if device.sample_rate() != self.config.sample_rate {
            warn!(
                device = device.sample_rate(),
                configured = self.config.sample_rate,
                "Device sample rate differs from the configured rate"
            );
        }

        let diagnostics = self.controller.lock().diagnostics_handle();
        let started = device.start(scheduler, diagnostics);
        let sample_rate = device.sample_rate();
        *slot = Some(device);
        if let Err((error, scheduler)) = started {
            *self.scheduler.lock() = Some(scheduler);
            warn!(%error, "Device failed to start; offline rendering still available");
            return Err(error.into());
        }
        info!(sample_rate, "Engine streaming to device");
        Ok(())
    }

    /// Stop the device stream. The scheduler is dropped with it.
    #[cfg(feature = "device")]
    pub fn stop(&self) {
        if let Some(device) = self.device.lock().as_mut() {
            device.stop();
        }
    }

    #[cfg(feature = "device")]
    pub fn is_running(&self) -> bool {
        self.device
            .lock()
            .as_ref()
            .is_some_and(|device| device.is_running())
    }

    #[cfg(feature = "device")]
    pub fn list_output_devices() -> Result<Vec<String>> {
        Ok(AudioDevice::list_devices()?)
    }
}
