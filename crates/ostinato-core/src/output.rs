//! CPAL output driver.
//!
//! The device callback asks a [`Scheduler`] for exactly the frames the device
//! wants. The scheduler is handed over only after the stream is playing, so a
//! failed start gives it back to the caller. Stream errors are logged and
//! counted as underruns.

use crate::diagnostics::Diagnostics;
use crate::scheduler::{scheduler_handoff, PendingScheduler, Scheduler};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::Producer;
use std::sync::Arc;
use tracing::{error, info};

/// Holds a `cpal::Stream` in a `Send` context.
///
/// # Safety
/// `cpal::Stream` is `!Send` because of platform internals. The handle is only
/// created, kept and dropped by the owner of [`AudioDevice`], which the
/// umbrella engine keeps behind a mutex.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for StreamHandle {}

pub struct AudioDevice {
    device_index: Option<usize>,
    sample_rate: f64,
    channels: usize,
    stream: Option<StreamHandle>,
}

impl AudioDevice {
    /// Open the default device (`None`) or the output device at `index`.
    pub fn open(device_index: Option<usize>) -> Result<Self> {
        let device = get_device(device_index)?;
        let config = device.default_output_config()?;
        Ok(Self {
            device_index,
            sample_rate: config.sample_rate().0 as f64,
            channels: config.channels() as usize,
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Start streaming. On success the scheduler belongs to the audio
    /// callback; on failure it comes back with the error.
    pub fn start(
        &mut self,
        scheduler: Scheduler,
        diagnostics: Arc<Diagnostics>,
    ) -> std::result::Result<(), (Error, Scheduler)> {
        if self.is_running() {
            return Err((
                Error::InvalidDevice("Audio stream already running".into()),
                scheduler,
            ));
        }

        let (mut sender, pending) = scheduler_handoff();
        let stream = match self.open_stream(pending, diagnostics) {
            Ok(stream) => stream,
            Err(e) => return Err((e, scheduler)),
        };
        if let Err(e) = stream.play() {
            return Err((e.into(), scheduler));
        }
        if let Err(scheduler) = sender.try_push(scheduler) {
            return Err((
                Error::InvalidDevice("Scheduler handoff refused".into()),
                scheduler,
            ));
        }

        info!(
            sample_rate = self.sample_rate,
            channels = self.channels,
            "Audio stream started"
        );
        self.stream = Some(StreamHandle(stream));
        Ok(())
    }

    fn open_stream(
        &self,
        pending: PendingScheduler,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<cpal::Stream> {
        let device = get_device(self.device_index)?;
        let config = device.default_output_config()?;

        match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config.into(), pending, diagnostics)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config.into(), pending, diagnostics)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config.into(), pending, diagnostics)
            }
            format => Err(Error::InvalidDevice(format!(
                "Unsupported sample format: {format:?}"
            ))),
        }
    }

    /// Stop and drop the stream, and the scheduler inside it.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("Audio stream stopped");
        }
    }

    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| Error::InvalidDevice(e.to_string()))?;
        Ok(devices
            .enumerate()
            .map(|(i, d)| format!("{i}: {}", d.name().unwrap_or_else(|_| "<unnamed>".into())))
            .collect())
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match index {
        Some(i) => {
            let devices: Vec<_> = host
                .output_devices()
                .map_err(|e| Error::InvalidDevice(e.to_string()))?
                .collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::InvalidDevice("No output device available".into())),
    }
}

/// Frames preallocated for format conversion; grows once if a device asks for more.
const CONVERSION_FRAMES: usize = 8192;

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut scheduler: PendingScheduler,
    diagnostics: Arc<Diagnostics>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + 'static,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0 as f64;
    let mut scratch = vec![0.0f32; CONVERSION_FRAMES * channels];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0.0);
            }
            let buffer = &mut scratch[..data.len()];
            scheduler.request_block(buffer, channels, sample_rate);
            for (out, sample) in data.iter_mut().zip(buffer.iter()) {
                *out = T::from_sample(*sample);
            }
        },
        move |err| {
            diagnostics.record_underrun();
            error!(%err, "Audio stream error");
        },
        None,
    )?;

    Ok(stream)
}
