use crate::error::{ClientError, Result};
use crate::media::wav;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::{Arc, Mutex, PoisonError};

/// Captured microphone audio, downmixed to mono.
pub struct Capture {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Capture {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }

    pub fn to_wav(&self) -> Vec<u8> {
        wav::encode_pcm16(&self.samples, self.sample_rate)
    }
}

/// A live capture session on the default input device. The device is held
/// until [`Recorder::stop`] (or drop) releases the stream.
pub struct Recorder {
    stream: Option<Stream>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl Recorder {
    pub fn start() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ClientError::Audio("no input device available".to_string()))?;
        let supported = device
            .default_input_config()
            .map_err(|err| ClientError::Audio(format!("failed to get input config: {err}")))?;

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;
        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            ?sample_format,
            "opening microphone"
        );

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&buffer))?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&buffer))?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&buffer))?,
            other => {
                return Err(ClientError::Audio(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        };
        stream
            .play()
            .map_err(|err| ClientError::Audio(format!("failed to start capture: {err}")))?;

        Ok(Self {
            stream: Some(stream),
            buffer,
            sample_rate,
        })
    }

    #[cfg(test)]
    pub fn detached(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            stream: None,
            buffer: Arc::new(Mutex::new(samples)),
            sample_rate,
        }
    }

    /// Ends the session, releasing the device, and returns what was captured.
    pub fn stop(mut self) -> Capture {
        self.stream = None;
        let samples = std::mem::take(
            &mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let capture = Capture {
            samples,
            sample_rate: self.sample_rate,
        };
        tracing::info!(seconds = capture.seconds(), "microphone released");
        capture
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let frame: Vec<f32> = data.iter().map(|s| f32::from_sample_(*s)).collect();
                let mono = wav::downmix(&frame, channels);
                buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&mono);
            },
            |err| tracing::error!("audio capture error: {err}"),
            None,
        )
        .map_err(|err| ClientError::Audio(format!("failed to build input stream: {err}")))
}
