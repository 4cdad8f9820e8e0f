use fundsp::prelude32::*;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Success,
    Fail,
    GameOver,
}

impl Cue {
    fn seconds(self) -> f32 {
        match self {
            Cue::Success => 0.25,
            Cue::Fail => 0.35,
            Cue::GameOver => 0.5,
        }
    }
}

/// Synthesizes a cue as mono samples at [`SAMPLE_RATE`].
pub fn synthesize(cue: Cue) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * cue.seconds()) as usize;
    let mut unit: Box<dyn AudioUnit> = match cue {
        // Rising chirp
        Cue::Success => Box::new(
            (lfo(|t: f32| lerp(600.0, 1200.0, (t / 0.15).min(1.0))) >> sine())
                * lfo(|t: f32| lerp(0.2, 0.0, (t / 0.25).min(1.0))),
        ),
        // Low buzz
        Cue::Fail => Box::new(
            (lfo(|t: f32| lerp(180.0, 120.0, (t / 0.3).min(1.0))) >> square())
                * lfo(|t: f32| lerp(0.12, 0.0, (t / 0.35).min(1.0))),
        ),
        // 400Hz down to 80Hz, fading out
        Cue::GameOver => Box::new(
            (lfo(|t: f32| lerp(400.0, 80.0, (t / 0.4).min(1.0))) >> saw())
                * lfo(|t: f32| lerp(0.15, 0.0, (t / 0.5).min(1.0))),
        ),
    };
    unit.set_sample_rate(SAMPLE_RATE as f64);
    (0..n).map(|_| unit.get_mono()).collect()
}

/// Output device handle. Holding it keeps the stream open.
pub struct Sound {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl Sound {
    /// `None` when muted or when there is no audio device; the game then
    /// runs silently.
    pub fn open(mute: bool) -> Option<Self> {
        if mute {
            debug!("sound muted");
            return None;
        }
        match OutputStream::try_default() {
            Ok((stream, handle)) => Some(Self {
                _stream: stream,
                handle,
            }),
            Err(e) => {
                warn!(error = %e, "no audio output, running silent");
                None
            }
        }
    }

    pub fn play(&self, cue: Cue) {
        let sink = match Sink::try_new(&self.handle) {
            Ok(sink) => sink,
            Err(e) => {
                warn!(error = %e, ?cue, "cannot play cue");
                return;
            }
        };
        sink.append(SamplesBuffer::new(1, SAMPLE_RATE, synthesize(cue)));
        sink.detach();
    }
}
