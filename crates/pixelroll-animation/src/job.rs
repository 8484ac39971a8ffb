//! Animation jobs and the lighting frames they produce.

use std::time::Duration;

use pixelroll_protocol::{FaceMask, LightingCommand};
use rand::Rng;
use rand::seq::index;

/// LED positions on a d20.
pub const FIELD_SIZE: u32 = 20;

/// Positions on the spin ring.
const RING_SIZE: u32 = 10;
const SPIN_STEP: Duration = Duration::from_millis(100);
const SPIN_CYCLES: u32 = 5;

const PULSE_LENGTH: Duration = Duration::from_millis(750);
const PULSE_REPEATS: u32 = 5;

/// Faces lit per sparkle frame.
const SPARKLE_LIT: usize = 6;
/// Width of the lit window in a wave.
const WAVE_WIDTH: u32 = 5;

const MIN_FRAME: Duration = Duration::from_millis(20);

/// The shapes an animation can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    Spin,
    Pulse,
    Sparkle,
    Wave,
    Blink,
}

/// One animation: a kind plus its timing and color.
///
/// The constructors pick the pattern. [`with_faces`](Self::with_faces),
/// [`with_fade`](Self::with_fade) and [`with_loops`](Self::with_loops)
/// adjust what every frame of that pattern sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationJob {
    kind: AnimationKind,
    color: u32,
    interval: Duration,
    steps: u32,
    blink_count: u8,
    /// Faces the pattern may light.
    faces: FaceMask,
    /// Overrides the pattern's own fade.
    fade: Option<u8>,
    loops: u8,
}

impl AnimationJob {
    fn new(
        kind: AnimationKind,
        color: u32,
        interval: Duration,
        steps: u32,
        blink_count: u8,
    ) -> Self {
        Self {
            kind,
            color,
            interval,
            steps,
            blink_count,
            faces: FaceMask::ALL,
            fade: None,
            loops: 1,
        }
    }

    /// A lit pair circling the die: 10 ring positions, 5 laps, 100 ms per
    /// step.
    pub fn spin(color: u32) -> Self {
        Self::new(
            AnimationKind::Spin,
            color,
            SPIN_STEP,
            RING_SIZE * SPIN_CYCLES,
            1,
        )
    }

    /// Every face fading in and out, 750 ms per pulse, 5 pulses.
    pub fn pulse(color: u32) -> Self {
        Self::new(AnimationKind::Pulse, color, PULSE_LENGTH, PULSE_REPEATS, 1)
    }

    /// Random faces flashing every `interval` for `total`.
    pub fn sparkle(color: u32, interval: Duration, total: Duration) -> Self {
        Self::timed(AnimationKind::Sparkle, color, interval, total)
    }

    /// A window of lit faces sliding around the die every `interval` for
    /// `total`.
    pub fn wave(color: u32, interval: Duration, total: Duration) -> Self {
        Self::timed(AnimationKind::Wave, color, interval, total)
    }

    /// The whole die blinking `count` times over `duration`.
    ///
    /// Sent as a single command; the die times the blinks itself.
    pub fn blink(color: u32, count: u8, duration: Duration) -> Self {
        Self::new(
            AnimationKind::Blink,
            color,
            duration.max(MIN_FRAME),
            1,
            count.max(1),
        )
    }

    fn timed(
        kind: AnimationKind,
        color: u32,
        interval: Duration,
        total: Duration,
    ) -> Self {
        let interval = interval.max(MIN_FRAME);
        let steps = (total.as_millis() / interval.as_millis()).max(1);
        Self::new(
            kind,
            color,
            interval,
            u32::try_from(steps).unwrap_or(u32::MAX),
            1,
        )
    }

    /// Limits every frame to `faces`. Pattern faces outside the mask stay
    /// dark.
    pub fn with_faces(mut self, faces: FaceMask) -> Self {
        self.faces = faces;
        self
    }

    /// Sets the fade of every frame, 0 (hard edges) to 255.
    pub fn with_fade(mut self, fade: u8) -> Self {
        self.fade = Some(fade);
        self
    }

    /// Makes the die repeat each frame `loops` times. Zero is treated
    /// as one.
    pub fn with_loops(mut self, loops: u8) -> Self {
        self.loops = loops.max(1);
        self
    }

    pub fn kind(&self) -> AnimationKind {
        self.kind
    }

    /// Time between frames.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of frames.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Total running time of the job, including the die's own repeats.
    pub fn duration(&self) -> Duration {
        self.frame_time() * self.steps
    }

    /// How long the die shows one frame.
    pub fn frame_time(&self) -> Duration {
        self.interval * u32::from(self.loops)
    }

    /// Computes every frame up front.
    ///
    /// Only sparkle draws from `rng`.
    pub fn frames<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<LightingCommand> {
        let frame_ms =
            u16::try_from(self.interval.as_millis()).unwrap_or(u16::MAX);
        let base = LightingCommand {
            blink_count: self.blink_count,
            duration_ms: frame_ms,
            color: self.color,
            faces: FaceMask::ALL,
            fade: 0,
            loop_count: self.loops,
        };

        (0..self.steps)
            .map(|step| {
                let frame = match self.kind {
                    AnimationKind::Spin => LightingCommand {
                        faces: ring_position(step % RING_SIZE),
                        ..base
                    },
                    AnimationKind::Pulse => LightingCommand { fade: 255, ..base },
                    AnimationKind::Sparkle => LightingCommand {
                        faces: sparkle_mask(rng),
                        fade: 128,
                        ..base
                    },
                    AnimationKind::Wave => LightingCommand {
                        faces: wave_window(step),
                        fade: 64,
                        ..base
                    },
                    AnimationKind::Blink => base,
                };
                LightingCommand {
                    faces: frame.faces.intersect(self.faces),
                    fade: self.fade.unwrap_or(frame.fade),
                    ..frame
                }
            })
            .collect()
    }
}

/// Ring position `i` lights LED `i` and its opposite, `19 - i`.
fn ring_position(i: u32) -> FaceMask {
    FaceMask::position(i).with(FaceMask::position(FIELD_SIZE - 1 - i))
}

fn sparkle_mask<R: Rng + ?Sized>(rng: &mut R) -> FaceMask {
    index::sample(rng, FIELD_SIZE as usize, SPARKLE_LIT)
        .into_iter()
        .fold(FaceMask::NONE, |mask, i| {
            mask.with(FaceMask::position(i as u32))
        })
}

fn wave_window(step: u32) -> FaceMask {
    (0..WAVE_WIDTH).fold(FaceMask::NONE, |mask, offset| {
        mask.with(FaceMask::position((step + offset) % FIELD_SIZE))
    })
}
