//! Frame-rate downsampling

use crate::{FrameError, FrameResult};

/// Highest accepted frame rate of an input sequence
pub const SOURCE_FPS_MAX: u32 = 60;
/// Highest accepted output frame rate
pub const OUTPUT_FPS_MAX: u32 = 50;

/// Frames per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameRate(u32);

impl FrameRate {
    /// Frame rate the sequence was captured at, `1..=60`
    pub fn source(fps: u32) -> FrameResult<Self> {
        Self::checked(fps, SOURCE_FPS_MAX)
    }

    /// Frame rate of the animation, `1..=50`
    pub fn output(fps: u32) -> FrameResult<Self> {
        Self::checked(fps, OUTPUT_FPS_MAX)
    }

    fn checked(fps: u32, max: u32) -> FrameResult<Self> {
        if (1..=max).contains(&fps) {
            Ok(Self(fps))
        } else {
            Err(FrameError::InvalidFrameRate { fps, max })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Output rate limited to the source rate; an animation can't play
    /// more frames per second than were captured.
    pub fn limit_to(self, source: FrameRate) -> FrameRate {
        self.min(source)
    }

    /// Duration of one frame in milliseconds
    pub fn frame_delay_ms(self) -> f64 {
        1000.0 / self.0 as f64
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} fps", self.0)
    }
}

/// Step between kept frames: `max(1, round(source / target))`
pub fn stride(source: FrameRate, target: FrameRate) -> usize {
    let ratio = source.0 as f64 / target.0 as f64;
    (ratio.round() as usize).max(1)
}

/// Keep frames `0, stride, 2 * stride, ...` so playback speed is preserved
pub fn downsample<T>(items: Vec<T>, source: FrameRate, target: FrameRate) -> Vec<T> {
    let step = stride(source, target.limit_to(source));
    items.into_iter().step_by(step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(source: u32, output: u32) -> (FrameRate, FrameRate) {
        (FrameRate::source(source).unwrap(), FrameRate::output(output).unwrap())
    }

    #[test]
    fn rates_are_range_checked() {
        assert!(FrameRate::source(60).is_ok());
        assert!(FrameRate::source(61).is_err());
        assert!(FrameRate::output(50).is_ok());
        assert!(matches!(
            FrameRate::output(0),
            Err(FrameError::InvalidFrameRate { fps: 0, max: 50 })
        ));
    }

    #[test]
    fn stride_rounds_ratio() {
        let (s, t) = fps(30, 30);
        assert_eq!(stride(s, t), 1);
        let (s, t) = fps(30, 15);
        assert_eq!(stride(s, t), 2);
        let (s, t) = fps(30, 20);
        assert_eq!(stride(s, t), 2);
        let (s, t) = fps(30, 25);
        assert_eq!(stride(s, t), 1);
        let (s, t) = fps(60, 7);
        assert_eq!(stride(s, t), 9);
    }

    #[test]
    fn stride_is_at_least_one() {
        let (s, t) = fps(10, 50);
        assert_eq!(stride(s, t), 1);
    }

    #[test]
    fn downsample_keeps_every_stride_th_frame() {
        let (s, t) = fps(30, 10);
        let kept = downsample((0..10).collect(), s, t);
        assert_eq!(kept, vec![0, 3, 6, 9]);
    }

    #[test]
    fn downsample_never_upsamples() {
        let (s, t) = fps(12, 24);
        assert_eq!(downsample(vec!['a', 'b', 'c'], s, t), vec!['a', 'b', 'c']);
        assert_eq!(t.limit_to(s), s);
    }

    #[test]
    fn downsample_empty_input() {
        let (s, t) = fps(30, 10);
        assert!(downsample(Vec::<u8>::new(), s, t).is_empty());
    }

    #[test]
    fn frame_delay_in_ms() {
        assert_eq!(FrameRate::output(25).unwrap().frame_delay_ms(), 40.0);
    }
}
