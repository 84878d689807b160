//! Trip-path animation.
//!
//! The route layer draws a moving trip whose head position cycles from 0 to
//! [`CYCLE_LENGTH`](crate::constants::animation::CYCLE_LENGTH). The loop runs
//! until its [`CancelToken`] is cancelled; frames come from a
//! [`FrameSource`], so tests can step it by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use web_time::Instant;

use crate::constants::animation::{CYCLE_LENGTH, FRAME_INTERVAL, STEP};

/// Position of the animated trip head.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TripProgress(f32);

impl TripProgress {
    /// Current value in `[0, CYCLE_LENGTH)`.
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Step one frame forward, wrapping at the cycle length.
    pub fn advance(&mut self) -> f32 {
        self.0 = (self.0 + STEP) % CYCLE_LENGTH;
        self.0
    }
}

/// Cancellation flag shared between the owner of a loop and the loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether `cancel` was called on this token or any clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress readable from another thread.
#[derive(Debug, Clone, Default)]
pub struct SharedProgress(Arc<AtomicU32>);

impl SharedProgress {
    /// Last progress stored by the loop.
    pub fn get(&self) -> TripProgress {
        TripProgress(f32::from_bits(self.0.load(Ordering::Acquire)))
    }

    fn set(&self, progress: TripProgress) {
        self.0.store(progress.0.to_bits(), Ordering::Release);
    }
}

/// Paces the animation.
pub trait FrameSource {
    /// Wait for the next frame. Returns false when no more frames will come.
    fn next_frame(&mut self) -> bool;
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn next_frame(&mut self) -> bool {
        (**self).next_frame()
    }
}

/// Frame source that yields a fixed number of frames immediately.
#[derive(Debug, Clone)]
pub struct ManualFrames {
    remaining: usize,
}

impl ManualFrames {
    /// Yield `frames` frames, then end.
    pub fn new(frames: usize) -> Self {
        Self { remaining: frames }
    }
}

impl FrameSource for ManualFrames {
    fn next_frame(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Frame source ticking at a fixed interval.
#[derive(Debug, Clone)]
pub struct IntervalFrames {
    interval: Duration,
    next: Instant,
}

impl IntervalFrames {
    /// First frame comes one `interval` from now.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }
}

impl Default for IntervalFrames {
    fn default() -> Self {
        Self::new(FRAME_INTERVAL)
    }
}

impl FrameSource for IntervalFrames {
    fn next_frame(&mut self) -> bool {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
        // Skip missed frames instead of bursting to catch up
        self.next = self.next.max(now) + self.interval;
        true
    }
}

/// The animation loop itself.
pub struct AnimationLoop<F: FrameSource> {
    source: F,
    token: CancelToken,
    progress: TripProgress,
    shared: SharedProgress,
}

impl<F: FrameSource> AnimationLoop<F> {
    /// Loop paced by `source` that stops once `token` is cancelled.
    pub fn new(source: F, token: CancelToken) -> Self {
        Self {
            source,
            token,
            progress: TripProgress::default(),
            shared: SharedProgress::default(),
        }
    }

    /// Handle for reading the progress while the loop runs elsewhere.
    pub fn progress_handle(&self) -> SharedProgress {
        self.shared.clone()
    }

    /// Current trip head position.
    pub fn progress(&self) -> TripProgress {
        self.progress
    }

    /// Run until cancelled or the frame source ends. Returns the number of
    /// frames advanced.
    pub fn run(&mut self) -> u64 {
        let mut frames = 0;
        while !self.token.is_cancelled() && self.source.next_frame() {
            if self.token.is_cancelled() {
                break;
            }
            self.progress.advance();
            self.shared.set(self.progress);
            frames += 1;
        }
        log::trace!("Animation loop stopped after {} frames", frames);
        frames
    }
}

/// Owns a background animation loop; dropping it cancels and joins.
pub struct AnimationHandle {
    token: CancelToken,
    progress: SharedProgress,
    thread_handle: Option<JoinHandle<u64>>,
}

impl AnimationHandle {
    /// Start the loop on its own thread.
    pub fn spawn<F: FrameSource + Send + 'static>(source: F) -> std::io::Result<Self> {
        let token = CancelToken::new();
        let mut animation = AnimationLoop::new(source, token.clone());
        let progress = animation.progress_handle();

        let thread_handle = thread::Builder::new()
            .name("trip-animation".to_string())
            .spawn(move || animation.run())?;
        log::debug!("Trip animation started");

        Ok(Self {
            token,
            progress,
            thread_handle: Some(thread_handle),
        })
    }

    /// Current trip head position.
    pub fn progress(&self) -> TripProgress {
        self.progress.get()
    }

    /// The loop's cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Cancel the loop and wait for it. Returns the number of frames run.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.token.cancel();
        match self.thread_handle.take().map(JoinHandle::join) {
            Some(Ok(frames)) => frames,
            Some(Err(e)) => {
                log::warn!("Animation thread panicked: {:?}", e);
                0
            }
            None => 0,
        }
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_wraps_at_cycle_length() {
        let mut progress = TripProgress::default();
        for _ in 0..239 {
            progress.advance();
        }
        assert_eq!(progress.value(), 119.5);
        assert_eq!(progress.advance(), 0.0);
    }

    #[test]
    fn test_loop_runs_every_manual_frame() {
        let mut animation = AnimationLoop::new(ManualFrames::new(10), CancelToken::new());
        assert_eq!(animation.run(), 10);
        assert_eq!(animation.progress().value(), 5.0);
        assert_eq!(animation.progress_handle().get().value(), 5.0);
    }

    #[test]
    fn test_cancelled_loop_does_not_advance() {
        let token = CancelToken::new();
        token.cancel();
        let mut animation = AnimationLoop::new(ManualFrames::new(10), token);
        assert_eq!(animation.run(), 0);
        assert_eq!(animation.progress(), TripProgress::default());
    }

    struct CancelAfter {
        frames: usize,
        token: CancelToken,
    }

    impl FrameSource for CancelAfter {
        fn next_frame(&mut self) -> bool {
            if self.frames == 0 {
                self.token.cancel();
            } else {
                self.frames -= 1;
            }
            true
        }
    }

    #[test]
    fn test_cancel_stops_loop_mid_run() {
        let token = CancelToken::new();
        let source = CancelAfter {
            frames: 3,
            token: token.clone(),
        };
        let mut animation = AnimationLoop::new(source, token);
        assert_eq!(animation.run(), 3);
    }

    #[test]
    fn test_handle_stops_on_drop() {
        let handle = AnimationHandle::spawn(IntervalFrames::new(Duration::from_millis(1))).unwrap();
        let token = handle.token().clone();
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_handle_stop_reports_frames() {
        let handle = AnimationHandle::spawn(ManualFrames::new(4)).unwrap();
        while handle.progress().value() < 2.0 {
            thread::yield_now();
        }
        assert_eq!(handle.stop(), 4);
    }
}
