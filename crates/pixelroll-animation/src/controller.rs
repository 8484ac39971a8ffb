//! Single-slot animation scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pixelroll_transport::DieLink;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{AnimationError, AnimationJob, Ticker};

/// Runs at most one animation at a time on one die.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct AnimationController {
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the animation task ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts `job` on `link`.
    ///
    /// The first frame goes out immediately, the rest one per tick. The
    /// slot is released one interval after the last frame, when the die
    /// has finished showing it.
    ///
    /// # Errors
    /// - [`AnimationError::Busy`] if an animation is already running. The
    ///   request is dropped, not queued.
    /// - [`AnimationError::WriteUnavailable`] if the link cannot write.
    pub fn start<L: DieLink>(
        &self,
        job: AnimationJob,
        link: Arc<L>,
    ) -> Result<JoinHandle<()>, AnimationError> {
        if !link.can_write() {
            return Err(AnimationError::WriteUnavailable);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(kind = ?job.kind(), "animation busy, request dropped");
            return Err(AnimationError::Busy);
        }

        let frames = job.frames(&mut rand::rng());
        let guard = RunningGuard(Arc::clone(&self.running));
        let kind = job.kind();
        let interval = job.frame_time();

        debug!(?kind, frames = frames.len(), "animation started");

        Ok(tokio::spawn(async move {
            let _guard = guard;
            let mut ticker = Ticker::new(interval);

            for (i, frame) in frames.iter().enumerate() {
                if i > 0 {
                    ticker.wait().await;
                }
                if let Err(e) = link.send(&frame.encode()).await {
                    warn!(?kind, error = %e, "animation frame not sent, stopping");
                    return;
                }
            }
            ticker.wait().await;

            debug!(?kind, "animation finished");
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pixelroll_protocol::FaceMask;
    use pixelroll_transport::Peripheral;
    use pixelroll_transport::memory::MemoryDie;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_start_spin_sends_every_frame_then_releases_slot() {
        let die = MemoryDie::new("Red");
        let link = Arc::new(die.open().await.unwrap());
        let controller = AnimationController::new();

        let handle = controller
            .start(AnimationJob::spin(0x00FF_0000), Arc::clone(&link))
            .unwrap();
        assert!(controller.is_running());

        handle.await.unwrap();

        assert!(!controller.is_running());
        let written = die.written();
        assert_eq!(written.len(), 50);
        assert!(written.iter().all(|w| w.len() == 15 && w[0] == 29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_returns_busy() {
        let die = MemoryDie::new("Red");
        let link = Arc::new(die.open().await.unwrap());
        let controller = AnimationController::new();

        let handle = controller
            .start(AnimationJob::pulse(0xFFFF_FFFF), Arc::clone(&link))
            .unwrap();
        let second = controller.start(AnimationJob::spin(1), Arc::clone(&link));
        assert!(matches!(second, Err(AnimationError::Busy)));

        handle.await.unwrap();
        // Only the pulse frames went out.
        assert_eq!(die.written().len(), 5);

        let third = controller.start(AnimationJob::spin(1), link);
        assert!(third.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_for_declared_duration() {
        let die = MemoryDie::new("Red");
        let link = Arc::new(die.open().await.unwrap());
        let controller = AnimationController::new();
        let start = tokio::time::Instant::now();

        let job = AnimationJob::pulse(0xFFFF_FFFF);
        let expected = job.duration();
        controller.start(job, link).unwrap().await.unwrap();

        assert_eq!(start.elapsed(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_write_is_rejected() {
        let die = MemoryDie::new("Old").without_write();
        let link = Arc::new(die.open().await.unwrap());
        let controller = AnimationController::new();

        let result = controller.start(AnimationJob::spin(1), link);

        assert!(matches!(result, Err(AnimationError::WriteUnavailable)));
        assert!(!controller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_stops_and_releases_slot() {
        let die = MemoryDie::new("Red");
        let link = Arc::new(die.open().await.unwrap());
        let controller = AnimationController::new();
        link.close().await.unwrap();

        controller
            .start(AnimationJob::spin(1), link)
            .unwrap()
            .await
            .unwrap();

        assert!(!controller.is_running());
        assert!(die.written().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_frame_lights_whole_die() {
        let die = MemoryDie::new("Red");
        let link = Arc::new(die.open().await.unwrap());
        let controller = AnimationController::new();

        controller
            .start(
                AnimationJob::blink(0x00FF_FFFF, 2, Duration::from_millis(600)),
                link,
            )
            .unwrap()
            .await
            .unwrap();

        let written = die.written();
        assert_eq!(written.len(), 1);
        let mask = u32::from_le_bytes([
            written[0][8],
            written[0][9],
            written[0][10],
            written[0][11],
        ]);
        assert_eq!(FaceMask(mask), FaceMask::ALL);
    }
}
