use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LiveSimError, LiveSimResult},
    store::PlaylistStore,
    window::SegmentWindow,
};

pub const DEFAULT_SLIDE_INTERVAL: Duration = Duration::from_secs(3);

/// Background mutator moving the served window forward one segment per tick.
///
/// The visible sequence at creation time ends with the last source segment,
/// so it already counts as a completed rotation: the first re-appended
/// segment is flagged as a discontinuity, and so is every later re-append of
/// the first source segment.
pub struct Slider {
    store: Arc<PlaylistStore>,
    window: SegmentWindow,
    cursor: usize,
    period: Duration,
    ticks: Arc<AtomicU64>,
}

impl Slider {
    pub fn new(store: Arc<PlaylistStore>, period: Duration) -> Self {
        let window = SegmentWindow::new(&store.segments());
        Self::with_window(store, window, period)
    }

    /// Slides `window` through `store`, which normally holds the same
    /// segments the window was built from.
    pub fn with_window(
        store: Arc<PlaylistStore>,
        window: SegmentWindow,
        period: Duration,
    ) -> Self {
        if !store.is_closed() && !window.is_empty() {
            store.mark_next_discontinuity();
        }

        Self {
            store,
            window,
            cursor: 0,
            // tokio intervals reject a zero period
            period: period.max(Duration::from_millis(1)),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn window(&self) -> &SegmentWindow {
        &self.window
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Successful slides so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Performs one slide. The cursor only advances when the store accepted
    /// the segment, so a failed tick never skips part of the rotation.
    pub fn step(&mut self) -> LiveSimResult<()> {
        let (segment, next_cursor) = self
            .window
            .next(self.cursor)
            .ok_or(LiveSimError::EmptyRotation)?;

        self.store.slide(segment, next_cursor == 0)?;
        self.cursor = next_cursor;
        self.ticks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Ticks every `period` until `cancel` fires. Returns at once for a
    /// closed playlist.
    pub async fn run(mut self, cancel: CancellationToken) {
        if self.store.is_closed() {
            log::debug!("Playlist is closed, slider exits without ticking");
            return;
        }

        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Slider stopped after {} ticks", self.ticks());
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.step() {
                        log::warn!("Slide skipped at cursor {}: {e}", self.cursor);
                    } else {
                        log::debug!("Slid to cursor {}", self.cursor);
                    }
                }
            }
        }
    }

    /// Starts the slider as a background task bound to `cancel`.
    pub fn spawn(self, cancel: CancellationToken) -> LiveSimResult<SliderHandle> {
        if self.window.is_empty() {
            return Err(LiveSimError::EmptyRotation);
        }

        log::info!(
            "Starting slider over {} segments, every {:?}",
            self.window.len(),
            self.period
        );
        let ticks = self.ticks.clone();
        let join = tokio::spawn(self.run(cancel.clone()));

        Ok(SliderHandle {
            ticks,
            cancel,
            join,
        })
    }
}

pub struct SliderHandle {
    ticks: Arc<AtomicU64>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SliderHandle {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancels the slider and waits for its task to end.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            log::error!("Slider task failed: {e}");
        }
    }
}
