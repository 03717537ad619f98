use m3u8_rs::{MediaPlaylist, MediaSegment};
use parking_lot::RwLock;

use crate::{
    error::{LiveSimError, LiveSimResult},
    playlist::render_media,
    window::is_placeholder,
};

/// Served playlist state without synchronisation.
///
/// Placeholder entries are dropped on load. The segment list never grows
/// past `capacity`, which is fixed to the number of remaining segments, the
/// same count the slider's window rotates through.
#[derive(Debug, Clone)]
pub struct LivePlaylist {
    playlist: MediaPlaylist,
    capacity: usize,
    pending_discontinuity: bool,
}

impl LivePlaylist {
    pub fn new(mut playlist: MediaPlaylist) -> Self {
        playlist.segments.retain(|segment| !is_placeholder(segment));
        let capacity = playlist.segments.len();
        Self {
            playlist,
            capacity,
            pending_discontinuity: false,
        }
    }

    pub fn playlist(&self) -> &MediaPlaylist {
        &self.playlist
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.playlist.end_list
    }

    pub fn has_pending_discontinuity(&self) -> bool {
        self.pending_discontinuity
    }

    /// Drops the head segment and moves the media sequence forward.
    pub fn remove_oldest(&mut self) -> LiveSimResult<MediaSegment> {
        if self.playlist.segments.is_empty() {
            return Err(LiveSimError::PlaylistEmpty);
        }

        let removed = self.playlist.segments.remove(0);
        if !self.is_closed() {
            self.playlist.media_sequence += 1;
            if removed.discontinuity {
                self.playlist.discontinuity_sequence += 1;
            }
        }
        Ok(removed)
    }

    /// Appends a copy of `segment`, attaching the pending discontinuity if any.
    pub fn append_segment(&mut self, segment: &MediaSegment) -> LiveSimResult<()> {
        if self.playlist.segments.len() >= self.capacity {
            return Err(LiveSimError::PlaylistFull(self.capacity));
        }

        let mut segment = segment.clone();
        if std::mem::take(&mut self.pending_discontinuity) {
            segment.discontinuity = true;
        }
        self.playlist.segments.push(segment);
        Ok(())
    }

    pub fn mark_next_discontinuity(&mut self) {
        self.pending_discontinuity = true;
    }

    /// Reverts a successful `remove_oldest`.
    fn restore_oldest(&mut self, segment: MediaSegment) {
        if !self.is_closed() {
            self.playlist.media_sequence -= 1;
            if segment.discontinuity {
                self.playlist.discontinuity_sequence -= 1;
            }
        }
        self.playlist.segments.insert(0, segment);
    }
}

/// The single playlist instance shared by the slider and every request.
///
/// The slider is the only writer. Each slide happens under one write lock,
/// so a render always sees the playlist either before or after a slide.
#[derive(Debug)]
pub struct PlaylistStore {
    inner: RwLock<LivePlaylist>,
}

impl PlaylistStore {
    pub fn new(playlist: MediaPlaylist) -> Self {
        Self {
            inner: RwLock::new(LivePlaylist::new(playlist)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().is_closed()
    }

    /// Current visible segments, in order.
    pub fn segments(&self) -> Vec<MediaSegment> {
        self.inner.read().playlist().segments.clone()
    }

    pub fn snapshot(&self) -> MediaPlaylist {
        self.inner.read().playlist().clone()
    }

    pub fn mark_next_discontinuity(&self) {
        self.inner.write().mark_next_discontinuity();
    }

    /// Moves the head segment out and `segment` in, as one update.
    ///
    /// With `mark_after` the segment appended by the following slide is
    /// flagged as a discontinuity. Nothing changes when this returns an error.
    pub fn slide(&self, segment: &MediaSegment, mark_after: bool) -> LiveSimResult<()> {
        let mut playlist = self.inner.write();

        let removed = playlist.remove_oldest()?;
        if let Err(e) = playlist.append_segment(segment) {
            playlist.restore_oldest(removed);
            return Err(e);
        }

        if mark_after {
            playlist.mark_next_discontinuity();
        }
        Ok(())
    }

    pub fn render(&self) -> LiveSimResult<Vec<u8>> {
        let playlist = self.inner.read();
        render_media(playlist.playlist())
    }
}
