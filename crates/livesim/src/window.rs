use m3u8_rs::MediaSegment;

/// Segment entries without an uri carry no content to serve.
pub fn is_placeholder(segment: &MediaSegment) -> bool {
    segment.uri.is_empty()
}

/// Fixed rotation set the slider cycles through.
///
/// Built once from the source segment list. Placeholder entries (segments
/// without an uri) are dropped, everything else keeps its source order.
#[derive(Debug, Clone, Default)]
pub struct SegmentWindow {
    segments: Vec<MediaSegment>,
}

impl SegmentWindow {
    pub fn new(source: &[MediaSegment]) -> Self {
        let segments = source
            .iter()
            .filter(|segment| !is_placeholder(segment))
            .cloned()
            .collect();

        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[MediaSegment] {
        &self.segments
    }

    /// Returns the segment at `cursor` and the cursor that follows it,
    /// wrapping back to 0 after the last segment.
    pub fn next(&self, cursor: usize) -> Option<(&MediaSegment, usize)> {
        if self.segments.is_empty() {
            return None;
        }

        let len = self.segments.len();
        let index = cursor % len;
        Some((&self.segments[index], (index + 1) % len))
    }
}
