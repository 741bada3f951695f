use tracing::{trace, warn};

use super::error::{BufferError, BufferResult};
use super::frame::FrameDescriptor;
use super::FrameId;

/// Second-chance (clock) victim selection
///
/// The hand sweeps the frames in order. A referenced frame loses its bit and
/// survives the pass; a pinned frame is skipped; the first frame that is
/// either empty or unpinned and unreferenced is chosen. The search gives up
/// after `2 * num_frames` inspections, which is enough for every frame to
/// spend its second chance.
#[derive(Debug)]
pub struct ClockReplacer {
    hand: FrameId,
    num_frames: usize,
}

impl ClockReplacer {
    /// The hand starts one position behind frame 0 so the first sweep begins there
    pub fn new(num_frames: usize) -> Self {
        Self {
            hand: num_frames.saturating_sub(1),
            num_frames,
        }
    }

    /// Current hand position
    pub fn hand(&self) -> FrameId {
        self.hand
    }

    /// Choose the next victim frame.
    ///
    /// The returned frame is either unoccupied or occupied, unpinned and
    /// unreferenced. Evicting its page (write-back, page table cleanup) is the
    /// caller's job. Clears referenced bits along the way.
    pub fn pick_victim(&mut self, frames: &mut [FrameDescriptor]) -> BufferResult<FrameId> {
        debug_assert_eq!(frames.len(), self.num_frames);

        for _ in 0..2 * self.num_frames {
            self.advance();
            let desc = &mut frames[self.hand];

            if !desc.occupied {
                trace!(frame = self.hand, "clock found empty frame");
                return Ok(self.hand);
            }
            if desc.referenced {
                desc.referenced = false;
                continue;
            }
            if desc.is_pinned() {
                continue;
            }

            trace!(frame = self.hand, "clock chose victim");
            return Ok(self.hand);
        }

        warn!(num_frames = self.num_frames, "no evictable frame in buffer pool");
        Err(BufferError::BufferExceeded {
            num_frames: self.num_frames,
        })
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.num_frames;
    }
}
