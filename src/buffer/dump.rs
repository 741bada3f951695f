use std::fmt;

use prettytable::{Table, format, row};
use serde::Serialize;

use super::FrameId;
use super::frame::FrameDescriptor;
use crate::file::{FileHandle, PageId};

/// State of one frame at the time of a dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub frame: FrameId,
    pub occupied: bool,
    pub file: Option<FileHandle>,
    pub page_id: Option<PageId>,
    pub pin_count: u32,
    pub modified: bool,
    pub referenced: bool,
}

/// Read-only snapshot of the whole buffer pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolDump {
    pub frames: Vec<FrameInfo>,
    pub valid_frames: usize,
}

impl PoolDump {
    pub(crate) fn capture(descriptors: &[FrameDescriptor]) -> Self {
        let frames: Vec<FrameInfo> = descriptors
            .iter()
            .enumerate()
            .map(|(frame, desc)| FrameInfo {
                frame,
                occupied: desc.occupied,
                file: desc.owner.map(|key| key.file),
                page_id: desc.owner.map(|key| key.page_id),
                pin_count: desc.pin_count,
                modified: desc.modified,
                referenced: desc.referenced,
            })
            .collect();
        let valid_frames = frames.iter().filter(|info| info.occupied).count();

        Self {
            frames,
            valid_frames,
        }
    }
}

impl fmt::Display for PoolDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["Frame", "Valid", "File", "Page", "Pins", "Dirty", "Ref"]);

        for info in &self.frames {
            let file = info.file.map_or_else(|| "-".to_string(), |file| file.to_string());
            let page = info.page_id.map_or_else(|| "-".to_string(), |page| page.to_string());
            table.add_row(row![
                info.frame,
                info.occupied,
                file,
                page,
                info.pin_count,
                info.modified,
                info.referenced
            ]);
        }

        write!(f, "{}", table)?;
        writeln!(f, "Total Number of Valid Frames: {}", self.valid_frames)
    }
}
