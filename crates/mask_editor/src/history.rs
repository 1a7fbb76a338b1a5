use std::collections::VecDeque;

use image::RgbaImage;
use tracing::debug;

/// Linear undo/redo over full raster snapshots.
///
/// Always holds at least one entry (the loaded state). `index` points at
/// the snapshot matching the canvas.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    stack: VecDeque<RgbaImage>,
    index: usize,
    capacity: usize,
}

impl HistoryManager {
    pub fn new(initial: RgbaImage, capacity: usize) -> Self {
        let mut stack = VecDeque::with_capacity(capacity.max(1));
        stack.push_back(initial);
        Self { stack, index: 0, capacity: capacity.max(1) }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.stack.len()
    }

    pub fn current(&self) -> &RgbaImage {
        &self.stack[self.index]
    }

    /// Push `canvas` after the current entry, dropping any redo tail and
    /// evicting the oldest entry once over capacity.
    pub fn snapshot(&mut self, canvas: &RgbaImage) {
        self.stack.truncate(self.index + 1);
        self.stack.push_back(canvas.clone());
        self.index += 1;

        while self.stack.len() > self.capacity {
            self.stack.pop_front();
            self.index -= 1;
        }
        debug!("History snapshot {}/{}", self.index + 1, self.stack.len());
    }

    pub fn undo(&mut self) -> Option<&RgbaImage> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        debug!("Undo to {}/{}", self.index + 1, self.stack.len());
        Some(&self.stack[self.index])
    }

    pub fn redo(&mut self) -> Option<&RgbaImage> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        debug!("Redo to {}/{}", self.index + 1, self.stack.len());
        Some(&self.stack[self.index])
    }
}
