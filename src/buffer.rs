use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::shape::Shape;

/// Device-visible cell array backing one buffer.
///
/// Cells hold f32 bit patterns in atomics: distinct work-items write
/// distinct cells by contract, and a violated contract still reads a
/// whole value instead of torn bytes. Release/Acquire pairs with the
/// group barrier and thread joins for cross-thread visibility.
pub struct DeviceStore {
    cells: Vec<AtomicU32>,
}

impl DeviceStore {
    pub fn zeroed(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicU32::new(0.0f32.to_bits())).collect(),
        }
    }

    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            cells: data.iter().map(|v| AtomicU32::new(v.to_bits())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn load(&self, idx: usize) -> f32 {
        f32::from_bits(self.cells[idx].load(Ordering::Acquire))
    }

    pub fn store(&self, idx: usize, v: f32) {
        self.cells[idx].store(v.to_bits(), Ordering::Release);
    }

    pub fn snapshot(&self) -> Vec<f32> {
        self.cells
            .iter()
            .map(|c| f32::from_bits(c.load(Ordering::Acquire)))
            .collect()
    }

    pub fn copy_into(&self, dst: &mut [f32]) {
        for (i, slot) in dst.iter_mut().enumerate().take(self.cells.len()) {
            *slot = f32::from_bits(self.cells[i].load(Ordering::Acquire));
        }
    }
}

/// Integer handle into the queue's flat buffer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// Registry entry. Reinterpreted views share the store and the `root`
/// id, so dependency tracking sees aliases as one buffer.
pub(crate) struct BufferEntry {
    pub store: Arc<DeviceStore>,
    pub shape: Shape,
    /// 1 for scalar buffers, 4 for vector-of-4 views.
    pub lanes: usize,
    pub root: usize,
}

/// Per-root producer/consumer tracking used to compute ordering edges
/// at submission-build time.
#[derive(Default)]
pub(crate) struct DepState {
    pub last_writer: Option<usize>,
    pub readers_since_write: Vec<usize>,
}
