use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::buffer::{BufferId, DeviceStore};
use crate::shape::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(&self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn writes(&self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "read-only",
            AccessMode::WriteOnly => "write-only",
            AccessMode::ReadWrite => "read-write",
        }
    }
}

/// One entry in the ordered binding list of a submission.
#[derive(Debug, Clone)]
pub enum Binding {
    Read(BufferId),
    Write(BufferId),
    ReadWrite(BufferId),
    /// Declares a work-group-private scratch array with the given tile
    /// shape. Only valid on a partitioned grid.
    Local(Shape),
}

impl Binding {
    pub(crate) fn mode(&self) -> Option<AccessMode> {
        match self {
            Binding::Read(_) => Some(AccessMode::ReadOnly),
            Binding::Write(_) => Some(AccessMode::WriteOnly),
            Binding::ReadWrite(_) => Some(AccessMode::ReadWrite),
            Binding::Local(_) => None,
        }
    }
}

/// First kernel fault raised during one submission. Faulting accessors
/// record here and keep going, so every work-item still reaches every
/// barrier; the fault surfaces from `wait_all`.
pub struct FaultCell {
    raised: AtomicBool,
    msg: Mutex<Option<String>>,
}

impl FaultCell {
    pub fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
            msg: Mutex::new(None),
        }
    }

    pub fn raise(&self, cause: String) {
        if !self.raised.swap(true, Ordering::SeqCst) {
            *self.msg.lock().unwrap() = Some(cause);
        }
    }

    pub fn raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    pub fn take(&self) -> Option<String> {
        self.msg.lock().unwrap().take()
    }
}

/// Mode-scoped view of exactly one buffer for exactly one submission.
///
/// Out-of-bounds indices and mode violations do not panic: loads yield
/// 0.0, stores are dropped, and the fault is recorded. That keeps
/// work-groups deadlock-free around barriers.
pub struct Accessor {
    pub(crate) store: Arc<DeviceStore>,
    pub(crate) shape: Shape,
    pub(crate) lanes: usize,
    pub(crate) mode: AccessMode,
    pub(crate) fault: Arc<FaultCell>,
}

impl Accessor {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    fn offset(&self, idx: &[usize]) -> Option<usize> {
        match self.shape.offset_of(idx) {
            Some(off) => Some(off),
            None => {
                self.fault.raise(format!(
                    "accessor index {:?} out of bounds for shape {:?}",
                    idx, self.shape.dims
                ));
                None
            }
        }
    }

    pub fn load(&self, idx: &[usize]) -> f32 {
        if !self.mode.reads() {
            self.fault.raise("load through a write-only accessor".to_string());
            return 0.0;
        }
        if self.lanes != 1 {
            self.fault.raise("scalar load through a vector-of-4 accessor".to_string());
            return 0.0;
        }
        match self.offset(idx) {
            Some(off) => self.store.load(off),
            None => 0.0,
        }
    }

    pub fn store(&self, idx: &[usize], v: f32) {
        if !self.mode.writes() {
            self.fault.raise("store through a read-only accessor".to_string());
            return;
        }
        if self.lanes != 1 {
            self.fault.raise("scalar store through a vector-of-4 accessor".to_string());
            return;
        }
        if let Some(off) = self.offset(idx) {
            self.store.store(off, v);
        }
    }

    /// Reads the 4 adjacent scalars of one vector element. Component
    /// order equals adjacent-element order in the scalar layout.
    pub fn load_vec(&self, idx: &[usize]) -> [f32; 4] {
        if !self.mode.reads() {
            self.fault.raise("load through a write-only accessor".to_string());
            return [0.0; 4];
        }
        if self.lanes != 4 {
            self.fault.raise("vector load through a scalar accessor".to_string());
            return [0.0; 4];
        }
        match self.offset(idx) {
            Some(off) => {
                let base = off * 4;
                [
                    self.store.load(base),
                    self.store.load(base + 1),
                    self.store.load(base + 2),
                    self.store.load(base + 3),
                ]
            }
            None => [0.0; 4],
        }
    }

    pub fn store_vec(&self, idx: &[usize], v: [f32; 4]) {
        if !self.mode.writes() {
            self.fault.raise("store through a read-only accessor".to_string());
            return;
        }
        if self.lanes != 4 {
            self.fault.raise("vector store through a scalar accessor".to_string());
            return;
        }
        if let Some(off) = self.offset(idx) {
            let base = off * 4;
            for (c, &val) in v.iter().enumerate() {
                self.store.store(base + c, val);
            }
        }
    }
}

/// Work-group-private ephemeral array. Allocated zeroed per group
/// (content is still contractually undefined at entry), never visible
/// outside its group, discarded when the group completes.
pub struct LocalScratch {
    store: DeviceStore,
    shape: Shape,
    fault: Arc<FaultCell>,
}

impl LocalScratch {
    pub(crate) fn new(shape: Shape, fault: Arc<FaultCell>) -> Self {
        Self {
            store: DeviceStore::zeroed(shape.len()),
            shape,
            fault,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn load(&self, idx: &[usize]) -> f32 {
        match self.shape.offset_of(idx) {
            Some(off) => self.store.load(off),
            None => {
                self.fault.raise(format!(
                    "scratch index {:?} out of bounds for tile shape {:?}",
                    idx, self.shape.dims
                ));
                0.0
            }
        }
    }

    pub fn store(&self, idx: &[usize], v: f32) {
        match self.shape.offset_of(idx) {
            Some(off) => self.store.store(off, v),
            None => {
                self.fault.raise(format!(
                    "scratch index {:?} out of bounds for tile shape {:?}",
                    idx, self.shape.dims
                ));
            }
        }
    }
}
