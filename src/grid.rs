use crate::error::ConfigError;
use crate::shape::{Shape, MAX_RANK};

/// Global index space plus an optional work-group partition of it.
#[derive(Debug, Clone)]
pub struct ExecutionGrid {
    pub global: Shape,
    pub local: Option<Shape>,
}

impl ExecutionGrid {
    pub fn new(global: Shape) -> Self {
        Self { global, local: None }
    }

    pub fn partitioned(global: Shape, local: Shape) -> Self {
        Self {
            global,
            local: Some(local),
        }
    }

    pub fn rank(&self) -> usize {
        self.global.rank()
    }

    pub fn is_partitioned(&self) -> bool {
        self.local.is_some()
    }

    /// Total work-item count.
    pub fn total(&self) -> usize {
        self.global.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global.validate()?;
        if let Some(local) = &self.local {
            local.validate()?;
            if local.rank() != self.global.rank() {
                return Err(ConfigError::LocalRankMismatch {
                    global: self.global.rank(),
                    local: local.rank(),
                });
            }
            for d in 0..self.global.rank() {
                if self.global.dims[d] % local.dims[d] != 0 {
                    return Err(ConfigError::LocalDoesNotDivide {
                        dim: d,
                        global: self.global.dims[d],
                        local: local.dims[d],
                    });
                }
            }
        }
        Ok(())
    }

    /// Work-group grid extents (global / local per dimension). Only
    /// meaningful on a partitioned grid; unused dimensions stay 1.
    pub fn group_dims(&self) -> [usize; MAX_RANK] {
        let mut dims = [1usize; MAX_RANK];
        if let Some(local) = &self.local {
            for d in 0..self.global.rank() {
                dims[d] = self.global.dims[d] / local.dims[d];
            }
        }
        dims
    }

    pub fn group_count(&self) -> usize {
        self.group_dims().iter().product()
    }

    /// Derives (work-group index, local index) for a global index:
    /// group = floor(g / local), local = g mod local, per dimension.
    pub fn split(&self, global: [usize; MAX_RANK]) -> ([usize; MAX_RANK], [usize; MAX_RANK]) {
        let mut group = [0usize; MAX_RANK];
        let mut local_idx = [0usize; MAX_RANK];
        if let Some(local) = &self.local {
            for d in 0..self.global.rank() {
                group[d] = global[d] / local.dims[d];
                local_idx[d] = global[d] % local.dims[d];
            }
        }
        (group, local_idx)
    }
}

/// The identity of one unit of parallel execution.
#[derive(Debug, Clone, Copy)]
pub struct WorkItem {
    pub rank: usize,
    pub partitioned: bool,
    global: [usize; MAX_RANK],
    local: [usize; MAX_RANK],
    group: [usize; MAX_RANK],
    local_range: [usize; MAX_RANK],
}

impl WorkItem {
    pub(crate) fn unpartitioned(rank: usize, global: [usize; MAX_RANK]) -> Self {
        Self {
            rank,
            partitioned: false,
            global,
            local: [0; MAX_RANK],
            group: [0; MAX_RANK],
            local_range: [1; MAX_RANK],
        }
    }

    pub(crate) fn partitioned(
        rank: usize,
        group: [usize; MAX_RANK],
        local: [usize; MAX_RANK],
        local_range: [usize; MAX_RANK],
    ) -> Self {
        let mut global = [0usize; MAX_RANK];
        for d in 0..rank {
            global[d] = group[d] * local_range[d] + local[d];
        }
        Self {
            rank,
            partitioned: true,
            global,
            local,
            group,
            local_range,
        }
    }

    pub fn global_id(&self, d: usize) -> usize {
        self.global[d]
    }

    pub fn local_id(&self, d: usize) -> usize {
        self.local[d]
    }

    pub fn group_id(&self, d: usize) -> usize {
        self.group[d]
    }

    pub fn local_size(&self, d: usize) -> usize {
        self.local_range[d]
    }
}
