use std::sync::{Arc, Barrier, Condvar, Mutex};
use std::thread;

use crossbeam_deque::{Injector, Steal};
use rayon::prelude::*;

use crate::access::{AccessMode, Accessor, Binding, FaultCell, LocalScratch};
use crate::buffer::{BufferEntry, BufferId, DepState, DeviceStore};
use crate::config::get_runtime_flags;
use crate::error::{ConfigError, EngineError, RuntimeError};
use crate::grid::{ExecutionGrid, WorkItem};
use crate::kernel::{Kernel, KernelCtx};
use crate::shape::{decode_index, Shape};
use crate::worker_budget::worker_budget;

/// Handle for one enqueued submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionToken(pub usize);

#[derive(Debug, Clone)]
enum Status {
    Pending,
    Done,
    Failed(RuntimeError),
}

struct SubmissionState {
    id: usize,
    status: Mutex<Status>,
    cv: Condvar,
}

impl SubmissionState {
    fn new(id: usize) -> Self {
        Self {
            id,
            status: Mutex::new(Status::Pending),
            cv: Condvar::new(),
        }
    }

    fn finish(&self, status: Status) {
        *self.status.lock().unwrap() = status;
        self.cv.notify_all();
    }

    fn wait_done(&self) -> Result<(), RuntimeError> {
        let mut st = self.status.lock().unwrap();
        loop {
            match &*st {
                Status::Done => return Ok(()),
                Status::Failed(e) => return Err(e.clone()),
                Status::Pending => st = self.cv.wait(st).unwrap(),
            }
        }
    }
}

/// Everything an executor thread needs to run one submission.
struct ExecPlan {
    kernel: Kernel,
    grid: ExecutionGrid,
    accessors: Vec<Accessor>,
    scratch_shapes: Vec<Shape>,
    fault: Arc<FaultCell>,
    parallel_groups: bool,
    workers: usize,
}

struct QueueInner {
    buffers: Mutex<Vec<BufferEntry>>,
    deps: Mutex<Vec<DepState>>,
    submissions: Mutex<Vec<Arc<SubmissionState>>>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

/// Accepts kernel submissions, derives producer/consumer ordering from
/// the buffers they touch, and executes them on host threads.
/// Submissions with disjoint buffer sets run concurrently; the buffer
/// dependency rule is the only cross-submission ordering.
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl Queue {
    pub fn new() -> Self {
        crate::cpu::init_parallel_runtime();
        crate::worker_budget::prime();
        Self {
            inner: Arc::new(QueueInner {
                buffers: Mutex::new(Vec::new()),
                deps: Mutex::new(Vec::new()),
                submissions: Mutex::new(Vec::new()),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a device buffer initialized from a host array.
    pub fn create_buffer(&self, data: &[f32], shape: Shape) -> Result<BufferId, ConfigError> {
        shape.validate()?;
        if shape.len() != data.len() {
            return Err(ConfigError::HostLengthMismatch {
                expected: shape.len(),
                got: data.len(),
            });
        }
        Ok(self.push_entry(Arc::new(DeviceStore::from_slice(data)), shape, 1, None))
    }

    /// Creates a zero-filled device buffer with no host source, the
    /// usual shape of an output buffer.
    pub fn create_uninit(&self, shape: Shape) -> Result<BufferId, ConfigError> {
        shape.validate()?;
        Ok(self.push_entry(Arc::new(DeviceStore::zeroed(shape.len())), shape, 1, None))
    }

    /// Reinterprets a scalar buffer as a grid of vector-of-4 elements.
    /// A view, not a copy: it shares the store and the dependency root,
    /// and the component order equals adjacent-scalar order.
    pub fn reinterpret_vec4(&self, id: BufferId, shape: Shape) -> Result<BufferId, ConfigError> {
        shape.validate()?;
        let (store, root, scalar_elems) = {
            let buffers = self.inner.buffers.lock().unwrap();
            let entry = buffers.get(id.0).ok_or(ConfigError::UnknownBuffer(id.0))?;
            (entry.store.clone(), entry.root, entry.store.len())
        };
        if shape.len() * 4 != scalar_elems {
            return Err(ConfigError::BadReinterpret {
                scalar_elems,
                vec_elems: shape.len(),
            });
        }
        Ok(self.push_entry(store, shape, 4, Some(root)))
    }

    fn push_entry(
        &self,
        store: Arc<DeviceStore>,
        shape: Shape,
        lanes: usize,
        root: Option<usize>,
    ) -> BufferId {
        let mut buffers = self.inner.buffers.lock().unwrap();
        let mut deps = self.inner.deps.lock().unwrap();
        let id = buffers.len();
        buffers.push(BufferEntry {
            store,
            shape,
            lanes,
            root: root.unwrap_or(id),
        });
        deps.push(DepState::default());
        BufferId(id)
    }

    /// Enqueues one kernel over one grid with the given bindings.
    /// Non-blocking: validation happens here, execution on a spawned
    /// thread ordered after the submissions this one depends on.
    pub fn submit(
        &self,
        kernel: Kernel,
        grid: ExecutionGrid,
        bindings: &[Binding],
    ) -> Result<SubmissionToken, ConfigError> {
        grid.validate()?;

        let mut buffer_bindings: Vec<(BufferId, AccessMode)> = Vec::new();
        let mut scratch_shapes: Vec<Shape> = Vec::new();
        for binding in bindings {
            match binding {
                Binding::Local(shape) => {
                    shape.validate()?;
                    scratch_shapes.push(shape.clone());
                }
                other => {
                    let mode = other.mode().unwrap_or(AccessMode::ReadOnly);
                    let id = match other {
                        Binding::Read(id) | Binding::Write(id) | Binding::ReadWrite(id) => *id,
                        Binding::Local(_) => unreachable!(),
                    };
                    buffer_bindings.push((id, mode));
                }
            }
        }

        if !scratch_shapes.is_empty() && !grid.is_partitioned() {
            return Err(ConfigError::LocalScratchWithoutPartition);
        }
        if kernel.needs_partition() && !grid.is_partitioned() {
            return Err(ConfigError::PartitionRequired {
                kernel: kernel.name(),
            });
        }

        let (modes, scratch_count) = kernel.signature();
        if buffer_bindings.len() != modes.len() {
            return Err(ConfigError::BindingCount {
                kernel: kernel.name(),
                expected: modes.len(),
                got: buffer_bindings.len(),
            });
        }
        for (slot, ((_, got), expected)) in buffer_bindings.iter().zip(modes.iter()).enumerate() {
            if got != expected {
                return Err(ConfigError::BindingMode {
                    kernel: kernel.name(),
                    slot,
                    expected: expected.name(),
                    got: got.name(),
                });
            }
        }
        if scratch_shapes.len() != scratch_count {
            return Err(ConfigError::ScratchCount {
                kernel: kernel.name(),
                expected: scratch_count,
                got: scratch_shapes.len(),
            });
        }

        // Resolve handles against the registry.
        let mut resolved: Vec<(Arc<DeviceStore>, Shape, usize, usize, AccessMode)> = Vec::new();
        {
            let buffers = self.inner.buffers.lock().unwrap();
            for (id, mode) in &buffer_bindings {
                let entry = buffers.get(id.0).ok_or(ConfigError::UnknownBuffer(id.0))?;
                resolved.push((
                    entry.store.clone(),
                    entry.shape.clone(),
                    entry.lanes,
                    entry.root,
                    *mode,
                ));
            }
        }

        // One in-flight writer per buffer: two writable accessors on
        // the same root (directly or through a view) are rejected.
        let mut writer_roots: Vec<usize> = resolved
            .iter()
            .filter(|(_, _, _, _, mode)| mode.writes())
            .map(|(_, _, _, root, _)| *root)
            .collect();
        writer_roots.sort_unstable();
        for pair in writer_roots.windows(2) {
            if pair[0] == pair[1] {
                return Err(ConfigError::MultipleWriters { buffer: pair[0] });
            }
        }

        let accessor_shapes: Vec<(Shape, usize)> = resolved
            .iter()
            .map(|(_, shape, lanes, _, _)| (shape.clone(), *lanes))
            .collect();
        kernel.validate(&grid, &accessor_shapes, &scratch_shapes)?;

        // Register the submission and compute its ordering edges.
        let (state, dep_states) = {
            let mut submissions = self.inner.submissions.lock().unwrap();
            let mut deps = self.inner.deps.lock().unwrap();
            let id = submissions.len();

            let mut dep_tokens: Vec<usize> = Vec::new();
            for (_, _, _, root, mode) in &resolved {
                let dep = &mut deps[*root];
                if mode.reads() {
                    if let Some(w) = dep.last_writer {
                        dep_tokens.push(w);
                    }
                }
                if mode.writes() {
                    if let Some(w) = dep.last_writer {
                        dep_tokens.push(w);
                    }
                    dep_tokens.extend(dep.readers_since_write.iter().copied());
                }
            }
            dep_tokens.sort_unstable();
            dep_tokens.dedup();
            dep_tokens.retain(|&t| t != id);

            for (_, _, _, root, mode) in &resolved {
                let dep = &mut deps[*root];
                if mode.writes() {
                    dep.last_writer = Some(id);
                    dep.readers_since_write.clear();
                } else if mode.reads() {
                    dep.readers_since_write.push(id);
                }
            }

            let state = Arc::new(SubmissionState::new(id));
            submissions.push(state.clone());
            let dep_states: Vec<Arc<SubmissionState>> =
                dep_tokens.iter().map(|&t| submissions[t].clone()).collect();
            (state, dep_states)
        };

        let fault = Arc::new(FaultCell::new());
        let accessors: Vec<Accessor> = resolved
            .into_iter()
            .map(|(store, shape, lanes, _, mode)| Accessor {
                store,
                shape,
                lanes,
                mode,
                fault: fault.clone(),
            })
            .collect();

        let flags = get_runtime_flags().clone();
        let workers = flags
            .worker_threads
            .unwrap_or_else(|| worker_budget(grid.group_count()))
            .max(1);
        let plan = ExecPlan {
            kernel,
            grid,
            accessors,
            scratch_shapes,
            fault,
            parallel_groups: flags.parallel_groups,
            workers,
        };

        crate::trace(&format!(
            "submit #{} {} ({} deps)",
            state.id,
            plan.kernel.name(),
            dep_states.len()
        ));

        let thread_state = state.clone();
        let handle = thread::spawn(move || run_submission(thread_state, dep_states, plan));
        self.inner.handles.lock().unwrap().push(handle);

        Ok(SubmissionToken(state.id))
    }

    /// Blocks until every outstanding submission has completed.
    /// Surfaces the first failure in submission order and leaves the
    /// queue clean: the submission arena is emptied and per-buffer
    /// writer/reader tracking reset. Buffer contents survive.
    pub fn wait_all(&self) -> Result<(), RuntimeError> {
        let handles: Vec<_> = self.inner.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        let submissions: Vec<_> = self.inner.submissions.lock().unwrap().drain(..).collect();
        let mut first: Option<RuntimeError> = None;
        for state in &submissions {
            let status = state.status.lock().unwrap().clone();
            match status {
                Status::Failed(e) => {
                    if first.is_none() {
                        first = Some(e);
                    }
                }
                Status::Pending => {
                    // Executor thread died without reporting.
                    if first.is_none() {
                        first = Some(RuntimeError::KernelFault {
                            submission: state.id,
                            cause: "executor thread terminated without a result".to_string(),
                        });
                    }
                }
                Status::Done => {}
            }
        }

        for dep in self.inner.deps.lock().unwrap().iter_mut() {
            *dep = DepState::default();
        }

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Synchronizes one buffer back to a host array: waits for the
    /// buffer's outstanding writer, then copies. The copy happens even
    /// when the writer failed (best-effort partial result); the failure
    /// is returned after the copy.
    pub fn read_back(&self, id: BufferId, dst: &mut [f32]) -> Result<(), EngineError> {
        let (store, root) = {
            let buffers = self.inner.buffers.lock().unwrap();
            let entry = buffers
                .get(id.0)
                .ok_or(ConfigError::UnknownBuffer(id.0))?;
            (entry.store.clone(), entry.root)
        };
        if dst.len() != store.len() {
            return Err(ConfigError::HostLengthMismatch {
                expected: store.len(),
                got: dst.len(),
            }
            .into());
        }

        let writer = {
            let deps = self.inner.deps.lock().unwrap();
            let submissions = self.inner.submissions.lock().unwrap();
            deps[root]
                .last_writer
                .and_then(|t| submissions.get(t).cloned())
        };
        let outcome = match writer {
            Some(state) => state.wait_done(),
            None => Ok(()),
        };

        store.copy_into(dst);
        outcome.map_err(EngineError::from)
    }

    /// Snapshot convenience over `read_back`.
    pub fn take(&self, id: BufferId) -> Result<Vec<f32>, EngineError> {
        let len = {
            let buffers = self.inner.buffers.lock().unwrap();
            buffers
                .get(id.0)
                .ok_or(ConfigError::UnknownBuffer(id.0))?
                .store
                .len()
        };
        let mut out = vec![0.0f32; len];
        self.read_back(id, &mut out)?;
        Ok(out)
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        if let Err(e) = self.wait_all() {
            crate::trace(&format!("wait_all on queue drop: {}", e));
        }
    }
}

fn run_submission(
    state: Arc<SubmissionState>,
    dep_states: Vec<Arc<SubmissionState>>,
    plan: ExecPlan,
) {
    for dep in &dep_states {
        if dep.wait_done().is_err() {
            state.finish(Status::Failed(RuntimeError::DependencyFailed {
                submission: state.id,
                dep: dep.id,
            }));
            return;
        }
    }

    execute_grid(&plan);

    match plan.fault.take() {
        Some(cause) => state.finish(Status::Failed(RuntimeError::KernelFault {
            submission: state.id,
            cause,
        })),
        None => state.finish(Status::Done),
    }
}

fn execute_grid(plan: &ExecPlan) {
    match &plan.grid.local {
        None => {
            // Embarrassingly parallel: no barriers, no scratch, any
            // iteration order.
            let rank = plan.grid.rank();
            (0..plan.grid.total()).into_par_iter().for_each(|linear| {
                let item = WorkItem::unpartitioned(rank, plan.grid.global.decode(linear));
                let ctx = KernelCtx {
                    item,
                    accessors: &plan.accessors,
                    scratch: &[],
                    barrier: None,
                    fault: &plan.fault,
                };
                plan.kernel.invoke(&ctx);
            });
        }
        Some(local) => execute_partitioned(plan, local),
    }
}

fn execute_partitioned(plan: &ExecPlan, local: &Shape) {
    let rank = plan.grid.rank();
    let group_dims = plan.grid.group_dims();
    let group_total = plan.grid.group_count();
    let group_size = local.len();

    let mut local_range = [1usize; crate::shape::MAX_RANK];
    for d in 0..rank {
        local_range[d] = local.dims[d];
    }

    // One work-group: one thread per work-item around a counting
    // barrier, so a barrier() really is a mutual rendezvous.
    let run_group = |group_linear: usize| {
        let group_idx = decode_index(&group_dims[..rank], group_linear);
        let scratch: Vec<LocalScratch> = plan
            .scratch_shapes
            .iter()
            .map(|s| LocalScratch::new(s.clone(), plan.fault.clone()))
            .collect();
        let barrier = Barrier::new(group_size);

        thread::scope(|scope| {
            for l in 0..group_size {
                let local_idx = decode_index(&local.dims, l);
                let item = WorkItem::partitioned(rank, group_idx, local_idx, local_range);
                let scratch = &scratch;
                let barrier = &barrier;
                scope.spawn(move || {
                    let ctx = KernelCtx {
                        item,
                        accessors: &plan.accessors,
                        scratch,
                        barrier: Some(barrier),
                        fault: &plan.fault,
                    };
                    plan.kernel.invoke(&ctx);
                });
            }
        });
    };

    if !plan.parallel_groups || group_total == 1 {
        for g in 0..group_total {
            run_group(g);
        }
        return;
    }

    // Work-stealing over group indices, one global injector shared by
    // the worker threads.
    let injector: Injector<usize> = Injector::new();
    for g in 0..group_total {
        injector.push(g);
    }
    let workers = plan.workers.min(group_total).max(1);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                match injector.steal() {
                    Steal::Success(g) => run_group(g),
                    Steal::Retry => continue,
                    Steal::Empty => break,
                }
            });
        }
    });
}
