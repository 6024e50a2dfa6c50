use crate::constants::DEFAULT_WORKERS;
use crate::error::Error;
use crate::models::{ImageTask, TaskRecord};
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Process-wide abort signal shared by the processor and the Ctrl-C handler
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag and report whether it was already raised, so a second
    /// interrupt can be told apart from the first
    pub fn signal(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }
}

/// Runs one unit of work per image with at most `worker_limit` running at once.
///
/// Every task yields exactly one [`TaskRecord`]. Records arrive in completion order,
/// not input order. Errors and panics stay inside their own record. Once the cancel
/// flag is raised, running work finishes and tasks that have not started yet are
/// recorded as [`Error::Cancelled`].
#[derive(Debug, Clone)]
pub struct ParallelProcessor {
    worker_limit: usize,
    cancel: CancelFlag,
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ParallelProcessor {
    /// Create a processor; a limit of 0 is treated as 1
    pub fn new(worker_limit: usize) -> Self {
        Self {
            worker_limit: worker_limit.max(1),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Run `work` over every task and collect all records
    pub async fn process_all<T, F, Fut>(&self, tasks: Vec<ImageTask>, work: F) -> Vec<TaskRecord<T>>
    where
        T: Send + 'static,
        F: Fn(ImageTask) -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.process_all_with_progress(tasks, work, |_, _, _| {}).await
    }

    /// Same as [`process_all`](Self::process_all), calling `progress(record, completed, total)`
    /// as each record arrives
    pub async fn process_all_with_progress<T, F, Fut, P>(
        &self,
        tasks: Vec<ImageTask>,
        work: F,
        mut progress: P,
    ) -> Vec<TaskRecord<T>>
    where
        T: Send + 'static,
        F: Fn(ImageTask) -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
        P: FnMut(&TaskRecord<T>, usize, usize),
    {
        let total = tasks.len();
        let work = &work;
        let cancel = &self.cancel;

        let mut records = Vec::with_capacity(total);
        let mut pending = stream::iter(tasks)
            .map(|task| async move {
                if cancel.is_cancelled() {
                    debug!("{}: cancelled before start", task.source_path.display());
                    return TaskRecord {
                        task,
                        outcome: Err(Error::Cancelled),
                    };
                }

                let outcome = match tokio::spawn(work(task.clone())).await {
                    Ok(outcome) => outcome,
                    Err(join_error) => {
                        let message = if join_error.is_panic() {
                            panic_message(join_error.into_panic())
                        } else {
                            "worker task aborted".to_string()
                        };
                        warn!("{}: {}", task.source_path.display(), message);
                        Err(Error::WorkerPanicked(message))
                    }
                };
                TaskRecord { task, outcome }
            })
            .buffer_unordered(self.worker_limit);

        while let Some(record) = pending.next().await {
            progress(&record, records.len() + 1, total);
            records.push(record);
        }

        records
    }
}

/// Free-function form: run `work` over `tasks` with `worker_limit` workers
pub async fn process_all<T, F, Fut>(
    tasks: Vec<ImageTask>,
    worker_limit: usize,
    work: F,
) -> Vec<TaskRecord<T>>
where
    T: Send + 'static,
    F: Fn(ImageTask) -> Fut,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
{
    ParallelProcessor::new(worker_limit)
        .process_all(tasks, work)
        .await
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
