use std::cmp::min;
use std::sync::Arc;

use futures::Future;
use futures::future;
use futures_cpupool;

use errors::*;
use job::MapReduceJob;
use split::InputBin;

type Task = Box<dyn FnOnce() -> Result<()> + Send>;

/// `PhaseExecutor` runs the tasks of a phase on a bounded pool and joins them before returning.
///
/// At most `max_concurrency` tasks of a phase run at once. The remainder are queued on the pool
/// and start as running tasks finish. The first task failure resolves the phase with a
/// `TaskFailure` naming the bin or partition; queued tasks that have not started are dropped.
pub struct PhaseExecutor {
    max_concurrency: usize,
}

impl PhaseExecutor {
    pub fn new(max_concurrency: usize) -> Self {
        PhaseExecutor { max_concurrency }
    }

    /// Runs one mapper task per bin and blocks until all of them have completed.
    pub fn run_map_phase<J>(&self, job: &Arc<J>, bins: Vec<InputBin>) -> Result<()>
    where
        J: MapReduceJob + 'static,
    {
        info!("Starting map phase with {} bins", bins.len());
        let tasks = bins.into_iter()
            .map(|bin| {
                let name = format!("map bin {}", bin.id);
                let job = Arc::clone(job);
                let task: Task = Box::new(move || job.run_mapper(bin.id, &bin));
                (name, task)
            })
            .collect();

        self.run_phase("map", tasks)?;
        info!("Map phase complete");
        Ok(())
    }

    /// Runs one reducer task for every partition in `[0, partition_count)`, including partitions
    /// no mapper wrote to, and blocks until all of them have completed.
    pub fn run_reduce_phase<J>(&self, job: &Arc<J>, partition_count: u64) -> Result<()>
    where
        J: MapReduceJob + 'static,
    {
        info!("Starting reduce phase with {} partitions", partition_count);
        let tasks = (0..partition_count)
            .map(|partition| {
                let job = Arc::clone(job);
                let task: Task = Box::new(move || job.run_reducer(partition));
                (format!("reduce partition {}", partition), task)
            })
            .collect();

        self.run_phase("reduce", tasks)?;
        info!("Reduce phase complete");
        Ok(())
    }

    fn run_phase(&self, phase: &str, tasks: Vec<(String, Task)>) -> Result<()> {
        if tasks.is_empty() {
            info!("No {} tasks to run", phase);
            return Ok(());
        }

        let pool_size = min(self.max_concurrency, tasks.len());
        debug!(
            "Running {} {} tasks on {} threads",
            tasks.len(),
            phase,
            pool_size
        );
        let cpu_pool = futures_cpupool::Builder::new()
            .pool_size(pool_size)
            .name_prefix(format!("{}-", phase))
            .create();

        let mut task_futures = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            let task_future = cpu_pool.spawn_fn(move || {
                debug!("Starting {}", name);
                match task().chain_err(|| ErrorKind::TaskFailure(name.clone())) {
                    Ok(()) => {
                        debug!("Completed {}", name);
                        future::ok(())
                    }
                    Err(err) => {
                        error!("{} failed: {}", name, err);
                        future::err(err)
                    }
                }
            });
            task_futures.push(task_future);
        }

        future::join_all(task_futures).wait()?;
        Ok(())
    }
}
