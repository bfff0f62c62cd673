use std::process;
use std::sync::Arc;

use config::Config;
use errors::*;
use executor::PhaseExecutor;
use job::MapReduceJob;
use platform::{EnvironmentDetector, ExecutionMode, PlatformDetector};
use serverless::{HostRuntime, InvocationHandler, LambdaRuntime};
use split::pack_splits;
use util::data_layer::init_data_layer;
use util::output_error;

/// `Driver` is the top-level orchestrator of a job.
///
/// It binds the backing store and configuration into the job and then either runs both phases
/// in-process or hands control to a serverless host runtime, depending on what its
/// `PlatformDetector` reports.
pub struct Driver<J> {
    job: J,
    config: Config,
    platform_detector: Box<dyn PlatformDetector>,
    host_runtime: Option<Box<dyn HostRuntime>>,
}

impl<J> Driver<J>
where
    J: MapReduceJob + 'static,
{
    pub fn new(job: J, config: Config) -> Self {
        Driver {
            job,
            config,
            platform_detector: Box::new(EnvironmentDetector),
            host_runtime: None,
        }
    }

    pub fn with_platform_detector<D>(mut self, platform_detector: D) -> Self
    where
        D: PlatformDetector + 'static,
    {
        self.platform_detector = Box::new(platform_detector);
        self
    }

    /// Runtime used in serverless mode. Defaults to a `LambdaRuntime` configured from the
    /// environment.
    pub fn with_host_runtime<H>(mut self, host_runtime: H) -> Self
    where
        H: HostRuntime + 'static,
    {
        self.host_runtime = Some(Box::new(host_runtime));
        self
    }

    /// Runs the job. In serverless mode this only returns once the host runtime stops.
    pub fn run(self) -> Result<()> {
        let Driver {
            mut job,
            config,
            platform_detector,
            host_runtime,
        } = self;

        config.validate()?;
        let config = Arc::new(config);
        let data_layer = init_data_layer(config.file_system_type, &config.file_system_location)
            .chain_err(|| "Unable to initialise the backing store")?;
        job.bind(Arc::clone(&config), data_layer);
        let job = Arc::new(job);

        match platform_detector.execution_mode() {
            ExecutionMode::Serverless => {
                let host_runtime: Box<dyn HostRuntime> = match host_runtime {
                    Some(host_runtime) => host_runtime,
                    None => Box::new(LambdaRuntime::from_env()?),
                };
                info!("Serverless context detected, waiting for invocations");
                let handler = InvocationHandler::new(job, config);
                host_runtime.start(&handler)
            }
            ExecutionMode::Local => run_local(&job, &config),
        }
    }

    /// Runs the job and exits the process with a non-zero status if it fails.
    pub fn main(self) {
        if let Err(err) = self.run() {
            output_error(&err);
            process::exit(1);
        }
    }
}

fn run_local<J>(job: &Arc<J>, config: &Config) -> Result<()>
where
    J: MapReduceJob + 'static,
{
    let splits = job.input_splits(&config.inputs, config.max_split_size)?;
    let bins = pack_splits(splits, config.max_input_bin_size);

    let executor = PhaseExecutor::new(config.max_concurrency);
    executor.run_map_phase(job, bins)?;
    executor.run_reduce_phase(job, config.intermediate_bins)?;

    info!("Job complete");
    Ok(())
}
