use std::collections::HashMap;
use std::sync::Arc;

use config::Config;
use emitter::{FinalVecEmitter, IntermediateVecEmitter};
use errors::*;
use intermediate::IntermediateInputKV;
use io;
use io::{FinalOutputObject, IntermediateOutputPair, MapInputKV};
use mapper::Map;
use partition::{Partition, PartitionInputKV};
use reducer::Reduce;
use registry::UserImplRegistry;
use split::{compute_splits, InputBin, InputSplit};
use util::data_layer::AbstractionLayerArc;

/// `MapReduceJob` is the task-dispatch contract shared by local execution and serverless
/// invocations. Each method performs one unit of work against the backing store.
///
/// `bind` is called exactly once, by the driver, before any other method.
pub trait MapReduceJob: Send + Sync {
    fn bind(&mut self, config: Arc<Config>, data_layer: AbstractionLayerArc);

    fn input_splits(&self, inputs: &[String], max_split_size: u64) -> Result<Vec<InputSplit>>;

    fn run_mapper(&self, bin_id: u64, bin: &InputBin) -> Result<()>;

    fn run_reducer(&self, partition: u64) -> Result<()>;
}

/// `Job` binds the user's Map, Reduce and Partition implementations to a configuration and a
/// backing store.
pub struct Job<M, R, P>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
    P: Partition<M::Key, M::Value>,
{
    registry: UserImplRegistry<M, R, P>,
    config: Option<Arc<Config>>,
    data_layer: Option<AbstractionLayerArc>,
}

impl<M, R, P> Job<M, R, P>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
    P: Partition<M::Key, M::Value>,
{
    pub fn new(registry: UserImplRegistry<M, R, P>) -> Self {
        Job {
            registry,
            config: None,
            data_layer: None,
        }
    }

    fn bound(&self) -> Result<(&Config, &AbstractionLayerArc)> {
        match (self.config.as_ref(), self.data_layer.as_ref()) {
            (Some(config), Some(data_layer)) => Ok((config, data_layer)),
            _ => Err(
                ErrorKind::ConfigurationError(
                    "job used before a configuration and data layer were bound".to_owned(),
                ).into(),
            ),
        }
    }

    fn map_records(
        &self,
        config: &Config,
        data_layer: &AbstractionLayerArc,
        split: &InputSplit,
        partitions: &mut HashMap<u64, Vec<IntermediateOutputPair<M::Key, M::Value>>>,
    ) -> Result<()> {
        let records = io::read_split_records(&**data_layer, split)?;
        debug!(
            "Mapping {} records from {} ({} -> {})",
            records.len(),
            split.source,
            split.start_offset,
            split.end_offset
        );

        for record in records {
            let mut pairs: Vec<(M::Key, M::Value)> = Vec::new();
            self.registry
                .mapper
                .map(
                    MapInputKV::new(split.source.clone(), record),
                    IntermediateVecEmitter::new(&mut pairs),
                )
                .chain_err(|| "Error running map operation.")?;

            for (key, value) in pairs {
                let partition = self.registry
                    .partitioner
                    .partition(
                        PartitionInputKV::new(&key, &value),
                        config.intermediate_bins,
                    )
                    .chain_err(|| "Error partitioning map output.")?;
                if partition >= config.intermediate_bins {
                    return Err(
                        format!(
                            "Partitioner returned partition {} but the job has {}",
                            partition,
                            config.intermediate_bins
                        ).into(),
                    );
                }
                partitions
                    .entry(partition)
                    .or_insert_with(Vec::new)
                    .push(IntermediateOutputPair { key, value });
            }
        }
        Ok(())
    }

    fn read_partition(
        &self,
        data_layer: &AbstractionLayerArc,
        partition: u64,
    ) -> Result<HashMap<M::Key, Vec<M::Value>>> {
        let mut grouped: HashMap<M::Key, Vec<M::Value>> = HashMap::new();
        let directory = io::intermediate_partition_dir(partition);
        if !data_layer.exists(&directory)? {
            return Ok(grouped);
        }

        for entry in data_layer.read_dir(&directory)? {
            let file_name = match entry.file_name().and_then(|name| name.to_str()) {
                Some(file_name) => file_name.to_owned(),
                None => continue,
            };
            if io::parse_shard_name(&file_name).is_none() {
                continue;
            }

            let shard_path = directory.join(&file_name);
            let length = data_layer.get_file_length(&shard_path)?;
            let data = data_layer.read_file_location(&shard_path, 0, length)?;
            let pairs: Vec<IntermediateOutputPair<M::Key, M::Value>> =
                io::deserialise_lines(&data)
                    .chain_err(|| format!("Error parsing shard {}", file_name))?;

            for pair in pairs {
                grouped.entry(pair.key).or_insert_with(Vec::new).push(pair.value);
            }
        }
        Ok(grouped)
    }
}

impl<M, R, P> MapReduceJob for Job<M, R, P>
where
    M: Map + Send + Sync,
    R: Reduce<M::Key, M::Value> + Send + Sync,
    P: Partition<M::Key, M::Value> + Send + Sync,
{
    fn bind(&mut self, config: Arc<Config>, data_layer: AbstractionLayerArc) {
        self.config = Some(config);
        self.data_layer = Some(data_layer);
    }

    fn input_splits(&self, inputs: &[String], max_split_size: u64) -> Result<Vec<InputSplit>> {
        let (_, data_layer) = self.bound()?;
        compute_splits(&**data_layer, inputs, max_split_size)
    }

    fn run_mapper(&self, bin_id: u64, bin: &InputBin) -> Result<()> {
        let (config, data_layer) = self.bound()?;
        info!(
            "Running mapper for bin {} ({} splits, {} bytes)",
            bin_id,
            bin.splits.len(),
            bin.size()
        );

        let mut partitions = HashMap::new();
        for split in &bin.splits {
            self.map_records(config, data_layer, split, &mut partitions)?;
        }

        for (partition, pairs) in partitions {
            let data = io::serialise_lines(&pairs)?;
            data_layer
                .write_file(&io::intermediate_shard_path(bin_id, partition), &data)
                .chain_err(|| {
                    format!("Error writing shard for bin {} partition {}", bin_id, partition)
                })?;
        }
        Ok(())
    }

    fn run_reducer(&self, partition: u64) -> Result<()> {
        let (config, data_layer) = self.bound()?;
        if partition >= config.intermediate_bins {
            return Err(
                format!(
                    "Partition {} is out of range for {} intermediate bins",
                    partition,
                    config.intermediate_bins
                ).into(),
            );
        }

        let grouped = self.read_partition(data_layer, partition)
            .chain_err(|| format!("Error reading intermediate data for partition {}", partition))?;
        if grouped.is_empty() {
            debug!("Partition {} received no map output", partition);
            return Ok(());
        }
        debug!("Reducing {} keys for partition {}", grouped.len(), partition);

        let mut output = Vec::with_capacity(grouped.len());
        for (key, values) in grouped {
            let mut reduced: Vec<R::Output> = Vec::new();
            self.registry
                .reducer
                .reduce(
                    IntermediateInputKV::new(key.clone(), values),
                    FinalVecEmitter::new(&mut reduced),
                )
                .chain_err(|| "Error running reduce operation.")?;
            output.push(FinalOutputObject {
                key,
                values: reduced,
            });
        }

        let data = io::serialise_lines(&output)?;
        data_layer
            .write_file(&io::output_partition_path(partition), &data)
            .chain_err(|| format!("Error writing output for partition {}", partition))?;
        Ok(())
    }
}
