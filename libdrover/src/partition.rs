use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use errors::*;

/// The `PartitionInputKV` is a struct for passing input data to a `Partition`.
///
/// `PartitionInputKV` is a thin wrapper around a `(Key, Value)`,
/// used for creating a clearer API.
/// It can be constructed normally or using `PartitionInputKV::new()`.
#[derive(Debug, PartialEq)]
pub struct PartitionInputKV<'a, K: 'a, V: 'a> {
    pub key: &'a K,
    pub value: &'a V,
}

impl<'a, K, V> PartitionInputKV<'a, K, V> {
    pub fn new(key: &'a K, value: &'a V) -> Self {
        PartitionInputKV { key, value }
    }
}

/// The `Partition` trait defines a function for partitioning the results of a `Map` operation.
///
/// # Arguments
///
/// * `input` - A `PartitionInputKV` containing an output pair of a map operation.
/// * `partition_count` - The number of reduce partitions configured for the job.
///
/// # Outputs
///
/// A Result<u64>, representing the output partition for the given key and value. The partition
/// must be lower than `partition_count`.
pub trait Partition<K, V> {
    fn partition(&self, input: PartitionInputKV<K, V>, partition_count: u64) -> Result<u64>;
}

/// `HashPartitioner` implements `Partition` for any key that can be hashed.
///
/// `DefaultHasher::new` always uses the same keys, so every process running the job, including
/// separate serverless invocations, routes a key to the same partition.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashPartitioner;

impl HashPartitioner {
    pub fn new() -> Self {
        HashPartitioner
    }

    fn calculate_hash<T: Hash>(&self, t: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        t.hash(&mut hasher);
        hasher.finish()
    }
}

impl<K, V> Partition<K, V> for HashPartitioner
where
    K: Hash,
{
    fn partition(&self, input: PartitionInputKV<K, V>, partition_count: u64) -> Result<u64> {
        if partition_count == 0 {
            return Err(
                ErrorKind::ConfigurationError("partition count must be positive".to_owned())
                    .into(),
            );
        }
        let hash: u64 = self.calculate_hash(input.key);
        Ok(hash % partition_count)
    }
}
