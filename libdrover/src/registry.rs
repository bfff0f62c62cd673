use errors::*;
use mapper::Map;
use partition::{HashPartitioner, Partition};
use reducer::Reduce;

/// `UserImplRegistry` tracks the user's implementations of Map, Reduce and Partition.
///
/// The user should use the `UserImplRegistryBuilder` to create this and then pass it in to
/// `Job::new`.
pub struct UserImplRegistry<M, R, P>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
    P: Partition<M::Key, M::Value>,
{
    pub mapper: M,
    pub reducer: R,
    pub partitioner: P,
}

/// `UserImplRegistryBuilder` is used to create a `UserImplRegistry`.
pub struct UserImplRegistryBuilder<M, R, P>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
    P: Partition<M::Key, M::Value>,
{
    mapper: Option<M>,
    reducer: Option<R>,
    partitioner: Option<P>,
}

impl<M, R, P> Default for UserImplRegistryBuilder<M, R, P>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
    P: Partition<M::Key, M::Value>,
{
    fn default() -> UserImplRegistryBuilder<M, R, P> {
        UserImplRegistryBuilder {
            mapper: None,
            reducer: None,
            partitioner: None,
        }
    }
}

impl<M, R, P> UserImplRegistryBuilder<M, R, P>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
    P: Partition<M::Key, M::Value>,
{
    pub fn new() -> UserImplRegistryBuilder<M, R, P> {
        Default::default()
    }

    pub fn mapper(mut self, mapper: M) -> UserImplRegistryBuilder<M, R, P> {
        self.mapper = Some(mapper);
        self
    }

    pub fn reducer(mut self, reducer: R) -> UserImplRegistryBuilder<M, R, P> {
        self.reducer = Some(reducer);
        self
    }

    pub fn partitioner(mut self, partitioner: P) -> UserImplRegistryBuilder<M, R, P> {
        self.partitioner = Some(partitioner);
        self
    }

    pub fn build(self) -> Result<UserImplRegistry<M, R, P>> {
        let mapper = self.mapper
            .chain_err(|| "Error building UserImplRegistry: No Mapper provided")?;
        let reducer = self.reducer
            .chain_err(|| "Error building UserImplRegistry: No Reducer provided")?;
        let partitioner = self.partitioner
            .chain_err(|| "Error building UserImplRegistry: No Partitioner provided")?;

        Ok(UserImplRegistry {
            mapper,
            reducer,
            partitioner,
        })
    }
}

/// Construct a `UserImplRegistryBuilder` that partitions with a `HashPartitioner`.
impl<M, R> UserImplRegistryBuilder<M, R, HashPartitioner>
where
    M: Map,
    R: Reduce<M::Key, M::Value>,
{
    pub fn new_hash_partitioned() -> UserImplRegistryBuilder<M, R, HashPartitioner> {
        UserImplRegistryBuilder::new().partitioner(HashPartitioner::new())
    }
}
