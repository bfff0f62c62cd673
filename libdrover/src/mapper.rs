use std::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;

use emitter::EmitIntermediate;
use errors::*;
use io::MapInputKV;

/// The `Map` trait defines a function for performing a map operation.
///
/// The output types are decided by the implementation of this trait. Keys must be hashable so
/// they can be partitioned, and both keys and values are serialised into intermediate shards.
///
/// # Arguments
///
/// * `input` - A single record of an input split, keyed by the source it was read from.
/// * `emitter` - A struct implementing the `EmitIntermediate` trait, provided by the map task.
///
/// # Outputs
///
/// An empty result used for returning an error. Outputs of the map operation are sent out through
/// the `emitter`.
pub trait Map {
    type Key: Serialize + DeserializeOwned + Clone + Eq + Hash;
    type Value: Serialize + DeserializeOwned;
    fn map<E>(&self, input: MapInputKV, emitter: E) -> Result<()>
    where
        E: EmitIntermediate<Self::Key, Self::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use emitter::IntermediateVecEmitter;

    struct SourceLengthMapper;
    impl Map for SourceLengthMapper {
        type Key = String;
        type Value = usize;
        fn map<E>(&self, input: MapInputKV, mut emitter: E) -> Result<()>
        where
            E: EmitIntermediate<Self::Key, Self::Value>,
        {
            emitter.emit(input.key, input.value.len())?;
            Ok(())
        }
    }

    #[test]
    fn mapper_receives_source_and_record() {
        let mut pairs: Vec<(String, usize)> = Vec::new();
        let input = MapInputKV::new("books/one.txt".to_owned(), "call me ishmael".to_owned());

        SourceLengthMapper
            .map(input, IntermediateVecEmitter::new(&mut pairs))
            .unwrap();

        assert_eq!(vec![("books/one.txt".to_owned(), 15)], pairs);
    }
}
