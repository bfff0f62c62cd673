/// The `IntermediateInputKV` is a struct for passing input data to a `Reduce`.
///
/// `IntermediateInputKV` is a thin wrapper around a `(Key, Vec<Value>)`, holding every value
/// emitted for one key across all map tasks.
#[derive(Debug, Default, PartialEq)]
pub struct IntermediateInputKV<K, V> {
    pub key: K,
    pub values: Vec<V>,
}

impl<K, V> IntermediateInputKV<K, V> {
    pub fn new(key: K, values: Vec<V>) -> Self {
        IntermediateInputKV { key, values }
    }
}
