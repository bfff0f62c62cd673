use std::cmp::min;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json;

use errors::*;
use split::InputSplit;
use util::data_layer::AbstractionLayer;

pub const INTERMEDIATE_DIRECTORY: &str = "intermediate";
pub const OUTPUT_DIRECTORY: &str = "output";

// How far past the end of a split to read at a time while finishing its last record.
const READ_AHEAD_SIZE: u64 = 64 * 1024;

/// The `MapInputKV` is a single record handed to a `Map` operation.
///
/// `key` is the input source the record was read from and `value` is the record itself, without
/// its line terminator.
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MapInputKV {
    pub key: String,
    pub value: String,
}

impl MapInputKV {
    pub fn new(key: String, value: String) -> Self {
        MapInputKV { key, value }
    }
}

/// `IntermediateOutputPair` is a single line of an intermediate shard.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct IntermediateOutputPair<K, V> {
    pub key: K,
    pub value: V,
}

/// `FinalOutputObject` is a single line of a reduce partition's output.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct FinalOutputObject<K, O> {
    pub key: K,
    pub values: Vec<O>,
}

/// `read_split_records` returns the newline delimited records that belong to a split.
///
/// A record belongs to the split that contains its first byte. The partial record a split starts
/// in the middle of is left to the previous split, and the last record is read to its end even
/// when that lies past the end of the split.
pub fn read_split_records(
    data_layer: &dyn AbstractionLayer,
    split: &InputSplit,
) -> Result<Vec<String>> {
    let path = Path::new(&split.source);
    let file_length = data_layer.get_file_length(path).chain_err(|| {
        ErrorKind::SourceUnavailable(split.source.clone())
    })?;
    let end_offset = min(split.end_offset, file_length);
    if split.start_offset >= end_offset {
        return Ok(Vec::new());
    }

    // Read one byte early to see whether the split starts on a record boundary.
    let read_start = if split.start_offset == 0 {
        0
    } else {
        split.start_offset - 1
    };
    let mut data = data_layer
        .read_file_location(path, read_start, end_offset)
        .chain_err(|| ErrorKind::SourceUnavailable(split.source.clone()))?;

    let mut next_offset = end_offset;
    while next_offset < file_length && data.last() != Some(&b'\n') {
        let chunk_end = min(next_offset + READ_AHEAD_SIZE, file_length);
        let chunk = data_layer
            .read_file_location(path, next_offset, chunk_end)
            .chain_err(|| ErrorKind::SourceUnavailable(split.source.clone()))?;
        match chunk.iter().position(|byte| *byte == b'\n') {
            Some(position) => {
                data.extend_from_slice(&chunk[..position + 1]);
                break;
            }
            None => data.extend_from_slice(&chunk),
        }
        next_offset = chunk_end;
    }

    let mut position = if split.start_offset == 0 {
        0
    } else {
        match data.iter().position(|byte| *byte == b'\n') {
            Some(newline) => newline + 1,
            None => return Ok(Vec::new()),
        }
    };

    let split_end = (end_offset - read_start) as usize;
    let mut records = Vec::new();
    while position < split_end && position < data.len() {
        let line_end = match data[position..].iter().position(|byte| *byte == b'\n') {
            Some(newline) => position + newline,
            None => data.len(),
        };
        let mut line = &data[position..line_end];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        let record = String::from_utf8(line.to_vec()).chain_err(|| {
            format!(
                "Record at byte {} of {} is not valid UTF-8",
                read_start + position as u64,
                split.source
            )
        })?;
        records.push(record);
        position = line_end + 1;
    }

    Ok(records)
}

/// Directory holding every shard addressed to reduce partition `partition`, so a reducer only
/// lists its own shards.
pub fn intermediate_partition_dir(partition: u64) -> PathBuf {
    Path::new(INTERMEDIATE_DIRECTORY).join(format!("partition-{}", partition))
}

/// Path of the shard written by map bin `bin_id` for reduce partition `partition`.
pub fn intermediate_shard_path(bin_id: u64, partition: u64) -> PathBuf {
    intermediate_partition_dir(partition).join(format!("map-bin{}.out", bin_id))
}

/// Parses a shard file name back into the id of the bin that wrote it.
pub fn parse_shard_name(file_name: &str) -> Option<u64> {
    let name = file_name.trim_start_matches("map-bin");
    if name.len() == file_name.len() || !name.ends_with(".out") {
        return None;
    }
    name[..name.len() - ".out".len()].parse().ok()
}

/// Path of the final output of reduce partition `partition`.
pub fn output_partition_path(partition: u64) -> PathBuf {
    Path::new(OUTPUT_DIRECTORY).join(format!("output-part-{}", partition))
}

/// Serialises records as JSON lines.
pub fn serialise_lines<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buffer, record).chain_err(|| "Error serialising record.")?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// Parses JSON lines written by `serialise_lines`.
pub fn deserialise_lines<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for record in serde_json::Deserializer::from_slice(data).into_iter::<T>() {
        records.push(record.chain_err(|| "Error parsing serialised record.")?);
    }
    Ok(records)
}
