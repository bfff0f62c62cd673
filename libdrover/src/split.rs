use std::path::{Path, PathBuf};

use errors::*;
use util::data_layer::AbstractionLayer;

/// `InputSplit` references the byte range `[start_offset, end_offset)` of one input source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSplit {
    pub source: String,
    pub start_offset: u64,
    pub end_offset: u64,
}

impl InputSplit {
    pub fn new<S: Into<String>>(source: S, start_offset: u64, end_offset: u64) -> Self {
        InputSplit {
            source: source.into(),
            start_offset,
            end_offset,
        }
    }

    pub fn size(&self) -> u64 {
        self.end_offset - self.start_offset
    }
}

/// `InputBin` is the unit of work of a single map task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBin {
    pub id: u64,
    pub splits: Vec<InputSplit>,
}

impl InputBin {
    pub fn size(&self) -> u64 {
        self.splits.iter().map(InputSplit::size).sum()
    }
}

/// `compute_splits` cuts every input source into consecutive splits of at most
/// `max_split_size` bytes.
///
/// An input naming a directory is expanded to the files directly inside it, in sorted order.
/// Fails with `SourceUnavailable` if an input does not exist or cannot be sized.
pub fn compute_splits(
    data_layer: &dyn AbstractionLayer,
    inputs: &[String],
    max_split_size: u64,
) -> Result<Vec<InputSplit>> {
    if max_split_size == 0 {
        return Err(
            ErrorKind::ConfigurationError("max split size must be positive".to_owned()).into(),
        );
    }

    let mut splits = Vec::new();
    for input in inputs {
        for source in resolve_input(data_layer, input)? {
            let length = data_layer.get_file_length(Path::new(&source)).chain_err(|| {
                ErrorKind::SourceUnavailable(source.clone())
            })?;
            split_source(&source, length, max_split_size, &mut splits);
        }
    }

    info!(
        "Computed {} input splits from {} inputs",
        splits.len(),
        inputs.len()
    );
    Ok(splits)
}

fn resolve_input(data_layer: &dyn AbstractionLayer, input: &str) -> Result<Vec<String>> {
    let path = Path::new(input);
    let exists = data_layer.exists(path).chain_err(|| {
        ErrorKind::SourceUnavailable(input.to_owned())
    })?;
    if !exists {
        return Err(ErrorKind::SourceUnavailable(input.to_owned()).into());
    }

    let is_dir = data_layer.is_dir(path).chain_err(|| {
        ErrorKind::SourceUnavailable(input.to_owned())
    })?;
    if !is_dir {
        return Ok(vec![input.to_owned()]);
    }

    let mut entries: Vec<PathBuf> = data_layer.read_dir(path).chain_err(|| {
        ErrorKind::SourceUnavailable(input.to_owned())
    })?;
    entries.sort();

    let mut sources = Vec::new();
    for entry in entries {
        let is_file = data_layer.is_file(&entry).chain_err(|| {
            ErrorKind::SourceUnavailable(entry.to_string_lossy().into_owned())
        })?;
        if is_file {
            sources.push(entry.to_string_lossy().into_owned());
        }
    }
    Ok(sources)
}

fn split_source(source: &str, length: u64, max_split_size: u64, splits: &mut Vec<InputSplit>) {
    let mut start_offset = 0;
    while start_offset < length {
        let end_offset = if length - start_offset > max_split_size {
            start_offset + max_split_size
        } else {
            length
        };
        splits.push(InputSplit::new(source, start_offset, end_offset));
        start_offset = end_offset;
    }
}

/// `pack_splits` groups splits into bins of at most `max_bin_size` bytes, first fit in input
/// order.
///
/// A split is appended to the open bin while the bin total stays within `max_bin_size`; otherwise
/// the bin is closed and a new one started. A split larger than `max_bin_size` ends up alone in
/// its own bin. Bin ids are dense from 0, and the same splits always produce the same bins.
pub fn pack_splits(splits: Vec<InputSplit>, max_bin_size: u64) -> Vec<InputBin> {
    let mut bins: Vec<InputBin> = Vec::new();
    let mut current: Vec<InputSplit> = Vec::new();
    let mut current_size: u64 = 0;

    for split in splits {
        let size = split.size();
        if !current.is_empty() && current_size.saturating_add(size) > max_bin_size {
            let id = bins.len() as u64;
            bins.push(InputBin {
                id,
                splits: current,
            });
            current = Vec::new();
            current_size = 0;
        }
        current_size += size;
        current.push(split);
    }

    if !current.is_empty() {
        let id = bins.len() as u64;
        bins.push(InputBin {
            id,
            splits: current,
        });
    }

    debug!("Packed input splits into {} bins", bins.len());
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;
    use util::data_layer::LocalAbstractionLayer;

    const MIB: u64 = 1024 * 1024;

    fn sized_file(dir: &TempDir, name: &str, length: u64) -> String {
        let file = File::create(dir.path().join(name)).unwrap();
        file.set_len(length).unwrap();
        name.to_owned()
    }

    fn sizes(splits: &[InputSplit]) -> Vec<u64> {
        splits.iter().map(InputSplit::size).collect()
    }

    #[test]
    fn splits_cover_each_source_exactly() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());
        let inputs = vec![
            sized_file(&dir, "a", 1),
            sized_file(&dir, "b", 10),
            sized_file(&dir, "c", 31),
            sized_file(&dir, "d", 0),
        ];

        for max_split_size in 1..12 {
            let splits = compute_splits(&layer, &inputs, max_split_size).unwrap();
            for (input, length) in inputs.iter().zip(vec![1, 10, 31, 0]) {
                let mut offset = 0;
                for split in splits.iter().filter(|split| &split.source == input) {
                    assert_eq!(offset, split.start_offset);
                    assert!(split.size() > 0);
                    assert!(split.size() <= max_split_size);
                    offset = split.end_offset;
                }
                assert_eq!(length, offset);
            }
        }
    }

    #[test]
    fn splits_keep_input_order() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());
        let inputs = vec![sized_file(&dir, "z", 3), sized_file(&dir, "a", 3)];

        let splits = compute_splits(&layer, &inputs, 2).unwrap();
        let sources: Vec<&str> = splits.iter().map(|split| split.source.as_str()).collect();

        assert_eq!(vec!["z", "z", "a", "a"], sources);
    }

    #[test]
    fn directory_inputs_expand_sorted() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());
        layer.create_dir_all(Path::new("inputs/nested")).unwrap();
        layer.write_file(Path::new("inputs/b"), b"bb").unwrap();
        layer.write_file(Path::new("inputs/a"), b"a").unwrap();

        let splits = compute_splits(&layer, &["inputs".to_owned()], 10).unwrap();

        assert_eq!(
            vec![InputSplit::new("inputs/a", 0, 1), InputSplit::new("inputs/b", 0, 2)],
            splits
        );
    }

    #[test]
    fn missing_source_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());

        let err = compute_splits(&layer, &["missing".to_owned()], 10).unwrap_err();
        match *err.kind() {
            ErrorKind::SourceUnavailable(ref input) => assert_eq!("missing", input),
            _ => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn no_inputs_gives_no_splits() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());

        assert!(compute_splits(&layer, &[], 10).unwrap().is_empty());
        assert!(pack_splits(Vec::new(), 10).is_empty());
    }

    #[test]
    fn zero_split_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());

        assert!(compute_splits(&layer, &[], 0).is_err());
    }

    #[test]
    fn bins_respect_cap_and_order() {
        let splits: Vec<InputSplit> = vec![3, 4, 2, 7, 1, 1, 9, 5]
            .into_iter()
            .enumerate()
            .map(|(i, size)| InputSplit::new(format!("s{}", i), 0, size))
            .collect();

        let bins = pack_splits(splits.clone(), 8);

        let flattened: Vec<InputSplit> = bins.iter()
            .flat_map(|bin| bin.splits.clone())
            .collect();
        assert_eq!(splits, flattened);
        for (i, bin) in bins.iter().enumerate() {
            assert_eq!(i as u64, bin.id);
            assert!(bin.size() <= 8 || bin.splits.len() == 1);
        }
        let bin_sizes: Vec<Vec<u64>> = bins.iter().map(|bin| sizes(&bin.splits)).collect();
        assert_eq!(
            vec![vec![3, 4], vec![2], vec![7, 1], vec![1], vec![9], vec![5]],
            bin_sizes
        );
    }

    #[test]
    fn oversized_split_gets_its_own_bin() {
        let splits = vec![
            InputSplit::new("big", 0, 20),
            InputSplit::new("small", 0, 2),
            InputSplit::new("huge", 0, 30),
        ];

        let bins = pack_splits(splits, 10);

        assert_eq!(3, bins.len());
        assert_eq!(vec![20], sizes(&bins[0].splits));
        assert_eq!(vec![2], sizes(&bins[1].splits));
        assert_eq!(vec![30], sizes(&bins[2].splits));
    }

    #[test]
    fn mixed_input_scenario() {
        let dir = TempDir::new().unwrap();
        let layer = LocalAbstractionLayer::new(dir.path());
        let inputs = vec![
            sized_file(&dir, "first", 40 * MIB),
            sized_file(&dir, "second", 450 * MIB),
            sized_file(&dir, "third", 10 * MIB),
        ];

        let splits = compute_splits(&layer, &inputs, 100 * MIB).unwrap();
        assert_eq!(
            vec![40, 100, 100, 100, 100, 50, 10],
            sizes(&splits)
                .into_iter()
                .map(|size| size / MIB)
                .collect::<Vec<u64>>()
        );

        // 40 + 450 + 10 lands exactly on the 500 MiB cap, so everything fits in one bin.
        let bins = pack_splits(splits.clone(), 500 * MIB);
        assert_eq!(1, bins.len());
        assert_eq!(500 * MIB, bins[0].size());

        // One byte less and the last split spills into a second bin.
        let bins = pack_splits(splits, 500 * MIB - 1);
        assert_eq!(2, bins.len());
        assert_eq!(490 * MIB, bins[0].size());
        assert_eq!(6, bins[0].splits.len());
        assert_eq!(vec![InputSplit::new("third", 0, 10 * MIB)], bins[1].splits);
    }
}
