use errors::*;
use util::data_layer::FileSystemType;

const MEBI_BYTE: u64 = 1024 * 1024;

pub const DEFAULT_MAX_SPLIT_SIZE: u64 = 100 * MEBI_BYTE;
pub const DEFAULT_MAX_INPUT_BIN_SIZE: u64 = 500 * MEBI_BYTE;
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;
pub const DEFAULT_INTERMEDIATE_BINS: u64 = 100;
pub const DEFAULT_FILE_SYSTEM_LOCATION: &str = ".";

/// `Config` holds the tunables of a job.
///
/// It is built once through `ConfigBuilder` and is read-only afterwards; the driver shares it
/// between tasks behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Input sources, in the order they are split.
    pub inputs: Vec<String>,
    /// Upper bound in bytes of a single `InputSplit`.
    pub max_split_size: u64,
    /// Upper bound in bytes of the splits packed into one `InputBin`.
    pub max_input_bin_size: u64,
    /// Maximum number of tasks running at the same time within a phase.
    pub max_concurrency: usize,
    pub file_system_type: FileSystemType,
    pub file_system_location: String,
    /// Number of reduce partitions. Fixed for the lifetime of the job.
    pub intermediate_bins: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inputs: Vec::new(),
            max_split_size: DEFAULT_MAX_SPLIT_SIZE,
            max_input_bin_size: DEFAULT_MAX_INPUT_BIN_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            file_system_type: FileSystemType::Local,
            file_system_location: DEFAULT_FILE_SYSTEM_LOCATION.to_owned(),
            intermediate_bins: DEFAULT_INTERMEDIATE_BINS,
        }
    }
}

impl Config {
    /// Checks that every size and count is positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_split_size == 0 {
            return Err(configuration_error("max split size must be positive"));
        }
        if self.max_input_bin_size == 0 {
            return Err(configuration_error("max input bin size must be positive"));
        }
        if self.max_concurrency == 0 {
            return Err(configuration_error("max concurrency must be positive"));
        }
        if self.intermediate_bins == 0 {
            return Err(configuration_error("intermediate bin count must be positive"));
        }
        if self.file_system_location.is_empty() {
            return Err(configuration_error("file system location must not be empty"));
        }
        Ok(())
    }
}

fn configuration_error(reason: &str) -> Error {
    ErrorKind::ConfigurationError(reason.to_owned()).into()
}

/// `ConfigBuilder` is used to create a `Config`, starting from the defaults.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> ConfigBuilder {
        Default::default()
    }

    pub fn inputs<I, S>(mut self, inputs: I) -> ConfigBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn input<S: Into<String>>(mut self, input: S) -> ConfigBuilder {
        self.config.inputs.push(input.into());
        self
    }

    pub fn max_split_size(mut self, max_split_size: u64) -> ConfigBuilder {
        self.config.max_split_size = max_split_size;
        self
    }

    pub fn max_input_bin_size(mut self, max_input_bin_size: u64) -> ConfigBuilder {
        self.config.max_input_bin_size = max_input_bin_size;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> ConfigBuilder {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn file_system(mut self, fs_type: FileSystemType, location: &str) -> ConfigBuilder {
        self.config.file_system_type = fs_type;
        self.config.file_system_location = location.to_owned();
        self
    }

    pub fn intermediate_bins(mut self, intermediate_bins: u64) -> ConfigBuilder {
        self.config.intermediate_bins = intermediate_bins;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();

        assert!(config.inputs.is_empty());
        assert_eq!(104_857_600, config.max_split_size);
        assert_eq!(524_288_000, config.max_input_bin_size);
        assert_eq!(100, config.max_concurrency);
        assert_eq!(100, config.intermediate_bins);
        assert_eq!(FileSystemType::Local, config.file_system_type);
        assert_eq!(".", config.file_system_location);
    }

    #[test]
    fn builder_starts_from_defaults() {
        let config = ConfigBuilder::new().build().unwrap();

        assert_eq!(Config::default(), config);
    }

    #[test]
    fn builder_applies_options_in_order() {
        let config = ConfigBuilder::new()
            .inputs(vec!["a", "b"])
            .input("c")
            .max_split_size(10)
            .max_split_size(20)
            .max_input_bin_size(40)
            .max_concurrency(4)
            .intermediate_bins(8)
            .file_system(FileSystemType::S3, "bucket/prefix")
            .build()
            .unwrap();

        assert_eq!(vec!["a", "b", "c"], config.inputs);
        assert_eq!(20, config.max_split_size);
        assert_eq!(40, config.max_input_bin_size);
        assert_eq!(4, config.max_concurrency);
        assert_eq!(8, config.intermediate_bins);
        assert_eq!(FileSystemType::S3, config.file_system_type);
        assert_eq!("bucket/prefix", config.file_system_location);
    }

    fn assert_configuration_error(result: Result<Config>) {
        match result {
            Err(err) => match *err.kind() {
                ErrorKind::ConfigurationError(_) => {}
                _ => panic!("unexpected error: {}", err),
            },
            Ok(config) => panic!("expected an error, got {:?}", config),
        }
    }

    #[test]
    fn non_positive_values_are_rejected() {
        assert_configuration_error(ConfigBuilder::new().max_split_size(0).build());
        assert_configuration_error(ConfigBuilder::new().max_input_bin_size(0).build());
        assert_configuration_error(ConfigBuilder::new().max_concurrency(0).build());
        assert_configuration_error(ConfigBuilder::new().intermediate_bins(0).build());
        assert_configuration_error(
            ConfigBuilder::new()
                .file_system(FileSystemType::Local, "")
                .build(),
        );
    }
}
