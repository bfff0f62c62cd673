use std::str::FromStr;

use clap::{App, Arg, ArgMatches};

use config::{Config, ConfigBuilder, DEFAULT_FILE_SYSTEM_LOCATION};
use errors::*;
use util::data_layer::FileSystemType;
use VERSION;

fn build_app<'a, 'b>() -> App<'a, 'b> {
    App::new("drover")
        .version(VERSION.unwrap_or("unknown"))
        .about("Runs a MapReduce job locally or as a serverless function")
        .arg(
            Arg::with_name("input")
                .value_name("INPUT")
                .help("Input files or directories")
                .multiple(true)
                .required(false),
        )
        .arg(
            Arg::with_name("max-split-size")
                .long("max-split-size")
                .help("Upper bound in bytes of a single input split")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("max-input-bin-size")
                .long("max-input-bin-size")
                .help("Upper bound in bytes of the input handled by one mapper")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("max-concurrency")
                .long("max-concurrency")
                .short("c")
                .help("Maximum number of tasks running at once")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("intermediate-bins")
                .long("intermediate-bins")
                .help("Number of reduce partitions")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("fs-type")
                .long("fs-type")
                .help("Backing store to read input from and write output to")
                .possible_values(&["local", "s3"])
                .case_insensitive(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("fs-location")
                .long("fs-location")
                .help("Directory, or bucket[/prefix] for S3, of the backing store")
                .takes_value(true),
        )
}

/// `parse_command_line` uses `clap` to parse the command-line arguments of a job binary.
///
/// The output of this function is turned into a `Config` by `config_from_matches`.
pub fn parse_command_line<'a>() -> ArgMatches<'a> {
    build_app().get_matches()
}

/// Builds a `Config` from parsed arguments. Options that were not given keep their defaults.
pub fn config_from_matches(matches: &ArgMatches) -> Result<Config> {
    let mut builder = ConfigBuilder::new();

    if let Some(inputs) = matches.values_of("input") {
        builder = builder.inputs(inputs);
    }
    if let Some(size) = parse_value(matches, "max-split-size")? {
        builder = builder.max_split_size(size);
    }
    if let Some(size) = parse_value(matches, "max-input-bin-size")? {
        builder = builder.max_input_bin_size(size);
    }
    if let Some(concurrency) = parse_value(matches, "max-concurrency")? {
        builder = builder.max_concurrency(concurrency);
    }
    if let Some(bins) = parse_value(matches, "intermediate-bins")? {
        builder = builder.intermediate_bins(bins);
    }

    let fs_type = match matches.value_of("fs-type") {
        Some(fs_type) => fs_type.parse::<FileSystemType>()?,
        None => FileSystemType::default(),
    };
    let fs_location = matches
        .value_of("fs-location")
        .unwrap_or(DEFAULT_FILE_SYSTEM_LOCATION);
    builder = builder.file_system(fs_type, fs_location);

    builder.build()
}

fn parse_value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(
                ErrorKind::ConfigurationError(format!("invalid value '{}' for --{}", value, name))
                    .into(),
            ),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from_args(args: &[&str]) -> Result<Config> {
        let matches = build_app().get_matches_from(args);
        config_from_matches(&matches)
    }

    #[test]
    fn no_arguments_gives_defaults() {
        let config = config_from_args(&["drover"]).unwrap();

        assert_eq!(Config::default(), config);
    }

    #[test]
    fn positional_arguments_are_inputs() {
        let config = config_from_args(&["drover", "books", "extra.txt"]).unwrap();

        assert_eq!(vec!["books", "extra.txt"], config.inputs);
    }

    #[test]
    fn options_override_defaults() {
        let config = config_from_args(&[
            "drover",
            "--max-split-size",
            "1024",
            "--max-input-bin-size",
            "4096",
            "-c",
            "8",
            "--intermediate-bins",
            "16",
            "--fs-type",
            "S3",
            "--fs-location",
            "bucket/jobs",
            "input",
        ]).unwrap();

        assert_eq!(1024, config.max_split_size);
        assert_eq!(4096, config.max_input_bin_size);
        assert_eq!(8, config.max_concurrency);
        assert_eq!(16, config.intermediate_bins);
        assert_eq!(FileSystemType::S3, config.file_system_type);
        assert_eq!("bucket/jobs", config.file_system_location);
        assert_eq!(vec!["input"], config.inputs);
    }

    #[test]
    fn invalid_numbers_are_configuration_errors() {
        for args in &[
            vec!["drover", "--max-split-size", "lots"],
            vec!["drover", "--intermediate-bins", "0"],
            vec!["drover", "--max-concurrency", "many"],
        ] {
            let err = config_from_args(args).unwrap_err();
            match *err.kind() {
                ErrorKind::ConfigurationError(_) => {}
                _ => panic!("unexpected error for {:?}: {}", args, err),
            }
        }
    }
}
