extern crate drover;
#[macro_use]
extern crate error_chain;

use drover::*;

struct WordCountMapper;
impl Map for WordCountMapper {
    type Key = String;
    type Value = u64;
    fn map<E>(&self, input: MapInputKV, mut emitter: E) -> Result<()>
    where
        E: EmitIntermediate<Self::Key, Self::Value>,
    {
        for token in input.value.split(char::is_whitespace) {
            if !token.is_empty() {
                emitter.emit(token.to_owned(), 1).chain_err(
                    || "Error emitting map key-value pair.",
                )?;
            }
        }
        Ok(())
    }
}

struct WordCountReducer;
impl Reduce<String, u64> for WordCountReducer {
    type Output = u64;
    fn reduce<E>(&self, input: IntermediateInputKV<String, u64>, mut emitter: E) -> Result<()>
    where
        E: EmitFinal<Self::Output>,
    {
        let total: u64 = input.values.iter().sum();
        emitter.emit(total).chain_err(|| {
            format!("Error emitting value {:?}.", total)
        })?;
        Ok(())
    }
}

fn run() -> Result<()> {
    drover::init_logger().chain_err(
        || "Failed to initialise logging.",
    )?;

    let matches = drover::parse_command_line();
    let config = drover::config_from_matches(&matches)?;

    let registry = UserImplRegistryBuilder::new_hash_partitioned()
        .mapper(WordCountMapper)
        .reducer(WordCountReducer)
        .build()
        .chain_err(|| "Error building UserImplRegistry.")?;

    Driver::new(Job::new(registry), config).run()
}

// Macro to generate a quick error_chain main function.
// https://github.com/rust-lang-nursery/error-chain/blob/master/examples/quickstart.rs
quick_main!(run);
