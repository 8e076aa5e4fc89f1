use std::io::{self, Read};

use anyhow::Context;
use clap::{value_parser, Parser};
use encoder::{Outcome, SatBackend, SatisfiabilityChecker, VarisatBackend};
use log::info;
use logging::Logger;

/// Bounded satisfiability checking for interval temporal logic formulas.
/// The formula is read from stdin.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Longest word length to try; without it the search does not stop
    #[arg(long, value_parser = value_parser!(u32).range(1..))]
    max_bound: Option<u32>,

    /// Solve with z3 instead of varisat
    #[cfg(feature = "z3")]
    #[arg(long)]
    z3: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let logger = Logger::default();

    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .context("Failed to read the formula from stdin")?;
    let (store, root) = parser::parse(&source).context("Failed parsing the formula")?;
    info!("parsed {}", store.display(root));

    let formula = formula::normalize(store, root).context("Failed normalizing the formula")?;
    logger.info(&format!("Formula size: {}", formula.expanded_size()));
    logger.info(&format!("Formula size after encoding: {}", formula.size()));

    let max_bound = args.max_bound.map(|bound| bound as usize);

    #[cfg(feature = "z3")]
    if args.z3 {
        let ctx = z3::Context::new(&z3::Config::new());
        let checker = SatisfiabilityChecker::new(formula, encoder::Z3Backend::new(&ctx)).with_logger(logger);
        return report(checker, max_bound, logger);
    }

    let checker = SatisfiabilityChecker::new(formula, VarisatBackend::new()).with_logger(logger);
    report(checker, max_bound, logger)
}

fn report<B: SatBackend>(
    mut checker: SatisfiabilityChecker<B>,
    max_bound: Option<usize>,
    logger: Logger,
) -> anyhow::Result<()> {
    logger.info("==========[Satisfiability Checking Result]==========");
    match checker.run(max_bound).context("Satisfiability check failed")? {
        Outcome::Satisfiable {
            length,
            certificate,
            stats,
        } => {
            logger.completed(&format!(
                "Result: The temporal logic formula is satisfiable for a word of length {length}"
            ));
            logger.info(&format!("We needed {stats}"));
            println!("==========[Satisfiability Certificate]==========");
            print!("{certificate}");
        }
        Outcome::BoundExhausted { bound, stats } => {
            logger.warning(&format!("Result: Aborting due to reaching the maximum bound of {bound}"));
            logger.info(&format!("Gave up after {stats}"));
        }
    }
    Ok(())
}
