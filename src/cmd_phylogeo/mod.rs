//! Subcommand modules for the `phylogeo` binary.

pub mod bootstrap;
pub mod climatic;
pub mod config;
pub mod matrix;
pub mod run;

use clap::*;

/// `--names id,VAR1,VAR2`: the specimen id column, then the variables.
pub fn arg_names() -> Arg {
    Arg::new("names")
        .long("names")
        .short('n')
        .num_args(1)
        .value_delimiter(',')
        .required(true)
        .help("Specimen id column, then climatic variables, comma separated")
}

pub fn arg_degenerate() -> Arg {
    Arg::new("degenerate")
        .long("degenerate")
        .num_args(1)
        .value_parser(["zero", "error"])
        .default_value("zero")
        .help("Variables with identical values everywhere: zero distances or an error")
}

pub fn arg_outfile() -> Arg {
    Arg::new("outfile")
        .short('o')
        .long("outfile")
        .num_args(1)
        .default_value("stdout")
        .help("Output filename. [stdout] for screen")
}

/// Split `--names` into the id column and the variables.
pub fn split_names(args: &ArgMatches) -> anyhow::Result<(String, Vec<String>)> {
    let names: Vec<String> = args
        .get_many::<String>("names")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    match names.split_first() {
        Some((id, vars)) if !vars.is_empty() => Ok((id.clone(), vars.to_vec())),
        _ => anyhow::bail!("--names needs the id column and at least one variable"),
    }
}
