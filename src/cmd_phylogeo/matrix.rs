use clap::*;
use phylogeo::libs::climate::{self, ClimaticTable};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("matrix")
        .about("Dissimilarity matrix of one climatic variable")
        .after_help(
            r###"
Pairwise distances |v[i] - v[j]| between specimens, normalized with the global
minimum and maximum of the matrix into [0, 1] and rounded to 6 decimals.

Notes:
* Input: comma-separated table with a header row.
* Output: relaxed PHYLIP, tab separated.
* With several variables in --names, matrices are written one after another.

Examples:
1. One variable:
   phylogeo matrix geo.csv --names id,T2M

2. Fail on a constant variable:
   phylogeo matrix geo.csv --names id,T2M --degenerate error
"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Climatic table. [stdin] for standard input"),
        )
        .arg(super::arg_names())
        .arg(super::arg_degenerate())
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();
    let (id_column, variables) = super::split_names(args)?;
    let policy = args.get_one::<String>("degenerate").unwrap().parse()?;

    //----------------------------
    // Ops
    //----------------------------
    let table = ClimaticTable::from_path(infile, &id_column, &variables)?;

    let mut writer = intspan::writer(outfile);
    for variable in &variables {
        let matrix = climate::dissimilarity_matrix(&table, variable, policy)?;
        writer.write_all(matrix.to_phylip().as_bytes())?;
    }

    Ok(())
}
