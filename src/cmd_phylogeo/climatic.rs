use clap::*;
use phylogeo::libs::climate::{self, ClimaticTable};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("climatic")
        .about("Neighbor-joining trees of climatic variables")
        .after_help(
            r###"
Builds the dissimilarity matrix of each variable and joins it into a tree.

Output:
One line per variable, `variable<TAB>newick`, in the order of --names.

Examples:
1. Two variables:
   phylogeo climatic geo.csv --names id,ALLSKY_SFC_SW_DWN,T2M

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
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();
    let (id_column, variables) = super::split_names(args)?;
    let policy = args.get_one::<String>("degenerate").unwrap().parse()?;

    let table = ClimaticTable::from_path(infile, &id_column, &variables)?;
    let trees = climate::climatic_trees(&table, &variables, policy)?;

    let mut writer = intspan::writer(outfile);
    for (variable, (_, tree)) in &trees {
        writer.write_fmt(format_args!("{}\t{}\n", variable, tree.to_newick()))?;
    }

    Ok(())
}
