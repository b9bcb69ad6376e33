use clap::*;
use indexmap::IndexMap;
use log::info;
use phylogeo::libs::alignment;
use phylogeo::libs::bootstrap::{self, CancelToken};
use phylogeo::libs::climate::{self, ClimaticTable};
use phylogeo::libs::config::Params;
use phylogeo::libs::error::Stage;
use phylogeo::libs::filter;
use phylogeo::libs::phylo::{DissimilarityMatrix, Tree};
use std::io::Write;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("run")
        .about("Compare genetic and climatic trees and write the result file")
        .after_help(
            r###"
The whole pipeline:

1. One neighbor-joining tree per climatic variable.
2. One bootstrap consensus tree per aligned gene.
3. Genes whose mean support reaches --bootstrap-threshold are compared with
   every climatic tree; pairs whose least-squares distance is at most
   --ls-threshold are written to the result file.

Settings come from the optional TOML file (see `phylogeo config`); options
given here override it.

Output header:
Gene, Phylogeographic tree, Name of species, Position in ASM, Bootsrap mean, Least-Square distance

Examples:
1. Everything from a configuration file:
   phylogeo run phylogeo.toml

2. No configuration file:
   phylogeo run --file-name geo.csv --names id,ALLSKY_SFC_SW_DWN,T2M \
       -a 1_35.fasta -a 36_70.fasta --bootstrap-amount 100 -o output.csv

3. Keep the intermediate matrices and trees:
   phylogeo run phylogeo.toml --debug --debug-dir debug/

"###,
        )
        .arg(
            Arg::new("config")
                .index(1)
                .num_args(1)
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("file_name")
                .long("file-name")
                .short('f')
                .num_args(1)
                .help("Climatic table"),
        )
        .arg(
            Arg::new("names")
                .long("names")
                .short('n')
                .num_args(1)
                .value_delimiter(',')
                .help("Specimen id column, then climatic variables, comma separated"),
        )
        .arg(
            Arg::new("alignment")
                .long("alignment")
                .short('a')
                .num_args(1)
                .action(ArgAction::Append)
                .help("Aligned FASTA file of one gene; may be repeated"),
        )
        .arg(
            Arg::new("bootstrap_amount")
                .long("bootstrap-amount")
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Resamples per gene"),
        )
        .arg(
            Arg::new("bootstrap_threshold")
                .long("bootstrap-threshold")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Minimum mean support of a gene, in percent"),
        )
        .arg(
            Arg::new("ls_threshold")
                .long("ls-threshold")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Maximum least-squares distance of a reported pair"),
        )
        .arg(
            Arg::new("reference_gene")
                .long("reference-gene")
                .num_args(1)
                .help("Label written in the Gene column"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Random seed"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Number of threads"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Seconds allowed per gene"),
        )
        .arg(
            Arg::new("on_gene_error")
                .long("on-gene-error")
                .num_args(1)
                .value_parser(["continue", "abort"])
                .help("What a failed gene does to the run"),
        )
        .arg(
            Arg::new("degenerate")
                .long("degenerate")
                .num_args(1)
                .value_parser(["zero", "error"])
                .help("Variables with identical values everywhere"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Write intermediate matrices and trees"),
        )
        .arg(
            Arg::new("debug_dir")
                .long("debug-dir")
                .num_args(1)
                .help("Directory of the intermediate files"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .help("Result file. [stdout] for screen"),
        )
}

/// Configuration file first, then command line options on top.
fn load_params(args: &ArgMatches) -> anyhow::Result<Params> {
    let mut params = match args.get_one::<String>("config") {
        Some(file) => {
            info!("Loaded configuration from {}", file);
            Params::from_file(file)?
        }
        None => Params::default(),
    };

    if let Some(v) = args.get_one::<String>("file_name") {
        params.file_name = v.clone();
    }
    if let Some(v) = args.get_many::<String>("names") {
        params.names = v.cloned().collect();
    }
    if let Some(v) = args.get_many::<String>("alignment") {
        params.alignments = v.cloned().collect();
    }
    if let Some(v) = args.get_one::<usize>("bootstrap_amount") {
        params.bootstrap_amount = *v;
    }
    if let Some(v) = args.get_one::<f64>("bootstrap_threshold") {
        params.bootstrap_threshold = *v;
    }
    if let Some(v) = args.get_one::<f64>("ls_threshold") {
        params.ls_threshold = *v;
    }
    if let Some(v) = args.get_one::<String>("reference_gene") {
        params.reference_gene_filename = v.clone();
    }
    if let Some(v) = args.get_one::<u64>("seed") {
        params.seed = *v;
    }
    if let Some(v) = args.get_one::<usize>("parallel") {
        params.threads = Some(*v);
    }
    if let Some(v) = args.get_one::<u64>("timeout") {
        params.gene_timeout = Some(*v);
    }
    if let Some(v) = args.get_one::<String>("on_gene_error") {
        params.on_gene_error = v.parse()?;
    }
    if let Some(v) = args.get_one::<String>("degenerate") {
        params.degenerate = v.parse()?;
    }
    if args.get_flag("debug") {
        params.make_debug_files = true;
    }
    if let Some(v) = args.get_one::<String>("debug_dir") {
        params.debug_dir = v.clone();
    }
    if let Some(v) = args.get_one::<String>("outfile") {
        params.output = v.clone();
    }

    params.validate()?;
    Ok(params)
}

fn write_debug(dir: &str, name: &str, content: &str) -> anyhow::Result<()> {
    let path = Path::new(dir).join(name);
    let mut writer = intspan::writer(&path.to_string_lossy());
    writer.write_all(content.as_bytes())?;
    Ok(())
}

fn dump_climatic(
    dir: &str,
    climatic: &IndexMap<String, (DissimilarityMatrix, Tree)>,
) -> anyhow::Result<()> {
    for (variable, (matrix, tree)) in climatic {
        write_debug(dir, &format!("{}.phy", variable), &matrix.to_phylip())?;
        write_debug(dir, &format!("{}.nwk", variable), &(tree.to_newick() + "\n"))?;
    }
    Ok(())
}

fn dump_genetic(dir: &str, genetic: &IndexMap<String, Tree>) -> anyhow::Result<()> {
    for (gene, tree) in genetic {
        let newick = tree.to_newick_with_format("  ") + "\n";
        write_debug(dir, &format!("{}.consensus.nwk", gene), &newick)?;
    }
    Ok(())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let params = load_params(args)?;

    if params.make_debug_files {
        std::fs::create_dir_all(&params.debug_dir)?;
    }

    //----------------------------
    // Climatic trees
    //----------------------------
    let table = ClimaticTable::from_path(&params.file_name, params.id_column(), params.variables())
        .map_err(|e| e.at(Stage::Climatic, &params.file_name))?;
    info!(
        "{} specimens, {} climatic variables",
        table.ids().len(),
        params.variables().len()
    );
    let climatic = climate::climatic_trees(&table, params.variables(), params.degenerate)?;
    if params.make_debug_files {
        dump_climatic(&params.debug_dir, &climatic)?;
    }

    //----------------------------
    // Genetic trees
    //----------------------------
    let set = alignment::load_alignments(&params.alignments)?;
    let outcomes =
        bootstrap::build_consensus_trees(set, &params.bootstrap_options(), &CancelToken::new())?;
    let genetic = bootstrap::merge_outcomes(outcomes, params.on_gene_error)?;
    if params.make_debug_files {
        dump_genetic(&params.debug_dir, &genetic)?;
    }

    //----------------------------
    // Compare and write
    //----------------------------
    let climatic: IndexMap<String, Tree> = climatic
        .into_iter()
        .map(|(variable, (_, tree))| (variable, tree))
        .collect();
    let results = filter::aggregate(&climatic, &genetic, &table, &params.filter_params())?;

    let writer = intspan::writer(&params.output);
    filter::write_results(&results, writer).map_err(|e| e.at(Stage::Output, &params.output))?;
    info!("Wrote {} rows to {}", results.len(), params.output);

    Ok(())
}
