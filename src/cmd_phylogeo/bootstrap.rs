use clap::*;
use log::warn;
use phylogeo::libs::alignment;
use phylogeo::libs::bootstrap::{self, BootstrapOptions, CancelToken};
use phylogeo::libs::phylo::Phylogeny;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("bootstrap")
        .about("Bootstrap consensus trees of aligned genes")
        .after_help(
            r###"
For each aligned FASTA file, resamples alignment columns with replacement,
builds a neighbor-joining tree from identity distances of every resample, and
reduces the trees to a majority-rule consensus.

Output:
One line per gene, `gene<TAB>mean support<TAB>newick`. Support values are
internal node labels of the Newick tree. Genes that fail are reported on
stderr and left out.

Notes:
* The gene key is the file stem.
* Resamples of a gene are seeded from --seed and the gene key.

Examples:
1. 100 resamples per gene, 4 threads:
   phylogeo bootstrap 1_35.fasta 36_70.fasta --reps 100 -p 4

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Aligned FASTA files, one per gene"),
        )
        .arg(
            Arg::new("reps")
                .long("reps")
                .short('r')
                .num_args(1)
                .default_value("100")
                .value_parser(value_parser!(usize))
                .help("Resamples per gene"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .default_value("42")
                .value_parser(value_parser!(u64))
                .help("Random seed"),
        )
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .num_args(1)
                .default_value("0.5")
                .value_parser(value_parser!(f64))
                .help("Keep splits found in more than this fraction of resamples"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads"),
        )
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infiles: Vec<String> = args.get_many::<String>("infiles").unwrap().cloned().collect();
    let outfile = args.get_one::<String>("outfile").unwrap();

    let opts = BootstrapOptions {
        reps: *args.get_one::<usize>("reps").unwrap(),
        seed: *args.get_one::<u64>("seed").unwrap(),
        cutoff: *args.get_one::<f64>("cutoff").unwrap(),
        timeout: None,
        threads: Some(*args.get_one::<usize>("parallel").unwrap()),
    };
    if opts.reps == 0 {
        anyhow::bail!("--reps must be at least 1");
    }

    //----------------------------
    // Ops
    //----------------------------
    let set = alignment::load_alignments(&infiles)?;
    let outcomes = bootstrap::build_consensus_trees(set, &opts, &CancelToken::new())?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = intspan::writer(outfile);
    for (gene, outcome) in outcomes {
        match outcome {
            Ok(tree) => {
                let mean = tree
                    .mean_confidence()
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "NA".to_string());
                writer.write_fmt(format_args!("{}\t{}\t{}\n", gene, mean, tree.to_newick()))?;
            }
            Err(e) => warn!("Skipping gene {}: {}", gene, e),
        }
    }

    Ok(())
}
