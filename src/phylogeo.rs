extern crate clap;
use clap::*;

mod cmd_phylogeo;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Command::new("phylogeo")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`phylogeo` - Correlate genetic and climatic divergence along phylogenetic trees")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_phylogeo::config::make_subcommand())
        .subcommand(cmd_phylogeo::matrix::make_subcommand())
        .subcommand(cmd_phylogeo::climatic::make_subcommand())
        .subcommand(cmd_phylogeo::bootstrap::make_subcommand())
        .subcommand(cmd_phylogeo::run::make_subcommand())
        .after_help(
            r###"Subcommands:

* Single stages:
    * matrix    - Dissimilarity matrix of one climatic variable
    * climatic  - Neighbor-joining trees of climatic variables
    * bootstrap - Bootstrap consensus trees of aligned genes

* Pipeline:
    * config - Print a sample configuration
    * run    - Compare genetic and climatic trees, write the result file

Set RUST_LOG=debug to see per-pair least-squares distances.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("config", sub_matches)) => cmd_phylogeo::config::execute(sub_matches),
        Some(("matrix", sub_matches)) => cmd_phylogeo::matrix::execute(sub_matches),
        Some(("climatic", sub_matches)) => cmd_phylogeo::climatic::execute(sub_matches),
        Some(("bootstrap", sub_matches)) => cmd_phylogeo::bootstrap::execute(sub_matches),
        Some(("run", sub_matches)) => cmd_phylogeo::run::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
