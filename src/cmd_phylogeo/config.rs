use clap::*;
use phylogeo::libs::config::Params;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("config")
        .about("Print a sample configuration file")
        .after_help(
            r###"
Prints a commented TOML configuration with every recognized key.

Examples:
1. Start a new project:
   phylogeo config -o phylogeo.toml

2. Check an edited file:
   phylogeo config --check phylogeo.toml
"###,
        )
        .arg(
            Arg::new("check")
                .long("check")
                .num_args(1)
                .help("Validate this configuration file instead"),
        )
        .arg(super::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let outfile = args.get_one::<String>("outfile").unwrap();
    let mut writer = intspan::writer(outfile);

    if let Some(file) = args.get_one::<String>("check") {
        let params = Params::from_file(file)?;
        params.validate()?;
        writer.write_fmt(format_args!(
            "{}: {} variables, {} alignments\n",
            file,
            params.variables().len(),
            params.alignments.len()
        ))?;
        return Ok(());
    }

    writer.write_all(Params::generate_sample().as_bytes())?;
    Ok(())
}
