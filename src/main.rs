use clap::Parser;
use quantscan::cli::{Cli, logging_settings, run};
use quantscan::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let (level, format) = logging_settings(&cli.config);
    init_logging(&level, format);
    run(cli)
}
