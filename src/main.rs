use clap::Parser;
use std::process::ExitCode;
use tasktime::cli::ReportCli;
use tasktime::report::{self, RunReport};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(args: &ReportCli) -> tasktime::report::Result<String> {
    let run_dir = report::locate_run(&args.benchmark_root, args.benchmark_dir.as_deref())?;
    tracing::debug!("Reporting on {}", run_dir.display());
    let report = RunReport::load(&run_dir)?;
    Ok(report.render(args.top_limit()))
}

fn main() -> ExitCode {
    let args = ReportCli::parse();
    init_tracing(args.debug);

    match run(&args) {
        Ok(text) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("ERROR: {}", e);
            ExitCode::from(1)
        }
    }
}
