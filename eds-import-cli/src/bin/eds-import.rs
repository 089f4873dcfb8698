//! Prints the CAN messages defined by the PDO configuration of EDS/DCF files
use std::process::ExitCode;

use clap::Parser;
use eds_import::{
    config::{ImportConfig, ImportJob},
    DiagnosticSink, LogSink, NoopSink,
};
use eds_import_cli::{
    command::{Cli, Commands},
    report::Report,
};

fn run_job(job: &ImportJob, sink: &dyn DiagnosticSink) -> bool {
    match job.run(sink) {
        Ok(result) => {
            print!("{}", Report(&result));
            true
        }
        Err(e) => {
            eprintln!("Error importing {}: {e}", job.path.display());
            false
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let sink: &dyn DiagnosticSink = if cli.verbose { &LogSink } else { &NoopSink };

    let ok = match cli.command {
        Commands::Import(args) => {
            let job = ImportJob {
                path: args.path,
                node_id: args.node_id,
                canopen_manager: args.canopen_manager,
            };
            run_job(&job, sink)
        }
        Commands::Batch(args) => {
            let config = match ImportConfig::load(&args.config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error loading {}: {e}", args.config.display());
                    return ExitCode::FAILURE;
                }
            };
            log::info!(
                "Running {} imports from {}",
                config.imports.len(),
                args.config.display()
            );
            let mut all_ok = true;
            for job in &config.imports {
                println!(
                    "== {} (node {}{}) ==",
                    job.path.display(),
                    job.node_id,
                    if job.canopen_manager { ", CANopen manager" } else { "" }
                );
                all_ok &= run_job(job, sink);
            }
            all_ok
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
