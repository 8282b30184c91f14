use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sched_config::{ConfigContainer, load_config, update_config};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "sched-config")]
#[command(about = "Validate job scheduler configuration", long_about = None)]
struct Cli {
    /// Log validation progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration documents and print what they define.
    Check {
        #[arg(required = true)]
        files: Vec<String>,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Replace one namespace of a document and print the merged result.
    Update {
        /// Existing configuration document.
        file: String,

        /// Fragment to merge; its `config_name` picks the namespace.
        fragment: String,
    },
}

fn read(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
}

fn print_summary(path: &str, container: &ConfigContainer) {
    let summary = container.summary();
    println!("{path}: OK");
    println!("  namespaces: {}", summary.namespaces.join(", "));
    println!("  nodes:      {}", summary.nodes.join(", "));
    println!("  jobs:       {}", summary.jobs.len());
    for job in &summary.jobs {
        println!("    {job}");
    }
    println!("  services:   {}", summary.services.len());
    for service in &summary.services {
        println!("    {service}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    sched_config::logging::init_logging(cli.verbose);

    match cli.cmd {
        Commands::Check { files, json } => {
            let mut failed = 0usize;
            let mut summaries = std::collections::BTreeMap::new();
            for path in &files {
                let text = read(path)?;
                match load_config(&text) {
                    Ok(container) if json => {
                        summaries.insert(path.clone(), container.summary());
                    }
                    Ok(container) => print_summary(path, &container),
                    Err(err) => {
                        eprintln!("{path}: {err}");
                        failed += 1;
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
            if failed > 0 {
                bail!("{failed} of {} configuration(s) failed validation", files.len());
            }
        }
        Commands::Update { file, fragment } => {
            let merged = update_config(&read(&file)?, &read(&fragment)?)
                .with_context(|| format!("update of {file} with {fragment} rejected"))?;
            print!("{merged}");
        }
    }

    Ok(())
}
