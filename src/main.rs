use clap::Parser;
use std::error::Error;
use std::io::Write;
use std::process::ExitCode;
use yield_catalog::{Catalog, FinalDocument};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    // Defaults, then config file, then environment, then command line
    let mut catalog = Catalog::default();
    if let Some(path) = &args.config {
        catalog = catalog.with_config_file(path)?;
    }
    let catalog = args.configure(catalog.with_env());

    ::log::info!("Starting catalog crawl of {}", catalog.config().base_url);
    ::log::debug!("Configuration: {:?}", catalog.config());

    let document = catalog.crawl().await?;
    write_document(&document, &args.output, !args.compact)?;

    if args.output != "-" {
        println!("Scraping complete. Data saved to {}", args.output);
    }
    Ok(())
}

fn write_document(document: &FinalDocument, output: &str, pretty: bool) -> Result<(), Box<dyn Error>> {
    let json = document.to_json(pretty)?;

    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        std::fs::write(output, json)?;
    }
    Ok(())
}
