// macsio_etl/src/main.rs
// Entry point for the macsio-etl CLI application.

use std::path::Path;

use clap::Parser;
use macsio_etl::cli::{Cli, Commands};
use macsio_etl::error::Result;
use macsio_etl::json::JsonLinesSink;
use macsio_etl::mongo::{MongoSink, MongoSource, connect, parse_filter};
use macsio_etl::pipeline::{Pipeline, PipelineOptions, RunReport};
use mongodb::Client;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(),> {
    // Initialize tracing
    let file_appender = tracing_appender::rolling::never(".", "etl.log",);
    let (non_blocking, _guard,) = tracing_appender::non_blocking(file_appender,);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with(fmt::layer().with_writer(std::io::stderr,),)
        .with(fmt::layer().with_writer(non_blocking,).with_ansi(false,),)
        .init();

    let cli = Cli::parse();
    let options = PipelineOptions {
        batch_size:   cli.batch_size,
        skip_invalid: cli.skip_invalid,
    };
    let filter = cli.source.filter.as_deref().map(parse_filter,).transpose()?;

    let client = connect(&cli.source.uri,).await?;

    // Every client acquired below is shut down before the run's outcome is returned.
    let mut output_client: Option<Client,> = None;
    let res: Result<RunReport,> = async {
        // Opening the source first keeps a bad query from touching the output.
        let source =
            MongoSource::open(&client, &cli.source.db, &cli.source.input_collection, filter,)
                .await?;

        match &cli.command {
            Commands::Mongo(args,) => {
                let write_client = match args.output_uri.as_deref() {
                    Some(uri,) if uri != cli.source.uri => {
                        output_client.insert(connect(uri,).await?,).clone()
                    },
                    _ => client.clone(),
                };
                let sink = MongoSink::new(&write_client, &cli.source.db, &args.output_collection,);
                Pipeline::new(source, sink, options,)?.run().await
            },
            Commands::Json(args,) => {
                let sink = match args.output.as_deref() {
                    Some(path,) => JsonLinesSink::create(path,),
                    None => JsonLinesSink::stdout(),
                };
                Pipeline::new(source, sink, options,)?.run().await
            },
        }
    }
    .await;

    if let Some(c,) = output_client {
        c.shutdown().await;
    }
    client.shutdown().await;

    let report = match res {
        Ok(report,) => report,
        Err(e,) => {
            error!(transient = e.is_transient(), "Run failed: {}", e);
            return Err(e,);
        },
    };

    if cli.report {
        report.save(Path::new(macsio_etl::REPORT_FILE_NAME,),)?;
    }
    info!("Done");
    Ok((),)
}
