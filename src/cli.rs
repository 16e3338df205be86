// macsio_etl/src/cli.rs
// Command Line Interface (CLI) specific logic for macsio_etl.

use std::path::PathBuf;

use clap::Parser;

/// Reshapes MACSio run records from one MongoDB collection into another.
#[derive(Parser, Debug,)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Where the reshaped records are written.
    #[clap(subcommand)]
    pub command: Commands,

    #[clap(flatten)]
    pub source: SourceArgs,

    /// Number of records per write.
    #[clap(short, long, default_value_t = crate::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Log and skip records that cannot be reshaped instead of aborting the run.
    #[clap(long)]
    pub skip_invalid: bool,

    /// Write a run summary (transform_report.json) at the end.
    #[clap(long)]
    pub report: bool,
}

#[derive(Parser, Debug,)]
pub enum Commands {
    /// Write reshaped records to a MongoDB collection
    Mongo(MongoSinkArgs,),
    /// Print reshaped records as JSON lines
    Json(JsonSinkArgs,),
}

#[derive(Parser, Debug,)]
pub struct SourceArgs {
    /// Connection string for MongoDB
    #[clap(long, env = "MONGO_URI", default_value = crate::DEFAULT_MONGO_URI)]
    pub uri:              String,
    /// Database holding both collections
    #[clap(long, env = "MACSIO_DB", default_value = crate::DEFAULT_DATABASE_NAME)]
    pub db:               String,
    /// Collection to read raw records from
    #[clap(long, default_value = crate::DEFAULT_INPUT_COLLECTION)]
    pub input_collection: String,
    /// Query filter as a JSON object (e.g. '{"hostname":"quartz1234"}')
    #[clap(long)]
    pub filter:           Option<String,>,
}

#[derive(Parser, Debug,)]
pub struct MongoSinkArgs {
    /// Collection to write reshaped records to
    #[clap(long, default_value = crate::DEFAULT_OUTPUT_COLLECTION)]
    pub output_collection: String,
    /// Connection string for the output deployment; defaults to --uri
    #[clap(long, env = "MONGO_OUTPUT_URI")]
    pub output_uri:        Option<String,>,
}

#[derive(Parser, Debug,)]
pub struct JsonSinkArgs {
    /// File to write to; stdout when omitted
    #[clap(short, long)]
    pub output: Option<PathBuf,>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_macsio_layout() {
        let cli = Cli::try_parse_from(["macsio-etl", "mongo"],).unwrap();
        assert_eq!(cli.batch_size, 10);
        assert_eq!(cli.source.db, "macsio2");
        assert_eq!(cli.source.input_collection, "macsioinputs");
        assert!(!cli.skip_invalid);
        match cli.command {
            Commands::Mongo(args,) => {
                assert_eq!(args.output_collection, "macsiooutputs");
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn json_output_path() {
        let cli = Cli::try_parse_from([
            "macsio-etl",
            "--filter",
            "{\"procs\":4}",
            "--skip-invalid",
            "json",
            "--output",
            "out.jsonl",
        ],)
        .unwrap();
        assert!(cli.skip_invalid);
        assert_eq!(cli.source.filter.as_deref(), Some("{\"procs\":4}"));
        match cli.command {
            Commands::Json(args,) => assert_eq!(args.output, Some(PathBuf::from("out.jsonl"))),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
