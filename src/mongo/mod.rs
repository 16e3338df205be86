// macsio_etl/src/mongo/mod.rs
// MongoDB source and sink.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Cursor};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::pipeline::{RecordSink, RecordSource};

/// Builds a client for `uri` and checks the deployment answers a ping.
///
/// No retry is attempted; an unreachable server fails the run.
pub async fn connect(uri: &str,) -> Result<Client,> {
    let client_options = ClientOptions::parse(uri,).await.map_err(|e| {
        EtlError::ConfigurationError(format!("Failed to parse MongoDB URI: {}", e),)
    },)?;
    let client = Client::with_options(client_options,).map_err(|e| {
        EtlError::ConnectionError(format!("Failed to create MongoDB client: {}", e),)
    },)?;

    client
        .database("admin",)
        .run_command(doc! {"ping": 1}, None,)
        .await
        .map_err(|e| EtlError::ConnectionError(format!("Failed to connect to MongoDB: {}", e),),)?;

    info!("Connected to MongoDB at {}", redact_uri(uri));
    Ok(client,)
}

/// Parses a `--filter` argument into a query document.
pub fn parse_filter(json: &str,) -> Result<Document,> {
    let value: serde_json::Value = serde_json::from_str(json,).map_err(|e| {
        EtlError::ConfigurationError(format!("Filter is not valid JSON: {}", e),)
    },)?;
    if !value.is_object() {
        return Err(EtlError::ConfigurationError(format!(
            "Filter must be a JSON object, got `{}`",
            json
        ),),);
    }
    mongodb::bson::to_document(&value,)
        .map_err(|e| EtlError::ConfigurationError(format!("Filter is not a valid query: {}", e),),)
}

// Credentials never reach the logs.
fn redact_uri(uri: &str,) -> String {
    match (uri.find("://",), uri.rfind('@',),) {
        (Some(scheme_end,), Some(at,),) if at > scheme_end => {
            format!("{}***{}", &uri[..scheme_end + 3], &uri[at..])
        },
        _ => uri.to_string(),
    }
}

pub struct MongoSource {
    cursor:          Cursor<Document,>,
    database_name:   String,
    collection_name: String,
}

impl MongoSource {
    pub async fn open(
        client: &Client,
        database_name: &str,
        collection_name: &str,
        filter: Option<Document,>,
    ) -> Result<Self,> {
        let collection: Collection<Document,> =
            client.database(database_name,).collection(collection_name,);
        let cursor = collection.find(filter, None,).await.map_err(|e| {
            EtlError::DatabaseError(format!(
                "Failed to query {}.{}: {}",
                database_name, collection_name, e
            ),)
        },)?;

        Ok(MongoSource {
            cursor,
            database_name: database_name.to_string(),
            collection_name: collection_name.to_string(),
        },)
    }
}

#[async_trait]
impl RecordSource for MongoSource {
    async fn next_record(&mut self,) -> Result<Option<Document,>,> {
        self.cursor.try_next().await.map_err(|e| {
            EtlError::DatabaseError(format!(
                "Failed to read from {}.{}: {}",
                self.database_name, self.collection_name, e
            ),)
        },)
    }

    fn describe(&self,) -> String {
        format!("mongodb {}.{}", self.database_name, self.collection_name)
    }
}

pub struct MongoSink {
    collection:      Collection<Document,>,
    database_name:   String,
    collection_name: String,
}

impl MongoSink {
    pub fn new(client: &Client, database_name: &str, collection_name: &str,) -> Self {
        MongoSink {
            collection:      client.database(database_name,).collection(collection_name,),
            database_name:   database_name.to_string(),
            collection_name: collection_name.to_string(),
        }
    }
}

#[async_trait]
impl RecordSink for MongoSink {
    async fn write_batch(&mut self, batch: Vec<Document,>,) -> Result<(),> {
        if batch.is_empty() {
            return Ok((),);
        }
        self.collection
            .insert_many(batch, None,)
            .await
            .map(|_| (),)
            .map_err(|e| {
                EtlError::SinkError(format!(
                    "Failed to insert into {}.{}: {}",
                    self.database_name, self.collection_name, e
                ),)
            },)
    }

    fn describe(&self,) -> String {
        format!("mongodb {}.{}", self.database_name, self.collection_name)
    }
}
