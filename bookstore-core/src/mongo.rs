// bookstore-core/src/mongo.rs
// DocumentStore backed by a MongoDB server through the sync driver

use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::sync::{Client, Collection, Database};
use mongodb::IndexModel;
use serde_json::Value;
use tracing::{debug, info};

use crate::aggregation::Pipeline;
use crate::config::RunnerConfig;
use crate::error::{BookstoreError, Result};
use crate::explain::{ExecutionStats, ExplainVerbosity};
use crate::filter::Filter;
use crate::find_options::FindRequest;
use crate::index::{IndexDescriptor, IndexSpec};
use crate::store::{DeleteOutcome, DocumentStore, UpdateOutcome};
use crate::update::Update;

/// Convert a JSON request fragment into a BSON document
pub fn to_bson_document(value: &Value) -> Result<Document> {
    Ok(bson::to_document(value)?)
}

/// Convert a BSON result back into relaxed extended JSON
pub fn from_bson_document(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

/// The driver takes a signed limit; a negative one means a single batch
fn driver_limit(limit: u64) -> Result<i64> {
    i64::try_from(limit)
        .map_err(|_| BookstoreError::InvalidQuery(format!("limit {} is too large", limit)))
}

/// One open connection, scoped to a database and collection
///
/// The client is released when the store is dropped, so every exit path
/// (normal completion or the first failure) closes the connection.
pub struct MongoStore {
    client: Client,
    database: Database,
    collection: Collection<Document>,
    collection_name: String,
}

impl MongoStore {
    /// Open the connection and make sure the target collection exists
    pub fn connect(config: &RunnerConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .map_err(|e| BookstoreError::Connection(format!("{}: {}", config.uri, e)))?;
        let database = client.database(&config.database);

        database
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| BookstoreError::Connection(format!("{}: {}", config.uri, e)))?;

        let names = database.list_collection_names(doc! { "name": config.collection.as_str() })?;
        if !names.iter().any(|n| n == &config.collection) {
            return Err(BookstoreError::CollectionNotFound(format!(
                "{}.{}",
                config.database, config.collection
            )));
        }

        info!(
            database = %config.database,
            collection = %config.collection,
            "connected"
        );

        Ok(MongoStore {
            collection: database.collection::<Document>(&config.collection),
            collection_name: config.collection.clone(),
            database,
            client,
        })
    }

    /// Release the client explicitly
    pub fn close(self) {
        debug!(collection = %self.collection_name, "closing connection");
        drop(self.client);
    }
}

impl DocumentStore for MongoStore {
    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn find(&self, request: &FindRequest) -> Result<Vec<Value>> {
        request.filter.validate()?;
        let filter = to_bson_document(&request.filter.to_json())?;

        let projection = match &request.projection {
            Some(p) => Some(to_bson_document(&p.to_json())?),
            None => None,
        };
        let sort = match &request.sort {
            Some(s) => Some(to_bson_document(&s.to_json())?),
            None => None,
        };
        let limit = request.limit.map(driver_limit).transpose()?;
        let options = FindOptions::builder()
            .projection(projection)
            .sort(sort)
            .skip(request.skip)
            .limit(limit)
            .build();

        let cursor = self.collection.find(filter, options)?;
        cursor
            .map(|doc| Ok(from_bson_document(doc?)))
            .collect()
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateOutcome> {
        filter.validate()?;
        update.validate()?;

        let result = self.collection.update_one(
            to_bson_document(&filter.to_json())?,
            to_bson_document(&update.to_json())?,
            None,
        )?;
        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    fn delete_one(&self, filter: &Filter) -> Result<DeleteOutcome> {
        filter.validate()?;
        let result = self
            .collection
            .delete_one(to_bson_document(&filter.to_json())?, None)?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    fn count_documents(&self, filter: &Filter) -> Result<u64> {
        filter.validate()?;
        Ok(self
            .collection
            .count_documents(to_bson_document(&filter.to_json())?, None)?)
    }

    fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>> {
        pipeline.validate()?;
        let stages = pipeline
            .to_json()
            .iter()
            .map(to_bson_document)
            .collect::<Result<Vec<Document>>>()?;

        let cursor = self.collection.aggregate(stages, None)?;
        cursor
            .map(|doc| Ok(from_bson_document(doc?)))
            .collect()
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<String> {
        spec.validate()?;
        let model = IndexModel::builder()
            .keys(to_bson_document(&spec.keys_json())?)
            .options(Some(IndexOptions::builder().name(spec.name()).build()))
            .build();

        Ok(self.collection.create_index(model, None)?.index_name)
    }

    fn list_indexes(&self) -> Result<Vec<IndexDescriptor>> {
        let cursor = self.collection.list_indexes(None)?;
        cursor
            .map(|model| {
                let model = model?;
                let options = model.options.as_ref();
                Ok(IndexDescriptor {
                    name: options.and_then(|o| o.name.clone()).unwrap_or_default(),
                    unique: options.and_then(|o| o.unique).unwrap_or(false),
                    keys: from_bson_document(model.keys),
                })
            })
            .collect()
    }

    fn explain(&self, filter: &Filter, verbosity: ExplainVerbosity) -> Result<ExecutionStats> {
        filter.validate()?;
        let command = doc! {
            "explain": {
                "find": self.collection_name.as_str(),
                "filter": to_bson_document(&filter.to_json())?,
            },
            "verbosity": verbosity.as_str(),
        };

        let report = self.database.run_command(command, None)?;
        ExecutionStats::from_explain(&from_bson_document(report))
    }
}
