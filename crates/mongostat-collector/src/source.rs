//! Database access used by the collectors.
//!
//! Collectors only ever need two shapes of request: an administrative
//! command run against a database, and an aggregation pipeline run against a
//! collection. [`StatsSource`] captures exactly that, so the driving loop can
//! run against a real `mongodb::Client` or an in-memory fake.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::Document;

use crate::error::BoxError;

/// Something that can answer administrative commands and pipelines
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Run a database command such as `{ collStats: "orders", scale: 1 }`
    async fn run_command(&self, database: &str, command: Document) -> Result<Document, BoxError>;

    /// Run an aggregation pipeline on a collection and collect every result
    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, BoxError>;
}

#[async_trait]
impl StatsSource for mongodb::Client {
    async fn run_command(&self, database: &str, command: Document) -> Result<Document, BoxError> {
        let response = self.database(database).run_command(command, None).await?;
        Ok(response)
    }

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, BoxError> {
        let cursor = self
            .database(database)
            .collection::<Document>(collection)
            .aggregate(pipeline, None)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory source keyed by collection name.

    use super::*;
    use mongodb::bson::doc;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    pub struct FakeSource {
        coll_stats: Mutex<HashMap<String, Document>>,
        index_stats: Mutex<HashMap<String, Vec<Document>>>,
        server_status: Mutex<Option<Document>>,
        failing: Mutex<HashSet<String>>,
    }

    impl FakeSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_coll_stats(&self, collection: &str, response: Document) {
            self.coll_stats
                .lock()
                .insert(collection.to_string(), response);
        }

        pub fn set_index_stats(&self, collection: &str, records: Vec<Document>) {
            self.index_stats
                .lock()
                .insert(collection.to_string(), records);
        }

        pub fn set_server_status(&self, response: Document) {
            *self.server_status.lock() = Some(response);
        }

        /// Every request naming `collection` fails until [`recover`](Self::recover)
        pub fn fail(&self, collection: &str) {
            self.failing.lock().insert(collection.to_string());
        }

        pub fn recover(&self, collection: &str) {
            self.failing.lock().remove(collection);
        }
    }

    #[async_trait]
    impl StatsSource for FakeSource {
        async fn run_command(
            &self,
            _database: &str,
            command: Document,
        ) -> Result<Document, BoxError> {
            if command.contains_key("serverStatus") {
                return self
                    .server_status
                    .lock()
                    .clone()
                    .ok_or_else(|| "serverStatus unavailable".into());
            }

            let collection = command.get_str("collStats")?.to_string();
            if self.failing.lock().contains(&collection) {
                return Err(format!("connection reset while reading {collection}").into());
            }
            self.coll_stats
                .lock()
                .get(&collection)
                .cloned()
                .ok_or_else(|| format!("ns not found: {collection}").into())
        }

        async fn aggregate(
            &self,
            _database: &str,
            collection: &str,
            pipeline: Vec<Document>,
        ) -> Result<Vec<Document>, BoxError> {
            if pipeline != vec![doc! { "$indexStats": {} }] {
                return Err("unsupported pipeline".into());
            }
            if self.failing.lock().contains(collection) {
                return Err(format!("connection reset while reading {collection}").into());
            }
            Ok(self
                .index_stats
                .lock()
                .get(collection)
                .cloned()
                .unwrap_or_default())
        }
    }
}
