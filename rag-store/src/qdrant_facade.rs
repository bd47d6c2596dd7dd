//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! This facade concentrates all Qdrant interactions behind a minimal API,
//! hiding away the verbose builder pattern and keeping the rest of the
//! crate decoupled from `qdrant-client`.

use std::collections::{BTreeSet, HashMap};

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, Filter, PayloadIncludeSelector, PointStruct,
    ScrollPointsBuilder, SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QValue, VectorParamsBuilder, value::Kind,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunk::{Chunk, ChunkKind, FILE_NAME_FIELD, KIND_FIELD, ORDINAL_FIELD, TEXT_FIELD};
use crate::config::{DistanceKind, RagConfig};
use crate::errors::RagError;

const SCROLL_PAGE: u32 = 256;

/// A facade over the Qdrant client bound to one collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// Supports optional API key authentication. No network I/O happens here.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn collection_exists(&self) -> Result<bool, RagError> {
        Ok(self.client.collection_exists(&self.collection).await?)
    }

    /// Ensures that the collection and its `file_name` keyword index exist.
    ///
    /// - If the collection already exists → no-op.
    /// - If missing → creates it with `dim`-sized vectors, then the index.
    pub async fn ensure_collection(&self, dim: usize) -> Result<(), RagError> {
        if self.collection_exists().await? {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };
        info!(
            collection = %self.collection,
            dim,
            distance = ?self.distance,
            "creating collection"
        );
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, distance)),
            )
            .await?;

        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    FILE_NAME_FIELD,
                    FieldType::Keyword,
                )
                .wait(true),
            )
            .await?;

        info!(collection = %self.collection, "collection and file_name index created");
        Ok(())
    }

    /// Upserts a batch of points and waits for persistence.
    pub async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<usize, RagError> {
        if points.is_empty() {
            return Ok(0);
        }
        let n = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;
        debug!(collection = %self.collection, points = n, "upsert acknowledged");
        Ok(n)
    }

    /// Similarity search restricted by `filter`, best first.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Filter,
        exact: bool,
    ) -> Result<Vec<(f32, Chunk)>, RagError> {
        let mut builder = SearchPointsBuilder::new(&self.collection, vector, top_k)
            .filter(filter)
            .with_payload(true);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self.client.search_points(builder).await?;

        let mut out = Vec::with_capacity(res.result.len());
        for point in res.result {
            out.push((point.score, chunk_from_payload(point.payload)?));
        }
        debug!(collection = %self.collection, hits = out.len(), "search completed");
        Ok(out)
    }

    /// Deletes every point matching `filter`, returning how many matched before deletion.
    pub async fn delete_matching(&self, filter: Filter) -> Result<u64, RagError> {
        let count = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(filter.clone())
                    .exact(true),
            )
            .await?
            .result
            .map(|r| r.count)
            .unwrap_or(0);

        if count > 0 {
            self.client
                .delete_points(
                    DeletePointsBuilder::new(&self.collection)
                        .points(filter)
                        .wait(true),
                )
                .await?;
        }
        Ok(count)
    }

    /// Scrolls all points reading only `file_name`, collecting distinct values.
    pub async fn distinct_file_names(&self) -> Result<BTreeSet<String>, RagError> {
        let mut names = BTreeSet::new();
        let mut offset = None;
        loop {
            let mut builder = file_name_scroll(&self.collection);
            if let Some(id) = offset.take() {
                builder = builder.offset(id);
            }

            let page = self.client.scroll(builder).await?;
            for point in page.result {
                if let Some(name) = string_field(&point.payload, FILE_NAME_FIELD) {
                    names.insert(name);
                }
            }
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(names)
    }
}

/// Builds a point from a chunk and its vector.
pub fn chunk_point(id: Uuid, vector: Vec<f32>, chunk: &Chunk) -> PointStruct {
    let mut payload: HashMap<String, QValue> = HashMap::new();
    payload.insert(TEXT_FIELD.into(), qstring(&chunk.text));
    payload.insert(FILE_NAME_FIELD.into(), qstring(&chunk.file_name));
    payload.insert(KIND_FIELD.into(), qstring(chunk.kind.as_str()));
    if let Some(ordinal) = chunk.ordinal {
        payload.insert(
            ORDINAL_FIELD.into(),
            QValue {
                kind: Some(Kind::IntegerValue(i64::from(ordinal))),
            },
        );
    }

    PointStruct {
        id: Some(id.to_string().into()),
        payload,
        vectors: Some(vector.into()),
        ..Default::default()
    }
}

/// Reads a chunk back from a Qdrant payload.
pub fn chunk_from_payload(payload: HashMap<String, QValue>) -> Result<Chunk, RagError> {
    let text = string_field(&payload, TEXT_FIELD)
        .ok_or_else(|| RagError::Payload(format!("missing `{TEXT_FIELD}`")))?;
    let file_name = string_field(&payload, FILE_NAME_FIELD)
        .ok_or_else(|| RagError::Payload(format!("missing `{FILE_NAME_FIELD}`")))?;
    let ordinal = payload.get(ORDINAL_FIELD).and_then(|v| match v.kind {
        Some(Kind::IntegerValue(i)) => u32::try_from(i).ok(),
        _ => None,
    });
    let kind = string_field(&payload, KIND_FIELD)
        .map(|k| ChunkKind::parse(&k))
        .unwrap_or(ChunkKind::Text);

    Ok(Chunk {
        text,
        file_name,
        ordinal,
        kind,
    })
}

fn string_field(payload: &HashMap<String, QValue>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Wraps a string into Qdrant `Value`.
fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

/// One page of points carrying only their file name.
fn file_name_scroll(collection: &str) -> ScrollPointsBuilder {
    ScrollPointsBuilder::new(collection)
        .limit(SCROLL_PAGE)
        .with_payload(PayloadIncludeSelector {
            fields: vec![FILE_NAME_FIELD.to_string()],
        })
        .with_vectors(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::with_payload_selector::SelectorOptions;

    #[test]
    fn scroll_fetches_only_file_names() {
        let req = file_name_scroll("docs").build();
        assert_eq!(req.collection_name, "docs");
        assert_eq!(req.limit, Some(SCROLL_PAGE));
        let selector = req.with_payload.and_then(|w| w.selector_options);
        assert_eq!(
            selector,
            Some(SelectorOptions::Include(PayloadIncludeSelector {
                fields: vec![FILE_NAME_FIELD.to_string()],
            }))
        );
    }

    #[test]
    fn payload_round_trips_through_point() {
        let chunk = Chunk {
            text: "| a | b |".into(),
            file_name: "report.pdf".into(),
            ordinal: Some(3),
            kind: ChunkKind::Table,
        };
        let point = chunk_point(Uuid::nil(), vec![0.1, 0.2], &chunk);
        assert_eq!(chunk_from_payload(point.payload).unwrap(), chunk);
    }

    #[test]
    fn payload_without_text_is_rejected() {
        let mut payload = HashMap::new();
        payload.insert(FILE_NAME_FIELD.to_string(), qstring("a.pdf"));
        assert!(matches!(
            chunk_from_payload(payload),
            Err(RagError::Payload(_))
        ));
    }

    #[test]
    fn missing_kind_and_ordinal_default() {
        let mut payload = HashMap::new();
        payload.insert(TEXT_FIELD.to_string(), qstring("body"));
        payload.insert(FILE_NAME_FIELD.to_string(), qstring("a.pdf"));
        let chunk = chunk_from_payload(payload).unwrap();
        assert_eq!(chunk.kind, ChunkKind::Text);
        assert_eq!(chunk.ordinal, None);
    }
}
