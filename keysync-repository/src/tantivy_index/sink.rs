//! Tantivy-backed index sink.
//!
//! Holds the full-text index in memory, mirroring the source store's
//! keyspace. One mutex serializes the revision guard and the index writer, so
//! the admit decision and the write it authorizes are a single atomic step
//! even when both workers target the same id at the same time.

use chrono::{DateTime, Utc};
use tantivy::collector::TopDocs;
use tantivy::query::{QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Term, Value, STORED, STRING, TEXT};
use tantivy::snippet::SnippetGenerator;
use tantivy::{doc, DateTime as TantivyDateTime, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::Mutex;
use tracing::debug;

use async_trait::async_trait;

use crate::errors::SinkError;
use crate::guard::RevisionGuard;
use crate::interfaces::IndexSink;
use crate::tantivy_index::IndexConfig;
use crate::types::{DeleteRequest, SearchHit, UpsertRequest, WriteOutcome};
use keysync_shared::IndexDocument;

/// Schema fields of the document index.
#[derive(Debug, Clone, Copy)]
struct DocFields {
    id: Field,
    body: Field,
    revision: Field,
    indexed_at: Field,
}

/// Writer-side state; guarded by one lock so admit-and-write is atomic.
struct WriterState {
    writer: IndexWriter,
    guard: RevisionGuard,
}

/// Embedded Tantivy index sink.
///
/// Documents carry the store key as their id, the value bytes as the indexed
/// body, and the store revision used by the write guard. Queries run against
/// a manually reloaded reader that is refreshed after every commit.
pub struct TantivyIndexSink {
    index: Index,
    reader: IndexReader,
    fields: DocFields,
    state: Mutex<WriterState>,
}

impl TantivyIndexSink {
    /// Create a new in-memory sink.
    pub fn new(config: IndexConfig) -> Result<Self, SinkError> {
        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let body = schema_builder.add_text_field("body", TEXT | STORED);
        let revision = schema_builder.add_u64_field("revision", STORED);
        let indexed_at = schema_builder.add_date_field("indexed_at", STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let writer = index
            .writer(config.writer_heap_bytes)
            .map_err(|e| SinkError::index_creation(e.to_string()))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: tantivy::TantivyError| SinkError::index_creation(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            fields: DocFields {
                id,
                body,
                revision,
                indexed_at,
            },
            state: Mutex::new(WriterState {
                writer,
                guard: RevisionGuard::new(),
            }),
        })
    }

    fn reload_reader(&self) -> Result<(), SinkError> {
        self.reader
            .reload()
            .map_err(|e| SinkError::index(e.to_string()))
    }

    fn hit_from_doc(&self, doc: &TantivyDocument, score: f32, snippet: String) -> SearchHit {
        let id = doc
            .get_first(self.fields.id)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        SearchHit { id, score, snippet }
    }

    fn document_from_doc(&self, doc: &TantivyDocument) -> Option<IndexDocument> {
        let id = doc.get_first(self.fields.id).and_then(|v| v.as_str())?;
        let body = doc
            .get_first(self.fields.body)
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let revision = doc.get_first(self.fields.revision).and_then(|v| v.as_u64())?;
        let indexed_at = doc
            .get_first(self.fields.indexed_at)
            .and_then(|v| v.as_datetime())
            .and_then(|dt| DateTime::from_timestamp_micros(dt.into_timestamp_micros()))
            .unwrap_or(DateTime::UNIX_EPOCH);

        Some(IndexDocument {
            id: id.to_string(),
            body: body.as_bytes().to_vec(),
            revision,
            indexed_at,
        })
    }
}

#[async_trait]
impl IndexSink for TantivyIndexSink {
    async fn ensure_ready(&self) -> Result<(), SinkError> {
        // A searcher over the empty index is enough to prove the backend is usable.
        let _ = self.reader.searcher().num_docs();
        Ok(())
    }

    async fn upsert(&self, request: &UpsertRequest) -> Result<WriteOutcome, SinkError> {
        let mut state = self.state.lock().await;

        if !state.guard.admit(&request.id, request.revision) {
            debug!(
                id = %request.id,
                revision = request.revision,
                "Discarded stale upsert"
            );
            return Ok(WriteOutcome::RejectedStale);
        }

        let body_text = String::from_utf8_lossy(&request.body).into_owned();
        let indexed_at = TantivyDateTime::from_timestamp_micros(Utc::now().timestamp_micros());

        state
            .writer
            .delete_term(Term::from_field_text(self.fields.id, &request.id));
        state
            .writer
            .add_document(doc!(
                self.fields.id => request.id.clone(),
                self.fields.body => body_text,
                self.fields.revision => request.revision,
                self.fields.indexed_at => indexed_at
            ))
            .map_err(|e| SinkError::index(e.to_string()))?;
        state
            .writer
            .commit()
            .map_err(|e| SinkError::index(e.to_string()))?;
        drop(state);

        self.reload_reader()?;
        Ok(WriteOutcome::Applied)
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<WriteOutcome, SinkError> {
        let mut state = self.state.lock().await;

        if !state.guard.admit(&request.id, request.revision) {
            debug!(
                id = %request.id,
                revision = request.revision,
                "Discarded stale delete"
            );
            return Ok(WriteOutcome::RejectedStale);
        }

        state
            .writer
            .delete_term(Term::from_field_text(self.fields.id, &request.id));
        state
            .writer
            .commit()
            .map_err(|e| SinkError::delete(e.to_string()))?;
        drop(state);

        self.reload_reader()?;
        Ok(WriteOutcome::Applied)
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>, SinkError> {
        let searcher = self.reader.searcher();

        let parser = QueryParser::for_index(&self.index, vec![self.fields.body]);
        let query = parser
            .parse_query(term)
            .map_err(|e| SinkError::query(e.to_string()))?;

        let snippet_generator = SnippetGenerator::create(&searcher, &*query, self.fields.body)
            .map_err(|e| SinkError::query(e.to_string()))?;

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1)))
            .map_err(|e| SinkError::query(e.to_string()))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SinkError::query(e.to_string()))?;
            let snippet = snippet_generator.snippet_from_doc(&doc).to_html();
            hits.push(self.hit_from_doc(&doc, score, snippet));
        }

        Ok(hits)
    }

    async fn fetch(&self, id: &str) -> Result<Option<IndexDocument>, SinkError> {
        let searcher = self.reader.searcher();

        let query = TermQuery::new(
            Term::from_field_text(self.fields.id, id),
            IndexRecordOption::Basic,
        );
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(|e| SinkError::query(e.to_string()))?;

        let Some((_score, address)) = top_docs.into_iter().next() else {
            return Ok(None);
        };

        let doc: TantivyDocument = searcher
            .doc(address)
            .map_err(|e| SinkError::query(e.to_string()))?;

        Ok(self.document_from_doc(&doc))
    }

    async fn document_count(&self) -> Result<u64, SinkError> {
        Ok(self.reader.searcher().num_docs())
    }
}
