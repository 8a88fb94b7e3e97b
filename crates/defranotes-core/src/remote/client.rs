//! GraphQL-over-HTTP access to the DefraDB query endpoint.
//!
//! Pure transport plus query templating; no merge or business logic lives
//! here. The [`RemoteStore`] trait is the seam the reconciliation engine is
//! written against, so tests (and a future push-capable transport) can swap
//! the implementation.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{NotesError, NotesResult};
use crate::types::{Commit, Note, NoteFields, NoteUpdate};

/// Default local DefraDB query endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9181/api/v0/graphql";

/// Selection set shared by every full-note query
const NOTE_FIELDS: &str = "_docID title content workspace createdAt updatedAt authorId";

/// Async interface to the note store's query endpoint.
///
/// Every method that yields a GraphQL `errors` array surfaces
/// [`NotesError::RemoteSchema`] with the first error's message; transport
/// failures surface as [`NotesError::Network`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Issue one request/response operation and return the `data` object
    async fn execute(&self, query: &str, variables: Value) -> NotesResult<Value>;

    /// Verify the store is reachable and the `Note` type exists in its schema
    async fn check_connection(&self) -> NotesResult<()>;

    /// All notes, in store arrival order
    async fn fetch_all_notes(&self) -> NotesResult<Vec<Note>>;

    /// One note by document identifier; `None` when absent
    async fn fetch_note(&self, doc_id: &str) -> NotesResult<Option<Note>>;

    /// Create a note; the store assigns the `docID`
    async fn create_note(&self, fields: &NoteFields) -> NotesResult<Note>;

    /// Update a note's fields; returns the stored document
    async fn update_note(&self, doc_id: &str, updates: &NoteUpdate) -> NotesResult<Note>;

    /// Version summary (`updatedAt` + `_version`) for one note, for display
    async fn fetch_note_version(&self, doc_id: &str) -> NotesResult<Option<Note>>;

    /// Latest commits for a document from the store's history. Informational.
    async fn fetch_latest_commits(&self, doc_id: &str) -> NotesResult<Vec<Commit>>;
}

/// HTTP client for a DefraDB GraphQL endpoint
pub struct DefraClient {
    http: reqwest::Client,
    endpoint: String,
}

impl DefraClient {
    /// Client against the given endpoint (see [`DEFAULT_ENDPOINT`])
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Split a `{data, errors?}` response body per the GraphQL convention
    fn extract_data(body: Value) -> NotesResult<Value> {
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if let Some(first) = errors.first() {
                let message = first
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("query rejected with no message");
                return Err(NotesError::RemoteSchema(message.to_string()));
            }
        }
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Escape a string for interpolation into a quoted GraphQL literal
    fn escape(value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        }
        out
    }

    /// Decode a `Note` array from a query's `data` object
    pub(crate) fn decode_notes(data: &Value, key: &str) -> NotesResult<Vec<Note>> {
        match data.get(key) {
            Some(Value::Array(items)) => {
                let notes = serde_json::from_value(Value::Array(items.clone()))?;
                Ok(notes)
            }
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(NotesError::RemoteSchema(format!(
                "expected {} to be a list, got {}",
                key, other
            ))),
        }
    }
}

#[async_trait]
impl RemoteStore for DefraClient {
    async fn execute(&self, query: &str, variables: Value) -> NotesResult<Value> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| NotesError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotesError::Network(format!(
                "unexpected HTTP status {} from {}",
                status, self.endpoint
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| NotesError::Network(e.to_string()))?;
        Self::extract_data(body)
    }

    async fn check_connection(&self) -> NotesResult<()> {
        let query = "query { __schema { types { name } } }";
        let data = self.execute(query, json!({})).await?;

        let has_note_type = data
            .pointer("/__schema/types")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .any(|t| t.get("name").and_then(Value::as_str) == Some("Note"))
            })
            .unwrap_or(false);

        if !has_note_type {
            return Err(NotesError::RemoteSchema(
                "Note schema not found; add the schema via the DefraDB CLI first".to_string(),
            ));
        }
        debug!("DefraDB connection and Note schema verified");
        Ok(())
    }

    async fn fetch_all_notes(&self) -> NotesResult<Vec<Note>> {
        let query = format!("query {{ Note {{ {} }} }}", NOTE_FIELDS);
        let data = self.execute(&query, json!({})).await?;
        Self::decode_notes(&data, "Note")
    }

    async fn fetch_note(&self, doc_id: &str) -> NotesResult<Option<Note>> {
        let query = format!(
            "query GetNote($docID: ID!) {{ Note(docID: $docID) {{ {} }} }}",
            NOTE_FIELDS
        );
        let data = self.execute(&query, json!({ "docID": doc_id })).await?;
        Ok(Self::decode_notes(&data, "Note")?.into_iter().next())
    }

    async fn create_note(&self, fields: &NoteFields) -> NotesResult<Note> {
        let mutation = format!(
            "mutation {{ create_Note(input: {{title: \"{}\", content: \"{}\", workspace: \"{}\", \
             createdAt: \"{}\", updatedAt: \"{}\", authorId: \"{}\"}}) {{ {} }} }}",
            Self::escape(&fields.title),
            Self::escape(&fields.content),
            Self::escape(&fields.workspace),
            Self::escape(&fields.created_at),
            Self::escape(&fields.updated_at),
            Self::escape(&fields.author_id),
            NOTE_FIELDS
        );
        let data = self.execute(&mutation, json!({})).await?;
        Self::decode_notes(&data, "create_Note")?
            .into_iter()
            .next()
            .ok_or_else(|| {
                NotesError::RemoteSchema("create_Note returned no document".to_string())
            })
    }

    async fn update_note(&self, doc_id: &str, updates: &NoteUpdate) -> NotesResult<Note> {
        let mutation = format!(
            "mutation {{ update_Note(docID: \"{}\", input: {{title: \"{}\", content: \"{}\", \
             workspace: \"{}\", updatedAt: \"{}\"}}) {{ {} }} }}",
            Self::escape(doc_id),
            Self::escape(&updates.title),
            Self::escape(&updates.content),
            Self::escape(&updates.workspace),
            Self::escape(&updates.updated_at),
            NOTE_FIELDS
        );
        let data = self.execute(&mutation, json!({})).await?;
        Self::decode_notes(&data, "update_Note")?
            .into_iter()
            .next()
            .ok_or_else(|| {
                NotesError::RemoteSchema("update_Note returned no document".to_string())
            })
    }

    async fn fetch_note_version(&self, doc_id: &str) -> NotesResult<Option<Note>> {
        let query = "query GetNoteVersion($docID: ID!) { Note(docID: $docID) { \
                     _docID updatedAt _version { cid height } } }";
        let data = self.execute(query, json!({ "docID": doc_id })).await?;
        Ok(Self::decode_notes(&data, "Note")?.into_iter().next())
    }

    async fn fetch_latest_commits(&self, doc_id: &str) -> NotesResult<Vec<Commit>> {
        let query = "query GetCommits($docID: String!) { latestCommits(docID: $docID) { \
                     cid height delta { payload } links { cid name } } }";
        let data = self.execute(query, json!({ "docID": doc_id })).await?;
        match data.get("latestCommits") {
            Some(Value::Array(items)) => Ok(serde_json::from_value(Value::Array(items.clone()))?),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_data_returns_data_object() {
        let body = json!({ "data": { "Note": [] } });
        let data = DefraClient::extract_data(body).unwrap();
        assert_eq!(data, json!({ "Note": [] }));
    }

    #[test]
    fn test_extract_data_surfaces_first_error_message() {
        let body = json!({
            "data": null,
            "errors": [
                { "message": "Cannot query field \"Nope\"" },
                { "message": "second error" }
            ]
        });
        let err = DefraClient::extract_data(body).unwrap_err();
        match err {
            NotesError::RemoteSchema(msg) => assert!(msg.contains("Nope")),
            other => panic!("expected RemoteSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_data_empty_errors_array_is_not_an_error() {
        let body = json!({ "data": { "Note": [] }, "errors": [] });
        assert!(DefraClient::extract_data(body).is_ok());
    }

    #[test]
    fn test_escape_quotes_and_newlines() {
        assert_eq!(
            DefraClient::escape("a \"quoted\"\nline\\end"),
            "a \\\"quoted\\\"\\nline\\\\end"
        );
    }

    #[test]
    fn test_decode_notes_missing_key_is_empty() {
        let data = json!({});
        assert!(DefraClient::decode_notes(&data, "Note").unwrap().is_empty());
        let data = json!({ "Note": null });
        assert!(DefraClient::decode_notes(&data, "Note").unwrap().is_empty());
    }

    #[test]
    fn test_decode_notes_rejects_non_list() {
        let data = json!({ "Note": 42 });
        assert!(matches!(
            DefraClient::decode_notes(&data, "Note"),
            Err(NotesError::RemoteSchema(_))
        ));
    }

    #[test]
    fn test_decode_notes_parses_documents() {
        let data = json!({
            "Note": [{
                "_docID": "bae-1",
                "title": "T",
                "content": "C",
                "workspace": "default",
                "authorId": "user-1",
                "createdAt": "2026-01-01T00:00:00Z",
                "updatedAt": "2026-01-01T00:00:00Z"
            }]
        });
        let notes = DefraClient::decode_notes(&data, "Note").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].doc_id, "bae-1");
    }
}
