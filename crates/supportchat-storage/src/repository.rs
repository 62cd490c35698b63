//! Repository implementations for SQLite-backed persistence.
//!
//! `DocumentRepository` is the document store (admin uploads, keyword
//! scans for retrieval). `ChatRepository` is the conversation store
//! (sessions and their ordered turns).

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use supportchat_core::error::SupportError;
use supportchat_core::types::{ChatSession, Document, Message, Role};

use crate::db::Database;

/// Repository for reference documents.
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new document. Empty title or content is rejected.
    pub fn save(&self, doc: &Document) -> Result<(), SupportError> {
        if doc.title.trim().is_empty() || doc.content.trim().is_empty() {
            return Err(SupportError::Validation(
                "Title and content are required".to_string(),
            ));
        }

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, title, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    doc.id,
                    doc.title,
                    doc.content,
                    doc.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| SupportError::Storage(format!("Failed to save document: {}", e)))?;
            Ok(())
        })
    }

    /// All documents, newest first. Same-millisecond uploads fall back to
    /// reverse insertion order.
    pub fn list_newest_first(&self) -> Result<Vec<Document>, SupportError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, content, created_at
                     FROM documents
                     ORDER BY created_at DESC, rowid DESC",
                )
                .map_err(|e| SupportError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_document(row)))
                .map_err(|e| SupportError::Storage(e.to_string()))?;

            let mut docs = Vec::new();
            for row in rows {
                let doc = row.map_err(|e| SupportError::Storage(e.to_string()))??;
                docs.push(doc);
            }
            Ok(docs)
        })
    }

    /// Scan documents in insertion order and return the first `limit` that
    /// satisfy `predicate`. Stops reading as soon as the cap is reached.
    pub fn find_where<P>(&self, limit: usize, mut predicate: P) -> Result<Vec<Document>, SupportError>
    where
        P: FnMut(&Document) -> bool,
    {
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, content, created_at
                     FROM documents
                     ORDER BY rowid ASC",
                )
                .map_err(|e| SupportError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_document(row)))
                .map_err(|e| SupportError::Storage(e.to_string()))?;

            let mut matches = Vec::new();
            for row in rows {
                let doc = row.map_err(|e| SupportError::Storage(e.to_string()))??;
                if predicate(&doc) {
                    matches.push(doc);
                    if matches.len() >= limit {
                        break;
                    }
                }
            }
            Ok(matches)
        })
    }

    /// Delete a document by id. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool, SupportError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM documents WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| SupportError::Storage(format!("Failed to delete document: {}", e)))?;
            Ok(affected > 0)
        })
    }

    /// Count stored documents.
    pub fn count(&self) -> Result<u64, SupportError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                .map_err(|e| SupportError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for chat sessions and their messages.
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load a session with all of its messages in turn order.
    pub fn find_by_session_id(&self, session_id: &str) -> Result<Option<ChatSession>, SupportError> {
        self.db.with_conn(|conn| load_session(conn, session_id))
    }

    /// Return the session for `session_id`, creating an empty one if absent.
    ///
    /// Creation is `INSERT OR IGNORE` against the unique session key, so
    /// concurrent first access yields a single row.
    pub fn get_or_create(&self, session_id: &str) -> Result<ChatSession, SupportError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().timestamp_millis();
            conn.execute(
                "INSERT OR IGNORE INTO chat_sessions (id, session_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![Uuid::new_v4().to_string(), session_id, now],
            )
            .map_err(|e| SupportError::Storage(format!("Failed to create session: {}", e)))?;

            load_session(conn, session_id)?.ok_or_else(|| {
                SupportError::Storage(format!("Session {} vanished after creation", session_id))
            })
        })
    }

    /// Persist `new_messages` at the end of the session in one transaction.
    ///
    /// Creates the session row if it does not exist yet and bumps
    /// `updated_at` to `session.updated_at`. Either every message is written
    /// or none is. Returns the stored session's id.
    pub fn append_messages(
        &self,
        session: &ChatSession,
        new_messages: &[Message],
    ) -> Result<String, SupportError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| SupportError::Storage(format!("Failed to begin transaction: {}", e)))?;

            tx.execute(
                "INSERT OR IGNORE INTO chat_sessions (id, session_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    session.id,
                    session.session_id,
                    session.created_at.timestamp_millis(),
                    session.updated_at.timestamp_millis(),
                ],
            )
            .map_err(|e| SupportError::Storage(format!("Failed to save session: {}", e)))?;

            let stored_id: String = tx
                .query_row(
                    "SELECT id FROM chat_sessions WHERE session_id = ?1",
                    rusqlite::params![session.session_id],
                    |row| row.get(0),
                )
                .map_err(|e| SupportError::Storage(e.to_string()))?;

            let next_position: i64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM chat_messages WHERE session_pk = ?1",
                    rusqlite::params![stored_id],
                    |row| row.get(0),
                )
                .map_err(|e| SupportError::Storage(e.to_string()))?;

            let now = Utc::now().timestamp_millis();
            for (offset, message) in new_messages.iter().enumerate() {
                tx.execute(
                    "INSERT INTO chat_messages (session_pk, position, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        stored_id,
                        next_position + offset as i64,
                        message.role.as_str(),
                        message.content,
                        now,
                    ],
                )
                .map_err(|e| SupportError::Storage(format!("Failed to save message: {}", e)))?;
            }

            tx.execute(
                "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
                rusqlite::params![session.updated_at.timestamp_millis(), stored_id],
            )
            .map_err(|e| SupportError::Storage(format!("Failed to touch session: {}", e)))?;

            tx.commit()
                .map_err(|e| SupportError::Storage(format!("Failed to commit turn: {}", e)))?;

            Ok(stored_id)
        })
    }

    /// Count stored sessions.
    pub fn count(&self) -> Result<u64, SupportError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))
                .map_err(|e| SupportError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn load_session(conn: &Connection, session_id: &str) -> Result<Option<ChatSession>, SupportError> {
    let header = conn
        .query_row(
            "SELECT id, session_id, created_at, updated_at
             FROM chat_sessions WHERE session_id = ?1",
            rusqlite::params![session_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()
        .map_err(|e| SupportError::Storage(e.to_string()))?;

    let Some((id, session_id, created_at, updated_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare(
            "SELECT role, content FROM chat_messages
             WHERE session_pk = ?1
             ORDER BY position ASC",
        )
        .map_err(|e| SupportError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![id], |row| Ok(row_to_message(row)))
        .map_err(|e| SupportError::Storage(e.to_string()))?;

    let mut messages = Vec::new();
    for row in rows {
        let message = row.map_err(|e| SupportError::Storage(e.to_string()))??;
        messages.push(message);
    }

    Ok(Some(ChatSession {
        id,
        session_id,
        messages,
        created_at: millis_to_datetime(created_at),
        updated_at: millis_to_datetime(updated_at),
    }))
}

fn row_to_document(row: &rusqlite::Row<'_>) -> Result<Document, SupportError> {
    let id: String = row
        .get(0)
        .map_err(|e| SupportError::Storage(e.to_string()))?;
    let title: String = row
        .get(1)
        .map_err(|e| SupportError::Storage(e.to_string()))?;
    let content: String = row
        .get(2)
        .map_err(|e| SupportError::Storage(e.to_string()))?;
    let created_at: i64 = row
        .get(3)
        .map_err(|e| SupportError::Storage(e.to_string()))?;

    Ok(Document {
        id,
        title,
        content,
        created_at: millis_to_datetime(created_at),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, SupportError> {
    let role_str: String = row
        .get(0)
        .map_err(|e| SupportError::Storage(e.to_string()))?;
    let content: String = row
        .get(1)
        .map_err(|e| SupportError::Storage(e.to_string()))?;

    let role = Role::parse(&role_str)
        .ok_or_else(|| SupportError::Storage(format!("Invalid message role: {}", role_str)))?;

    Ok(Message { role, content })
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn doc_at(title: &str, content: &str, offset_secs: i64) -> Document {
        let mut doc = Document::new(title, content);
        doc.created_at = Utc::now() + Duration::seconds(offset_secs);
        doc
    }

    // ========================================================================
    // DocumentRepository tests
    // ========================================================================

    #[test]
    fn test_document_save_and_list() {
        let repo = DocumentRepository::new(make_db());
        let doc = Document::new("Return Policy", "Items can be returned within 30 days");

        repo.save(&doc).unwrap();

        let docs = repo.list_newest_first().unwrap();
        assert_eq!(docs.len(), 1);
        let found = &docs[0];
        assert_eq!(found.id, doc.id);
        assert_eq!(found.title, "Return Policy");
        assert_eq!(found.content, "Items can be returned within 30 days");
        assert_eq!(
            found.created_at.timestamp_millis(),
            doc.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_document_save_rejects_blank_fields() {
        let repo = DocumentRepository::new(make_db());
        let err = repo.save(&Document::new("", "content")).unwrap_err();
        assert!(matches!(err, SupportError::Validation(_)));
        let err = repo.save(&Document::new("Title", "   ")).unwrap_err();
        assert!(matches!(err, SupportError::Validation(_)));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_document_list_newest_first() {
        let repo = DocumentRepository::new(make_db());
        repo.save(&doc_at("Old", "old content", -60)).unwrap();
        repo.save(&doc_at("New", "new content", 0)).unwrap();
        repo.save(&doc_at("Middle", "middle content", -30)).unwrap();

        let titles: Vec<String> = repo
            .list_newest_first()
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["New", "Middle", "Old"]);
    }

    #[test]
    fn test_document_list_same_timestamp_uses_insertion_order() {
        let repo = DocumentRepository::new(make_db());
        let now = Utc::now();
        for title in ["first", "second"] {
            let mut doc = Document::new(title, "content");
            doc.created_at = now;
            repo.save(&doc).unwrap();
        }
        let docs = repo.list_newest_first().unwrap();
        assert_eq!(docs[0].title, "second");
        assert_eq!(docs[1].title, "first");
    }

    #[test]
    fn test_document_delete() {
        let repo = DocumentRepository::new(make_db());
        let doc = Document::new("Shipping", "Ships in two days");
        repo.save(&doc).unwrap();

        assert!(repo.delete(&doc.id).unwrap());
        assert_eq!(repo.count().unwrap(), 0);
        assert!(!repo.delete(&doc.id).unwrap());
    }

    #[test]
    fn test_find_where_insertion_order_and_cap() {
        let repo = DocumentRepository::new(make_db());
        for i in 0..8 {
            repo.save(&doc_at(&format!("doc{}", i), "matching text", -i))
                .unwrap();
        }

        let found = repo.find_where(5, |d| d.content.contains("matching")).unwrap();
        let titles: Vec<&str> = found.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["doc0", "doc1", "doc2", "doc3", "doc4"]);
    }

    #[test]
    fn test_find_where_filters() {
        let repo = DocumentRepository::new(make_db());
        repo.save(&Document::new("Billing", "Invoices are monthly")).unwrap();
        repo.save(&Document::new("Shipping", "Orders ship daily")).unwrap();

        let found = repo.find_where(5, |d| d.title == "Shipping").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Shipping");

        assert!(repo.find_where(0, |_| true).unwrap().is_empty());
    }

    // ========================================================================
    // ChatRepository tests
    // ========================================================================

    #[test]
    fn test_chat_find_missing_session() {
        let repo = ChatRepository::new(make_db());
        assert!(repo.find_by_session_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_chat_get_or_create_is_idempotent() {
        let repo = ChatRepository::new(make_db());
        let first = repo.get_or_create("s1").unwrap();
        let second = repo.get_or_create("s1").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.session_id, "s1");
        assert!(first.messages.is_empty());
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_chat_append_creates_session() {
        let repo = ChatRepository::new(make_db());
        let session = ChatSession::new("s1");

        let stored_id = repo
            .append_messages(
                &session,
                &[Message::user("hello"), Message::assistant("hi there")],
            )
            .unwrap();
        assert_eq!(stored_id, session.id);

        let loaded = repo.find_by_session_id("s1").unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(
            loaded.messages,
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[test]
    fn test_chat_append_preserves_order_across_turns() {
        let repo = ChatRepository::new(make_db());
        let session = repo.get_or_create("s1").unwrap();

        repo.append_messages(&session, &[Message::user("a"), Message::assistant("b")])
            .unwrap();
        repo.append_messages(&session, &[Message::user("c"), Message::assistant("d")])
            .unwrap();

        let loaded = repo.find_by_session_id("s1").unwrap().unwrap();
        let contents: Vec<&str> = loaded.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_chat_append_uses_existing_row_id() {
        let repo = ChatRepository::new(make_db());
        let existing = repo.get_or_create("s1").unwrap();

        // A freshly constructed session for the same key carries a new id;
        // the stored row keeps its original one.
        let fresh = ChatSession::new("s1");
        let stored_id = repo.append_messages(&fresh, &[Message::user("hi")]).unwrap();
        assert_eq!(stored_id, existing.id);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_chat_append_updates_timestamp() {
        let repo = ChatRepository::new(make_db());
        let mut session = repo.get_or_create("s1").unwrap();
        session.updated_at = session.updated_at + Duration::minutes(5);

        repo.append_messages(&session, &[Message::user("later")]).unwrap();

        let loaded = repo.find_by_session_id("s1").unwrap().unwrap();
        assert_eq!(
            loaded.updated_at.timestamp_millis(),
            session.updated_at.timestamp_millis()
        );
    }

    #[test]
    fn test_chat_append_is_atomic() {
        let db = make_db();
        let repo = ChatRepository::new(Arc::clone(&db));
        let session = repo.get_or_create("s1").unwrap();
        repo.append_messages(&session, &[Message::user("a"), Message::assistant("b")])
            .unwrap();

        // Make the second insert of the next batch fail.
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_assistant BEFORE INSERT ON chat_messages
                 WHEN NEW.content = 'd'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .map_err(|e| SupportError::Storage(e.to_string()))
        })
        .unwrap();

        let result =
            repo.append_messages(&session, &[Message::user("c"), Message::assistant("d")]);
        assert!(matches!(result, Err(SupportError::Storage(_))));

        let loaded = repo.find_by_session_id("s1").unwrap().unwrap();
        let contents: Vec<&str> = loaded.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }
}
