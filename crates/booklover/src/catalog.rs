use serde_json::Value;

/// Client for the external book catalog.
///
/// Every call is a single outbound GET returning the response body as an
/// opaque JSON document. No retries, no caching, no timeout override beyond
/// the transport default. The catalog's schemas are loose, so callers go
/// through the defensive extractors below instead of indexing into documents.

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("catalog item not found")]
    NotFound,
    #[error("catalog returned status {0}")]
    Status(u16),
    #[error("catalog returned a malformed document: {0}")]
    Malformed(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, req: reqwest::RequestBuilder) -> Result<Value, CatalogError> {
        let resp = req.header("Accept", "application/json").send().await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(CatalogError::NotFound);
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(CatalogError::Malformed)
    }

    async fn get_json(&self, path: &str) -> Result<Value, CatalogError> {
        let url = format!("{}/{path}", self.base_url);
        self.fetch(self.http.get(&url)).await
    }

    /// Fetch one book record by its opaque catalog key.
    pub async fn fetch_book(&self, key: &str) -> Result<Value, CatalogError> {
        self.get_json(&format!("{}.json", key.trim_matches('/'))).await
    }

    /// Fetch one author record by its opaque catalog key.
    pub async fn fetch_author(&self, key: &str) -> Result<Value, CatalogError> {
        self.get_json(&format!("{}.json", key.trim_matches('/'))).await
    }

    /// Fetch the rating summary for a book.
    pub async fn fetch_ratings(&self, key: &str) -> Result<Value, CatalogError> {
        self.get_json(&format!("{}/ratings.json", key.trim_matches('/'))).await
    }

    /// List an author's works; callers take the first N entries.
    pub async fn fetch_author_works(&self, key: &str) -> Result<Vec<Value>, CatalogError> {
        let doc = self
            .get_json(&format!("{}/works.json", key.trim_matches('/')))
            .await?;
        Ok(list_of(&doc, "entries"))
    }

    /// The catalog's trending listing; callers take the first N works.
    pub async fn trending(&self) -> Result<Vec<Value>, CatalogError> {
        let doc = self.get_json("trending/yearly.json").await?;
        Ok(list_of(&doc, "works"))
    }

    /// Free-text search. Zero matches is an empty sequence, not a failure.
    pub async fn search(&self, query: &str) -> Result<Vec<Value>, CatalogError> {
        let url = format!("{}/search.json", self.base_url);
        let doc = self.fetch(self.http.get(&url).query(&[("q", query)])).await?;
        Ok(list_of(&doc, "docs"))
    }
}

// ---------------------------------------------------------------------------
// Defensive document shaping. The catalog performs no schema validation, so
// every field access here tolerates absence and wrong shapes.

pub const UNKNOWN_AUTHOR: &str = "Unknown author";

pub fn list_of(doc: &Value, field: &str) -> Vec<Value> {
    doc.get(field)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub fn title_of(doc: &Value) -> String {
    doc.get("title")
        .and_then(Value::as_str)
        .unwrap_or("Untitled")
        .to_string()
}

/// The document's own catalog key, normalized without surrounding slashes.
pub fn key_of(doc: &Value) -> Option<String> {
    doc.get("key")
        .and_then(Value::as_str)
        .map(|s| s.trim_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

/// Author display name as carried on listing documents, which embed it as a
/// list under `author_name` (search) or `author_names` (trending).
pub fn author_name_of(doc: &Value) -> String {
    for field in ["author_name", "author_names"] {
        if let Some(name) = doc
            .get(field)
            .and_then(Value::as_array)
            .and_then(|names| names.first())
            .and_then(Value::as_str)
        {
            return name.to_string();
        }
    }

    UNKNOWN_AUTHOR.to_string()
}

/// Key of the first listed author on a full work document, if any.
///
/// Work documents carry `authors: [{"author": {"key": "/authors/..."}}]`; an
/// absent or empty list is a normal case, not an error.
pub fn first_author_key(book: &Value) -> Option<String> {
    book.get("authors")?
        .as_array()?
        .first()?
        .get("author")?
        .get("key")?
        .as_str()
        .map(|s| s.trim_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

pub fn name_of(author: &Value) -> String {
    author
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string()
}

/// Free-text fields come back either as a plain string or wrapped in a
/// `{"type": ..., "value": ...}` object.
pub fn text_field(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(map)) => map
            .get("value")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

pub fn cover_url_of(doc: &Value) -> String {
    let id = doc
        .get("cover_i")
        .and_then(Value::as_i64)
        .or_else(|| {
            doc.get("covers")
                .and_then(Value::as_array)
                .and_then(|covers| covers.first())
                .and_then(Value::as_i64)
        });

    match id {
        Some(id) if id > 0 => format!("https://covers.openlibrary.org/b/id/{id}-M.jpg"),
        _ => String::new(),
    }
}

pub fn average_rating_of(ratings: &Value) -> Option<f64> {
    ratings.get("summary")?.get("average")?.as_f64()
}

pub fn ratings_count_of(ratings: &Value) -> i64 {
    ratings
        .get("summary")
        .and_then(|s| s.get("count"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_defaults_when_absent() {
        assert_eq!(title_of(&json!({})), "Untitled");
        assert_eq!(title_of(&json!({"title": "Dune"})), "Dune");
    }

    #[test]
    fn author_name_reads_both_listing_shapes() {
        assert_eq!(author_name_of(&json!({"author_name": ["F. Herbert"]})), "F. Herbert");
        assert_eq!(author_name_of(&json!({"author_names": ["F. Herbert"]})), "F. Herbert");
        assert_eq!(author_name_of(&json!({"author_name": []})), UNKNOWN_AUTHOR);
        assert_eq!(author_name_of(&json!({})), UNKNOWN_AUTHOR);
    }

    #[test]
    fn first_author_key_tolerates_missing_and_empty_lists() {
        let book = json!({"authors": [{"author": {"key": "/authors/OL1A"}}]});
        assert_eq!(first_author_key(&book), Some("authors/OL1A".to_string()));

        assert_eq!(first_author_key(&json!({})), None);
        assert_eq!(first_author_key(&json!({"authors": []})), None);
        assert_eq!(first_author_key(&json!({"authors": [{"role": "editor"}]})), None);
    }

    #[test]
    fn text_field_reads_string_and_object_shapes() {
        assert_eq!(
            text_field(&json!({"description": "plain"}), "description"),
            Some("plain".to_string())
        );
        assert_eq!(
            text_field(&json!({"description": {"type": "/type/text", "value": "wrapped"}}), "description"),
            Some("wrapped".to_string())
        );
        assert_eq!(text_field(&json!({}), "description"), None);
        assert_eq!(text_field(&json!({"description": 7}), "description"), None);
    }

    #[test]
    fn cover_url_reads_listing_and_work_shapes() {
        assert_eq!(
            cover_url_of(&json!({"cover_i": 12})),
            "https://covers.openlibrary.org/b/id/12-M.jpg"
        );
        assert_eq!(
            cover_url_of(&json!({"covers": [34, 56]})),
            "https://covers.openlibrary.org/b/id/34-M.jpg"
        );
        assert_eq!(cover_url_of(&json!({"covers": [-1]})), "");
        assert_eq!(cover_url_of(&json!({})), "");
    }

    #[test]
    fn rating_summary_is_optional() {
        let ratings = json!({"summary": {"average": 4.2, "count": 31}});
        assert_eq!(average_rating_of(&ratings), Some(4.2));
        assert_eq!(ratings_count_of(&ratings), 31);

        let empty = json!({"summary": {"average": null, "count": 0}});
        assert_eq!(average_rating_of(&empty), None);
        assert_eq!(ratings_count_of(&empty), 0);
    }

    #[test]
    fn list_of_tolerates_wrong_shapes() {
        assert_eq!(list_of(&json!({"works": [1, 2]}), "works").len(), 2);
        assert!(list_of(&json!({"works": "oops"}), "works").is_empty());
        assert!(list_of(&json!({}), "works").is_empty());
    }
}
