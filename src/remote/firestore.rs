use std::collections::HashSet;
use std::future::Future;
use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::RemoteConfig;
use crate::core::{Expense, LedgerError, LedgerResult};
use crate::core::expense::parse_date;
use crate::remote::{DocumentCollection, RemoteExpense};

const PAGE_SIZE: usize = 300;

/// A collection in a Firestore database, reached over its v1 REST API.
pub struct FirestoreCollection {
    client: Client,
    url: String,
    api_key: Option<String>
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>
}

impl FirestoreCollection {
    pub fn new(config: &RemoteConfig) -> FirestoreCollection {
        FirestoreCollection {
            client: Client::new(),
            url: collection_url(config),
            api_key: config.api_key.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request
        }
    }

    async fn list_page(&self, page_token: Option<&str>) -> LedgerResult<ListResponse> {
        let mut request = self.with_key(self.client.get(&self.url))
            .query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        let resp = request.send().await
            .and_then(|resp| resp.error_for_status())
            .map_err(remote_error)?;
        resp.json().await.map_err(remote_error)
    }
}

#[async_trait]
impl DocumentCollection for FirestoreCollection {
    async fn create_document(&self, expense: &Expense) -> LedgerResult<String> {
        let body = json!({ "fields": encode_fields(expense)? });
        let resp = self.with_key(self.client.post(&self.url))
            .json(&body)
            .send().await
            .and_then(|resp| resp.error_for_status())
            .map_err(remote_error)?;
        let created: Document = resp.json().await.map_err(remote_error)?;
        return Ok(document_id(&created.name).to_owned());
    }

    async fn list_documents(&self) -> LedgerResult<Vec<RemoteExpense>> {
        collect_pages(move |token: Option<String>| async move {
            self.list_page(token.as_deref()).await
        }).await
    }
}

/// Follows `nextPageToken` until a page comes back without one. A token
/// that was already followed ends the walk, so a misbehaving server cannot
/// keep it going forever.
async fn collect_pages<F, Fut>(mut fetch: F) -> LedgerResult<Vec<RemoteExpense>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = LedgerResult<ListResponse>>
{
    let mut expenses = Vec::new();
    let mut followed: HashSet<String> = HashSet::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = fetch(page_token.take()).await?;
        debug!("fetched {} remote documents", page.documents.len());
        for document in page.documents {
            match decode_document(&document) {
                Ok(expense) => expenses.push(expense),
                Err(err) => warn!("skipping remote document {}: {}", document.name, err)
            }
        }
        match page.next_page_token {
            Some(token) if token.is_empty() => break,
            Some(token) if !followed.insert(token.clone()) => {
                warn!("page token {} repeated, stopping the listing", token);
                break;
            },
            Some(token) => page_token = Some(token),
            None => break
        }
    }
    return Ok(expenses);
}

fn remote_error(err: reqwest::Error) -> LedgerError {
    LedgerError::RemoteOperation(err.to_string())
}

fn collection_url(config: &RemoteConfig) -> String {
    format!("{}/projects/{}/databases/(default)/documents/{}",
        config.base_url.trim_end_matches('/'),
        config.project_id,
        config.collection)
}

/// Last path segment of a resource name such as
/// `projects/p/databases/(default)/documents/expenses/<id>`.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn encode_fields(expense: &Expense) -> LedgerResult<Value> {
    let amount = expense.amount.to_f64()
        .ok_or_else(|| LedgerError::RemoteOperation(format!("amount out of range: {}", expense.amount)))?;

    let mut fields = Map::new();
    fields.insert("description".to_owned(), json!({ "stringValue": expense.description }));
    fields.insert("amount".to_owned(), json!({ "doubleValue": amount }));
    fields.insert("date".to_owned(), json!({ "timestampValue": expense.date.to_rfc3339() }));
    if let Some(category) = &expense.category {
        fields.insert("category".to_owned(), json!({ "stringValue": category }));
    }
    if let Some(note) = &expense.note {
        fields.insert("note".to_owned(), json!({ "stringValue": note }));
    }
    return Ok(Value::Object(fields));
}

fn decode_document(document: &Document) -> LedgerResult<RemoteExpense> {
    let fields = &document.fields;
    let invalid = |what: &str| LedgerError::RemoteOperation(format!("missing or invalid {}", what));

    let amount = fields.get("amount").and_then(decode_amount).ok_or_else(|| invalid("amount"))?;
    let date = fields.get("date").and_then(decode_date).ok_or_else(|| invalid("date"))?;
    let string_field = |name: &str| fields.get(name)
        .and_then(|value| value.get("stringValue"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let expense = Expense {
        description: string_field("description").unwrap_or_default(),
        amount,
        date,
        category: string_field("category"),
        note: string_field("note"),
    };
    return Ok(RemoteExpense { id: document_id(&document.name).to_owned(), expense });
}

fn decode_amount(value: &Value) -> Option<Decimal> {
    if let Some(double) = value.get("doubleValue") {
        return match double {
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None
        };
    }
    // 64-bit integers travel as strings
    match value.get("integerValue")? {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None
    }
}

fn decode_date(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    value.get("timestampValue")
        .or_else(|| value.get("stringValue"))
        .and_then(Value::as_str)
        .and_then(parse_date)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;

    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> RemoteConfig {
        RemoteConfig {
            project_id: "test-prj".to_owned(),
            api_key: Some("k".to_owned()),
            collection: "expenses".to_owned(),
            base_url: "https://firestore.googleapis.com/v1/".to_owned(),
            mirror_appends: false,
        }
    }

    fn document(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    fn builds_collection_url(config: RemoteConfig) {
        let collection = FirestoreCollection::new(&config);
        assert_eq!(collection.url(),
            "https://firestore.googleapis.com/v1/projects/test-prj/databases/(default)/documents/expenses");
    }

    #[test]
    fn encodes_typed_fields() {
        let expense = Expense::new("Coffee", Decimal::new(450, 2), parse_date("2024-01-05").unwrap())
            .with_category("Food");
        assert_eq!(encode_fields(&expense).unwrap(), json!({
            "description": {"stringValue": "Coffee"},
            "amount": {"doubleValue": 4.5},
            "date": {"timestampValue": "2024-01-05T00:00:00+00:00"},
            "category": {"stringValue": "Food"}
        }));
    }

    #[test]
    fn decodes_document() {
        let doc = document(json!({
            "name": "projects/test-prj/databases/(default)/documents/expenses/Xy12",
            "fields": {
                "description": {"stringValue": "Coffee"},
                "amount": {"doubleValue": 4.5},
                "date": {"timestampValue": "2024-01-05T09:30:00.120Z"},
                "note": {"stringValue": "oat milk"}
            },
            "createTime": "2024-01-05T09:30:01.000000Z"
        }));

        let decoded = decode_document(&doc).unwrap();

        assert_eq!(decoded.id, "Xy12");
        assert_eq!(decoded.expense.description, "Coffee");
        assert_eq!(decoded.expense.amount, Decimal::new(45, 1));
        assert_eq!(decoded.expense.note.as_deref(), Some("oat milk"));
        assert_eq!(decoded.expense.category, None);
    }

    #[test]
    fn decodes_integer_amount() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/expenses/a",
            "fields": {
                "description": {"stringValue": "Rent"},
                "amount": {"integerValue": "900"},
                "date": {"timestampValue": "2024-02-01T00:00:00Z"}
            }
        }));
        assert_eq!(decode_document(&doc).unwrap().expense.amount, Decimal::new(900, 0));
    }

    #[test]
    fn rejects_document_without_amount() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/expenses/a",
            "fields": {"description": {"stringValue": "Rent"}}
        }));
        assert!(matches!(decode_document(&doc), Err(LedgerError::RemoteOperation(..))));
    }

    #[test]
    fn empty_list_response() {
        let page: ListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    fn page(names: &[&str], next: Option<&str>) -> ListResponse {
        let documents = names.iter().map(|name| json!({
            "name": format!("projects/p/databases/(default)/documents/expenses/{}", name),
            "fields": {
                "description": {"stringValue": "Coffee"},
                "amount": {"doubleValue": 4.5},
                "date": {"stringValue": "2024-01-05T00:00:00Z"}
            }
        })).collect::<Vec<_>>();
        serde_json::from_value(json!({"documents": documents, "nextPageToken": next})).unwrap()
    }

    async fn walk(pages: Vec<ListResponse>) -> (Vec<String>, Vec<Option<String>>) {
        let mut pages = pages.into_iter();
        let mut requested = Vec::new();
        let expenses = collect_pages(|token| {
            requested.push(token);
            let page = pages.next()
                .ok_or_else(|| LedgerError::RemoteOperation("no more pages".to_owned()));
            std::future::ready(page)
        }).await.unwrap();
        (expenses.into_iter().map(|e| e.id).collect(), requested)
    }

    #[tokio::test]
    async fn follows_page_tokens() {
        let (ids, requested) = walk(vec![
            page(&["a", "b"], Some("t1")),
            page(&["c"], Some("")),
        ]).await;
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(requested, vec![None, Some("t1".to_owned())]);
    }

    #[tokio::test]
    async fn repeated_page_token_stops() {
        let (ids, requested) = walk(vec![
            page(&["a"], Some("t1")),
            page(&["b"], Some("t1")),
            page(&["never"], None),
        ]).await;
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(requested.len(), 2);
    }

    #[tokio::test]
    async fn cycling_page_tokens_stop() {
        let (ids, _) = walk(vec![
            page(&["a"], Some("t1")),
            page(&["b"], Some("t2")),
            page(&["c"], Some("t1")),
            page(&["never"], None),
        ]).await;
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
