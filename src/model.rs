//! Resource handles: lazy local views over server resources.
//!
//! Each handle stores its identifying URL and a reference to the owning
//! [`Client`]; data-bearing fields are populated on first access through the
//! client (which applies the cache policy) and are not re-fetched implicitly
//! afterwards. [`ItemList::refresh`] is the only operation that forces a
//! re-fetch, and it returns a new snapshot rather than mutating in place.

use crate::client::Client;
use crate::error::AlveoError;
use serde_json::Value;
use std::cell::RefCell;
use tracing::trace;

const DOCUMENTS_FIELD: &str = "alveo:documents";
const DOCUMENT_URL_FIELD: &str = "alveo:url";
const PRIMARY_TEXT_FIELD: &str = "alveo:primary_text_url";

/// A remote catalog item, identified by its canonical URL.
///
/// Metadata is fetched on first access and memoized for the lifetime of the
/// handle; a fresh handle from [`Client::get_item`] re-reads through the
/// cache policy.
#[derive(Debug)]
pub struct Item<'a> {
    url: String,
    client: &'a Client,
    metadata: RefCell<Option<Value>>,
}

impl PartialEq for Item<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl<'a> Item<'a> {
    pub(crate) fn new(url: &str, client: &'a Client) -> Item<'a> {
        Item {
            url: url.to_string(),
            client,
            metadata: RefCell::new(None),
        }
    }

    /// Canonical URL of this item.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The item's JSON-LD metadata document, fetched on first access.
    pub fn metadata(&self) -> Result<Value, AlveoError> {
        if let Some(metadata) = self.metadata.borrow().as_ref() {
            return Ok(metadata.clone());
        }
        trace!("first metadata access for {}", self.url);
        let data = self.client.item_metadata(&self.url)?;
        let value: Value = serde_json::from_slice(&data)?;
        *self.metadata.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// All documents listed in the item's metadata, in listing order.
    pub fn get_documents(&self) -> Result<Vec<Document<'a>>, AlveoError> {
        let metadata = self.metadata()?;
        Ok(document_urls(&metadata)
            .into_iter()
            .map(|url| Document::new(url, &self.url, self.client))
            .collect())
    }

    /// The document at `index` within the metadata's document listing.
    pub fn get_document(&self, index: usize) -> Result<Document<'a>, AlveoError> {
        let metadata = self.metadata()?;
        let mut urls = document_urls(&metadata);
        if index >= urls.len() {
            return Err(AlveoError::DocumentNotFound {
                url: self.url.clone(),
                index,
            });
        }
        Ok(Document::new(urls.swap_remove(index), &self.url, self.client))
    }

    /// Annotations on this item, optionally filtered by type URI.
    ///
    /// `Ok(None)` means the item has no matching annotations.
    pub fn get_annotations(
        &self,
        annotation_type: Option<&str>,
    ) -> Result<Option<Value>, AlveoError> {
        self.client.get_annotations(&self.url, annotation_type)
    }

    /// The item's primary text, or `Ok(None)` when the metadata declares no
    /// usable primary text URL.
    pub fn get_primary_text(&self) -> Result<Option<Vec<u8>>, AlveoError> {
        let metadata = self.metadata()?;
        match metadata.get(PRIMARY_TEXT_FIELD).and_then(Value::as_str) {
            Some(url) if !url.is_empty() && url != "unknown" => {
                Ok(Some(self.client.get_raw(url)?))
            }
            _ => Ok(None),
        }
    }
}

/// A single content file attached to an item.
#[derive(Debug)]
pub struct Document<'a> {
    url: String,
    item_url: String,
    client: &'a Client,
}

impl PartialEq for Document<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl<'a> Document<'a> {
    pub(crate) fn new(url: String, item_url: &str, client: &'a Client) -> Document<'a> {
        Document {
            url,
            item_url: item_url.to_string(),
            client,
        }
    }

    /// URL of the document itself.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL of the owning item.
    pub fn item_url(&self) -> &str {
        &self.item_url
    }

    /// Last path segment of the document URL, when there is one.
    pub fn file_name(&self) -> Option<&str> {
        self.url.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Fetch the document's content, consulting the document cache first.
    pub fn get_content(&self) -> Result<Vec<u8>, AlveoError> {
        self.client.get_document_content(&self.url)
    }
}

/// A point-in-time snapshot of a named, server-persisted item collection.
#[derive(Debug)]
pub struct ItemList<'a> {
    url: String,
    name: String,
    items: Vec<String>,
    client: &'a Client,
}

impl PartialEq for ItemList<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl<'a> ItemList<'a> {
    pub(crate) fn from_json(
        url: &str,
        value: &Value,
        client: &'a Client,
    ) -> Result<ItemList<'a>, AlveoError> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AlveoError::UnexpectedResponse(value.to_string()))?;
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| AlveoError::UnexpectedResponse(value.to_string()))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        Ok(ItemList {
            url: url.to_string(),
            name: name.to_string(),
            items,
            client,
        })
    }

    /// Server-assigned URL of this list.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Display name as of this snapshot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member item URLs as of this snapshot.
    pub fn item_urls(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Membership is decided by identifying URL, not handle identity.
    pub fn contains(&self, item: &Item<'_>) -> bool {
        self.contains_url(item.url())
    }

    pub fn contains_url(&self, item_url: &str) -> bool {
        self.items.iter().any(|url| url == item_url)
    }

    /// A handle for the member at `index`, when there is one.
    pub fn get_item(&self, index: usize) -> Option<Item<'a>> {
        self.items
            .get(index)
            .map(|url| Item::new(url, self.client))
    }

    /// Fetch a fresh snapshot of this list from the server.
    ///
    /// The current snapshot is left untouched; server-side changes (added
    /// members, renames) are only observable through the returned value.
    pub fn refresh(&self) -> Result<ItemList<'a>, AlveoError> {
        self.client.get_item_list(&self.url)
    }
}

/// Document URLs listed in an item's metadata, in listing order.
fn document_urls(metadata: &Value) -> Vec<String> {
    metadata
        .get(DOCUMENTS_FIELD)
        .and_then(Value::as_array)
        .map(|documents| {
            documents
                .iter()
                .filter_map(|doc| doc.get(DOCUMENT_URL_FIELD).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
