//! The Alveo API client.
//!
//! [`Client`] owns the resolved configuration, the optional local
//! [`Cache`], and a blocking HTTP client. Read paths (item metadata,
//! document content) are cache-first when caching is enabled; item-list
//! mutations, SPARQL queries and annotation lookups always go to the
//! server.

use crate::cache::Cache;
use crate::config::{ClientConfig, ResolvedConfig};
use crate::error::AlveoError;
use crate::model::{Item, ItemList};
use reqwest::blocking::RequestBuilder;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};

/// Header carrying the API key, as expected by the Alveo service.
pub const API_KEY_HEADER: &str = "X-API-KEY";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Authenticated client for one Alveo service endpoint.
///
/// Two clients are interchangeable exactly when their resolved
/// configurations are equal; see [`ResolvedConfig`].
#[derive(Debug)]
pub struct Client {
    config: ResolvedConfig,
    cache: Option<Cache>,
    http: reqwest::blocking::Client,
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
    }
}

impl Client {
    /// Create a client from the defaults, reading `~/alveo.config` for the
    /// API key.
    ///
    /// The key is verified with one privileged request before the client is
    /// returned; a rejected key surfaces as
    /// [`AlveoError::Authentication`] with the server's 401 response.
    pub fn new() -> Result<Client, AlveoError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client from explicit configuration overrides.
    pub fn with_config(config: ClientConfig) -> Result<Client, AlveoError> {
        let resolved = config.resolve()?;
        Self::from_resolved(resolved)
    }

    pub(crate) fn from_resolved(config: ResolvedConfig) -> Result<Client, AlveoError> {
        let cache = if config.use_cache {
            Some(Cache::open(&config.cache_dir)?)
        } else {
            None
        };
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let client = Client {
            config,
            cache,
            http,
        };
        client.verify_api_key()?;
        Ok(client)
    }

    /// Resolved configuration this client was built from.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Base URL of the service, without a trailing slash.
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// The local cache, when caching is enabled.
    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    /// Return a lazy handle for the item at `item_url`.
    ///
    /// No network traffic happens here; metadata is fetched (cache-first)
    /// when the handle is first asked for it.
    pub fn get_item(&self, item_url: &str) -> Item<'_> {
        Item::new(item_url, self)
    }

    /// Fetch raw item metadata, consulting the metadata cache first.
    ///
    /// On a miss the server bytes are stored back into the cache iff
    /// `update_cache` is set; no entry is ever written without a successful
    /// network read.
    pub(crate) fn item_metadata(&self, item_url: &str) -> Result<Vec<u8>, AlveoError> {
        if let Some(cache) = &self.cache {
            if cache.has_item(item_url) {
                trace!("metadata cache hit for {}", item_url);
                return Ok(cache.get_item(item_url)?);
            }
        }
        trace!("metadata cache miss for {}", item_url);
        let data = self.get_raw(item_url)?;
        if self.config.update_cache {
            if let Some(cache) = &self.cache {
                cache.add_item(item_url, &data)?;
            }
        }
        Ok(data)
    }

    /// Fetch raw document content, consulting the document cache first.
    pub fn get_document_content(&self, doc_url: &str) -> Result<Vec<u8>, AlveoError> {
        if let Some(cache) = &self.cache {
            if cache.has_file(doc_url) {
                trace!("document cache hit for {}", doc_url);
                return Ok(cache.get_file(doc_url)?);
            }
        }
        trace!("document cache miss for {}", doc_url);
        let data = self.get_raw(doc_url)?;
        if self.config.update_cache {
            if let Some(cache) = &self.cache {
                cache.add_file(doc_url, &data)?;
            }
        }
        Ok(data)
    }

    /// All item lists visible to this key, as returned by the server
    /// (grouped under `own` and `shared`).
    pub fn get_item_lists(&self) -> Result<Value, AlveoError> {
        self.get_json(&self.endpoint("item_lists"))
    }

    /// Fetch one item list snapshot by its server-assigned URL.
    pub fn get_item_list(&self, list_url: &str) -> Result<ItemList<'_>, AlveoError> {
        let value = self.get_json(list_url)?;
        ItemList::from_json(list_url, &value, self)
    }

    /// Look up an item list by display name.
    ///
    /// The name is matched against both own and shared lists; an unknown
    /// name is [`AlveoError::ItemListNotFound`], distinct from HTTP errors.
    pub fn get_item_list_by_name(&self, name: &str) -> Result<ItemList<'_>, AlveoError> {
        let lists = self.get_item_lists()?;
        for scope in ["own", "shared"] {
            let Some(entries) = lists.get(scope).and_then(Value::as_array) else {
                continue;
            };
            for entry in entries {
                if entry.get("name").and_then(Value::as_str) == Some(name) {
                    let url = entry
                        .get("item_list_url")
                        .and_then(Value::as_str)
                        .ok_or_else(|| AlveoError::UnexpectedResponse(entry.to_string()))?;
                    return self.get_item_list(url);
                }
            }
        }
        Err(AlveoError::ItemListNotFound {
            name: name.to_string(),
        })
    }

    /// Add items to an existing list by URL. Returns the server's success
    /// message, e.g. `1 items added to existing item list my list`.
    pub fn add_to_item_list<S: AsRef<str>>(
        &self,
        item_urls: &[S],
        list_url: &str,
    ) -> Result<String, AlveoError> {
        let body = json!({ "items": collect_urls(item_urls) });
        let value = self.send_json(self.http.post(list_url).json(&body))?;
        success_message(&value)
    }

    /// Add items to the list named `name`, creating it when no list with
    /// that name exists yet.
    pub fn add_to_item_list_by_name<S: AsRef<str>>(
        &self,
        item_urls: &[S],
        name: &str,
    ) -> Result<String, AlveoError> {
        let body = json!({ "items": collect_urls(item_urls) });
        let request = self
            .http
            .post(self.endpoint("item_lists"))
            .query(&[("name", name)])
            .json(&body);
        let value = self.send_json(request)?;
        success_message(&value)
    }

    /// Rename an item list on the server.
    ///
    /// The local snapshot is unaffected; call [`ItemList::refresh`] to
    /// observe the new name.
    pub fn rename_item_list(
        &self,
        list: &ItemList<'_>,
        new_name: &str,
    ) -> Result<(), AlveoError> {
        debug!("renaming item list {} to {:?}", list.url(), new_name);
        let body = json!({ "name": new_name });
        self.send_json(self.http.put(list.url()).json(&body))?;
        Ok(())
    }

    /// Delete an item list on the server.
    ///
    /// Deleting a list that no longer exists is an [`AlveoError::Api`]
    /// failure, never a silent success.
    pub fn delete_item_list(&self, list: &ItemList<'_>) -> Result<(), AlveoError> {
        debug!("deleting item list {}", list.url());
        self.send(self.http.delete(list.url()))?;
        Ok(())
    }

    /// Run a SPARQL query against one dataset.
    ///
    /// The server's result set is returned verbatim, bindings and all; no
    /// local filtering or truncation is applied.
    pub fn sparql_query(&self, dataset: &str, query: &str) -> Result<Value, AlveoError> {
        let request = self
            .http
            .get(self.endpoint(&format!("sparql/{}", dataset)))
            .query(&[("query", query)]);
        self.send_json(request)
    }

    /// Fetch annotations for an item, optionally filtered by type URI.
    ///
    /// Returns `Ok(None)` when the item has no matching annotations; an
    /// empty result is deliberately not represented as an empty structure.
    pub fn get_annotations(
        &self,
        item_url: &str,
        annotation_type: Option<&str>,
    ) -> Result<Option<Value>, AlveoError> {
        let url = format!("{}/annotations.json", item_url.trim_end_matches('/'));
        let mut request = self.http.get(&url);
        if let Some(kind) = annotation_type {
            request = request.query(&[("type", kind)]);
        }
        let value = self.send_json(request)?;
        Ok(filter_annotation_response(value))
    }

    /// The first privileged request decides whether the key is usable.
    fn verify_api_key(&self) -> Result<(), AlveoError> {
        debug!("verifying api key against {}", self.config.api_url);
        self.get_item_lists().map(|_| ())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url, path)
    }

    pub(crate) fn get_raw(&self, url: &str) -> Result<Vec<u8>, AlveoError> {
        self.send(self.http.get(url))
    }

    fn get_json(&self, url: &str) -> Result<Value, AlveoError> {
        self.send_json(self.http.get(url))
    }

    fn send_json(&self, request: RequestBuilder) -> Result<Value, AlveoError> {
        let data = self.send(request)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Issue one authenticated request and surface the response body.
    ///
    /// Non-2xx responses become [`AlveoError::Api`], with 401 singled out as
    /// [`AlveoError::Authentication`]; transport failures become
    /// [`AlveoError::Network`] and are not retried.
    fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, AlveoError> {
        let response = request
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        let body = response.bytes()?.to_vec();
        trace!("response status {} ({} bytes)", status, body.len());

        if status.is_success() {
            Ok(body)
        } else {
            let body = String::from_utf8_lossy(&body).into_owned();
            if status == StatusCode::UNAUTHORIZED {
                Err(AlveoError::Authentication {
                    status: status.as_u16(),
                    body,
                })
            } else {
                Err(AlveoError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[cfg(test)]
impl Client {
    /// Construct a client without touching the network, for handle tests.
    pub(crate) fn offline_for_tests() -> Client {
        Self::offline_with_cache(None, false)
    }

    /// Construct a client against an unreachable endpoint, optionally with a
    /// live cache, for exercising cache policy without a server.
    pub(crate) fn offline_with_cache(cache: Option<Cache>, update_cache: bool) -> Client {
        let cache_dir = cache
            .as_ref()
            .map(|c| c.root().to_path_buf())
            .unwrap_or_else(std::env::temp_dir);
        Client {
            config: ResolvedConfig {
                api_key: "test-key".to_string(),
                api_url: "http://127.0.0.1:1".to_string(),
                cache_dir,
                use_cache: cache.is_some(),
                update_cache,
            },
            cache,
            http: reqwest::blocking::Client::new(),
        }
    }
}

fn collect_urls<S: AsRef<str>>(item_urls: &[S]) -> Vec<&str> {
    item_urls.iter().map(AsRef::as_ref).collect()
}

/// Extract the server's `success` message from a mutation response.
fn success_message(value: &Value) -> Result<String, AlveoError> {
    match value.get("success").and_then(Value::as_str) {
        Some(message) => Ok(message.to_string()),
        None => Err(AlveoError::UnexpectedResponse(value.to_string())),
    }
}

/// An annotation payload counts as a result only when it actually carries
/// annotations; anything else is the explicit "none" signal.
fn filter_annotation_response(value: Value) -> Option<Value> {
    if value.get("alveo:annotations").is_some() {
        Some(value)
    } else {
        None
    }
}
