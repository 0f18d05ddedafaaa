//! Integration tests against a live Alveo service.
//!
//! These need a valid `~/alveo.config` and network access, so they are
//! ignored by default; run them with `cargo test -- --ignored`.

use alveo::{AlveoError, Client, ClientConfig};
use tempfile::TempDir;

const TEST_LIST_NAME: &str = "alveo_rs_test_item_list";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn no_cache_client() -> Client {
    init_logging();
    Client::with_config(ClientConfig::new().use_cache(false)).expect("client creation failed")
}

#[test]
#[ignore]
fn test_create_client_with_wrong_api_key() {
    init_logging();
    let error = Client::with_config(ClientConfig::new().api_key("wrongapikey123").use_cache(false))
        .expect_err("client with a bad key must not construct");

    assert!(error.is_authentication());
    assert_eq!(error.status(), Some(401));
    assert!(error.to_string().contains("401"));
}

#[test]
#[ignore]
fn test_identical_clients() {
    let first = no_cache_client();
    let second = no_cache_client();
    assert_eq!(first, second);

    let cache_dir = TempDir::new().unwrap();
    let cached = Client::with_config(
        ClientConfig::new()
            .cache_dir(cache_dir.path())
            .use_cache(true)
            .update_cache(true),
    )
    .unwrap();
    let cached_again = Client::with_config(
        ClientConfig::new()
            .cache_dir(cache_dir.path())
            .use_cache(true)
            .update_cache(true),
    )
    .unwrap();
    assert_eq!(cached, cached_again);

    // same key, different cache configuration: distinct clients
    let uncached = Client::with_config(
        ClientConfig::new()
            .cache_dir(cache_dir.path())
            .use_cache(false)
            .update_cache(false),
    )
    .unwrap();
    assert_ne!(cached, uncached);
}

#[test]
#[ignore]
fn test_client_cache() {
    init_logging();
    let cache_dir = TempDir::new().unwrap();
    let client = Client::with_config(
        ClientConfig::new()
            .use_cache(true)
            .cache_dir(cache_dir.path()),
    )
    .unwrap();

    let item_url = format!("{}/catalog/cooee/1-190", client.api_url());
    let item = client.get_item(&item_url);

    let metadata = item.metadata().unwrap();
    assert!(metadata.get("@context").is_some());

    // the raw metadata must now be in the cache, byte-identical to the fetch
    let cache = client.cache().expect("cache enabled");
    assert!(cache.has_item(&item_url));
    let cached = String::from_utf8(cache.get_item(&item_url).unwrap()).unwrap();
    assert!(cached.contains("@context"));
    assert!(cached.contains(&item_url));

    // document content lands in the files namespace, one file per document
    let document = item.get_document(0).unwrap();
    let content = document.get_content().unwrap();
    assert_eq!(&content[..20], b"\r\n\r\n\r\nSydney, New So");

    let listing: Vec<_> = std::fs::read_dir(cache.files_dir()).unwrap().collect();
    assert_eq!(listing.len(), 1);
    let cached_path = listing[0].as_ref().unwrap().path();
    assert_eq!(std::fs::read(cached_path).unwrap(), content);

    // second read is a cache hit and byte-identical
    let content_again = document.get_content().unwrap();
    assert_eq!(content, content_again);
}

#[test]
#[ignore]
fn test_client_no_cache() {
    let client = no_cache_client();
    assert!(client.cache().is_none());

    let item_url = format!("{}/catalog/cooee/1-190", client.api_url());
    let item = client.get_item(&item_url);
    let document = item.get_document(0).unwrap();
    let content = document.get_content().unwrap();
    assert_eq!(&content[..20], b"\r\n\r\n\r\nSydney, New So");
}

#[test]
#[ignore]
fn test_item_download() {
    let client = no_cache_client();
    let item_url = format!("{}/catalog/ace/A01a", client.api_url());
    let item = client.get_item(&item_url);

    assert_eq!(item.url(), item_url);

    let metadata = item.metadata().unwrap();
    assert_eq!(
        metadata["alveo:primary_text_url"],
        format!("{}/catalog/ace/A01a/primary_text.json", client.api_url())
    );
}

#[test]
#[ignore]
fn test_item_list_lifecycle() {
    let client = no_cache_client();
    let base_url = client.api_url().to_string();

    // remove any leftover list from a previous run
    if let Ok(stale) = client.get_item_list_by_name(TEST_LIST_NAME) {
        let _ = client.delete_item_list(&stale);
    }

    // adding to a nonexistent name creates the list
    let first_item = [format!("{}/catalog/ace/A01a", base_url)];
    let message = client
        .add_to_item_list_by_name(&first_item, TEST_LIST_NAME)
        .unwrap();
    assert_eq!(
        message,
        format!("1 items added to new item list {}", TEST_LIST_NAME)
    );

    let list = client.get_item_list_by_name(TEST_LIST_NAME).unwrap();
    assert_eq!(list.name(), TEST_LIST_NAME);

    // adding by URL appends to the existing list
    let second_item = [format!("{}/catalog/ace/A01b", base_url)];
    let message = client.add_to_item_list(&second_item, list.url()).unwrap();
    assert_eq!(
        message,
        format!("1 items added to existing item list {}", list.name())
    );

    // membership is only observable after an explicit refresh
    let list = list.refresh().unwrap();
    let item = client.get_item(&second_item[0]);
    assert!(list.contains(&item));

    client.rename_item_list(&list, "brand new list").unwrap();
    let list = list.refresh().unwrap();
    assert_eq!(list.name(), "brand new list");

    client.delete_item_list(&list).unwrap();

    // deleting a list that is already gone is an API error
    let error = client.delete_item_list(&list).unwrap_err();
    assert!(matches!(error, AlveoError::Api { .. }));
}

#[test]
#[ignore]
fn test_get_annotations() {
    let client = no_cache_client();
    let speaker_type = "http://ns.ausnc.org.au/schemas/annotation/ice/speaker";

    let item_with = client.get_item(&format!(
        "{}/catalog/monash/MEBH2FB_Sanitised",
        client.api_url()
    ));
    let annotations = item_with
        .get_annotations(Some(speaker_type))
        .unwrap()
        .expect("item has speaker annotations");
    let payload = annotations.get("alveo:annotations").unwrap();
    let first = &payload.as_array().unwrap()[0];
    for key in ["@id", "@type", "start", "end", "type"] {
        assert!(first.get(key).is_some(), "annotation missing {}", key);
    }

    // an item with no annotations of this type yields the explicit none
    let item_without = client.get_item(&format!(
        "{}/catalog/avozes/f6ArtharThan",
        client.api_url()
    ));
    let annotations = item_without.get_annotations(Some(speaker_type)).unwrap();
    assert!(annotations.is_none());
}

#[test]
#[ignore]
fn test_sparql_query() {
    let client = no_cache_client();

    let result = client
        .sparql_query("mitcheldelbridge", "select * where { ?a ?b ?c } LIMIT 10")
        .unwrap();

    let bindings = result["results"]["bindings"]
        .as_array()
        .expect("bindings array");
    assert_eq!(bindings.len(), 10);
}
