//! Search Demo
//!
//! Creates an index, loads a few documents and runs faceted searches against
//! an IndexTank/Searchify account.
//!
//! Run with: INDEXTANK_API_URL=https://:secret@xxxx.api.searchify.com \
//!     cargo run --example search_demo
//!
//! A `config.json` in the working directory is used when the variable is unset.

use indextank_rs::{ApiClient, ClientConfig, ClientError, Document, SearchQuery};
use std::{thread, time::Duration};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const INDEX_NAME: &str = "search_demo";

fn init_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("indextank_rs=debug,search_demo=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()?;
    Ok(())
}

fn load_config() -> anyhow::Result<ClientConfig> {
    match std::env::var("INDEXTANK_API_URL") {
        Ok(url) => Ok(ClientConfig::new(url)),
        Err(_) => ClientConfig::load("config.json"),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging()?;

    let client = ApiClient::with_config(load_config()?)?;

    let mut index = match client.create_index(INDEX_NAME) {
        Ok(index) => index,
        Err(ClientError::IndexAlreadyExists) => client.index(INDEX_NAME),
        Err(e) => return Err(e.into()),
    };

    // New indexes take a few seconds to come up
    while !index.has_started()? {
        println!("Waiting for index '{}' to start...", index.name());
        thread::sleep(Duration::from_secs(1));
    }

    let documents = vec![
        Document::new("go-1", [("text", "Go is an open source programming language")])?
            .with_variable(0, 4.5)
            .with_category("language", "go"),
        Document::new("rust-1", [("text", "Rust is a language empowering everyone")])?
            .with_variable(0, 4.8)
            .with_category("language", "rust"),
        Document::new("rust-2", [("text", "Rust has no garbage collector")])?
            .with_variable(0, 3.9)
            .with_category("language", "rust"),
    ];

    let added = index.add_documents(documents)?;
    println!("Added {} documents", added.len() - added.failed_positions().len());
    for doc in added.failed_documents() {
        println!("  failed: {}", doc.id());
    }

    index.add_function(1, "-age")?;
    println!("Scoring functions: {:?}", index.list_functions()?);

    let results = index.search("language")?;
    println!(
        "\n'language' matched {} documents in {}s",
        results.matches, results.search_time
    );

    let mut query = SearchQuery::new("language");
    query
        .fetch_fields(["text"])
        .fetch_variables()
        .category_filter([("language", vec!["rust"])])
        .document_variable_filter(0, 4.0, f64::INFINITY);

    let results = index.search_with_query(&query)?;
    println!(
        "\nRust documents rated 4.0 or better ({} matches):",
        results.matches
    );
    for (i, hit) in results.results.iter().enumerate() {
        let docid = hit.get("docid").and_then(|v| v.as_str()).unwrap_or("?");
        let text = hit.get("text").and_then(|v| v.as_str()).unwrap_or("");
        println!("   {}. {} {}", i + 1, docid, text);
    }
    for (category, counts) in &results.facets {
        println!("   facet {}: {:?}", category, counts);
    }

    index.delete_document("rust-2")?;
    println!("\nIndex size: {}", index.refresh_metadata()?.size);

    Ok(())
}
