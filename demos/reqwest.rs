//! Fetches a collection, then follows its changes until the server closes the stream
//!
//! Run with: cargo run --example reqwest --features reqwest -- https://example.com/api notes

use restream::{Client, ListOptions, Termination, reqwest::ReqwestTransport};
use serde_json::{Map, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8080/api".to_owned());
    let collection = args.next().unwrap_or_else(|| "notes".to_owned());

    let client = Client::new(ReqwestTransport::new(base_url));

    let first = client
        .list::<Map<String, Value>>(&collection, ListOptions::new())
        .await?;
    println!("fetched {} items", first.len());

    let options = if first.revision().is_some() {
        ListOptions::new().stream("diff").prev(first)
    } else {
        ListOptions::new().stream("diff")
    };
    let mut stream = client.stream_list(&collection, options).await?;
    println!("subscribed, server picked {} mode", stream.format());

    while let Some(items) = stream.read().await? {
        println!("{} items", items.len());
        for item in items.iter() {
            println!("  {} @ {}", item.id(), item.metadata.etag);
        }
        println!("---");
    }

    match stream.termination() {
        Some(Termination::TransportFailure(reason)) => eprintln!("connection lost: {reason}"),
        _ => println!("stream ended"),
    }
    Ok(())
}
