//! Print the body hash (and fixture file name) for a request body on stdin.
//!
//! ```text
//! echo '{"q":"x"}' | fixture-key --path /search
//! ```

use std::io::Read;
use std::path::Path;

use axum::body::Bytes;
use clap::Parser;
use mock_proxy::fixtures::key::body_hash;
use mock_proxy::fixtures::{ArtifactType, FixtureKey, LogicalPath, Namespace};
use mock_proxy::http::RequestBody;

#[derive(Parser)]
#[command(name = "fixture-key")]
#[command(about = "Compute the fixture key for a request body read from stdin", long_about = None)]
struct Cli {
    /// Content type used to parse the body
    #[arg(long, default_value = "application/json")]
    content_type: String,

    /// Request path; prints the fixture file path as well
    #[arg(long)]
    path: Option<String>,

    /// Artifact type: data, headers, func or request
    #[arg(long = "type", default_value = "data")]
    artifact: ArtifactType,

    /// Use the private namespace (request carries Authorization)
    #[arg(long)]
    private: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut raw = Vec::new();
    std::io::stdin().read_to_end(&mut raw)?;
    let body = RequestBody::parse(Some(&cli.content_type), Bytes::from(raw));

    match body_hash(&body) {
        Some(hash) => println!("{hash}"),
        None => eprintln!("body has no data; fixtures for it use the generic file name"),
    }

    if let Some(path) = &cli.path {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path.as_str(), None),
        };
        let namespace = if cli.private { Namespace::Private } else { Namespace::Public };
        let key = FixtureKey::new(cli.artifact, LogicalPath::new(path, query), &body);
        println!("{}", key.resolve(Path::new(""), namespace).display());
    }

    Ok(())
}
