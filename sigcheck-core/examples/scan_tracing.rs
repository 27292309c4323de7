//! Example demonstrating scan client tracing instrumentation.
//!
//! Run with:
//!   SCAN_API_URL=http://127.0.0.1:8000 \
//!   cargo run -p sigcheck-core --example scan_tracing -- original.png scanned.png

use std::time::Duration;

use sigcheck_core::scan::{HttpScanClient, ScanClientConfig, SignatureScanner};
use sigcheck_core::{classify, encode_file, SigcheckConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("sigcheck_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(original), Some(scanned)) = (args.next(), args.next()) else {
        eprintln!("usage: scan_tracing <ORIGINAL> <SCANNED>");
        return;
    };

    println!("=== Scan Client Tracing Demo ===\n");

    let env = SigcheckConfig::from_env();
    let config = match ScanClientConfig::from_config(&env) {
        Ok(config) => ScanClientConfig {
            timeout: Duration::from_secs(15),
            ..config
        },
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };
    println!("Config: {:?}\n", config);

    let client = match HttpScanClient::with_config(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let (original, scanned) = match (encode_file(&original).await, encode_file(&scanned).await) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Failed to read image: {}", e);
            return;
        }
    };

    println!("\nScanning...\n");

    // A demo token; the scan service decides whether it is accepted
    match client
        .submit_scan(original.as_str(), scanned.as_str(), "demo-token")
        .await
    {
        Ok(outcome) => {
            println!("\nSuccess!");
            println!("   Similarity: {:.2}", outcome.similarity_index);
            println!("   Severity:   {}", classify(Some(outcome.similarity_index)));
            println!("   Date:       {}", outcome.computed_at);
        }
        Err(e) => {
            println!("\nFailed: {}", e);
        }
    }
}
