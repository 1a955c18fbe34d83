//! dpiprobe - censorship and DPI checker
//!
//! Probes domains and IP addresses over DNS, HTTP and TLS and reports where
//! they are being blocked.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dpi_cli::run().await
}
