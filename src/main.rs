use xero_mcp::app::logging;

#[tokio::main]
async fn main() {
    // Credentials may live in a local .env; absence is fine.
    let _ = dotenvy::dotenv();
    logging::init();

    if let Err(err) = xero_mcp::run().await {
        tracing::error!(error = %err, "fatal error");
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}
