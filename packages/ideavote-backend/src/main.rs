#[tokio::main]
async fn main() {
    if let Err(e) = ideavote_backend::run().await {
        log::error!(target: "ideavote.server", "Backend failed: {}", e);
        std::process::exit(1);
    }
}
