#[tokio::main]
async fn main() {
    if let Err(e) = review_relay_lib::run().await {
        eprintln!("review-relay: {}", e);
        std::process::exit(1);
    }
}
