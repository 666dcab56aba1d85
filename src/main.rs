#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = timecard_backend::run().await {
        eprintln!("Server failed to start: {}", e);
        std::process::exit(1);
    }
}
