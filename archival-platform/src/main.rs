#[tokio::main]
async fn main() {
    archival_platform::server::run().await
}
