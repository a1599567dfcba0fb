/// Service running in the background while the platform is up.
#[async_trait::async_trait]
pub trait BackgroundService: Send + Sync {
    async fn run(&self);
}
