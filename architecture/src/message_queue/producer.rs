use serde::Serialize;

#[async_trait::async_trait]
pub trait MessageQueueProducerTemplate<T>: Send + Sync
where
    T: Serialize + Send + Sync,
{
    async fn send_object(&self, content: &T, topic: &str) -> anyhow::Result<()>;
}
