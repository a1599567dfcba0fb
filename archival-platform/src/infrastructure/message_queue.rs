use std::{collections::HashMap, sync::Arc};

use archival_architecture::{
    hosting::BackgroundService, message_queue::producer::MessageQueueProducerTemplate,
};
use futures::future::BoxFuture;
use tracing::Instrument;

pub type ConsumerReturn = BoxFuture<'static, anyhow::Result<()>>;
pub type ConsumerFn<SP> = fn(content: String, sp: Arc<SP>) -> ConsumerReturn;

#[derive(Debug, Clone)]
pub struct InternalMessage {
    pub target: String,
    pub body: String,
}

/// In-process queue, messages are JSON bodies addressed to a topic.
pub struct InternalMessageQueueProducer {
    receiver: flume::Receiver<InternalMessage>,
    sender: flume::Sender<InternalMessage>,
}

#[async_trait::async_trait]
impl<T> MessageQueueProducerTemplate<T> for InternalMessageQueueProducer
where
    T: serde::Serialize + Send + Sync,
{
    async fn send_object(&self, content: &T, topic: &str) -> anyhow::Result<()> {
        Ok(self
            .sender
            .send_async(InternalMessage {
                target: topic.to_string(),
                body: serde_json::to_string(content)?,
            })
            .await?)
    }
}

impl Default for InternalMessageQueueProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalMessageQueueProducer {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    pub fn get_receiver(&self) -> flume::Receiver<InternalMessage> {
        self.receiver.clone()
    }
}

/// Routes the messages of one queue to the consumer function of their topic.
pub struct InternalMessageQueueConsumer<SP>
where
    SP: Send + Sync + 'static,
{
    name: &'static str,
    receiver: flume::Receiver<InternalMessage>,
    service_provider: Arc<SP>,
    fn_mapper: HashMap<String, ConsumerFn<SP>>,
    /// Handle messages concurrently instead of in arrival order.
    concurrent: bool,
}

#[async_trait::async_trait]
impl<SP> BackgroundService for InternalMessageQueueConsumer<SP>
where
    SP: Send + Sync + 'static,
{
    async fn run(&self) {
        loop {
            let message = match self.receiver.recv_async().await {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!("[{}] Queue closed: {e}", self.name);
                    return;
                }
            };
            tracing::trace!("[{}] Message received: {:?}.", self.name, message);
            let Some(consumer) = self.fn_mapper.get(message.target.as_str()).copied() else {
                tracing::warn!("[{}] No such service: {}.", self.name, message.target);
                continue;
            };
            let sp = self.service_provider.clone();
            let InternalMessage { target, body } = message;
            let task = async move {
                if let Err(e) = consumer(body, sp).await {
                    tracing::error!("Consumer of {target} failed: {e}");
                }
            }
            .instrument(tracing::trace_span!("internal_message_queue"));
            if self.concurrent {
                tokio::spawn(task);
            } else {
                task.await;
            }
        }
    }
}

impl<SP> InternalMessageQueueConsumer<SP>
where
    SP: Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        receiver: flume::Receiver<InternalMessage>,
        service_provider: Arc<SP>,
        fn_mapper: HashMap<String, ConsumerFn<SP>>,
    ) -> Self {
        Self {
            name,
            receiver,
            service_provider,
            fn_mapper,
            concurrent: false,
        }
    }

    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        bodies: Mutex<Vec<String>>,
    }

    fn record(content: String, sp: Arc<Recorder>) -> ConsumerReturn {
        Box::pin(async move {
            sp.bodies.lock().unwrap().push(content);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_messages_reach_their_topic_in_order() {
        let producer = InternalMessageQueueProducer::new();
        let recorder = Arc::new(Recorder::default());
        let consumer = Arc::new(InternalMessageQueueConsumer::new(
            "test",
            producer.get_receiver(),
            recorder.clone(),
            HashMap::from([("numbers".to_string(), record as ConsumerFn<Recorder>)]),
        ));
        let handle = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.run().await }
        });

        producer.send_object(&1, "numbers").await.unwrap();
        producer.send_object(&"ignored", "letters").await.unwrap();
        producer.send_object(&2, "numbers").await.unwrap();
        while recorder.bodies.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
        handle.abort();

        assert_eq!(*recorder.bodies.lock().unwrap(), vec!["1", "2"]);
    }
}
