use archival_architecture::{
    message_queue::producer::MessageQueueProducerTemplate,
    repository::{DBRepository, MutableRepository, ReadOnlyRepository},
};
use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use crate::{
    model::{
        entity::{Aip, Sip},
        vo::AipChangeMsg,
    },
    repository::{AipRepo, SipRepo},
};

mock! {
    pub AipChangeProducer {}
    #[async_trait]
    impl MessageQueueProducerTemplate<AipChangeMsg> for AipChangeProducer {
        async fn send_object(&self, content: &AipChangeMsg, topic: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub SipRepo {}
    impl SipRepo for SipRepo {}
    #[async_trait]
    impl ReadOnlyRepository<Sip> for SipRepo {
        async fn get_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Sip>>;
        async fn get_all(&self) -> anyhow::Result<Vec<Sip>>;
    }
    #[async_trait]
    impl MutableRepository<Sip> for SipRepo {
        async fn insert(&self, entity: &Sip) -> anyhow::Result<()>;
        async fn update(&self, entity: &Sip) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &Uuid) -> anyhow::Result<()>;
    }
    impl DBRepository<Sip> for SipRepo {}
}

mock! {
    pub AipRepo {}
    #[async_trait]
    impl AipRepo for AipRepo {
        async fn get_by_group_id(&self, group_id: &str) -> anyhow::Result<Option<Aip>>;
        async fn get_all_by_sip(&self, sip_id: Uuid) -> anyhow::Result<Vec<Aip>>;
    }
    #[async_trait]
    impl ReadOnlyRepository<Aip> for AipRepo {
        async fn get_by_id(&self, id: &Uuid) -> anyhow::Result<Option<Aip>>;
        async fn get_all(&self) -> anyhow::Result<Vec<Aip>>;
    }
    #[async_trait]
    impl MutableRepository<Aip> for AipRepo {
        async fn insert(&self, entity: &Aip) -> anyhow::Result<()>;
        async fn update(&self, entity: &Aip) -> anyhow::Result<()>;
        async fn delete_by_id(&self, id: &Uuid) -> anyhow::Result<()>;
    }
    impl DBRepository<Aip> for AipRepo {}
}
