use dashmap::DashMap;
use domain_package::{model::entity::Sip, repository::SipRepo};
use uuid::Uuid;

use crate::infrastructure::database::{MemoryRepository, Row};

impl Row for Sip {
    const NAME: &'static str = "SIP";

    fn key(&self) -> Uuid {
        self.id
    }

    fn table(repo: &MemoryRepository) -> &DashMap<Uuid, Self> {
        &repo.sips
    }
}

impl SipRepo for MemoryRepository {}
