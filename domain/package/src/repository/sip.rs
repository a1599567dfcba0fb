use archival_architecture::repository::DBRepository;

use crate::model::entity::Sip;

pub trait SipRepo: DBRepository<Sip> + Send + Sync {}
