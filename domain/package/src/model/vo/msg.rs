use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AipState;

/// Published on every AIP state change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AipChangeMsg {
    pub aip_id: Uuid,
    pub sip_id: Uuid,
    pub state: AipState,
    pub message: Option<String>,
}
