//! Application registry records
//!
//! Applications and their deployable instances are owned by an external
//! registry. This core only reads them: to resolve display names and to check
//! that a rule's declared version exists.

use serde::{Deserialize, Serialize};

use super::id::ApplicationId;

/// A registered upstream service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub enabled: bool,
}

/// A concrete deployable version of an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstance {
    pub application_id: ApplicationId,
    pub version: String,
}
