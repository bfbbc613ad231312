pub mod activity;
pub mod config;
pub mod decisions;
pub mod domain;
pub mod errors;
pub mod policy;

pub use activity::{
    ActivityEvent, ActivityNotifier, InMemoryActivityNotifier, LabelCatalog,
    ENTITY_KIND_APPROVAL_REQUEST,
};
pub use decisions::{
    derive_final_status, Decision, DecisionEngine, DecisionError, DecisionPolicy, StatusChange,
};
pub use domain::entity::EntityType;
pub use domain::organization::{Organization, OrganizationId};
pub use domain::request::{ApprovalRequest, FinalStatus, LevelStatus, RequestId, UserId};
pub use domain::threshold::{
    ApprovalLevel, Threshold, ThresholdId, ThresholdInput, ThresholdPatch,
};
pub use errors::ApprovalError;
pub use policy::{evaluate, RuleOutcome};
