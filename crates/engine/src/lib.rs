//! Hierarchical quota authorization and allocation.
//!
//! [`QuotaSetService`] ties the pieces together for each request: place the
//! target in the project tree ([`HierarchyResolver`]), decide whether the
//! caller may act there ([`QuotaAuthorizer`]), validate proposed limits
//! against usage and the parent's budget, and write them while keeping the
//! parent's `allocated` figures current ([`AllocationEngine`]).

pub mod allocation;
pub mod authorizer;
pub mod builder;
pub mod error;
pub mod hierarchy;
pub mod metrics;
pub mod policy;
pub mod service;

pub use allocation::{AllocationEngine, ParentAllocation};
pub use authorizer::{Mutation, QuotaAuthorizer};
pub use builder::QuotaSetServiceBuilder;
pub use error::QuotaError;
pub use hierarchy::{HierarchyPosition, HierarchyResolver, immediate_children};
pub use metrics::{MetricsSnapshot, QuotaMetrics};
pub use policy::{PolicyEnforcer, PolicyError, RolePolicy, check_project_context, rules};
pub use service::QuotaSetService;
