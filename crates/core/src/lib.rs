pub mod context;
pub mod error;
pub mod limit;
pub mod quota_set;
pub mod resource;
pub mod types;
pub mod validation;

pub use context::{ADMIN_ROLE, RequestContext};
pub use error::ValidationError;
pub use limit::{QuotaLimit, ResourceQuota, SettableRange, UNLIMITED};
pub use quota_set::{QuotaSet, QuotaSetEnvelope, QuotaSetUpdate};
pub use resource::{
    ExtensionRegistry, QuotaResource, SERVER_GROUP_QUOTAS_EXTENSION, StaticExtensions,
};
pub use types::{ProjectId, UserId};
pub use validation::{
    NON_QUOTA_KEYS, parse_force, parse_limit_entry, parse_limit_value, validate_limit,
};
