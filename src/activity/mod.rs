//! Normalized activity feed: classification and display grouping

pub mod group;
pub mod transform;
pub mod types;

pub use group::{group_by_time, group_by_time_at, ActivityGroup, GroupBucket};
pub use transform::{
    transform_account_activity, transform_activities, AccountActivity, CoinActivity,
    StakeActivity, TokenActivity, TransformError,
};
pub use types::{ActivityEvent, ActivityKind, Identity};
