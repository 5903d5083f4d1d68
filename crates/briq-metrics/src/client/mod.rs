//! Upstream Briq API: the [`ListUsers`] operation and its HTTP implementation.

use async_trait::async_trait;
use serde::Deserialize;

use std::fmt;

pub use self::{
    error::Error,
    http::{BriqClient, DEFAULT_API_URL},
};

mod error;
mod http;

/// Opaque error returned by a [`ListUsers`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request for [`ListUsers::list_users()`]. There are no filters at the moment; all users
/// visible to the credential are listed.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ListUsersRequest {}

/// Snapshot of a single Briq user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Username. Used as the `user` label value.
    pub username: String,
    /// Balance the user can currently give away.
    pub active_balance: i64,
    /// Balance that is not spendable right now.
    pub inactive_balance: i64,
    /// Points earned by the user.
    pub points: i64,
}

/// Users returned by a single [`ListUsers::list_users()`] call, in the upstream order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserList {
    /// Listed users.
    pub users: Vec<User>,
}

/// Upstream source of Briq users.
///
/// Implementations must be cancel-safe: the collector drops the returned future
/// on timeout.
#[async_trait]
pub trait ListUsers: fmt::Debug + Send + Sync + 'static {
    /// Lists users together with their balances.
    ///
    /// # Errors
    ///
    /// Any failure (transport, authentication, upstream-side) is reported as an opaque error.
    async fn list_users(&self, request: ListUsersRequest) -> Result<UserList, BoxError>;
}
