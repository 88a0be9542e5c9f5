//! Demo domain wrapper: maps `User` entities onto generic records via the
//! record client, executing HTTP round-trips with ureq.

pub mod connector;
pub mod transport;
pub mod user;

pub use connector::UserConnector;
pub use user::User;
