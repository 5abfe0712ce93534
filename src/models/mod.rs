pub mod error;
pub mod fetch;
pub mod notification;
pub mod page;
