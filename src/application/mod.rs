//! Application services layer.

pub mod accounts;
pub mod authoring;
pub mod error;
pub mod feed;
pub mod follows;
pub mod forms;
pub mod groups;
pub mod pagination;
pub mod repos;
