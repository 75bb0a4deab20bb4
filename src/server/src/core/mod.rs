//! 核心业务逻辑模块

pub mod models;
pub mod store;
pub mod selection;
pub mod closer;
pub mod scheduler;
pub mod reconcile;
pub mod ledger;
pub mod participation;
pub mod settings;
