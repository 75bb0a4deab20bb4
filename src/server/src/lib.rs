#![recursion_limit = "1024"]
//! 抽奖平台后端服务
//!
//! 用户参与、定时开奖、管理员手动开奖与后台管理接口

pub mod config;
pub mod core;
pub mod errors;
pub mod routes;
pub mod state;
pub mod types;
pub mod utils;


pub use crate::config::ServerConfig;
pub use crate::state::ServerState;
