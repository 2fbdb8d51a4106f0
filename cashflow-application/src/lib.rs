//! 收支账本应用层（cashflow-application）
//!
//! 在领域层之上提供 CQRS 的应用侧：
//! - 命令（`commands`）与命令总线，写路径经聚合产生事件并发布；
//! - 查询（`queries`）与查询总线，读路径来自投影或日志重放；
//! - 配置（`config`）、日志（`telemetry`）与组合根（`bootstrap::Ledger`）。
//!
pub mod bootstrap;
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod command_handlers;
pub mod commands;
pub mod config;
pub mod context;
pub mod dto;
pub mod error;
pub mod inmemory_command_bus;
pub mod inmemory_query_bus;
pub mod queries;
pub mod query;
pub mod query_bus;
pub mod query_handler;
pub mod query_handlers;
pub mod telemetry;

pub use bootstrap::Ledger;
pub use inmemory_command_bus::InMemoryCommandBus;
pub use inmemory_query_bus::InMemoryQueryBus;
