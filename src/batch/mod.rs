//! # 批量处理模块
//!
//! micrograph 文件收集与并行执行。
//!
//! ## 功能
//! - 输入可为单文件、目录或 glob 模式
//! - 并行调度外部 Gctf 进程，GPU 轮换分配
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被各命令模块使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
