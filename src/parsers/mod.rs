//! # 解析器模块
//!
//! 解析 Gctf 产生的各类文本输出。格式由外部程序拥有，
//! 这里只做尽力而为的行扫描：缺失或畸形的行跳过并告警，从不崩溃。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: gctf_log, epa_log, star

pub mod epa_log;
pub mod gctf_log;
pub mod star;
