//! # 数据模型模块
//!
//! 定义 CTF 估计结果与 micrograph 元数据的统一数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `commands/` 使用
//! - 子模块: ctf, micrograph

pub mod ctf;
pub mod micrograph;

pub use ctf::CtfModel;
pub use micrograph::{Acquisition, TiltImageCtf};
