//! # Gctf 外部程序封装模块
//!
//! Gctf 是外部预编译的 GPU CTF 估计程序，本模块负责三件事：
//! 定位二进制与运行环境、把参数结构拼装成命令行、同步执行子进程。
//! CTF 估计算法本身完全在外部程序内部，这里从不重新实现。
//!
//! ## 依赖关系
//! - 被 `commands/` 各模块使用
//! - 子模块: program, args, runner

pub mod args;
pub mod program;
pub mod runner;

pub use args::{GctfParams, HighResParams, InputCtfParams, LocalRefineParams, PhaseShiftParams};
pub use program::GctfProgram;
