//! # ctfkit - Gctf CTF 估计统一工具箱
//!
//! 将围绕 Gctf (GPU 加速 CTF 估计程序) 的各种包装脚本用 Rust 重构，
//! 统一成单一可执行文件。Gctf 本身是外部预编译二进制；本工具只负责
//! 定位二进制、拼装命令行、启动子进程并解析其文本输出。
//!
//! ## 子命令
//! - `estimate` - 对一组 micrograph 做 CTF 估计
//! - `refine`   - 基于粒子坐标的局部 CTF 精修
//! - `ts`       - 倾转系列 (tilt series) 逐帧 CTF 估计
//! - `import`   - 导入已有 Gctf 日志中的 CTF 结果
//! - `plot`     - 绘制 EPA 拟合曲线图
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── gctf/     (二进制定位、参数拼装、子进程执行)
//!   │     ├── parsers/  (Gctf 日志/STAR 输出解析)
//!   │     └── models/   (CTF 数据模型)
//!   ├── batch/      (文件收集与并行执行)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod gctf;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
