//! # Gctf 子进程执行
//!
//! 每张 micrograph 对应一次同步的 Gctf 调用：输入链接进独立工作目录，
//! 子进程在其中产生 PSD 与日志文件，结束后搬移到输出目录。
//! 非零退出码携带 stderr 上报为命令失败。
//!
//! ## 依赖关系
//! - 被 `commands/estimate.rs`, `commands/refine.rs`, `commands/ts.rs` 使用
//! - 使用 `gctf/program.rs` 定位二进制与环境

use crate::error::{CtfKitError, Result};
use crate::gctf::program::GctfProgram;

use std::fs;
use std::path::Path;
use std::process::Command;

/// 在 `cwd` 中同步运行 Gctf，返回其 stdout
pub fn run_gctf(program: &GctfProgram, args: &[String], cwd: &Path) -> Result<String> {
    let mut cmd = Command::new(program.path());
    cmd.args(args).current_dir(cwd);

    for (key, value) in program.environ() {
        cmd.env(key, value);
    }

    let output = cmd.output().map_err(|_| CtfKitError::CommandNotFound {
        command: program.path().display().to_string(),
    })?;

    if !output.status.success() {
        return Err(CtfKitError::CommandFailed {
            command: format!("{} {}", program.path().display(), args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// 把输入 micrograph 放进工作目录：unix 下用符号链接，否则复制
pub fn link_or_copy(src: &Path, dst: &Path) -> Result<()> {
    let src = src
        .canonicalize()
        .map_err(|e| CtfKitError::FileReadError {
            path: src.display().to_string(),
            source: e,
        })?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&src, dst).map_err(|e| CtfKitError::FileWriteError {
            path: dst.display().to_string(),
            source: e,
        })
    }

    #[cfg(not(unix))]
    {
        fs::copy(&src, dst)
            .map(|_| ())
            .map_err(|e| CtfKitError::FileWriteError {
                path: dst.display().to_string(),
                source: e,
            })
    }
}

/// 搬移 Gctf 产生的输出文件，跨设备时退化为复制加删除
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(CtfKitError::FileNotFound {
            path: from.display().to_string(),
        });
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| CtfKitError::FileWriteError {
        path: to.display().to_string(),
        source: e,
    })?;
    fs::remove_file(from).ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("mic_gctf.log");
        let dst = dir.path().join("mic_ctf.log");

        File::create(&src)
            .unwrap()
            .write_all(b"Final Values\n")
            .unwrap();

        move_file(&src, &dst).unwrap();
        assert!(!src.exists());
        assert!(dst.exists());
    }

    #[test]
    fn test_move_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.log");
        let dst = dir.path().join("out.log");
        assert!(move_file(&src, &dst).is_err());
    }

    #[test]
    fn test_link_or_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("mic.mrc");
        let dst = dir.path().join("work").join("mic.mrc");

        File::create(&src).unwrap().write_all(b"MRC").unwrap();
        fs::create_dir_all(dst.parent().unwrap()).unwrap();

        link_or_copy(&src, &dst).unwrap();
        assert!(dst.exists());
    }
}
