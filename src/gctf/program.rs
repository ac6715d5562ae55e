//! # Gctf 二进制定位与运行环境
//!
//! 通过环境变量定位预编译的 Gctf 可执行文件并推断其版本：
//! - `GCTF_HOME`: 安装根目录，二进制位于 `$GCTF_HOME/bin/`
//! - `GCTF`: 二进制文件名，默认 `Gctf-v1.06_sm_20_cu8.0_x86_64`
//! - `GCTF_CUDA_LIB` / `CUDA_LIB`: 追加到子进程的 `LD_LIBRARY_PATH`
//!
//! ## 依赖关系
//! - 被 `commands/` 各模块使用
//! - 被 `gctf/runner.rs` 用于构造子进程环境

use crate::error::{CtfKitError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// 环境变量名
pub const GCTF_HOME: &str = "GCTF_HOME";
pub const GCTF: &str = "GCTF";
pub const GCTF_CUDA_LIB: &str = "GCTF_CUDA_LIB";
pub const CUDA_LIB: &str = "CUDA_LIB";

/// 默认二进制文件名
pub const DEFAULT_BINARY: &str = "Gctf-v1.06_sm_20_cu8.0_x86_64";

/// 已验证可用的 Gctf 版本
pub const SUPPORTED_VERSIONS: &[&str] = &["0.50", "1.06", "1.18"];

/// 已定位的 Gctf 程序
#[derive(Debug, Clone)]
pub struct GctfProgram {
    path: PathBuf,
    version: Option<String>,
}

impl GctfProgram {
    /// 定位 Gctf 可执行文件。
    ///
    /// 查找顺序：显式路径 > `$GCTF_HOME/bin/$GCTF` > PATH 中的 `Gctf`。
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(CtfKitError::BinaryNotFound {
                    reason: format!("'{}' does not exist", path.display()),
                });
            }
            return Ok(Self::from_path(path.to_path_buf()));
        }

        if let Ok(home) = env::var(GCTF_HOME) {
            let name = env::var(GCTF).unwrap_or_else(|_| DEFAULT_BINARY.to_string());
            let candidate = Path::new(&home).join("bin").join(&name);
            if candidate.is_file() {
                return Ok(Self::from_path(candidate));
            }
            return Err(CtfKitError::BinaryNotFound {
                reason: format!(
                    "'{}' does not exist (check {} and {})",
                    candidate.display(),
                    GCTF_HOME,
                    GCTF
                ),
            });
        }

        if let Some(path) = find_in_path("Gctf") {
            return Ok(Self::from_path(path));
        }

        Err(CtfKitError::BinaryNotFound {
            reason: format!("{} is not set and no 'Gctf' found in PATH", GCTF_HOME),
        })
    }

    fn from_path(path: PathBuf) -> Self {
        let version = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(detect_version);
        GctfProgram { path, version }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从二进制文件名推断的版本号，无法推断时为 None
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// 局部精修仅旧版本支持：1.18 移除了该功能
    pub fn supports_local_refine(&self) -> bool {
        self.version() != Some("1.18")
    }

    /// v1.18 的 EPA 日志多一列背景值
    pub fn has_new_epa_format(&self) -> bool {
        self.version() == Some("1.18")
    }

    /// 子进程需要的环境变量：CUDA 库目录插入 `LD_LIBRARY_PATH` 头部
    pub fn environ(&self) -> Vec<(String, String)> {
        let cuda_lib = env::var(GCTF_CUDA_LIB).or_else(|_| env::var(CUDA_LIB));

        match cuda_lib {
            Ok(lib) if !lib.is_empty() => {
                let ld_path = match env::var("LD_LIBRARY_PATH") {
                    Ok(existing) if !existing.is_empty() => format!("{}:{}", lib, existing),
                    _ => lib,
                };
                vec![("LD_LIBRARY_PATH".to_string(), ld_path)]
            }
            _ => vec![],
        }
    }
}

/// 从二进制文件名推断版本 (如 "Gctf-v1.06_sm_20_cu8.0_x86_64" -> "1.06")
fn detect_version(file_name: &str) -> Option<String> {
    SUPPORTED_VERSIONS
        .iter()
        .find(|v| file_name.contains(&format!("v{}", v)))
        .map(|v| v.to_string())
}

/// 在 PATH 中查找可执行文件
fn find_in_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_detect_version() {
        assert_eq!(
            detect_version("Gctf-v1.06_sm_20_cu8.0_x86_64"),
            Some("1.06".to_string())
        );
        assert_eq!(
            detect_version("Gctf_v1.18_sm30-75_cu10.1"),
            Some("1.18".to_string())
        );
        assert_eq!(detect_version("Gctf_v0.50"), Some("0.50".to_string()));
        assert_eq!(detect_version("Gctf"), None);
    }

    #[test]
    fn test_locate_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("Gctf-v1.06_sm_20_cu8.0_x86_64");
        File::create(&bin).unwrap();

        let program = GctfProgram::locate(Some(&bin)).unwrap();
        assert_eq!(program.path(), bin.as_path());
        assert_eq!(program.version(), Some("1.06"));
        assert!(program.supports_local_refine());
        assert!(!program.has_new_epa_format());
    }

    #[test]
    fn test_locate_explicit_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("Gctf");
        assert!(GctfProgram::locate(Some(&missing)).is_err());
    }

    #[test]
    fn test_v118_restrictions() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("Gctf_v1.18_sm30-75_cu10.1");
        File::create(&bin).unwrap();

        let program = GctfProgram::locate(Some(&bin)).unwrap();
        assert!(!program.supports_local_refine());
        assert!(program.has_new_epa_format());
    }
}
