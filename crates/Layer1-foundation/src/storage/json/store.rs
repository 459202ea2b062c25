//! JSON 파일 저장소
//!
//! 쓰기는 임시 파일에 기록한 뒤 rename 하므로, 중간에 실패해도
//! 기존 설정 파일이 반쯤 쓰인 상태로 남지 않습니다.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// 설정 디렉토리 이름
const APP_DIR: &str = "cadence";

/// 기존 파일 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 있으면 덮어쓰기
    Replace,
    /// 있으면 실패
    CreateNew,
}

/// 디렉토리 하나에 묶인 JSON 파일 저장소
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// <config_dir>/cadence/
    pub fn global() -> Result<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join(APP_DIR)))
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))
    }

    /// <root>/.cadence/
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(format!(".{}", APP_DIR)))
    }

    pub fn current_project() -> Result<Self> {
        std::env::current_dir()
            .map(Self::project)
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))
    }

    pub fn base_dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// 파일이 없으면 `None`, 있는데 깨졌으면 에러
    pub fn read<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// 기록한 파일 경로를 돌려줌
    pub fn write<T: Serialize>(&self, filename: &str, data: &T, mode: WriteMode) -> Result<PathBuf> {
        let path = self.file_path(filename);
        if mode == WriteMode::CreateNew && path.exists() {
            return Err(Error::Config(format!("{} already exists", path.display())));
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Config(format!("Failed to serialize {}: {}", filename, e)))?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Config(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let staging = self.file_path(&format!(".{}.tmp", filename));
        std::fs::write(&staging, content)
            .and_then(|_| std::fs::rename(&staging, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&staging);
                Error::Config(format!("Failed to write {}: {}", path.display(), e))
            })?;

        Ok(path)
    }
}
