pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "routeflow";
const PROJECT_DIR: &str = ".routeflow";
const PROFILE_FILE: &str = "profile.yaml";
const MANIFEST_ENV: &str = "ROUTEFLOW_MANIFEST";

/// RouteFlowの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(APP_DIR);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトのマニフェスト (routeflow.yaml) を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 ROUTEFLOW_MANIFEST (直接パス指定)
/// 2. カレントディレクトリ: routeflow.local.yaml, .routeflow.local.yaml, routeflow.yaml, .routeflow.yaml
/// 3. ./.routeflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/routeflow/routeflow.yaml (グローバル設定)
pub fn find_manifest_file() -> Result<PathBuf> {
    if let Ok(manifest_path) = std::env::var(MANIFEST_ENV) {
        let path = PathBuf::from(manifest_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing file: {}", MANIFEST_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    let candidates = [
        "routeflow.local.yaml",
        ".routeflow.local.yaml",
        "routeflow.yaml",
        ".routeflow.yaml",
    ];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(PROJECT_DIR);
    if project_dir.is_dir() {
        for filename in &candidates {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_manifest = config_dir.join(APP_DIR).join("routeflow.yaml");
        if global_manifest.exists() {
            return Ok(global_manifest);
        }
    }

    Err(ConfigError::ManifestNotFound)
}

/// 接続先のデフォルト値 (~/.config/routeflow/profile.yaml)
///
/// ```yaml
/// region: eu-de
/// private_endpoint: true
/// timeout_secs: 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_endpoint: Option<bool>,
    /// サービスURLの上書き
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Profile {
    /// 設定ディレクトリのプロファイルを読み込む。ファイルがなければデフォルト
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_dir()?.join(PROFILE_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        tracing::debug!("Loading profile: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::InvalidProfile {
            path: path.display().to_string(),
            source,
        })
    }
}
