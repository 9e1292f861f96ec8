use crate::error::{OmrError, Result};
use omr_common::{Configuration, Viewport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 検出サービスURLを上書きする環境変数
pub const BACKEND_URL_ENV: &str = "OMR_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub timeout_seconds: u64,
    pub default_columns: usize,
    pub default_rows: usize,
    pub default_confidence: f64,
    /// 端末にはウィンドウが無いので、表示サイズ計算に使う仮想ビューポート
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let session = Configuration::default();
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            timeout_seconds: 60,
            default_columns: session.num_columns,
            default_rows: session.num_rows_per_column,
            default_confidence: session.min_confidence_score,
            viewport_width: 1280.0,
            viewport_height: 900.0,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// ファイルが無ければ既定値
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| OmrError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("omr-annotator").join("config.json"))
    }

    /// 検出サービスのURL（環境変数を優先）
    pub fn backend_url(&self) -> String {
        match std::env::var(BACKEND_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => self.backend_url.clone(),
        }
    }

    pub fn set_backend_url(&mut self, url: String) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(OmrError::Config(format!("URLは http:// か https:// で始めてください: {}", url)));
        }
        self.backend_url = url.trim_end_matches('/').to_string();
        Ok(())
    }

    /// セッション設定の既定値（コマンドライン引数で上書き）
    pub fn session_config(
        &self,
        columns: Option<usize>,
        rows: Option<usize>,
        confidence: Option<f64>,
    ) -> Result<Configuration> {
        let config = Configuration::new(
            columns.unwrap_or(self.default_columns),
            rows.unwrap_or(self.default_rows),
            confidence.unwrap_or(self.default_confidence),
        )?;
        Ok(config)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }
}
