//! セッション設定（列数・行数・信頼度しきい値）

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUM_COLUMNS: usize = 5;
pub const DEFAULT_NUM_ROWS_PER_COLUMN: usize = 20;
pub const DEFAULT_MIN_CONFIDENCE_SCORE: f64 = 0.20;

/// 1セッション分の設定
///
/// 最初の列を描いた時点でセッション内では変更不可になる
/// （[`crate::Session::set_config`] を参照）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub num_columns: usize,
    pub num_rows_per_column: usize,
    pub min_confidence_score: f64,
}

impl Configuration {
    /// 検証付きで生成
    pub fn new(num_columns: usize, num_rows_per_column: usize, min_confidence_score: f64) -> Result<Self> {
        let config = Self {
            num_columns,
            num_rows_per_column,
            min_confidence_score,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_columns == 0 {
            return Err(Error::InvalidConfig("number of columns must be at least 1".into()));
        }
        if self.num_rows_per_column == 0 {
            return Err(Error::InvalidConfig("number of rows per column must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence_score) {
            return Err(Error::InvalidConfig(format!(
                "confidence score must be within 0..=1, got {}",
                self.min_confidence_score
            )));
        }
        Ok(())
    }

    /// 出力される設問数
    pub fn total_questions(&self) -> usize {
        self.num_columns * self.num_rows_per_column
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            num_columns: DEFAULT_NUM_COLUMNS,
            num_rows_per_column: DEFAULT_NUM_ROWS_PER_COLUMN,
            min_confidence_score: DEFAULT_MIN_CONFIDENCE_SCORE,
        }
    }
}
