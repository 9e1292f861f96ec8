//! テキスト出力（`"<番号>\t<ラベル>\n"`）

use crate::error::Result;
use omr_common::AnswerKey;
use std::path::Path;

pub fn write_answer_key(key: &AnswerKey, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, key.to_tsv())?;
    Ok(())
}
