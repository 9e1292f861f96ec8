//! Excel生成（CLI版）
//!
//! シートの中身は omr_common の excel_core で作る。

use crate::error::Result;
use chrono::Local;
use omr_common::export::excel_core::answer_sheet_buffer;
use omr_common::AnswerKey;
use std::path::Path;

pub fn write_answer_sheet(key: &AnswerKey, path: &Path) -> Result<()> {
    let title = format!(
        "{} ({})",
        key.file_name,
        Local::now().format("%Y-%m-%d %H:%M")
    );
    let buffer = answer_sheet_buffer(&key.answers, &title)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, buffer)?;
    Ok(())
}
