pub mod excel;
pub mod text;

use crate::cli::ExportFormat;
use crate::error::Result;
use omr_common::AnswerKey;
use std::path::{Path, PathBuf};

/// 出力先パスを決める
///
/// `output` がディレクトリ（または拡張子なし）ならその中に `file_name` を置く。
fn output_path_for(output: &Path, file_name: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(file_name)
    } else {
        output.to_path_buf()
    }
}

/// 解答キーを書き出し、書き出したパスを返す
pub fn export_answer_key(key: &AnswerKey, format: &ExportFormat, output: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let text_path = output_path_for(output, &key.file_name);

    if matches!(format, ExportFormat::Txt | ExportFormat::Both) {
        let path = text_path.clone();
        println!("- テキストを出力中...");
        text::write_answer_key(key, &path)?;
        println!("✔ テキスト出力: {}", path.display());
        written.push(path);
    }

    if matches!(format, ExportFormat::Excel | ExportFormat::Both) {
        let path = text_path.with_extension("xlsx");
        println!("- Excelを生成中...");
        excel::write_answer_sheet(key, &path)?;
        println!("✔ Excel出力: {}", path.display());
        written.push(path);
    }

    Ok(written)
}
