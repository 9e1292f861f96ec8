use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use omr_common::export::excel_core::answer_sheet_buffer;
use omr_common::{parse_analyze_response, AnswerKey, ColumnDetections, Error, ImageSize, SourceFile};

use crate::model::{AnalyzeJob, ExportFormat, SheetPixels};

const GENERIC_SERVER_ERROR: &str = "Server error processing column";

/// 画像ファイルを読み込む
///
/// 画像として認識できなければピクセルは `None`（拒否はセッション側）。
pub fn read_sheet(path: &Path) -> Result<(SourceFile, ImageSize, Option<SheetPixels>)> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let Ok(format) = image::guess_format(&bytes) else {
        return Ok((SourceFile::new(name, "application/octet-stream", bytes), ImageSize::new(0, 0), None));
    };
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .with_context(|| format!("decode {}", path.display()))?;
    let size = ImageSize::new(decoded.width(), decoded.height());
    let pixels = SheetPixels {
        size: [decoded.width() as usize, decoded.height() as usize],
        rgba: decoded.to_rgba8().into_raw(),
    };
    Ok((SourceFile::new(name, format.to_mime_type(), bytes), size, Some(pixels)))
}

/// CLIの `analyze` を実行して1列分を検出する（ワーカースレッドから呼ぶ）
pub fn run_analyze_cli(cli: &Path, job: &AnalyzeJob) -> omr_common::Result<ColumnDetections> {
    let output_path = response_path(job);
    let _ = fs::remove_file(&output_path);

    let rows = job.num_rows.to_string();
    let confidence = job.confidence_score.to_string();
    let result = Command::new(cli)
        .args([
            "analyze",
            job.image_path.to_string_lossy().as_ref(),
            "--rect",
            job.rect_arg().as_str(),
            "--rows",
            rows.as_str(),
            "--confidence",
            confidence.as_str(),
            "--output",
            output_path.to_string_lossy().as_ref(),
        ])
        .output();

    let out = result.map_err(|e| Error::BackendRequestFailed(format!("Could not start analyzer: {e}")))?;
    let body = fs::read_to_string(&output_path).ok();
    let _ = fs::remove_file(&output_path);

    interpret_analyze_output(out.status.success(), body.as_deref(), &String::from_utf8_lossy(&out.stderr))
}

/// CLIの終了状態と出力からレスポンスを解釈する
pub fn interpret_analyze_output(
    success: bool,
    body: Option<&str>,
    stderr: &str,
) -> omr_common::Result<ColumnDetections> {
    match (success, body) {
        (true, Some(body)) => parse_analyze_response(200, body),
        (true, None) => Err(Error::BackendResponseMalformed("analyzer produced no output".into())),
        // 本文があればサービスの `error` を優先する
        (false, Some(body)) if !body.trim().is_empty() => parse_analyze_response(500, body),
        (false, _) => {
            let message = stderr.lines().rev().find(|l| !l.trim().is_empty()).map(str::trim);
            Err(Error::BackendRequestFailed(message.unwrap_or(GENERIC_SERVER_ERROR).to_string()))
        }
    }
}

fn response_path(job: &AnalyzeJob) -> PathBuf {
    std::env::temp_dir().join(format!("omr-column-{}-{}.json", std::process::id(), job.ticket.id()))
}

pub fn save_answer_key(path: &Path, key: &AnswerKey, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Txt => {
            fs::write(path, key.to_tsv()).with_context(|| format!("write {}", path.display()))?;
        }
        ExportFormat::Excel => {
            let buffer = answer_sheet_buffer(&key.answers, &key.file_name)?;
            fs::write(path, buffer).with_context(|| format!("write {}", path.display()))?;
        }
    }
    Ok(())
}

pub fn default_export_name(key: &AnswerKey, format: ExportFormat) -> String {
    match format {
        ExportFormat::Txt => key.file_name.clone(),
        ExportFormat::Excel => Path::new(&key.file_name)
            .with_extension("xlsx")
            .to_string_lossy()
            .to_string(),
    }
}
