//! 画像ファイルの読み込み
//!
//! 形式は拡張子ではなく中身から判定する。

use crate::error::{OmrError, Result};
use image::DynamicImage;
use omr_common::{ImageSize, SourceFile};
use std::path::Path;

/// 読み込んだ画像（送信用のバイト列と描画用のビットマップ）
pub struct LoadedFile {
    pub source: SourceFile,
    pub size: ImageSize,
    pub bitmap: Option<DynamicImage>,
}

/// ファイルを読み込み、MIMEタイプと寸法を取得する
///
/// 画像として認識できないファイルは `application/octet-stream` として返し、
/// 拒否はセッション側（`load_image`）に任せる。
pub fn load_file(path: &Path) -> Result<LoadedFile> {
    if !path.is_file() {
        return Err(OmrError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let Ok(format) = image::guess_format(&bytes) else {
        return Ok(LoadedFile {
            source: SourceFile::new(name, "application/octet-stream", bytes),
            size: ImageSize::new(0, 0),
            bitmap: None,
        });
    };

    let bitmap = image::load_from_memory_with_format(&bytes, format)?;
    let size = ImageSize::new(bitmap.width(), bitmap.height());
    Ok(LoadedFile {
        source: SourceFile::new(name, format.to_mime_type(), bytes),
        size,
        bitmap: Some(bitmap),
    })
}
