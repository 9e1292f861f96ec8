//! 解答キーの書き出し（CLI・デスクトップ共通）

#[cfg(feature = "excel")]
pub mod excel_core;
