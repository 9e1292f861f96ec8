//! マークシート列アノテーション CLI ライブラリ
//!
//! コアのワークフローは `omr_common`、このクレートは
//! 端末UI・設定ファイル・検出サービス連携・出力を担当する。

pub mod annotate;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod raster;
