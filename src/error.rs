use thiserror::Error;

#[derive(Error, Debug)]
pub enum OmrError {
    /// セッション・検出結果のエラー（そのまま表示）
    #[error(transparent)]
    Common(#[from] omr_common::Error),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("検出サービス通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl OmrError {
    /// 対話セッションを続けられるエラーか
    ///
    /// 検出・出力・プレビューの失敗は表示して続行する。
    /// 端末入力が壊れた場合や起動時の設定・画像エラーは終了する。
    pub fn is_recoverable(&self) -> bool {
        match self {
            OmrError::Common(_) | OmrError::Http(_) | OmrError::Io(_) | OmrError::ImageLoad(_) => true,
            OmrError::Config(_) | OmrError::FileNotFound(_) | OmrError::Prompt(_) | OmrError::JsonParse(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, OmrError>;
