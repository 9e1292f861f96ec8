//! エラー型定義

use thiserror::Error;

/// 共通エラー型
///
/// どのエラーもセッションを致命的に止めることはない。
/// 呼び出し側は一時状態（選択中の矩形・保留中の結果）を捨てて
/// ステータスに表示すればよい。
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Rectangle too small ({width:.1}x{height:.1} px)")]
    SelectionTooSmall { width: f64, height: f64 },

    #[error("No image file is currently loaded for processing")]
    NoFileLoaded,

    #[error("{0}")]
    BackendRequestFailed(String),

    #[error("Malformed detection response: {0}")]
    BackendResponseMalformed(String),

    #[error("Configuration is locked for this session")]
    ConfigLocked,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Viewport too small: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("All columns are already confirmed")]
    AllColumnsConfirmed,

    #[error("Export requires all columns to be confirmed ({confirmed}/{total})")]
    Incomplete { confirmed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    #[error("Excel error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    /// バックエンド起因のエラーか（どちらも同じ回復経路を取る）
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            Error::BackendRequestFailed(_) | Error::BackendResponseMalformed(_)
        )
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_too_small() {
        let error = Error::SelectionTooSmall { width: 3.0, height: 120.0 };
        assert_eq!(format!("{}", error), "Rectangle too small (3.0x120.0 px)");
    }

    #[test]
    fn test_error_display_backend_passthrough() {
        let error = Error::BackendRequestFailed("Could not decode image".to_string());
        assert_eq!(format!("{}", error), "Could not decode image");
    }

    #[test]
    fn test_error_display_incomplete() {
        let error = Error::Incomplete { confirmed: 1, total: 2 };
        let display = format!("{}", error);
        assert!(display.contains("1/2"));
    }

    #[test]
    fn test_error_is_backend() {
        assert!(Error::BackendRequestFailed("x".into()).is_backend());
        assert!(Error::BackendResponseMalformed("x".into()).is_backend());
        assert!(!Error::NoFileLoaded.is_backend());
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
