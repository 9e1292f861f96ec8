//! ステータス表示とボタン状態

use std::fmt;

pub const CONFIRM_NEXT_LABEL: &str = "Confirm Column & Draw Next";
pub const CONFIRM_LAST_LABEL: &str = "Confirm Last Column";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// オペレーター向けのステータスメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::info("1. Load an answer sheet image to begin.")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// 操作の有効・無効
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub confirm_enabled: bool,
    pub confirm_label: &'static str,
    pub export_enabled: bool,
    pub config_enabled: bool,
    /// キャンバス上で描画できるか（カーソル表示用）
    pub crosshair: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            confirm_enabled: false,
            confirm_label: CONFIRM_NEXT_LABEL,
            export_enabled: false,
            config_enabled: true,
            crosshair: false,
        }
    }
}
