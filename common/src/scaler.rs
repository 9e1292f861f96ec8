//! 表示サイズ計算
//!
//! 画像をビューポートに収まるよう縦横比を保って縮小する。
//! 拡大はしない（注釈対象がぼやけるため）。

use crate::error::{Error, Result};
use crate::geometry::{ImageSize, Scale};

/// ビューポート高さのうちキャンバスに使う割合
pub const VIEWPORT_HEIGHT_FRACTION: f64 = 0.9;

/// 表示領域の寸法
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// コンテナの幅（パディング込み）
    pub container_width: f64,
    /// ウィンドウの高さ
    pub viewport_height: f64,
    /// 左右パディングの合計
    pub padding_x: f64,
    /// 上下パディングの合計
    pub padding_y: f64,
}

impl Viewport {
    pub const fn new(container_width: f64, viewport_height: f64) -> Self {
        Self {
            container_width,
            viewport_height,
            padding_x: 0.0,
            padding_y: 0.0,
        }
    }

    pub const fn with_padding(mut self, padding_x: f64, padding_y: f64) -> Self {
        self.padding_x = padding_x;
        self.padding_y = padding_y;
        self
    }

    pub fn max_width(&self) -> f64 {
        self.container_width - self.padding_x
    }

    pub fn max_height(&self) -> f64 {
        self.viewport_height * VIEWPORT_HEIGHT_FRACTION - self.padding_y
    }
}

/// 表示中の画像の幾何情報
///
/// ビットマップ自体は各UI側（CLIの `image::DynamicImage`、
/// デスクトップのテクスチャ）が保持する。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayImage {
    pub original: ImageSize,
    pub display_width: f64,
    pub display_height: f64,
}

impl DisplayImage {
    /// 表示 / 元画像 の倍率
    pub fn scale(&self) -> Scale {
        Scale::new(self.scale_x(), self.scale_y())
    }

    pub fn scale_x(&self) -> f64 {
        self.display_width / f64::from(self.original.width)
    }

    pub fn scale_y(&self) -> f64 {
        self.display_height / f64::from(self.original.height)
    }
}

/// ビューポートに収まる表示サイズを計算
///
/// 高さを先に合わせ、その後で幅を合わせる。
/// キャンバスは整数ピクセルなので結果は切り捨てる。
pub fn fit_to_viewport(natural: ImageSize, viewport: &Viewport) -> Result<DisplayImage> {
    if natural.is_empty() {
        return Err(Error::InvalidImage(format!(
            "image has no pixels ({}x{})",
            natural.width, natural.height
        )));
    }

    let max_width = viewport.max_width();
    let max_height = viewport.max_height();
    if max_width < 1.0 || max_height < 1.0 {
        return Err(Error::InvalidViewport {
            width: max_width,
            height: max_height,
        });
    }

    let aspect = f64::from(natural.width) / f64::from(natural.height);
    let mut width = f64::from(natural.width);
    let mut height = f64::from(natural.height);

    if height > max_height {
        height = max_height;
        width = height * aspect;
    }
    if width > max_width {
        width = max_width;
        height = width / aspect;
    }

    Ok(DisplayImage {
        original: natural,
        display_width: width.floor().max(1.0),
        display_height: height.floor().max(1.0),
    })
}
