//! 座標変換
//!
//! - 表示 ↔ 元画像: 軸ごとの倍率で割る／掛ける
//! - 表示 ↔ 正規化: 表示サイズで割る／掛ける
//! - クロップ内 → 表示: 列矩形とクロップサイズの比でバブルを配置
//!
//! すべて純粋関数で、倍率は明示的に受け取る。

use crate::detection::BubbleBox;
use crate::geometry::{DisplayRect, ImageRect, ImageSize, NormalizedRect, Scale};
use crate::scaler::DisplayImage;

/// 表示座標 → 元画像座標
pub fn display_to_image(rect: DisplayRect, scale: Scale) -> ImageRect {
    ImageRect::new(
        rect.x / scale.x,
        rect.y / scale.y,
        rect.width / scale.x,
        rect.height / scale.y,
    )
}

/// 元画像座標 → 表示座標
pub fn image_to_display(rect: ImageRect, scale: Scale) -> DisplayRect {
    DisplayRect::new(
        rect.x * scale.x,
        rect.y * scale.y,
        rect.width * scale.x,
        rect.height * scale.y,
    )
}

/// 表示座標 → 正規化座標
pub fn display_to_normalized(rect: DisplayRect, display: &DisplayImage) -> NormalizedRect {
    NormalizedRect::new(
        rect.x / display.display_width,
        rect.y / display.display_height,
        rect.width / display.display_width,
        rect.height / display.display_height,
    )
}

/// 正規化座標 → 表示座標
pub fn normalized_to_display(rect: NormalizedRect, display: &DisplayImage) -> DisplayRect {
    DisplayRect::new(
        rect.x * display.display_width,
        rect.y * display.display_height,
        rect.width * display.display_width,
        rect.height * display.display_height,
    )
}

/// 正規化座標 → 元画像座標
pub fn normalized_to_image(rect: NormalizedRect, original: ImageSize) -> ImageRect {
    let w = f64::from(original.width);
    let h = f64::from(original.height);
    ImageRect::new(rect.x * w, rect.y * h, rect.width * w, rect.height * h)
}

/// クロップ内のバブル矩形を表示座標に配置
///
/// バックエンドはクロップした部分画像しか見ていないため、
/// 列矩形の表示サイズとクロップのピクセルサイズの比で拡縮する。
/// クロップサイズが0のバブルは配置できない。
pub fn bubble_to_display(column: DisplayRect, bubble: &BubbleBox) -> Option<DisplayRect> {
    if bubble.crop_origin_w <= 0.0 || bubble.crop_origin_h <= 0.0 {
        return None;
    }
    let scale_x = column.width / bubble.crop_origin_w;
    let scale_y = column.height / bubble.crop_origin_h;
    let local = bubble.rect();

    Some(DisplayRect::new(
        column.x + local.x * scale_x,
        column.y + local.y * scale_y,
        local.width * scale_x,
        local.height * scale_y,
    ))
}
