//! 座標系ごとの矩形型
//!
//! 4つの座標系をマーカー型で区別する:
//! - `DisplaySpace`: 表示キャンバス上のピクセル
//! - `ImageSpace`: 元画像のピクセル
//! - `CropSpace`: 検出サービスに送ったクロップ画像内のピクセル
//! - `NormalizedSpace`: 元画像に対する `[0,1]` の相対座標
//!
//! 異なる座標系の矩形を混ぜるとコンパイルエラーになる。

use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedSpace;

/// 表示キャンバス上の点（ポインタ位置）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 軸並行の矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<S> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    space: PhantomData<S>,
}

pub type DisplayRect = Rect<DisplaySpace>;
pub type ImageRect = Rect<ImageSpace>;
pub type CropRect = Rect<CropSpace>;
pub type NormalizedRect = Rect<NormalizedSpace>;

impl<S> Rect<S> {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space: PhantomData,
        }
    }

    /// アンカーと現在位置から矩形を作る（幅・高さは負になりうる）
    pub fn spanning(anchor: Point, cursor: Point) -> Self {
        Self::new(anchor.x, anchor.y, cursor.x - anchor.x, cursor.y - anchor.y)
    }

    /// 負の幅・高さを反転し、x/yが左上になるようにする
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Self::new(x, y, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// 各成分が `eps` 以内で一致するか
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.width - other.width).abs() <= eps
            && (self.height - other.height).abs() <= eps
    }
}

/// 元画像のピクセルサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 軸ごとの倍率（表示 / 元画像）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_flips_negative_extent() {
        let rect = DisplayRect::new(50.0, 80.0, -20.0, -30.0).normalized();
        assert_eq!(rect, DisplayRect::new(30.0, 50.0, 20.0, 30.0));
    }

    #[test]
    fn test_normalized_keeps_positive_extent() {
        let rect = DisplayRect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn test_spanning_from_points() {
        let rect = DisplayRect::spanning(Point::new(10.0, 10.0), Point::new(4.0, 30.0));
        assert_eq!(rect.width, -6.0);
        assert_eq!(rect.height, 20.0);
        let rect = rect.normalized();
        assert_eq!(rect.x, 4.0);
        assert_eq!(rect.right(), 10.0);
        assert_eq!(rect.bottom(), 30.0);
    }

    #[test]
    fn test_image_size_empty() {
        assert!(ImageSize::new(0, 10).is_empty());
        assert!(!ImageSize::new(1, 1).is_empty());
    }
}
