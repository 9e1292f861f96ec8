//! シーンのラスタライズ（プレビューPNG用）

use crate::error::Result;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use omr_common::{DisplayRect, DrawOp, Scene};
use std::path::Path;

/// シーンを画像に描く
///
/// 元画像を表示サイズに縮小し、その上に枠線を重ねる。
pub fn rasterize(scene: &Scene, base: &DynamicImage) -> RgbaImage {
    let width = scene.width.max(1.0) as u32;
    let height = scene.height.max(1.0) as u32;
    let mut canvas = RgbaImage::new(width, height);

    for op in &scene.ops {
        match *op {
            DrawOp::Clear => {
                for pixel in canvas.pixels_mut() {
                    *pixel = Rgba([0, 0, 0, 0]);
                }
            }
            DrawOp::Image { width, height } => {
                let resized = base.resize_exact(width as u32, height as u32, FilterType::Triangle);
                image::imageops::overlay(&mut canvas, &resized.to_rgba8(), 0, 0);
            }
            DrawOp::Stroke { rect, style } => {
                stroke_rect(&mut canvas, rect, style.line_width(), Rgba(style.rgba()));
            }
        }
    }
    canvas
}

/// シーンをPNGとして保存
pub fn save_preview(scene: &Scene, base: &DynamicImage, path: &Path) -> Result<()> {
    rasterize(scene, base).save(path)?;
    Ok(())
}

/// 矩形の枠線を描く（線は矩形の内側に太らせる）
///
/// 検出結果の枠は画像外まで伸びることがあるので、描く前に
/// キャンバス（線幅分の余白込み）に切り詰める。
fn stroke_rect(canvas: &mut RgbaImage, rect: DisplayRect, line_width: u32, color: Rgba<u8>) {
    let (cw, ch) = canvas.dimensions();
    let lw = line_width.max(1);
    let margin = f64::from(lw);
    let rect = rect.normalized();

    let left = rect.x.round().max(-margin);
    let top = rect.y.round().max(-margin);
    let right = rect.right().round().min(f64::from(cw) + margin);
    let bottom = rect.bottom().round().min(f64::from(ch) + margin);
    if !(right > left && bottom > top) {
        return;
    }

    let (x, y) = (left as i32, top as i32);
    let (w, h) = ((right - left) as u32, (bottom - top) as u32);
    for i in 0..lw {
        let inner_w = w.saturating_sub(2 * i);
        let inner_h = h.saturating_sub(2 * i);
        if inner_w == 0 || inner_h == 0 {
            break;
        }
        let inset = i as i32;
        draw_hollow_rect_mut(canvas, Rect::at(x + inset, y + inset).of_size(inner_w, inner_h), color);
    }
}
