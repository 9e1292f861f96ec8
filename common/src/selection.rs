//! 矩形選択のステートマシン
//!
//! ```text
//! Idle --pointer_down--> Drawing --pointer_move--> Drawing
//! Drawing --pointer_up--> Idle   (Completed / TooSmall)
//! any --lock--> Locked           (全列確定後、以後の操作は無視)
//! ```
//!
//! 開始可否（画像の有無・列番号の範囲）は呼び出し側が判定して渡す。

use crate::geometry::{DisplayRect, Point};

/// これ未満の幅・高さ（表示ピクセル）の矩形は破棄する
pub const MIN_SELECTION_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    Idle,
    Drawing { anchor: Point, cursor: Point },
    Locked,
}

/// ポインタ操作の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    /// 状態が変わらなかった
    Ignored,
    /// 描画を開始した
    Started,
    /// 描画中の矩形を更新した（再描画が必要）
    Updated,
    /// 小さすぎて破棄した
    TooSmall(DisplayRect),
    /// 正規化済みの矩形が確定した
    Completed(DisplayRect),
}

#[derive(Debug, Clone)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, SelectionState::Drawing { .. })
    }

    pub fn is_locked(&self) -> bool {
        self.state == SelectionState::Locked
    }

    pub fn pointer_down(&mut self, at: Point, can_start: bool) -> PointerOutcome {
        match self.state {
            SelectionState::Idle if can_start => {
                self.state = SelectionState::Drawing { anchor: at, cursor: at };
                PointerOutcome::Started
            }
            _ => PointerOutcome::Ignored,
        }
    }

    pub fn pointer_move(&mut self, at: Point) -> PointerOutcome {
        match &mut self.state {
            SelectionState::Drawing { cursor, .. } => {
                *cursor = at;
                PointerOutcome::Updated
            }
            _ => PointerOutcome::Ignored,
        }
    }

    /// 最後のカーソル位置で矩形を確定する
    pub fn pointer_up(&mut self) -> PointerOutcome {
        let SelectionState::Drawing { anchor, cursor } = self.state else {
            return PointerOutcome::Ignored;
        };
        self.state = SelectionState::Idle;

        let rect = DisplayRect::spanning(anchor, cursor).normalized();
        if rect.width < MIN_SELECTION_SIZE || rect.height < MIN_SELECTION_SIZE {
            PointerOutcome::TooSmall(rect)
        } else {
            PointerOutcome::Completed(rect)
        }
    }

    /// 描画中の矩形（表示用に正規化済み）
    pub fn in_progress(&self) -> Option<DisplayRect> {
        match self.state {
            SelectionState::Drawing { anchor, cursor } => {
                Some(DisplayRect::spanning(anchor, cursor).normalized())
            }
            _ => None,
        }
    }

    pub fn lock(&mut self) {
        self.state = SelectionState::Locked;
    }

    /// 新しい画像の読み込み時に初期状態へ戻す
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
    }
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(controller: &mut SelectionController, from: (f64, f64), to: (f64, f64)) -> PointerOutcome {
        controller.pointer_down(Point::new(from.0, from.1), true);
        controller.pointer_move(Point::new(to.0, to.1));
        controller.pointer_up()
    }

    #[test]
    fn test_drag_completes_normalized_rect() {
        let mut controller = SelectionController::new();
        let outcome = drag(&mut controller, (120.0, 300.0), (20.0, 10.0));
        assert_eq!(outcome, PointerOutcome::Completed(DisplayRect::new(20.0, 10.0, 100.0, 290.0)));
        assert_eq!(controller.state(), SelectionState::Idle);
    }

    #[test]
    fn test_too_small_is_discarded() {
        let mut controller = SelectionController::new();
        let outcome = drag(&mut controller, (10.0, 10.0), (14.9, 200.0));
        assert!(matches!(outcome, PointerOutcome::TooSmall(_)));
        assert_eq!(controller.state(), SelectionState::Idle);
    }

    #[test]
    fn test_exact_minimum_is_accepted() {
        let mut controller = SelectionController::new();
        let outcome = drag(&mut controller, (0.0, 0.0), (5.0, 5.0));
        assert!(matches!(outcome, PointerOutcome::Completed(_)));
    }

    #[test]
    fn test_click_without_move_is_too_small() {
        let mut controller = SelectionController::new();
        controller.pointer_down(Point::new(3.0, 3.0), true);
        assert!(matches!(controller.pointer_up(), PointerOutcome::TooSmall(_)));
    }

    #[test]
    fn test_guarded_pointer_down() {
        let mut controller = SelectionController::new();
        assert_eq!(controller.pointer_down(Point::new(1.0, 1.0), false), PointerOutcome::Ignored);
        assert_eq!(controller.state(), SelectionState::Idle);
    }

    #[test]
    fn test_pointer_down_while_drawing_is_ignored() {
        let mut controller = SelectionController::new();
        controller.pointer_down(Point::new(1.0, 1.0), true);
        assert_eq!(controller.pointer_down(Point::new(50.0, 50.0), true), PointerOutcome::Ignored);
        controller.pointer_move(Point::new(40.0, 40.0));
        assert_eq!(controller.in_progress(), Some(DisplayRect::new(1.0, 1.0, 39.0, 39.0)));
    }

    #[test]
    fn test_move_and_up_without_down_are_ignored() {
        let mut controller = SelectionController::new();
        assert_eq!(controller.pointer_move(Point::new(1.0, 1.0)), PointerOutcome::Ignored);
        assert_eq!(controller.pointer_up(), PointerOutcome::Ignored);
        assert!(controller.in_progress().is_none());
    }

    #[test]
    fn test_locked_ignores_everything() {
        let mut controller = SelectionController::new();
        controller.lock();
        assert_eq!(controller.pointer_down(Point::new(1.0, 1.0), true), PointerOutcome::Ignored);
        assert_eq!(controller.pointer_move(Point::new(9.0, 9.0)), PointerOutcome::Ignored);
        assert_eq!(controller.pointer_up(), PointerOutcome::Ignored);
        assert!(controller.is_locked());

        controller.reset();
        assert_eq!(controller.pointer_down(Point::new(1.0, 1.0), true), PointerOutcome::Started);
    }
}
