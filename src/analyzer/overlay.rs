use super::motion::MotionRect;
use crate::frame::Frame;
use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const RECT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const RECT_THICKNESS: u32 = 2;

/// Copy of `frame` with the motion box drawn on it
pub fn annotate(frame: &Frame, rect: &MotionRect) -> Frame {
    let mut annotated = frame.clone();
    if rect.is_empty() {
        return annotated;
    }

    for inset in 0..RECT_THICKNESS {
        if rect.width <= inset * 2 || rect.height <= inset * 2 {
            break;
        }
        let outline = Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32)
            .of_size(rect.width - inset * 2, rect.height - inset * 2);
        draw_hollow_rect_mut(&mut annotated.image, outline, RECT_COLOR);
    }

    annotated
}
