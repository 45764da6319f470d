//! Coordinate conversion between widget space and image pixel space.
//!
//! The analyzer draws the image into a widget rectangle; pointer positions
//! are mapped back into image pixels before they reach the region selector.

use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

/// Converts a widget position to image pixel coordinates.
///
/// Positions outside the image rectangle map to values outside
/// `[0, width] x [0, height]`; the selector clamps them on release.
pub fn widget_to_image(pos: Pos2, image_rect: Rect, image_size: (u32, u32)) -> (f32, f32) {
    let scale_x = image_size.0 as f32 / image_rect.width().max(f32::EPSILON);
    let scale_y = image_size.1 as f32 / image_rect.height().max(f32::EPSILON);
    (
        (pos.x - image_rect.min.x) * scale_x,
        (pos.y - image_rect.min.y) * scale_y,
    )
}

/// Converts image pixel coordinates to a widget position.
pub fn image_to_widget(point: (f32, f32), image_rect: Rect, image_size: (u32, u32)) -> Pos2 {
    let scale_x = image_rect.width() / (image_size.0.max(1) as f32);
    let scale_y = image_rect.height() / (image_size.1.max(1) as f32);
    pos2(
        image_rect.min.x + point.0 * scale_x,
        image_rect.min.y + point.1 * scale_y,
    )
}

/// Rectangle in widget space covering the image-space corners `a` and `b`.
pub fn image_rect_to_widget(
    a: (f32, f32),
    b: (f32, f32),
    image_rect: Rect,
    image_size: (u32, u32),
) -> Rect {
    Rect::from_two_pos(
        image_to_widget(a, image_rect, image_size),
        image_to_widget(b, image_rect, image_size),
    )
}

/// Largest size with the image's aspect ratio that fits in `available`.
pub fn fit_size(image_size: (u32, u32), available: Vec2) -> Vec2 {
    let (w, h) = (image_size.0.max(1) as f32, image_size.1.max(1) as f32);
    let scale = (available.x / w).min(available.y / h).max(0.0);
    vec2(w * scale, h * scale)
}
