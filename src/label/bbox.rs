//! Normalized YOLO bounding boxes and IoU.

use serde::Serialize;

/// One annotated box in normalized center format (cx, cy, w, h), plus its
/// class id.
///
/// Note: This type does NOT enforce that coordinates lie in [0, 1] or that
/// sizes are positive. Out-of-range boxes are kept as parsed; [`iou`]
/// degrades them to a smaller or zero intersection instead of failing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub class_id: i64,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    /// Creates a new box from a class id and normalized center-format geometry.
    #[inline]
    pub fn new(class_id: i64, cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            class_id,
            cx,
            cy,
            w,
            h,
        }
    }

    /// Returns the corners as `(xmin, ymin, xmax, ymax)`.
    #[inline]
    pub fn to_xyxy(&self) -> (f64, f64, f64, f64) {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        (
            self.cx - half_w,
            self.cy - half_h,
            self.cx + half_w,
            self.cy + half_h,
        )
    }

    /// Returns the area spanned by the corners.
    ///
    /// May be negative if the box is malformed (negative width or height).
    #[inline]
    pub fn area(&self) -> f64 {
        let (xmin, ymin, xmax, ymax) = self.to_xyxy();
        (xmax - xmin) * (ymax - ymin)
    }

    /// Returns true if all geometry values are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.cx.is_finite() && self.cy.is_finite() && self.w.is_finite() && self.h.is_finite()
    }
}

/// Intersection-over-union of two boxes, ignoring their class ids.
///
/// The intersection is clipped to non-negative width and height, so
/// disjoint or inverted boxes yield 0.0. A zero union (two degenerate
/// boxes) also yields 0.0.
///
/// Box areas come from the corners rather than from `w * h`; the two can
/// differ in the last bit. With corner areas a box against itself yields
/// exactly 1.0.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let (ax1, ay1, ax2, ay2) = a.to_xyxy();
    let (bx1, by1, bx2, by2) = b.to_xyxy();

    let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let intersection = inter_w * inter_h;

    let union = a.area() + b.area() - intersection;
    if union == 0.0 {
        return 0.0;
    }

    (intersection / union).clamp(0.0, 1.0)
}
