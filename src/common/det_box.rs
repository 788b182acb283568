/// Axis-aligned bounding box in source-image pixel coordinates.
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DetBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub w: f32,
    pub h: f32,
}

impl DetBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            w: x2 - x1,
            h: y2 - y1,
        }
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f32 {
        self.w
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f32 {
        self.h
    }

    /// Computes the area of the bounding box.
    pub fn area(&self) -> f32 {
        self.h * self.w
    }

    /// Computes the intersection area between this bounding box and another.
    pub fn intersect(&self, other: &DetBox) -> f32 {
        let left = self.x1.max(other.x1);
        let right = self.x2.min(other.x2);
        let top = self.y1.max(other.y1);
        let bottom = self.y2.min(other.y2);
        (right - left).max(0.) * (bottom - top).max(0.)
    }

    /// Computes the union area between this bounding box and another.
    pub fn union(&self, other: &DetBox) -> f32 {
        self.area() + other.area() - self.intersect(other)
    }

    pub fn iou(&self, other: &DetBox) -> f32 {
        let union = self.union(other);
        if union <= 0. {
            return 0.;
        }
        self.intersect(other) / union
    }

    /// Clips the box so it lies inside a `width` x `height` image.
    pub fn clamp_to(mut self, width: f32, height: f32) -> Self {
        self.x1 = self.x1.clamp(0., width);
        self.y1 = self.y1.clamp(0., height);
        self.x2 = self.x2.clamp(0., width);
        self.y2 = self.y2.clamp(0., height);
        self.w = self.x2 - self.x1;
        self.h = self.y2 - self.y1;
        self
    }

    pub fn as_xy_wh_i32(&self) -> (i32, i32, i32, i32) {
        (self.x1.round() as i32,
         self.y1.round() as i32,
         self.w.round() as i32,
         self.h.round() as i32)
    }

    /// Sets the bounding box's coordinates and dimensions using `(cx, cy, w, h)`.
    ///
    /// # Arguments
    ///
    /// * `cx` - The x-coordinate of the horizontal center.
    /// * `cy` - The y-coordinate of the vertical center.
    /// * `w` - The width of the bounding box.
    /// * `h` - The height of the bounding box.
    pub fn with_cxcy_wh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - (w / 2.0);
        self.y1 = cy - (h / 2.0);
        self.w = w;
        self.h = h;

        self.x2 = cx + (w / 2.0);
        self.y2 = cy + (h / 2.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = DetBox::new(10., 10., 50., 50.);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = DetBox::new(0., 0., 10., 10.);
        let b = DetBox::new(20., 20., 30., 30.);
        assert_eq!(a.intersect(&b), 0.);
        assert_eq!(a.iou(&b), 0.);
    }

    #[test]
    fn cxcy_wh_matches_corners() {
        let b = DetBox::default().with_cxcy_wh(50., 40., 20., 10.);
        assert_eq!(b, DetBox::new(40., 35., 60., 45.));
    }

    #[test]
    fn clamp_keeps_box_inside_image() {
        let b = DetBox::new(-5., -5., 120., 90.).clamp_to(100., 80.);
        assert_eq!(b, DetBox::new(0., 0., 100., 80.));
    }
}
