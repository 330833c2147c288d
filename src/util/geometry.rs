//! Vector and pixel-rectangle primitives

use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// World-space position or velocity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Snap both components to the nearest whole pixel
    pub fn rounded(self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned box in whole pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn bottom_center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + self.width as f32 / 2.0, self.bottom() as f32)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        other.left() < self.right()
            && self.left() < other.right()
            && other.top() < self.bottom()
            && self.top() < other.bottom()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() as f32
            && p.x < self.right() as f32
            && p.y >= self.top() as f32
            && p.y < self.bottom() as f32
    }

    /// Circle overlap test against this box
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let nearest_x = center.x.clamp(self.left() as f32, self.right() as f32);
        let nearest_y = center.y.clamp(self.top() as f32, self.bottom() as f32);
        let dx = center.x - nearest_x;
        let dy = center.y - nearest_y;
        dx * dx + dy * dy < radius * radius
    }

    /// Signed penetration of `self` into `other` on each axis.
    ///
    /// The sign says which way `self` must move to separate, so adding the
    /// returned depth on one axis resolves the overlap on that axis. Returns
    /// zero when the boxes do not overlap.
    pub fn intersection_depth(&self, other: &Rect) -> Vec2 {
        let half_width_a = self.width as f32 / 2.0;
        let half_height_a = self.height as f32 / 2.0;
        let half_width_b = other.width as f32 / 2.0;
        let half_height_b = other.height as f32 / 2.0;

        let center_a = Vec2::new(self.left() as f32 + half_width_a, self.top() as f32 + half_height_a);
        let center_b = Vec2::new(other.left() as f32 + half_width_b, other.top() as f32 + half_height_b);

        let distance_x = center_a.x - center_b.x;
        let distance_y = center_a.y - center_b.y;
        let min_distance_x = half_width_a + half_width_b;
        let min_distance_y = half_height_a + half_height_b;

        if distance_x.abs() >= min_distance_x || distance_y.abs() >= min_distance_y {
            return Vec2::ZERO;
        }

        let depth_x = if distance_x > 0.0 {
            min_distance_x - distance_x
        } else {
            -min_distance_x - distance_x
        };
        let depth_y = if distance_y > 0.0 {
            min_distance_y - distance_y
        } else {
            -min_distance_y - distance_y
        };
        Vec2::new(depth_x, depth_y)
    }
}
