//! Hit testing between placed icons (squares) and brush circles.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Axis-aligned square described by its center and side length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Square {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

impl Square {
    /// Distance from `(x, y)` to the nearest point of the square, zero
    /// when the point is inside.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let half = self.width / 2.0;
        let dx = ((x - self.x).abs() - half).max(0.0);
        let dy = ((y - self.y).abs() - half).max(0.0);
        dx.hypot(dy)
    }

    /// Touching counts as intersecting.
    pub fn intersects(&self, circle: &Circle) -> bool {
        self.distance_to(circle.x, circle.y) <= circle.radius
    }
}

pub fn square_intersects_circle(
    circle_x: f64,
    circle_y: f64,
    radius: f64,
    square_x: f64,
    square_y: f64,
    square_width: f64,
) -> bool {
    let square = Square {
        x: square_x,
        y: square_y,
        width: square_width,
    };
    square.intersects(&Circle {
        x: circle_x,
        y: circle_y,
        radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_inside_square_intersects() {
        assert!(square_intersects_circle(0.0, 0.0, 0.0, 0.0, 0.0, 10.0));
    }

    #[test]
    fn touching_edge_counts() {
        // square spans x in [-5, 5]; circle at x=8 with radius 3 touches it
        assert!(square_intersects_circle(8.0, 0.0, 3.0, 0.0, 0.0, 10.0));
        assert!(!square_intersects_circle(8.1, 0.0, 3.0, 0.0, 0.0, 10.0));
    }

    #[test]
    fn corner_uses_euclidean_distance() {
        // corner at (5, 5); circle center (8, 9) is exactly 5 away
        assert!(square_intersects_circle(8.0, 9.0, 5.0, 0.0, 0.0, 10.0));
        assert!(!square_intersects_circle(8.0, 9.0, 4.99, 0.0, 0.0, 10.0));
    }
}
