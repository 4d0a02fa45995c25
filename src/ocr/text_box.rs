use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in source-image pixels.
///
/// Stored as `(x_min, x_max, y_min, y_max)`, the same order region boxes use.
/// No ordering between min and max is enforced; degenerate rectangles are
/// carried as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Rect {
    pub fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Bounding rectangle of a polygon, truncated to whole pixels.
    /// An empty polygon yields the zero rectangle.
    pub fn from_polygon(points: &[[f64; 2]]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let x_min = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        let x_max = points.iter().map(|p| p[0]).fold(f64::NEG_INFINITY, f64::max);
        let y_min = points.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
        let y_max = points.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max);

        Self::new(x_min as i32, x_max as i32, y_min as i32, y_max as i32)
    }

    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    /// Whether `inner` lies inside this rectangle once it is grown by
    /// `dx` horizontally and `dy` vertically on every side.
    pub fn contains_with_slack(&self, inner: &Rect, dx: i32, dy: i32) -> bool {
        self.x_min <= inner.x_min + dx
            && self.x_max >= inner.x_max - dx
            && self.y_min <= inner.y_min + dy
            && self.y_max >= inner.y_max - dy
    }

    /// Shifts the rectangle by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x_min + dx, self.x_max + dx, self.y_min + dy, self.y_max + dy)
    }
}

/// A recognized text fragment, or a run of fragments after merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub raw_text: String,
    #[serde(rename = "box")]
    pub rect: Rect,
    /// Recognizer confidence (0.0-1.0)
    pub score: f32,
}

/// One or more fragments merged into a single logical text run.
pub type MergedLine = TextBox;

impl TextBox {
    pub fn new(raw_text: impl Into<String>, rect: Rect, score: f32) -> Self {
        Self {
            raw_text: raw_text.into(),
            rect,
            score,
        }
    }

    pub fn left(&self) -> i32 {
        self.rect.x_min
    }

    pub fn right(&self) -> i32 {
        self.rect.x_max
    }

    pub fn top(&self) -> i32 {
        self.rect.y_min
    }

    pub fn bottom(&self) -> i32 {
        self.rect.y_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_polygon() {
        let rect = Rect::from_polygon(&[[10.7, 5.2], [40.9, 5.0], [40.1, 25.8], [10.2, 26.0]]);
        assert_eq!(rect, Rect::new(10, 40, 5, 26));
    }

    #[test]
    fn test_rect_from_empty_polygon() {
        assert_eq!(Rect::from_polygon(&[]), Rect::default());
    }

    #[test]
    fn test_contains_with_slack() {
        let outer = Rect::new(100, 200, 100, 150);

        assert!(outer.contains_with_slack(&Rect::new(110, 190, 110, 140), 0, 0));
        // Pokes out by 5px on the right, tolerated by 10px of slack
        assert!(outer.contains_with_slack(&Rect::new(110, 205, 110, 140), 10, 10));
        assert!(!outer.contains_with_slack(&Rect::new(110, 205, 110, 140), 0, 0));
        // Horizontal and vertical slack are independent
        assert!(!outer.contains_with_slack(&Rect::new(110, 190, 110, 160), 20, 5));
    }

    #[test]
    fn test_offset() {
        let rect = Rect::new(1, 2, 3, 4).offset(10, 100);
        assert_eq!(rect, Rect::new(11, 12, 103, 104));
    }

    #[test]
    fn test_text_box_serializes_rect_as_box() {
        let tb = TextBox::new("攻击力", Rect::new(10, 60, 0, 20), 0.9);
        let json = serde_json::to_string(&tb).unwrap();
        assert!(json.contains("\"box\""));
        let back: TextBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tb);
    }
}
