//! Page geometry: rectangles, affine matrices and coordinate conversion
//!
//! Two coordinate systems are in play:
//! - PDF user space: origin at the bottom-left of the MediaBox, Y grows upward
//! - Page space: origin at the top-left of the page, Y grows downward
//!
//! Spans, lines and wrapping all work in page space. Conversion back to PDF
//! space happens only when text is written into a content stream.

/// Axis-aligned rectangle in page space (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest rectangle containing all the given points
    pub fn bounding(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut rect = Rect::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        Some(rect)
    }
}

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: tx, f: ty }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self { a: sx, b: 0.0, c: 0.0, d: sy, e: 0.0, f: 0.0 }
    }

    /// Build a matrix from six numeric operands (`cm` / `Tm` order)
    pub fn from_operands(values: &[f32]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self` followed by `other`.
    ///
    /// PDF composes matrices as row vectors, so `cm` updates the CTM as
    /// `m.multiply(&ctm)` and `Td` updates the line matrix as
    /// `translate(tx, ty).multiply(&tlm)`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Apply this matrix to a point
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// The same transform, applied with `(x, y)` as its fixed point
    pub fn about(&self, x: f32, y: f32) -> Matrix {
        Matrix::translate(-x, -y)
            .multiply(self)
            .multiply(&Matrix::translate(x, y))
    }

    /// Length of the transformed unit Y vector, i.e. the vertical scale
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// The visible page area, in PDF user space (from the MediaBox)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl Default for PageFrame {
    /// US Letter (612pt × 792pt)
    fn default() -> Self {
        Self { llx: 0.0, lly: 0.0, urx: 612.0, ury: 792.0 }
    }
}

impl PageFrame {
    pub fn from_media_box(values: [f32; 4]) -> Self {
        let [x0, y0, x1, y1] = values;
        Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// PDF user space → page space
    pub fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.llx, self.ury - y)
    }

    /// Page space → PDF user space
    pub fn to_pdf(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.llx, self.ury - y)
    }
}
