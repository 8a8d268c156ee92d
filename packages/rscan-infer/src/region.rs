/// Axis-aligned pixel rectangle in `[x0, y0, x1, y1]` corner form, the
/// shape the extraction model expects. Well-formed means `x0 <= x1` and
/// `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn is_well_formed(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }

    pub fn to_array(self) -> [u32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    pub fn from_array([x0, y0, x1, y1]: [u32; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// One OCR token. Backends that only return plain text leave the box empty;
/// the pipeline fills it in before extraction.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub bounding_box: Option<BoundingBox>,
}

impl Word {
    pub fn unboxed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounding_box: None,
        }
    }

    pub fn with_box(text: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bounding_box: Some(bounding_box),
        }
    }
}
