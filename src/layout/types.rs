//! Core types for the furniture layout: points, trainable parameters and assets

use indexmap::IndexMap;

/// A 2D point in room coordinates (meters, y pointing up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate around the origin by `radians` (counter-clockwise)
    pub fn rotated(self, radians: f64) -> Self {
        let (sin_a, cos_a) = radians.sin_cos();
        Self {
            x: self.x * cos_a - self.y * sin_a,
            y: self.x * sin_a + self.y * cos_a,
        }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing all points, or None for an empty slice
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = BoundingBox::new(first.x, first.y, 0.0, 0.0);
        for point in &points[1..] {
            bounds = bounds.expand_to_include(*point);
        }
        Some(bounds)
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge y-coordinate
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Expand this bounding box to include a point
    pub fn expand_to_include(&self, point: Point) -> BoundingBox {
        let x = self.x.min(point.x);
        let y = self.y.min(point.y);
        let right = self.right().max(point.x);
        let top = self.top().max(point.y);
        BoundingBox::new(x, y, right - x, top - y)
    }
}

/// A trainable vector-valued variable with an optional accumulated gradient.
///
/// Turning gradient tracking off never touches the stored values, so a frozen
/// parameter keeps its pose until something writes to it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    values: Vec<f64>,
    grad: Option<Vec<f64>>,
    requires_grad: bool,
}

impl Param {
    /// Create a parameter with gradient tracking enabled
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            grad: None,
            requires_grad: true,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    pub fn grad(&self) -> Option<&[f64]> {
        self.grad.as_deref()
    }

    pub(crate) fn grad_mut(&mut self) -> Option<&mut [f64]> {
        self.grad.as_deref_mut()
    }

    /// Drop the accumulated gradient
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Add `grad` element-wise into the accumulated gradient
    pub fn accumulate_grad(&mut self, grad: &[f64]) {
        let len = self.values.len();
        let acc = self.grad.get_or_insert_with(|| vec![0.0; len]);
        for (slot, g) in acc.iter_mut().zip(grad) {
            *slot += g;
        }
    }
}

/// Which pose variable of an asset a parameter refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKind {
    Position,
    Rotation,
}

/// Identifies one trainable variable in an asset collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId {
    pub asset: String,
    pub kind: ParamKind,
}

impl ParamId {
    pub fn new(asset: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            asset: asset.into(),
            kind,
        }
    }

    pub fn position(asset: impl Into<String>) -> Self {
        Self::new(asset, ParamKind::Position)
    }

    pub fn rotation(asset: impl Into<String>) -> Self {
        Self::new(asset, ParamKind::Rotation)
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ParamKind::Position => write!(f, "{}.position", self.asset),
            ParamKind::Rotation => write!(f, "{}.rotation", self.asset),
        }
    }
}

/// The 2D outline of an asset in its local frame, centered on the origin
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A `width` x `depth` rectangle
    Box { width: f64, depth: f64 },
    /// An arbitrary closed outline
    Outline(Vec<Point>),
}

impl Shape {
    pub fn local_outline(&self) -> Vec<Point> {
        match self {
            Shape::Box { width, depth } => {
                let (hw, hd) = (width / 2.0, depth / 2.0);
                vec![
                    Point::new(-hw, -hd),
                    Point::new(hw, -hd),
                    Point::new(hw, hd),
                    Point::new(-hw, hd),
                ]
            }
            Shape::Outline(points) => points.clone(),
        }
    }
}

/// A piece of furniture with a trainable pose
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: String,
    pub shape: Shape,
    /// 2 or 3 components; the first two are the footprint center
    pub position: Param,
    /// Heading in radians, counter-clockwise
    pub rotation: Param,
    /// Whether the optimizer may move this asset
    pub optimize: bool,
}

impl Asset {
    /// Create an optimizable asset with trainable position and rotation
    pub fn new(id: impl Into<String>, shape: Shape, position: Vec<f64>, rotation: f64) -> Self {
        Self {
            id: id.into(),
            shape,
            position: Param::new(position),
            rotation: Param::new(vec![rotation]),
            optimize: true,
        }
    }

    /// Set the optimize flag and both tracking flags at once
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self.position.set_requires_grad(optimize);
        self.rotation.set_requires_grad(optimize);
        self
    }

    pub fn param(&self, kind: ParamKind) -> &Param {
        match kind {
            ParamKind::Position => &self.position,
            ParamKind::Rotation => &self.rotation,
        }
    }

    pub fn param_mut(&mut self, kind: ParamKind) -> &mut Param {
        match kind {
            ParamKind::Position => &mut self.position,
            ParamKind::Rotation => &mut self.rotation,
        }
    }

    pub fn center(&self) -> Point {
        let values = self.position.values();
        Point::new(
            values.first().copied().unwrap_or(0.0),
            values.get(1).copied().unwrap_or(0.0),
        )
    }

    pub fn heading(&self) -> f64 {
        self.rotation.values().first().copied().unwrap_or(0.0)
    }

    pub fn set_center(&mut self, center: Point) {
        let values = self.position.values_mut();
        if let Some(x) = values.get_mut(0) {
            *x = center.x;
        }
        if let Some(y) = values.get_mut(1) {
            *y = center.y;
        }
    }

    /// Outline vertices at the current pose
    pub fn footprint_points(&self) -> Vec<Point> {
        let center = self.center();
        let heading = self.heading();
        self.shape
            .local_outline()
            .into_iter()
            .map(|p| {
                let r = p.rotated(heading);
                Point::new(r.x + center.x, r.y + center.y)
            })
            .collect()
    }
}

/// The item collection, in insertion order
pub type Assets = IndexMap<String, Asset>;
