//! Region quadtree over node positions, used for the Barnes-Hut repulsion approximation.
//!
//! Cells live in a flat arena and refer to each other by index. The tree is rebuilt from scratch
//! every simulation step and dropped afterwards.

use crate::geometry::{SimBox, Vec2};

pub const DEFAULT_MAX_DEPTH: usize = 25;

/// Side length of the cells created for bodies that cannot be separated within the depth budget.
const DEGENERATE_CELL_SIZE: f64 = 0.1;

pub type CellId = usize;

pub const ROOT: CellId = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Index of the owning node in the layout arena.
    pub index: usize,
    pub position: Vec2,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Empty,
    /// Holds one body. `overflow` lists degenerate cells for bodies that landed here after the
    /// depth budget ran out.
    External { body: Body, overflow: Vec<CellId> },
    Internal { children: [CellId; 4] },
}

#[derive(Debug, Clone)]
pub struct QuadCell {
    pub area: SimBox,
    /// `min(width, height)`, compared against distances by the opening criterion.
    pub size: f64,
    pub kind: CellKind,
    pub mass: f64,
    pub center: Vec2,
}

impl QuadCell {
    fn new(area: SimBox) -> Self {
        Self {
            area,
            size: area.width.min(area.height),
            kind: CellKind::Empty,
            mass: 0.0,
            center: area.center(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, CellKind::Internal { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, CellKind::Empty)
    }

    pub fn body(&self) -> Option<&Body> {
        match &self.kind {
            CellKind::External { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Outcome of [`QuadTree::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The body got a cell of its own.
    Placed,
    /// The depth budget ran out (coincident or extremely close bodies); the body was attached to
    /// a saturated leaf as a degenerate cell.
    Degenerate,
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<QuadCell>,
    max_depth: usize,
}

impl QuadTree {
    /// Creates a tree whose root is already split into four quadrants.
    pub fn new(area: SimBox, max_depth: usize) -> Self {
        let mut tree = Self {
            cells: vec![QuadCell::new(area)],
            max_depth,
        };
        let children = tree.subdivide(ROOT);
        tree.cells[ROOT].kind = CellKind::Internal { children };
        tree
    }

    pub fn from_bodies(area: SimBox, max_depth: usize, bodies: impl IntoIterator<Item = Body>) -> Self {
        let mut tree = Self::new(area, max_depth);
        for body in bodies {
            tree.insert(body);
        }
        tree.compute_mass_and_center();
        tree
    }

    pub fn root(&self) -> &QuadCell {
        &self.cells[ROOT]
    }

    pub fn cell(&self, id: CellId) -> &QuadCell {
        &self.cells[id]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().mass == 0.0
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn insert(&mut self, body: Body) -> Insertion {
        let mut cell = ROOT;
        let mut depth = self.max_depth;
        loop {
            match &self.cells[cell].kind {
                CellKind::Internal { children } => {
                    cell = children[quadrant(&self.cells[cell].area, body.position)];
                    depth = depth.saturating_sub(1);
                }
                CellKind::Empty => {
                    self.cells[cell].kind = CellKind::External {
                        body,
                        overflow: Vec::new(),
                    };
                    return Insertion::Placed;
                }
                CellKind::External { body: existing, .. } if depth > 0 => {
                    // Split the leaf, push the resident body one level down, then keep descending
                    // with the new one from this (now internal) cell.
                    let existing = *existing;
                    let children = self.subdivide(cell);
                    let target = children[quadrant(&self.cells[cell].area, existing.position)];
                    self.cells[target].kind = CellKind::External {
                        body: existing,
                        overflow: Vec::new(),
                    };
                    self.cells[cell].kind = CellKind::Internal { children };
                }
                CellKind::External { .. } => {
                    let id = self.cells.len();
                    let mut degenerate = QuadCell::new(SimBox::new(
                        body.position.x,
                        body.position.y,
                        DEGENERATE_CELL_SIZE,
                        DEGENERATE_CELL_SIZE,
                    ));
                    degenerate.kind = CellKind::External {
                        body,
                        overflow: Vec::new(),
                    };
                    self.cells.push(degenerate);
                    if let CellKind::External { overflow, .. } = &mut self.cells[cell].kind {
                        overflow.push(id);
                    }
                    return Insertion::Degenerate;
                }
            }
        }
    }

    fn subdivide(&mut self, cell: CellId) -> [CellId; 4] {
        let area = self.cells[cell].area;
        let hw = area.width / 2.0;
        let hh = area.height / 2.0;
        let quads = [
            SimBox::new(area.left, area.top, hw, hh),
            SimBox::new(area.left + hw, area.top, hw, hh),
            SimBox::new(area.left + hw, area.top + hh, hw, hh),
            SimBox::new(area.left, area.top + hh, hw, hh),
        ];
        let first = self.cells.len();
        self.cells.extend(quads.into_iter().map(QuadCell::new));
        [first, first + 1, first + 2, first + 3]
    }

    /// Post-order aggregation: every cell's mass and mass-weighted center from its subtree.
    pub fn compute_mass_and_center(&mut self) {
        let mut order: Vec<CellId> = Vec::with_capacity(self.cells.len());
        self.visit(|_, _| true, |id, _| order.push(id));

        for id in order {
            let (mass, center) = match &self.cells[id].kind {
                CellKind::Empty => (0.0, self.cells[id].area.center()),
                CellKind::External { body, overflow } => {
                    let mut mass = body.mass;
                    let mut weighted = body.position * body.mass;
                    for &o in overflow {
                        mass += self.cells[o].mass;
                        weighted += self.cells[o].center * self.cells[o].mass;
                    }
                    (mass, weighted / mass)
                }
                CellKind::Internal { children } => {
                    let mut mass = 0.0;
                    let mut weighted = Vec2::zeros();
                    for &c in children {
                        let child = &self.cells[c];
                        if !child.is_empty() {
                            mass += child.mass;
                            weighted += child.center * child.mass;
                        }
                    }
                    if mass > 0.0 {
                        (mass, weighted / mass)
                    } else {
                        (0.0, self.cells[id].area.center())
                    }
                }
            };
            self.cells[id].mass = mass;
            self.cells[id].center = center;
        }
    }

    /// Depth-first traversal from the root. `before` runs pre-order; returning `false` skips the
    /// cell's subtree and its `after` call. `after` runs post-order.
    pub fn visit<B, A>(&self, mut before: B, mut after: A)
    where
        B: FnMut(CellId, &QuadCell) -> bool,
        A: FnMut(CellId, &QuadCell),
    {
        self.walk(ROOT, &mut before, &mut after);
    }

    fn walk<B, A>(&self, id: CellId, before: &mut B, after: &mut A)
    where
        B: FnMut(CellId, &QuadCell) -> bool,
        A: FnMut(CellId, &QuadCell),
    {
        let cell = &self.cells[id];
        if !before(id, cell) {
            return;
        }
        match &cell.kind {
            CellKind::Internal { children } => {
                for &c in children {
                    self.walk(c, before, after);
                }
            }
            CellKind::External { overflow, .. } => {
                for &o in overflow {
                    self.walk(o, before, after);
                }
            }
            CellKind::Empty => {}
        }
        after(id, cell);
    }
}

/// 0 = top-left, 1 = top-right, 2 = bottom-right, 3 = bottom-left. Points on a midline fall to
/// the right/bottom side.
pub fn quadrant(area: &SimBox, p: Vec2) -> usize {
    let left = p.x < area.left + area.width / 2.0;
    let top = p.y < area.top + area.height / 2.0;
    match (left, top) {
        (true, true) => 0,
        (false, true) => 1,
        (false, false) => 2,
        (true, false) => 3,
    }
}
