//! Heightfield terrain: cells, the map grid, and the dirty-region contract
//!
//! Every cell carries five elevation samples (four corners plus a center
//! knot), which makes each cell a fan of four triangles. Interpolated height
//! along a shared cell edge depends only on the two shared corner samples, so
//! a well-formed level rolls smoothly across cell boundaries.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Per-cell flag bits. Stored in the level file, so the layout is stable.
pub mod cell_flags {
    /// Dissolves any ball whose footprint touches the cell
    pub const ACID: u16 = 1 << 0;
    /// Instant kill, no dissolve effect
    pub const KILL: u16 = 1 << 1;
    /// Heavy drag, low top speed
    pub const SAND: u16 = 1 << 2;
    /// No ground friction
    pub const ICE: u16 = 1 << 3;
    /// Boosted restitution on impact
    pub const TRAMPOLINE: u16 = 1 << 4;
    /// Cosmetic: suppress the grid line on the given edge
    pub const NO_LINE_NORTH: u16 = 1 << 5;
    pub const NO_LINE_EAST: u16 = 1 << 6;
    pub const NO_LINE_SOUTH: u16 = 1 << 7;
    pub const NO_LINE_WEST: u16 = 1 << 8;
    /// Editor tooling: the extended flags menu applies to this cell
    pub const FLAGS_EXTENDED: u16 = 1 << 9;

    /// Flags that end a ball on contact
    pub const LETHAL: u16 = ACID | KILL;
    /// Every defined bit; anything outside this range is malformed level data
    pub const ALL: u16 = ACID
        | KILL
        | SAND
        | ICE
        | TRAMPOLINE
        | NO_LINE_NORTH
        | NO_LINE_EAST
        | NO_LINE_SOUTH
        | NO_LINE_WEST
        | FLAGS_EXTENDED;
}

/// Height sample indices within a cell
pub const SOUTH_WEST: usize = 0;
pub const SOUTH_EAST: usize = 1;
pub const NORTH_EAST: usize = 2;
pub const NORTH_WEST: usize = 3;
pub const CENTER: usize = 4;

/// Water level treated as "no water" when at or below this
const NO_WATER: f32 = -100.0;

/// One grid square of terrain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Terrain elevation: four corners plus the center knot
    pub heights: [f32; 5],
    /// Water surface, same layout, independent of terrain height
    pub water_heights: [f32; 5],
    /// Bit set from [`cell_flags`]
    pub flags: u16,
    /// Surface material id (rendering only)
    pub texture: i32,
    /// Base color, cycled at runtime by color-modifier hooks
    pub colors: [f32; 4],
    /// Conveyor velocity imparted to balls resting on this cell
    pub velocity: Vec2,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            heights: [0.0; 5],
            water_heights: [NO_WATER; 5],
            flags: 0,
            texture: 0,
            colors: [1.0, 1.0, 1.0, 1.0],
            velocity: Vec2::ZERO,
        }
    }
}

impl Cell {
    /// Whether contact with this cell kills a ball
    pub fn is_lethal(&self) -> bool {
        self.flags & cell_flags::LETHAL != 0
    }
}

/// Why level validation rejected a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDefect {
    /// The cell list does not match the declared grid dimensions
    BadShape { expected: usize, actual: usize },
    /// A cell carries flag bits outside the defined set
    BadFlags { x: i32, y: i32, flags: u16 },
}

/// Inclusive rectangle of cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    fn union(self, other: Region) -> Region {
        Region {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

/// Rectangular grid of cells plus level metadata
///
/// The map exclusively owns its cells. Any code that mutates heights must go
/// through [`Map::set_region_heights`] or follow up with
/// [`Map::mark_cells_updated`] so renderers and collision caches know which
/// region to refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Map {
    pub name: String,
    pub is_bonus: bool,
    pub level_set: String,
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    /// Accumulated dirty region, drained by the renderer each frame
    #[serde(skip)]
    dirty: Option<Region>,
}

impl Map {
    /// Flat map of the given dimensions
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            name: String::new(),
            is_bonus: false,
            level_set: String::new(),
            width,
            height,
            cells: vec![Cell::default(); (width * height) as usize],
            dirty: None,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Level-load validation: grid shape and flag range. The defect names
    /// what is actually wrong so load errors stay diagnosable.
    pub fn validate(&self) -> Result<(), MapDefect> {
        let expected = (self.width.max(0) as usize) * (self.height.max(0) as usize);
        if self.width < 1 || self.height < 1 || self.cells.len() != expected {
            return Err(MapDefect::BadShape {
                expected,
                actual: self.cells.len(),
            });
        }
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.flags & !cell_flags::ALL != 0 {
                return Err(MapDefect::BadFlags {
                    x: i as i32 % self.width,
                    y: i as i32 / self.width,
                    flags: cell.flags,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn clamp_ix(&self, ix: i32) -> i32 {
        ix.clamp(0, self.width - 1)
    }

    #[inline]
    fn clamp_iy(&self, iy: i32) -> i32 {
        iy.clamp(0, self.height - 1)
    }

    /// Cell at integer grid coordinates. Out-of-bounds input clamps to the
    /// nearest edge cell; both rendering and physics rely on this never
    /// failing.
    pub fn cell(&self, ix: i32, iy: i32) -> &Cell {
        let ix = self.clamp_ix(ix);
        let iy = self.clamp_iy(iy);
        &self.cells[(iy * self.width + ix) as usize]
    }

    /// Mutable cell access, same clamping policy as [`Map::cell`]
    pub fn cell_mut(&mut self, ix: i32, iy: i32) -> &mut Cell {
        let ix = self.clamp_ix(ix);
        let iy = self.clamp_iy(iy);
        &mut self.cells[(iy * self.width + ix) as usize]
    }

    /// Interpolated terrain elevation at a continuous world coordinate
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        self.sample_at(x, y, |c| &c.heights)
    }

    /// Interpolated water surface elevation, or `None` where there is no water
    pub fn water_at(&self, x: f32, y: f32) -> Option<f32> {
        let w = self.sample_at(x, y, |c| &c.water_heights);
        (w > NO_WATER).then_some(w)
    }

    fn sample_at(&self, x: f32, y: f32, samples: impl Fn(&Cell) -> &[f32; 5]) -> f32 {
        // Clamp into the grid so the boundary acts like an edge extension
        let x = x.clamp(0.0, self.width as f32 - 1e-4);
        let y = y.clamp(0.0, self.height as f32 - 1e-4);
        let ix = x.floor() as i32;
        let iy = y.floor() as i32;
        let fx = x - ix as f32;
        let fy = y - iy as f32;
        fan_interpolate(samples(self.cell(ix, iy)), fx, fy)
    }

    /// Bulk height mutation over a rectangle.
    ///
    /// `f` receives each cell's grid coordinates and its height samples.
    /// Afterwards the touched region is reported via the cells-updated
    /// notification, marked as raised when any sample increased.
    pub fn set_region_heights<F>(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, mut f: F)
    where
        F: FnMut(i32, i32, &mut [f32; 5]),
    {
        let r = Region::new(x1, y1, x2, y2);
        let mut raised = false;
        for iy in r.y1.max(0)..=r.y2.min(self.height - 1) {
            for ix in r.x1.max(0)..=r.x2.min(self.width - 1) {
                let cell = &mut self.cells[(iy * self.width + ix) as usize];
                let before = cell.heights;
                f(ix, iy, &mut cell.heights);
                raised |= cell
                    .heights
                    .iter()
                    .zip(before.iter())
                    .any(|(new, old)| new > old);
            }
        }
        self.mark_cells_updated(r.x1, r.y1, r.x2, r.y2, raised);
    }

    /// Cells-updated notification.
    ///
    /// Records the touched rectangle for downstream refresh. When the region
    /// was raised, the bounds grow by one cell on every side so neighboring
    /// caches (wall faces, shadows) refresh too. Re-notifying an unchanged
    /// rectangle leaves the accumulated region as it was.
    pub fn mark_cells_updated(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, raised: bool) {
        let mut r = Region::new(x1, y1, x2, y2);
        if raised {
            r.x1 -= 1;
            r.y1 -= 1;
            r.x2 += 1;
            r.y2 += 1;
        }
        r.x1 = self.clamp_ix(r.x1);
        r.y1 = self.clamp_iy(r.y1);
        r.x2 = self.clamp_ix(r.x2);
        r.y2 = self.clamp_iy(r.y2);
        self.dirty = Some(match self.dirty {
            Some(d) => d.union(r),
            None => r,
        });
    }

    /// Current accumulated dirty region, if any
    pub fn dirty_region(&self) -> Option<Region> {
        self.dirty
    }

    /// Drain the dirty region (called by the renderer once per frame)
    pub fn take_dirty(&mut self) -> Option<Region> {
        self.dirty.take()
    }
}

/// Interpolate within one cell's triangle fan.
///
/// The cell splits into four triangles meeting at the center knot. On each
/// cell edge only the two corner samples contribute, which is what makes the
/// surface continuous across cells that agree on their shared corners.
fn fan_interpolate(h: &[f32; 5], fx: f32, fy: f32) -> f32 {
    let sw = (Vec2::new(0.0, 0.0), h[SOUTH_WEST]);
    let se = (Vec2::new(1.0, 0.0), h[SOUTH_EAST]);
    let ne = (Vec2::new(1.0, 1.0), h[NORTH_EAST]);
    let nw = (Vec2::new(0.0, 1.0), h[NORTH_WEST]);
    let center = (Vec2::new(0.5, 0.5), h[CENTER]);

    let p = Vec2::new(fx, fy);
    let dx = fx - 0.5;
    let dy = fy - 0.5;
    let (a, b) = if dx.abs() >= dy.abs() {
        if dx >= 0.0 { (se, ne) } else { (nw, sw) }
    } else if dy >= 0.0 {
        (ne, nw)
    } else {
        (sw, se)
    };
    triangle_height(p, a.0, a.1, b.0, b.1, center.0, center.1)
}

/// Barycentric height on the triangle (a, b, c)
fn triangle_height(p: Vec2, a: Vec2, ha: f32, b: Vec2, hb: f32, c: Vec2, hc: f32) -> f32 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let den = v0.x * v1.y - v1.x * v0.y;
    let u = (v2.x * v1.y - v1.x * v2.y) / den;
    let v = (v0.x * v2.y - v2.x * v0.y) / den;
    ha + u * (hb - ha) + v * (hc - ha)
}
