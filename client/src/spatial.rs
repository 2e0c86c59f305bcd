use opportunity_shared::RegionRef;

use crate::viewport::{project, unproject};

const GRID_COLS: usize = 48;
const GRID_ROWS: usize = 48;

/// World-space bounding box `(min_x, min_y, max_x, max_y)`.
type WorldBox = (f64, f64, f64, f64);

/// A flat 2D grid over projected region bounding boxes.
/// Rebuilt whenever the drawn region set changes.
pub struct SpatialGrid {
    cells: Vec<Vec<usize>>,
    regions: Vec<RegionRef>,
    boxes: Vec<WorldBox>,
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
}

impl SpatialGrid {
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            regions: Vec::new(),
            boxes: Vec::new(),
            min_x: 0.0,
            min_y: 0.0,
            cell_w: 1.0,
            cell_h: 1.0,
        }
    }

    pub fn build(regions: &[RegionRef]) -> Self {
        let mut indexed = Vec::with_capacity(regions.len());
        let mut boxes = Vec::with_capacity(regions.len());
        for region in regions {
            let Some(bounds) = region.bounds() else {
                continue;
            };
            let (x0, y1) = project(bounds.min_lon, bounds.min_lat);
            let (x1, y0) = project(bounds.max_lon, bounds.max_lat);
            indexed.push(region.clone());
            boxes.push((x0, y0, x1, y1));
        }
        if boxes.is_empty() {
            return Self::empty();
        }

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x0, y0, x1, y1) in &boxes {
            min_x = min_x.min(x0);
            min_y = min_y.min(y0);
            max_x = max_x.max(x1);
            max_y = max_y.max(y1);
        }
        // Guard against zero-size extents
        let cell_w = ((max_x - min_x) / GRID_COLS as f64).max(f64::EPSILON);
        let cell_h = ((max_y - min_y) / GRID_ROWS as f64).max(f64::EPSILON);

        let mut cells = vec![Vec::new(); GRID_COLS * GRID_ROWS];
        for (idx, &(x0, y0, x1, y1)) in boxes.iter().enumerate() {
            let col_start = ((x0 - min_x) / cell_w).floor().max(0.0) as usize;
            let col_end = (((x1 - min_x) / cell_w).floor() as usize).min(GRID_COLS - 1);
            let row_start = ((y0 - min_y) / cell_h).floor().max(0.0) as usize;
            let row_end = (((y1 - min_y) / cell_h).floor() as usize).min(GRID_ROWS - 1);
            for row in row_start..=row_end {
                for col in col_start..=col_end {
                    cells[row * GRID_COLS + col].push(idx);
                }
            }
        }

        Self {
            cells,
            regions: indexed,
            boxes,
            min_x,
            min_y,
            cell_w,
            cell_h,
        }
    }

    /// Region under a world coordinate. Later regions are drawn on top, so they win.
    pub fn find_at(&self, wx: f64, wy: f64) -> Option<RegionRef> {
        if self.cells.is_empty() {
            return None;
        }

        let col = ((wx - self.min_x) / self.cell_w).floor();
        let row = ((wy - self.min_y) / self.cell_h).floor();
        if col < 0.0 || row < 0.0 || col >= GRID_COLS as f64 || row >= GRID_ROWS as f64 {
            return None;
        }

        let (lon, lat) = unproject(wx, wy);
        let cell = &self.cells[row as usize * GRID_COLS + col as usize];
        cell.iter()
            .rev()
            .filter(|&&idx| {
                let (x0, y0, x1, y1) = self.boxes[idx];
                wx >= x0 && wx <= x1 && wy >= y0 && wy <= y1
            })
            .map(|&idx| &self.regions[idx])
            .find(|region| region.contains(lon, lat))
            .cloned()
    }
}
