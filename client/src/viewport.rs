use std::f64::consts::PI;

use opportunity_shared::Bounds;

/// Side of one slippy-map tile in CSS pixels. World coordinates are Web Mercator
/// pixels at zoom 0, so the whole world spans `0..TILE_SIZE` on both axes.
pub const TILE_SIZE: f64 = 256.0;

pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 19.0;
const ZOOM_SENSITIVITY: f64 = 0.002;
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Project lon/lat (degrees) to world coordinates.
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * TILE_SIZE;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * TILE_SIZE;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(wx: f64, wy: f64) -> (f64, f64) {
    let lon = wx / TILE_SIZE * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * wy / TILE_SIZE);
    let lat = n.sinh().atan().to_degrees();
    (lon, lat)
}

/// Pan/zoom transformation from world coordinates to screen coordinates.
/// `scale` is `2^zoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 2f64.powf(MIN_ZOOM),
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    pub fn lonlat_to_screen(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (wx, wy) = project(lon, lat);
        self.world_to_screen(wx, wy)
    }

    pub fn screen_to_lonlat(&self, sx: f64, sy: f64) -> (f64, f64) {
        let (wx, wy) = self.screen_to_world(sx, sy);
        unproject(wx, wy)
    }

    /// Center the view on a lon/lat at a fixed zoom level.
    pub fn center_on(&mut self, lon: f64, lat: f64, zoom: f64, canvas_w: f64, canvas_h: f64) {
        let (wx, wy) = project(lon, lat);
        self.scale = 2f64.powf(zoom.clamp(MIN_ZOOM, MAX_ZOOM));
        self.offset_x = canvas_w / 2.0 - wx * self.scale;
        self.offset_y = canvas_h / 2.0 - wy * self.scale;
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale =
            (self.scale * factor).clamp(2f64.powf(MIN_ZOOM), 2f64.powf(MAX_ZOOM));
        let ratio = new_scale / self.scale;

        // Keep the point under the cursor fixed
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Fit the view to lon/lat bounds, leaving `padding` CSS pixels on every side.
    /// Degenerate bounds (a point or a line) are centered at the maximum zoom that
    /// still fits.
    pub fn fit_bounds(&mut self, bounds: &Bounds, canvas_w: f64, canvas_h: f64, padding: f64) {
        if !bounds.is_valid() || canvas_w <= 0.0 || canvas_h <= 0.0 {
            return;
        }
        let (min_x, max_y) = project(bounds.min_lon, bounds.min_lat);
        let (max_x, min_y) = project(bounds.max_lon, bounds.max_lat);
        let world_w = max_x - min_x;
        let world_h = max_y - min_y;

        let avail_w = (canvas_w - 2.0 * padding).max(1.0);
        let avail_h = (canvas_h - 2.0 * padding).max(1.0);
        let scale_x = if world_w > 0.0 { avail_w / world_w } else { f64::INFINITY };
        let scale_y = if world_h > 0.0 { avail_h / world_h } else { f64::INFINITY };
        self.scale = scale_x
            .min(scale_y)
            .clamp(2f64.powf(MIN_ZOOM), 2f64.powf(MAX_ZOOM));

        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;
        self.offset_x = canvas_w / 2.0 - center_x * self.scale;
        self.offset_y = canvas_h / 2.0 - center_y * self.scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn projection_round_trips_near_singapore() {
        let (wx, wy) = project(103.8198, 1.3521);
        let (lon, lat) = unproject(wx, wy);
        assert!(close(lon, 103.8198));
        assert!(close(lat, 1.3521));
    }

    #[test]
    fn projection_anchors() {
        let (x, y) = project(0.0, 0.0);
        assert!(close(x, TILE_SIZE / 2.0) && close(y, TILE_SIZE / 2.0));
        let (x, _) = project(-180.0, 0.0);
        assert!(close(x, 0.0));
        // North is up: higher latitude means smaller y
        assert!(project(0.0, 10.0).1 < project(0.0, -10.0).1);
    }

    #[test]
    fn center_on_puts_point_in_middle() {
        let mut vp = Viewport::default();
        vp.center_on(103.8198, 1.3521, 11.0, 800.0, 600.0);
        let (sx, sy) = vp.lonlat_to_screen(103.8198, 1.3521);
        assert!(close(sx, 400.0) && close(sy, 300.0));
        assert!(close(vp.zoom(), 11.0));
    }

    #[test]
    fn zoom_at_keeps_focus_point_fixed() {
        let mut vp = Viewport::default();
        vp.center_on(103.8, 1.35, 11.0, 800.0, 600.0);
        let before = vp.screen_to_world(120.0, 80.0);
        vp.zoom_at(-200.0, 120.0, 80.0);
        let after = vp.screen_to_world(120.0, 80.0);
        assert!(close(before.0, after.0) && close(before.1, after.1));
        assert!(vp.zoom() > 11.0);
    }

    #[test]
    fn fit_bounds_respects_padding() {
        let bounds = Bounds {
            min_lon: 103.6,
            min_lat: 1.2,
            max_lon: 104.0,
            max_lat: 1.5,
        };
        let mut vp = Viewport::default();
        vp.fit_bounds(&bounds, 800.0, 600.0, 16.0);

        let (left, bottom) = vp.lonlat_to_screen(bounds.min_lon, bounds.min_lat);
        let (right, top) = vp.lonlat_to_screen(bounds.max_lon, bounds.max_lat);
        assert!(left >= 16.0 - 1e-6 && right <= 784.0 + 1e-6);
        assert!(top >= 16.0 - 1e-6 && bottom <= 584.0 + 1e-6);
        // The limiting axis touches the padding exactly
        assert!(close(left, 16.0) || close(top, 16.0));
    }

    #[test]
    fn fit_bounds_ignores_empty_canvas() {
        let bounds = Bounds {
            min_lon: 103.6,
            min_lat: 1.2,
            max_lon: 104.0,
            max_lat: 1.5,
        };
        let mut vp = Viewport::default();
        let before = vp.clone();
        vp.fit_bounds(&bounds, 0.0, 600.0, 16.0);
        assert_eq!(vp, before);
    }
}
