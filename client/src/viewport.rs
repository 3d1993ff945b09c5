use std::f64::consts::PI;

use choropleth_shared::Bounds;

/// Side of the projected world square at zoom 0, in CSS pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Accumulated wheel travel that counts as one zoom level.
const WHEEL_PX_PER_ZOOM_LEVEL: f64 = 60.0;
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Web Mercator projection of `(lon, lat)` into world pixels at zoom 0.
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * TILE_SIZE;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * TILE_SIZE;
    (x, y)
}

/// Axis-aligned box in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldRect {
    pub fn from_bounds(bounds: &Bounds) -> Self {
        let (min_x, max_y) = project(bounds.min_lon, bounds.min_lat);
        let (max_x, min_y) = project(bounds.max_lon, bounds.max_lat);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// Pan/zoom transformation from world coordinates to screen coordinates.
///
/// `scale` is `2^zoom` and zoom always rests on a whole level, so layer
/// zoom ranges never leave a gap between two levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    min_zoom: f64,
    max_zoom: f64,
    screen: (f64, f64),
    max_bounds: Option<WorldRect>,
    wheel_travel: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::with_zoom_limits(0.0, 20.0)
    }
}

impl Viewport {
    pub fn with_zoom_limits(min_zoom: f64, max_zoom: f64) -> Self {
        let min_zoom = min_zoom.ceil();
        let max_zoom = max_zoom.floor().max(min_zoom);
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: min_zoom.exp2(),
            min_zoom,
            max_zoom,
            screen: (0.0, 0.0),
            max_bounds: None,
            wheel_travel: 0.0,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom().round() < self.max_zoom
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom().round() > self.min_zoom
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

    /// SVG `transform` placing world coordinates on screen.
    pub fn svg_transform(&self) -> String {
        format!(
            "translate({} {}) scale({})",
            self.offset_x, self.offset_y, self.scale
        )
    }

    pub fn set_screen_size(&mut self, screen_w: f64, screen_h: f64) {
        self.screen = (screen_w, screen_h);
        self.keep_inside_max_bounds();
    }

    /// Restrict panning to `bounds`; `None` lifts the restriction.
    pub fn set_max_bounds(&mut self, bounds: Option<&Bounds>) {
        self.max_bounds = bounds.filter(|b| !b.is_empty()).map(WorldRect::from_bounds);
        self.keep_inside_max_bounds();
    }

    /// Feed wheel travel; every full notch zooms one level toward the cursor.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        self.wheel_travel += delta;
        let levels = (self.wheel_travel / WHEEL_PX_PER_ZOOM_LEVEL).trunc();
        if levels == 0.0 {
            return;
        }
        self.wheel_travel -= levels * WHEEL_PX_PER_ZOOM_LEVEL;
        self.zoom_by(-levels, screen_x, screen_y);
    }

    /// Change zoom by whole `levels`, keeping the screen point fixed.
    pub fn zoom_by(&mut self, levels: f64, screen_x: f64, screen_y: f64) {
        let target = self.snap(self.zoom().round() + levels.round());
        let new_scale = target.exp2();
        let ratio = new_scale / self.scale;

        // Keep the point under the cursor fixed
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
        self.keep_inside_max_bounds();
    }

    /// Zoom by whole `levels` around the middle of the screen.
    pub fn zoom_centered(&mut self, levels: f64) {
        let (w, h) = self.screen;
        self.zoom_by(levels, w / 2.0, h / 2.0);
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
        self.keep_inside_max_bounds();
    }

    /// Fit the viewport to show the given geographic bounds with padding.
    ///
    /// The zoom is the deepest whole level at which the bounds still fit.
    pub fn fit_bounds(&mut self, bounds: &Bounds, screen_w: f64, screen_h: f64) {
        if bounds.is_empty() || screen_w <= 0.0 || screen_h <= 0.0 {
            return;
        }
        self.screen = (screen_w, screen_h);
        let rect = WorldRect::from_bounds(bounds);
        let world_w = (rect.max_x - rect.min_x).max(f64::EPSILON);
        let world_h = (rect.max_y - rect.min_y).max(f64::EPSILON);

        let padding = 0.05;
        let scale_x = screen_w / (world_w * (1.0 + padding * 2.0));
        let scale_y = screen_h / (world_h * (1.0 + padding * 2.0));
        self.scale = self.snap(scale_x.min(scale_y).log2().floor()).exp2();

        self.center_world(
            (rect.min_x + rect.max_x) / 2.0,
            (rect.min_y + rect.max_y) / 2.0,
        );
    }

    /// Pan so `(lon, lat)` sits in the middle of the screen, keeping the zoom.
    pub fn center_on(&mut self, lon: f64, lat: f64, screen_w: f64, screen_h: f64) {
        self.screen = (screen_w, screen_h);
        let (wx, wy) = project(lon, lat);
        self.center_world(wx, wy);
    }

    fn snap(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    fn center_world(&mut self, wx: f64, wy: f64) {
        let (w, h) = self.screen;
        self.offset_x = w / 2.0 - wx * self.scale;
        self.offset_y = h / 2.0 - wy * self.scale;
        self.keep_inside_max_bounds();
    }

    fn keep_inside_max_bounds(&mut self) {
        let (w, h) = self.screen;
        let Some(rect) = self.max_bounds else {
            return;
        };
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        self.offset_x = clamp_axis(self.offset_x, rect.min_x, rect.max_x, self.scale, w);
        self.offset_y = clamp_axis(self.offset_y, rect.min_y, rect.max_y, self.scale, h);
    }
}

/// Offset keeping `[min, max]` covering the screen along one axis, or
/// centered when it is smaller than the screen.
fn clamp_axis(offset: f64, min: f64, max: f64, scale: f64, screen: f64) -> f64 {
    if (max - min) * scale <= screen {
        screen / 2.0 - (min + max) / 2.0 * scale
    } else {
        offset.clamp(screen - max * scale, -min * scale)
    }
}

#[cfg(test)]
mod tests {
    use choropleth_shared::{GeoDocument, MapConfig, MapWidget, Record};

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn projection_maps_origin_to_world_center() {
        let (x, y) = project(0.0, 0.0);
        assert!(close(x, 128.0));
        assert!(close(y, 128.0));
        let (x, _) = project(-180.0, 0.0);
        assert!(close(x, 0.0));
    }

    #[test]
    fn north_is_up() {
        let (_, north) = project(0.0, 60.0);
        let (_, south) = project(0.0, -60.0);
        assert!(north < south);
    }

    #[test]
    fn zoom_is_clamped_to_limits() {
        let mut vp = Viewport::with_zoom_limits(5.0, 10.0);
        assert!(close(vp.zoom(), 5.0));
        vp.zoom_at(-100_000.0, 0.0, 0.0);
        assert!(close(vp.zoom(), 10.0));
        vp.zoom_at(100_000.0, 0.0, 0.0);
        assert!(close(vp.zoom(), 5.0));
    }

    #[test]
    fn zoom_keeps_focus_point_fixed() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        vp.scale = 4.0;
        let before = vp.screen_to_world(300.0, 200.0);
        vp.zoom_at(-250.0, 300.0, 200.0);
        let after = vp.screen_to_world(300.0, 200.0);
        assert!(close(before.0, after.0));
        assert!(close(before.1, after.1));
    }

    #[test]
    fn fit_bounds_centers_the_box() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        let bounds = Bounds {
            min_lon: 10.0,
            min_lat: 49.0,
            max_lon: 12.0,
            max_lat: 51.0,
        };
        vp.fit_bounds(&bounds, 800.0, 600.0);

        let (cx, cy) = project(11.0, 50.0);
        let (sx, _) = vp.world_to_screen(cx, cy);
        assert!(close(sx, 400.0));
        let (left, _) = vp.world_to_screen(project(10.0, 50.0).0, 0.0);
        let (right, _) = vp.world_to_screen(project(12.0, 50.0).0, 0.0);
        assert!(left >= 0.0 && right <= 800.0);
    }

    #[test]
    fn center_on_moves_point_to_middle() {
        let mut vp = Viewport::with_zoom_limits(5.0, 10.0);
        vp.center_on(11.0, 50.0, 640.0, 480.0);
        let (wx, wy) = project(11.0, 50.0);
        let (sx, sy) = vp.world_to_screen(wx, wy);
        assert!(close(sx, 320.0));
        assert!(close(sy, 240.0));
    }

    #[test]
    fn zoom_buttons_stop_at_the_limits() {
        let mut vp = Viewport::with_zoom_limits(5.0, 7.0);
        vp.set_screen_size(800.0, 600.0);
        assert!(vp.can_zoom_in() && !vp.can_zoom_out());

        vp.zoom_centered(1.0);
        assert!(close(vp.zoom(), 6.0));
        assert!(vp.can_zoom_in() && vp.can_zoom_out());

        vp.zoom_centered(1.0);
        vp.zoom_centered(1.0);
        assert!(close(vp.zoom(), 7.0));
        assert!(!vp.can_zoom_in());
    }

    #[test]
    fn zoom_centered_keeps_the_screen_middle_fixed() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        vp.center_on(11.0, 50.0, 640.0, 480.0);
        vp.zoom_centered(2.0);
        let (wx, wy) = project(11.0, 50.0);
        let (sx, sy) = vp.world_to_screen(wx, wy);
        assert!(close(sx, 320.0));
        assert!(close(sy, 240.0));
    }

    fn is_whole(zoom: f64) -> bool {
        (zoom - zoom.round()).abs() < 1e-9
    }

    fn square(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Bounds {
        Bounds {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    #[test]
    fn wheel_travel_below_a_notch_keeps_the_zoom() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        vp.scale = 8.0;
        vp.zoom_at(-40.0, 0.0, 0.0);
        assert!(close(vp.zoom(), 3.0));
        vp.zoom_at(-40.0, 0.0, 0.0);
        assert!(close(vp.zoom(), 4.0));
        for _ in 0..7 {
            vp.zoom_at(17.0, 10.0, 10.0);
            assert!(is_whole(vp.zoom()));
        }
        assert!(close(vp.zoom(), 3.0));
    }

    #[test]
    fn fit_bounds_lands_on_a_whole_level() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        vp.fit_bounds(&square(10.0, 49.0, 12.3, 51.7), 813.0, 577.0);
        assert!(is_whole(vp.zoom()));
        vp.zoom_centered(1.0);
        assert!(is_whole(vp.zoom()));
    }

    #[test]
    fn panning_stays_inside_max_bounds() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        let bounds = square(10.0, 49.0, 12.0, 51.0);
        vp.fit_bounds(&bounds, 400.0, 300.0);
        vp.set_max_bounds(Some(&bounds));
        vp.zoom_centered(3.0);

        vp.pan(100_000.0, 100_000.0);
        let rect = WorldRect::from_bounds(&bounds);
        let (left, top) = vp.world_to_screen(rect.min_x, rect.min_y);
        assert!(close(left, 0.0) && close(top, 0.0));

        vp.pan(-200_000.0, -200_000.0);
        let (right, bottom) = vp.world_to_screen(rect.max_x, rect.max_y);
        assert!(close(right, 400.0) && close(bottom, 300.0));
    }

    #[test]
    fn bounds_smaller_than_the_screen_stay_centered() {
        let mut vp = Viewport::with_zoom_limits(0.0, 20.0);
        let bounds = square(10.0, 49.0, 12.0, 51.0);
        vp.fit_bounds(&bounds, 800.0, 600.0);
        vp.set_max_bounds(Some(&bounds));
        vp.zoom_centered(-2.0);
        let before = (vp.offset_x, vp.offset_y);
        vp.pan(50.0, -50.0);
        assert!(close(vp.offset_x, before.0) && close(vp.offset_y, before.1));
    }

    #[test]
    fn sample_map_always_shows_a_layer_while_zooming() {
        let config: MapConfig =
            serde_json::from_str(include_str!("../../data/map.json")).expect("sample options");
        let records: Vec<Record> =
            serde_json::from_str(include_str!("../../data/records.json")).expect("sample records");
        let regions: GeoDocument =
            serde_json::from_str(include_str!("../../data/geo/regions.geojson")).expect("regions");
        let districts: GeoDocument =
            serde_json::from_str(include_str!("../../data/geo/districts.geojson"))
                .expect("districts");

        let (min_zoom, max_zoom) = (config.min_zoom, config.max_zoom);
        let mut widget = MapWidget::new(config, records).expect("widget");
        widget
            .load_layers(vec![Ok(regions), Ok(districts)])
            .expect("layers");

        let mut vp = Viewport::with_zoom_limits(min_zoom, max_zoom);
        let bounds = widget.visible_bounds(vp.zoom()).expect("visible bounds");
        vp.fit_bounds(&bounds, 800.0, 600.0);
        vp.set_max_bounds(Some(&bounds));
        assert!(is_whole(vp.zoom()));
        assert!(!widget.visible_layers(vp.zoom()).is_empty());

        let mut seen = Vec::new();
        for delta in [-20.0, 20.0] {
            for _ in 0..40 {
                vp.zoom_at(delta, 400.0, 300.0);
                let zoom = vp.zoom();
                assert!(is_whole(zoom), "fractional zoom {zoom}");
                assert!((min_zoom..=max_zoom).contains(&zoom));
                assert!(
                    !widget.visible_layers(zoom).is_empty(),
                    "no layer visible at zoom {zoom}"
                );
                seen.push(zoom.round() as i32);
            }
        }
        assert!(seen.contains(&(min_zoom as i32)));
        assert!(seen.contains(&(max_zoom as i32)));
        assert!(seen.contains(&6) && seen.contains(&7));
    }
}
