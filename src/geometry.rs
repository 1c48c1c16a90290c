use crate::codec::{self, Command};

/// A point in millimeters. The origin is the top left corner, x grows rightwards and y downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A connected stroke. The tool is lowered at the first point and raised after the last one.
pub type Path = Vec<Point>;

/// A rectangle in millimeters.
///
/// "Lower" means larger y here, so `lly >= ury` for any non-empty rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

/// Accumulates the extent of the plotted points and clips them to an optional clip rectangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingBox {
    /// Extent of all points seen so far, `None` before the first point.
    pub bounds: Option<Rect>,
    /// Allowed plotting area.
    pub clip: Option<Rect>,
    /// Number of points which had to be clipped.
    pub clip_count: usize,
    /// Number of points seen.
    pub point_count: usize,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(clip: Rect) -> Self {
        Self {
            clip: Some(clip),
            ..Self::default()
        }
    }

    /// Grows the extent so it contains the given point.
    pub fn extend(&mut self, x: f64, y: f64) {
        self.bounds = Some(match self.bounds {
            None => Rect {
                llx: x,
                lly: y,
                urx: x,
                ury: y,
            },
            Some(b) => Rect {
                llx: b.llx.min(x),
                lly: b.lly.max(y),
                urx: b.urx.max(x),
                ury: b.ury.min(y),
            },
        });
    }

    /// Clips a point to the clip rectangle.
    ///
    /// A coordinate is clamped to an edge only if it lies beyond it by more than `fuzz`.
    /// Returns the clipped coordinates and whether the point was left untouched.
    pub fn clip_point(&mut self, mut x: f64, mut y: f64, fuzz: f64) -> (f64, f64, bool) {
        let Some(clip) = self.clip else {
            return (x, y, true);
        };

        let mut inside = true;

        if clip.llx - x > fuzz {
            x = clip.llx;
            inside = false;
        }
        if x - clip.urx > fuzz {
            x = clip.urx;
            inside = false;
        }
        if clip.ury - y > fuzz {
            y = clip.ury;
            inside = false;
        }
        if y - clip.lly > fuzz {
            y = clip.lly;
            inside = false;
        }

        if !inside {
            self.clip_count += 1;
        }

        (x, y, inside)
    }

    /// The extent, or an empty rectangle at the origin if no point was seen.
    pub fn bounds_or_origin(&self) -> Rect {
        self.bounds.unwrap_or_default()
    }

    /// Commands tracing the outline of the extent: a move to the upper left corner
    /// and four draws around the rectangle. Empty if no point was seen.
    pub fn outline(&self) -> Vec<Command> {
        let Some(b) = self.bounds else {
            return Vec::new();
        };

        vec![
            codec::move_mm(b.ury, b.llx),
            codec::draw_mm(b.ury, b.urx),
            codec::draw_mm(b.lly, b.urx),
            codec::draw_mm(b.lly, b.llx),
            codec::draw_mm(b.ury, b.llx),
        ]
    }
}

/// Software clipping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clipping {
    /// If disabled, segments running into the forbidden zone are still drawn (along the edge).
    pub enabled: bool,
    /// Tolerance in mm before a coordinate counts as outside. Defaults to the device resolution.
    pub fuzz: f64,
}

impl Default for Clipping {
    fn default() -> Self {
        Self {
            enabled: true,
            fuzz: 0.05,
        }
    }
}

/// Translates the paths into move/draw commands.
///
/// * `bbox` - Accumulator, usually seeded with a clip rectangle. If it has one, the offset is
///   relative to the clip rectangle's upper left corner.
/// * `offset` - `(x, y)` offset in mm added to every point.
/// * `emit` - If false, only the bounding box is computed and no command is produced.
///
/// Paths with fewer than two points are skipped. Commands take `(y, x)`, the device's own axis order.
/// Returns the commands and the updated accumulator.
pub fn plot_commands(
    paths: &[Path],
    mut bbox: BoundingBox,
    offset: (f64, f64),
    clipping: Clipping,
    emit: bool,
) -> (Vec<Command>, BoundingBox) {
    let (mut x_off, mut y_off) = offset;

    if let Some(clip) = bbox.clip {
        x_off += clip.llx;
        y_off += clip.ury;
    }

    bbox.point_count = 0;

    let mut cmds = Vec::new();

    for path in paths.iter().filter(|p| p.len() >= 2) {
        let first = path[0];
        let (x, y) = (first.x + x_off, first.y + y_off);
        bbox.extend(x, y);
        bbox.point_count += 1;

        let (x, y, mut last_inside) = bbox.clip_point(x, y, clipping.fuzz);

        if emit {
            cmds.push(codec::move_mm(y, x));
        }

        for pt in &path[1..] {
            let (x, y) = (pt.x + x_off, pt.y + y_off);
            bbox.extend(x, y);
            bbox.point_count += 1;

            let (x, y, inside) = bbox.clip_point(x, y, clipping.fuzz);

            if emit {
                if !clipping.enabled || (inside && last_inside) {
                    cmds.push(codec::draw_mm(y, x));
                } else {
                    // Never draw into or through the forbidden zone.
                    cmds.push(codec::move_mm(y, x));
                }
            }

            last_inside = inside;
        }
    }

    (cmds, bbox)
}

/// Finds the extent of all points.
pub fn find_bbox(paths: &[Path]) -> BoundingBox {
    let mut bbox = BoundingBox::new();

    for pt in paths.iter().flatten() {
        bbox.extend(pt.x, pt.y);
    }

    bbox
}

/// Returns a copy flipped upside down, keeping the extent where it is.
pub fn flip_cut(paths: &[Path]) -> Vec<Path> {
    let b = find_bbox(paths).bounds_or_origin();

    paths
        .iter()
        .map(|path| {
            path.iter()
                .map(|pt| Point::new(pt.x, b.lly + b.ury - pt.y))
                .collect()
        })
        .collect()
}

/// Returns a copy mirrored left to right, keeping the extent where it is.
pub fn mirror_cut(paths: &[Path]) -> Vec<Path> {
    let b = find_bbox(paths).bounds_or_origin();

    paths
        .iter()
        .map(|path| {
            path.iter()
                .map(|pt| Point::new(b.llx + b.urx - pt.x, pt.y))
                .collect()
        })
        .collect()
}
