//! Path data output.
//!
//! Emits `d` attribute strings using only `M`, `L`, `A` and `Z`, and a
//! layered preview document (stroked `CUT`, filled `ENGRAVE`) in mm units.

use std::fmt::Write as _;

use laserkit_core::{Point, Polygon, PolygonSet, Rect};

use crate::outline::OutlineResult;

/// Formats path data with a fixed number of decimals.
///
/// `None` writes the shortest representation that reads back to the same
/// `f64`.
#[derive(Debug, Clone, Default)]
pub struct PathWriter {
    precision: Option<u32>,
    out: String,
}

impl PathWriter {
    pub fn new(precision: Option<u32>) -> Self {
        Self {
            precision,
            out: String::new(),
        }
    }

    fn number(&self, value: f64) -> String {
        let text = match self.precision {
            None => format!("{}", value),
            Some(p) => {
                let fixed = format!("{:.*}", p as usize, value);
                if fixed.contains('.') {
                    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
                } else {
                    fixed
                }
            }
        };
        if text == "-0" {
            "0".to_string()
        } else {
            text
        }
    }

    fn separator(&mut self) {
        if !self.out.is_empty() {
            self.out.push(' ');
        }
    }

    fn point(&mut self, letter: char, p: Point) {
        self.separator();
        let x = self.number(p.x);
        let y = self.number(p.y);
        let _ = write!(self.out, "{} {} {}", letter, x, y);
    }

    pub fn move_to(&mut self, p: Point) {
        self.point('M', p);
    }

    pub fn line_to(&mut self, p: Point) {
        self.point('L', p);
    }

    /// Circular arc of `radius` to `p`.
    pub fn arc_to(&mut self, radius: f64, large_arc: bool, sweep: bool, p: Point) {
        self.separator();
        let r = self.number(radius);
        let x = self.number(p.x);
        let y = self.number(p.y);
        let _ = write!(
            self.out,
            "A {} {} 0 {} {} {} {}",
            r,
            r,
            u8::from(large_arc),
            u8::from(sweep),
            x,
            y
        );
    }

    pub fn close(&mut self) {
        self.separator();
        self.out.push('Z');
    }

    pub fn polygon(&mut self, polygon: &Polygon) {
        let mut points = polygon.points().iter();
        if let Some(first) = points.next() {
            self.move_to(*first);
            for p in points {
                self.line_to(*p);
            }
            self.close();
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Serializes every ring as `M … L … Z`.
pub fn polygon_set_to_path(set: &PolygonSet, precision: Option<u32>) -> String {
    let mut writer = PathWriter::new(precision);
    for polygon in set {
        writer.polygon(polygon);
    }
    writer.finish()
}

/// Rectangle with circular corners of `radius`, clockwise on screen.
pub fn rounded_rect_path(rect: &Rect, radius: f64, precision: Option<u32>) -> String {
    let Rect {
        x,
        y,
        width: w,
        height: h,
    } = *rect;
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let mut writer = PathWriter::new(precision);
    if r <= 0.0 {
        writer.move_to(Point::new(x, y));
        writer.line_to(Point::new(x + w, y));
        writer.line_to(Point::new(x + w, y + h));
        writer.line_to(Point::new(x, y + h));
        writer.close();
        return writer.finish();
    }
    writer.move_to(Point::new(x + r, y));
    writer.line_to(Point::new(x + w - r, y));
    writer.arc_to(r, false, true, Point::new(x + w, y + r));
    writer.line_to(Point::new(x + w, y + h - r));
    writer.arc_to(r, false, true, Point::new(x + w - r, y + h));
    writer.line_to(Point::new(x + r, y + h));
    writer.arc_to(r, false, true, Point::new(x, y + h - r));
    writer.line_to(Point::new(x, y + r));
    writer.arc_to(r, false, true, Point::new(x + r, y));
    writer.close();
    writer.finish()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Builds a preview document with a stroked `CUT` layer and a filled
/// `ENGRAVE` layer.
pub fn render_layers(result: &OutlineResult) -> String {
    let b = result.bounds;
    // Same margin on the far side as on the near side
    let width = (b.x * 2.0 + b.width).max(0.0);
    let height = (b.y * 2.0 + b.height).max(0.0);

    let mut doc = String::new();
    let _ = writeln!(doc, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        doc,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}mm" height="{h}mm" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    if !result.engrave_path.is_empty() {
        let _ = writeln!(
            doc,
            r##"  <g id="ENGRAVE"><path d="{}" fill="#000000" fill-rule="nonzero" stroke="none"/></g>"##,
            escape_attr(&result.engrave_path)
        );
    }
    let _ = writeln!(
        doc,
        r##"  <g id="CUT"><path d="{}" fill="none" stroke="#ff0000" stroke-width="0.1"/></g>"##,
        escape_attr(&result.cut_path)
    );
    doc.push_str("</svg>\n");
    doc
}
