//! Declarative vector drawings.
//!
//! The gauge, weekly chart, calendar and macro cards all describe their
//! output as a [`Drawing`]: a view box plus a list of shapes. The same
//! drawing is serialized to SVG for headless cards and replayed onto an
//! `iced` canvas by the GUI.

use std::fmt::Write as _;

/// Semantic color of a shape. Renderers map tones to concrete colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    /// Within goal.
    Good,
    /// Over goal.
    Bad,
    Warning,
    /// Gauge track, grid lines, empty cells.
    Track,
    Text,
    Muted,
    Accent,
    Background,
}

impl Tone {
    pub fn hex(&self) -> &'static str {
        match self {
            Tone::Good => "#33d97f",
            Tone::Bad => "#ff5959",
            Tone::Warning => "#ff9933",
            Tone::Track => "#333847",
            Tone::Text => "#f5f7fc",
            Tone::Muted => "#99a1b3",
            Tone::Accent => "#59a6f2",
            Tone::Background => "#171c26",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    Start,
    #[default]
    Middle,
    End,
}

impl Anchor {
    fn svg(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Stroked circular arc. Angles are in degrees in screen space
    /// (y grows downward), drawn from `start_deg` to `end_deg` clockwise.
    Arc {
        center: Point,
        radius: f64,
        start_deg: f64,
        end_deg: f64,
        width: f64,
        tone: Tone,
    },
    Line {
        from: Point,
        to: Point,
        width: f64,
        tone: Tone,
        dashed: bool,
    },
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        corner: f64,
        tone: Tone,
        filled: bool,
    },
    Text {
        at: Point,
        content: String,
        size: f64,
        tone: Tone,
        anchor: Anchor,
        bold: bool,
    },
}

/// A view box and its shapes, in paint order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Drawing {
    pub width: f64,
    pub height: f64,
    pub shapes: Vec<Shape>,
}

impl Drawing {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn arc(&mut self, center: Point, radius: f64, start_deg: f64, end_deg: f64, width: f64, tone: Tone) {
        self.push(Shape::Arc {
            center,
            radius,
            start_deg,
            end_deg,
            width,
            tone,
        });
    }

    pub fn line(&mut self, from: Point, to: Point, width: f64, tone: Tone) {
        self.push(Shape::Line {
            from,
            to,
            width,
            tone,
            dashed: false,
        });
    }

    pub fn dashed_line(&mut self, from: Point, to: Point, width: f64, tone: Tone) {
        self.push(Shape::Line {
            from,
            to,
            width,
            tone,
            dashed: true,
        });
    }

    pub fn rect(&mut self, origin: Point, width: f64, height: f64, tone: Tone) {
        self.push(Shape::Rect {
            origin,
            width,
            height,
            corner: 0.0,
            tone,
            filled: true,
        });
    }

    pub fn outline(&mut self, origin: Point, width: f64, height: f64, corner: f64, tone: Tone) {
        self.push(Shape::Rect {
            origin,
            width,
            height,
            corner,
            tone,
            filled: false,
        });
    }

    pub fn text(&mut self, at: Point, content: impl Into<String>, size: f64, tone: Tone, anchor: Anchor) {
        self.push(Shape::Text {
            at,
            content: content.into(),
            size,
            tone,
            anchor,
            bold: false,
        });
    }

    pub fn bold_text(&mut self, at: Point, content: impl Into<String>, size: f64, tone: Tone) {
        self.push(Shape::Text {
            at,
            content: content.into(),
            size,
            tone,
            anchor: Anchor::Middle,
            bold: true,
        });
    }

    /// Shift every shape down by `dy` and grow the view box to make room,
    /// e.g. for a card title above the content.
    pub fn offset_y(mut self, dy: f64) -> Self {
        self.translate(0.0, dy);
        self.height += dy;
        self
    }

    /// Place `other` to the right of this drawing, `gap` apart.
    pub fn beside(mut self, mut other: Drawing, gap: f64) -> Self {
        let dx = self.width + gap;
        other.translate(dx, 0.0);
        self.width = dx + other.width;
        self.height = self.height.max(other.height);
        self.shapes.append(&mut other.shapes);
        self
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let shift = |p: &mut Point| {
            p.x += dx;
            p.y += dy;
        };
        for shape in &mut self.shapes {
            match shape {
                Shape::Arc { center, .. } => shift(center),
                Shape::Line { from, to, .. } => {
                    shift(from);
                    shift(to);
                }
                Shape::Rect { origin, .. } => shift(origin),
                Shape::Text { at, .. } => shift(at),
            }
        }
    }

    /// Texts in paint order; handy for assertions.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Serialize as a standalone SVG document. `max_height` caps the
    /// rendered size while keeping the view box (and aspect ratio).
    pub fn to_svg(&self, max_height: Option<f64>) -> String {
        let (out_w, out_h) = match max_height {
            Some(cap) if cap > 0.0 && cap < self.height => {
                (self.width * cap / self.height, cap)
            }
            _ => (self.width, self.height),
        };

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            num(out_w),
            num(out_h),
            num(self.width),
            num(self.height)
        );
        for shape in &self.shapes {
            write_shape(&mut svg, shape);
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn write_shape(svg: &mut String, shape: &Shape) {
    let _ = match shape {
        Shape::Arc {
            center,
            radius,
            start_deg,
            end_deg,
            width,
            tone,
        } => {
            let start = polar(*center, *radius, *start_deg);
            let end = polar(*center, *radius, *end_deg);
            let large = if (end_deg - start_deg).abs() > 180.0 { 1 } else { 0 };
            writeln!(
                svg,
                r#"  <path d="M {} {} A {} {} 0 {} 1 {} {}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                num(start.x),
                num(start.y),
                num(*radius),
                num(*radius),
                large,
                num(end.x),
                num(end.y),
                tone.hex(),
                num(*width)
            )
        }
        Shape::Line {
            from,
            to,
            width,
            tone,
            dashed,
        } => writeln!(
            svg,
            r#"  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"{}/>"#,
            num(from.x),
            num(from.y),
            num(to.x),
            num(to.y),
            tone.hex(),
            num(*width),
            if *dashed { r#" stroke-dasharray="4 3""# } else { "" }
        ),
        Shape::Rect {
            origin,
            width,
            height,
            corner,
            tone,
            filled,
        } => {
            let paint = if *filled {
                format!(r#"fill="{}""#, tone.hex())
            } else {
                format!(r#"fill="none" stroke="{}""#, tone.hex())
            };
            writeln!(
                svg,
                r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="{}" {}/>"#,
                num(origin.x),
                num(origin.y),
                num(*width),
                num(*height),
                num(*corner),
                paint
            )
        }
        Shape::Text {
            at,
            content,
            size,
            tone,
            anchor,
            bold,
        } => writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="{}" dominant-baseline="middle"{}>{}</text>"#,
            num(at.x),
            num(at.y),
            num(*size),
            tone.hex(),
            anchor.svg(),
            if *bold { r#" font-weight="bold""# } else { "" },
            escape(content)
        ),
    };
}

/// Point on a circle at `deg` degrees (screen space, 0° = right, -90° = up).
pub fn polar(center: Point, radius: f64, deg: f64) -> Point {
    let rad = deg.to_radians();
    Point::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
}

fn num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // avoid "-0"
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
