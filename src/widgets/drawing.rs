use iced::{
    Font, Point, Rectangle, Renderer, Size, Theme, Vector, mouse,
    widget::canvas::{self, LineDash, Path, Stroke, Text},
};

use crate::{
    drawing::{self, Anchor, Drawing, Shape},
    style,
};

/// Replays a [`Drawing`] onto a canvas, scaled uniformly to fit and centered.
pub struct DrawingWidget<'a> {
    pub drawing: &'a Drawing,
    pub cache: &'a canvas::Cache,
}

/// Uniform scale and offset that fit a `width` x `height` view box into
/// `bounds`.
pub fn fit(width: f64, height: f64, bounds: Size) -> (f32, Vector) {
    if !(width > 0.0 && height > 0.0) {
        return (1.0, Vector::ZERO);
    }
    let scale = (bounds.width / width as f32).min(bounds.height / height as f32);
    let offset = Vector::new(
        (bounds.width - width as f32 * scale) / 2.0,
        (bounds.height - height as f32 * scale) / 2.0,
    );
    (scale, offset)
}

fn to_screen(p: drawing::Point, scale: f32, offset: Vector) -> Point {
    Point::new(p.x as f32 * scale, p.y as f32 * scale) + offset
}

impl<'a, Message> canvas::Program<Message> for DrawingWidget<'a> {
    type State = ();

    fn draw(
        &self,
        _: &Self::State,
        renderer: &Renderer,
        _: &Theme,
        bounds: Rectangle,
        _: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let geo = self.cache.draw(renderer, bounds.size(), |frame| {
            let (scale, offset) = fit(self.drawing.width, self.drawing.height, bounds.size());

            for shape in &self.drawing.shapes {
                match shape {
                    Shape::Arc {
                        center,
                        radius,
                        start_deg,
                        end_deg,
                        width,
                        tone,
                    } => {
                        let arc = Path::new(|b| {
                            b.arc(canvas::path::Arc {
                                center: to_screen(*center, scale, offset),
                                radius: *radius as f32 * scale,
                                start_angle: (*start_deg as f32).to_radians().into(),
                                end_angle: (*end_deg as f32).to_radians().into(),
                            })
                        });
                        frame.stroke(
                            &arc,
                            Stroke::default()
                                .with_color(style::tone_color(*tone))
                                .with_width(*width as f32 * scale)
                                .with_line_cap(canvas::LineCap::Butt),
                        );
                    }
                    Shape::Line {
                        from,
                        to,
                        width,
                        tone,
                        dashed,
                    } => {
                        let line = Path::line(
                            to_screen(*from, scale, offset),
                            to_screen(*to, scale, offset),
                        );
                        let stroke = Stroke::default()
                            .with_color(style::tone_color(*tone))
                            .with_width(*width as f32 * scale)
                            .with_line_cap(canvas::LineCap::Round);
                        if *dashed {
                            frame.stroke(
                                &line,
                                Stroke {
                                    line_dash: LineDash {
                                        segments: &[4.0, 3.0],
                                        offset: 0,
                                    },
                                    ..stroke
                                },
                            );
                        } else {
                            frame.stroke(&line, stroke);
                        }
                    }
                    Shape::Rect {
                        origin,
                        width,
                        height,
                        corner,
                        tone,
                        filled,
                    } => {
                        let rect = Path::rounded_rectangle(
                            to_screen(*origin, scale, offset),
                            Size::new(*width as f32 * scale, *height as f32 * scale),
                            (*corner as f32 * scale).into(),
                        );
                        let color = style::tone_color(*tone);
                        if *filled {
                            frame.fill(&rect, color);
                        } else {
                            frame.stroke(&rect, Stroke::default().with_color(color).with_width(1.0));
                        }
                    }
                    Shape::Text {
                        at,
                        content,
                        size,
                        tone,
                        anchor,
                        bold,
                    } => {
                        let align_x = match anchor {
                            Anchor::Start => iced::alignment::Horizontal::Left,
                            Anchor::Middle => iced::alignment::Horizontal::Center,
                            Anchor::End => iced::alignment::Horizontal::Right,
                        };
                        let font = if *bold {
                            Font {
                                weight: iced::font::Weight::Bold,
                                ..Font::DEFAULT
                            }
                        } else {
                            Font::DEFAULT
                        };
                        frame.fill_text(Text {
                            content: content.clone(),
                            position: to_screen(*at, scale, offset),
                            color: style::tone_color(*tone),
                            size: (*size as f32 * scale).into(),
                            font,
                            align_x: align_x.into(),
                            align_y: iced::alignment::Vertical::Center,
                            ..Default::default()
                        });
                    }
                }
            }
        });
        vec![geo]
    }
}
