use iced::{
    Point, Rectangle, Renderer, Size, Theme, mouse,
    widget::canvas::{self, Action, LineDash, Path, Stroke, Text},
};

use crate::{scheduler::TrackMeasure, style, summary::DayBar, summary::goal_line_offset};

const PAD_TOP: f32 = 8.0;
const LABEL_AREA: f32 = 22.0;
const MAX_BAR_WIDTH: f32 = 36.0;

/// Interaction event to avoid a dependency on the app's message type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartEvent {
    /// The bar track was laid out at a new height; carries the goal-line
    /// offset from the top of the track.
    TrackMeasured(f64),
    DaySelected(usize),
}

/// Seven-day bar chart drawn at the size it is given.
pub struct WeeklyChart<'a> {
    pub bars: &'a [DayBar; 7],
    pub cache: &'a canvas::Cache,
}

fn track_height(bounds: Rectangle) -> f32 {
    (bounds.height - PAD_TOP - LABEL_AREA).max(0.0)
}

fn slot_width(bounds: Rectangle) -> f32 {
    bounds.width / 7.0
}

impl<'a> canvas::Program<ChartEvent> for WeeklyChart<'a> {
    type State = TrackMeasure;

    fn update(
        &self,
        state: &mut Self::State,
        event: &iced::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<ChartEvent>> {
        if let iced::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) = event {
            if let Some(pos) = cursor.position_in(bounds) {
                let index = (pos.x / slot_width(bounds)) as usize;
                if index < self.bars.len() {
                    return Some(Action::publish(ChartEvent::DaySelected(index)).and_capture());
                }
            }
        }
        state
            .measure(f64::from(track_height(bounds)))
            .map(|offset| Action::publish(ChartEvent::TrackMeasured(offset)))
    }

    fn draw(
        &self,
        state: &Self::State,
        renderer: &Renderer,
        _: &Theme,
        bounds: Rectangle,
        _: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let geo = self.cache.draw(renderer, bounds.size(), |frame| {
            let track_h = track_height(bounds);
            let slot = slot_width(bounds);
            let bar_w = (slot * 0.6).min(MAX_BAR_WIDTH);
            let bottom = PAD_TOP + track_h;

            for (i, bar) in self.bars.iter().enumerate() {
                let x = slot * i as f32 + (slot - bar_w) / 2.0;

                let track = Path::rounded_rectangle(
                    Point::new(x, PAD_TOP),
                    Size::new(bar_w, track_h),
                    4.0.into(),
                );
                frame.fill(&track, style::BG_DARK);

                let green_h = track_h * bar.green_pct as f32 / 100.0;
                let red_h = track_h * bar.red_pct as f32 / 100.0;
                if green_h > 0.0 {
                    frame.fill(
                        &Path::rectangle(Point::new(x, bottom - green_h), Size::new(bar_w, green_h)),
                        style::ACCENT_GREEN,
                    );
                }
                if red_h > 0.0 {
                    frame.fill(
                        &Path::rectangle(
                            Point::new(x, bottom - green_h - red_h),
                            Size::new(bar_w, red_h),
                        ),
                        style::ACCENT_RED,
                    );
                }
                if bar.is_selected {
                    frame.stroke(
                        &track,
                        Stroke::default()
                            .with_color(style::ACCENT_BLUE)
                            .with_width(2.0),
                    );
                }

                let label_color = if bar.is_selected {
                    style::ACCENT_BLUE
                } else if bar.is_today {
                    style::TEXT_BRIGHT
                } else {
                    style::TEXT_MUTED
                };
                frame.fill_text(Text {
                    content: bar.weekday.to_string(),
                    position: Point::new(x + bar_w / 2.0, bottom + LABEL_AREA / 2.0),
                    color: label_color,
                    size: 11.0.into(),
                    align_x: iced::alignment::Horizontal::Center.into(),
                    align_y: iced::alignment::Vertical::Center,
                    ..Default::default()
                });
            }

            // Goal line
            let offset = state
                .offset()
                .unwrap_or_else(|| goal_line_offset(f64::from(track_h)));
            let goal_y = PAD_TOP + offset as f32;
            frame.stroke(
                &Path::line(Point::new(0.0, goal_y), Point::new(bounds.width, goal_y)),
                Stroke {
                    style: style::ACCENT_ORANGE.into(),
                    width: 1.0,
                    line_dash: LineDash {
                        segments: &[4.0, 4.0],
                        offset: 0,
                    },
                    ..Stroke::default()
                },
            );
        });
        vec![geo]
    }

    fn mouse_interaction(
        &self,
        _: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }
}
