use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::arbiter::MissReason;
use crate::controls::slot_key;
use crate::game::{GameState, Judgement, Snapshot};
use crate::score::Outcome;
use crate::target::{Target, Tier};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

const HELP: &str = "(1-9) whack  (s) start  (p) pause  (x) stop  (d) difficulty  (enter) dismiss  (q) quit";
const HELP_SHORT: &str = "1-9 whack  s p x d q";

/// Everything the frontend draws in one frame
pub struct GameView<'a> {
    pub snapshot: &'a Snapshot,
    pub best: Option<u32>,
    pub last: Option<Judgement>,
}

/// Columns and rows for a near-square grid of `n` cells
pub fn grid_shape(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    (cols, rows)
}

fn target_face(target: &Target) -> (&'static str, Style) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    if target.resolved {
        return ("x_x", bold.fg(Color::DarkGray));
    }
    match target.tier {
        Tier::Normal => ("(o.o)", bold.fg(Color::Rgb(160, 110, 60))),
        Tier::Golden => ("$(o.o)$", bold.fg(Color::Yellow)),
        Tier::Diamond => ("<>(o.o)<>", bold.fg(Color::Cyan)),
    }
}

impl GameView<'_> {
    fn render_hud(&self, area: Rect, buf: &mut Buffer) {
        let s = self.snapshot;
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let mut spans = vec![
            Span::styled(format!("{:>2}s", s.remaining_secs), bold_style),
            Span::raw("   "),
            Span::styled(
                format!("{} / {}", s.score.points, s.win_score),
                bold_style.fg(Color::Green),
            ),
            Span::raw("   "),
            Span::styled(s.difficulty.to_string(), dim_style),
        ];
        if let Some(best) = self.best {
            spans.push(Span::styled(format!("   best {}", best), dim_style));
        }
        if s.state == GameState::Paused {
            spans.push(Span::styled(
                "   PAUSED",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            ));
        }

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }

    fn render_grid(&self, area: Rect, buf: &mut Buffer) {
        let n = self.snapshot.grid_size;
        let (cols, rows) = grid_shape(n);
        if n == 0 {
            Paragraph::new("no slots configured")
                .alignment(Alignment::Center)
                .render(area, buf);
            return;
        }

        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(area);

        for (r, row_area) in row_areas.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
                .split(*row_area);

            for (c, cell) in cells.iter().enumerate() {
                let slot = r * cols + c;
                if slot >= n {
                    break;
                }
                self.render_slot(slot, *cell, buf);
            }
        }
    }

    fn render_slot(&self, slot: usize, area: Rect, buf: &mut Buffer) {
        let title = slot_key(slot).map(|k| k.to_string()).unwrap_or_default();
        let occupant = self.snapshot.visible.filter(|t| t.slot == slot);
        let border = if occupant.is_some() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title);

        let body = match occupant {
            Some(target) => {
                let (face, style) = target_face(&target);
                Span::styled(face, style)
            }
            None => Span::styled("___", Style::default().fg(Color::DarkGray)),
        };

        let inner_height = area.height.saturating_sub(2);
        let mut lines = vec![Line::from(""); (inner_height / 2) as usize];
        lines.push(Line::from(body));

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let s = self.snapshot;
        let line = match (s.state, s.outcome) {
            (GameState::Ended, Some(outcome)) => {
                let (title, color) = match outcome {
                    Outcome::Win => ("YOU WIN!", Color::Green),
                    Outcome::Lose => ("you lose", Color::Red),
                };
                let mut spans = vec![
                    Span::styled(
                        title,
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        "   score {}   target {}",
                        s.score.points, s.win_score
                    )),
                ];
                if s.score.diamond_hits > 0 {
                    spans.push(Span::styled(
                        format!("   diamond hits {}", s.score.diamond_hits),
                        Style::default().fg(Color::Cyan),
                    ));
                }
                Line::from(spans)
            }
            (GameState::Idle, _) => Line::from(Span::styled(
                "press s to start",
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            _ => match self.last {
                Some(Judgement::Hit { tier, points, .. }) => Line::from(Span::styled(
                    format!("+{} {}", points, tier),
                    Style::default().fg(Color::Green),
                )),
                Some(Judgement::Miss(MissReason::NotRunning)) | None => Line::from(""),
                Some(Judgement::Miss(reason)) => Line::from(Span::styled(
                    format!("miss ({})", reason),
                    Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
                )),
            },
        };

        Paragraph::new(line)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

impl Widget for GameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // hud
                Constraint::Min(3),    // grid
                Constraint::Length(1), // status
                Constraint::Length(1), // help
            ])
            .split(area);

        self.render_hud(chunks[0], buf);
        self.render_grid(chunks[1], buf);
        self.render_status(chunks[2], buf);

        let help = if HELP.width() as u16 <= chunks[3].width {
            HELP
        } else {
            HELP_SHORT
        };
        Paragraph::new(Span::styled(
            help,
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }
}
