use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};

use super::app::App;

pub(crate) fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    let playing = app.now_playing().unwrap_or("-");
    let header = Paragraph::new(Line::from(format!(
        "soundboard  |  dir: {}  |  playing: {playing}",
        app.sounds_dir
    )))
    .block(Block::default().borders(Borders::ALL).title("Soundboard"));
    f.render_widget(header, chunks[0]);

    f.render_widget(buttons(app), chunks[1]);
    draw_seek(f, app, chunks[2]);

    let help = Paragraph::new(Line::from(
        "←/→ select  Enter play  s stop  [ ] seek  l logs  q quit",
    ))
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(help, chunks[3]);

    if app.logs_open {
        draw_logs(f, app);
    }
}

fn buttons(app: &App) -> Paragraph<'static> {
    let mut spans = Vec::with_capacity(app.buttons.len() * 2);
    for (idx, button) in app.buttons.iter().enumerate() {
        let mut style = Style::default();
        if Some(button.text.as_str()) == app.now_playing() {
            style = style.fg(Color::Green);
        }
        if idx == app.selected {
            style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
        }
        spans.push(Span::styled(format!("[ {} ]", button.text), style));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Sounds"))
}

fn draw_seek(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(16)])
        .split(area);

    let (ratio, style) = match app.page.seek() {
        Some(seek) if !seek.disabled() => (seek.ratio(), Style::default().fg(Color::Cyan)),
        Some(seek) => (seek.ratio(), Style::default().fg(Color::DarkGray)),
        None => (0.0, Style::default().fg(Color::DarkGray)),
    };
    let position = app
        .page
        .seek()
        .map(|s| format!("{:.1}s / {:.1}s", s.value(), s.max()))
        .unwrap_or_default();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Seek"))
        .gauge_style(style)
        .ratio(ratio)
        .label(position);
    f.render_widget(gauge, cols[0]);

    let remaining = app.page.label().map(|l| l.text()).unwrap_or_default();
    let label = Paragraph::new(Line::from(remaining))
        .block(Block::default().borders(Borders::ALL).title("Remaining"));
    f.render_widget(label, cols[1]);
}

fn draw_logs(f: &mut ratatui::Frame, app: &App) {
    let area = centered(f.area(), 90, 70);
    let inner_height = area.height.saturating_sub(2) as usize;
    let end = app.logs.len().saturating_sub(app.logs_scroll);
    let start = end.saturating_sub(inner_height);
    let lines: Vec<Line> = app
        .logs
        .iter()
        .skip(start)
        .take(end - start)
        .map(|l| Line::from(l.as_str()))
        .collect();

    f.render_widget(Clear, area);
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Logs (↑/↓ scroll, Esc close)"),
    );
    f.render_widget(panel, area);
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(rows[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let r = centered(area, 90, 70);
        assert!(r.width >= 89 && r.width <= 91, "{r:?}");
        assert!(r.height >= 34 && r.height <= 36, "{r:?}");
        assert!(r.right() <= area.right() && r.bottom() <= area.bottom());
    }
}
