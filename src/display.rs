use crate::input::{FRETS_OFFSET, N_FRETS, STRUM, WHAMMY};
use crate::program::PROGRAM_START;
use crate::status::Snapshot;
use crate::synth::ModeTag;
use crate::vm::Opcode;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::{Constraint, Direction, Layout};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph, Wrap};
use tui::Terminal;

/// Display shows what the instrument is doing. It's a diagnostic aid; the
/// instrument itself only talks through its audio.
pub trait Display {
    fn draw(&mut self, status: &Snapshot, program: &[u8]) -> Result<(), io::Error>;
}

/// status panel in a terminal, rendered using TUI and crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TermDisplay {
    pub fn new() -> Result<TermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermDisplay { terminal })
    }
}

impl Display for TermDisplay {
    fn draw(&mut self, status: &Snapshot, program: &[u8]) -> Result<(), io::Error> {
        let header = vec![
            Spans::from(vec![
                Span::styled(
                    format!("{:<12}", status.mode.name()),
                    Style::default()
                        .fg(mode_colour(status.mode))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(detail(status)),
            ]),
            Spans::from(Span::raw(format!(
                "buttons {}   open {}   mod {}",
                format_buttons(status.buttons),
                status.open,
                status.modulation
            ))),
            Spans::from(Span::styled(
                "space strum | 1-5 frets | 0 clear | w lever | <- -> encoder | q quit",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let listing = Spans::from(format_program(program, status.cursor));

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Min(3)].as_ref())
                .split(f.size());
            let top = Paragraph::new(header)
                .block(Block::default().borders(Borders::ALL).title("bytebeat axe"));
            f.render_widget(top, chunks[0]);
            let bottom = Paragraph::new(listing)
                .block(Block::default().borders(Borders::ALL).title("program"))
                .wrap(Wrap { trim: false });
            f.render_widget(bottom, chunks[1]);
        })?;
        Ok(())
    }
}

fn mode_colour(mode: ModeTag) -> Color {
    match mode {
        ModeTag::Programming => Color::Yellow,
        ModeTag::Beep => Color::Magenta,
        ModeTag::Play => Color::Green,
        ModeTag::NumberAnnounce => Color::Cyan,
        ModeTag::Test => Color::Red,
    }
}

fn submode_name(submode: u8) -> &'static str {
    match submode {
        0 => "melody / pitch",
        1 => "melody / mod",
        2 => "harmony / pitch",
        _ => "harmony / mod",
    }
}

fn detail(status: &Snapshot) -> String {
    match status.mode {
        ModeTag::Programming => format!(
            "cursor {}  length {}",
            status.cursor.saturating_sub(PROGRAM_START),
            status.high_water_mark.saturating_sub(PROGRAM_START)
        ),
        ModeTag::Play => submode_name(status.submode).to_string(),
        ModeTag::NumberAnnounce => format!("{} digits", status.digits_spoken),
        ModeTag::Test => format!("clip {:02}", status.test_slot),
        ModeTag::Beep => String::new(),
    }
}

/// S for strum, frets as 1-5 or '.', W for the lever
pub fn format_buttons(buttons: u32) -> String {
    let mut s = String::new();
    s.push(if buttons & STRUM != 0 { 'S' } else { '.' });
    for n in 0..N_FRETS {
        let held = buttons & (1 << (n + FRETS_OFFSET)) != 0;
        s.push(if held {
            char::from_digit(n + 1, 10).unwrap_or('?')
        } else {
            '.'
        });
    }
    s.push(if buttons & WHAMMY != 0 { 'W' } else { '.' });
    s
}

/// one span per opcode after the reserved prefix, the one under the cursor
/// reversed
pub fn format_program(program: &[u8], cursor: usize) -> Vec<Span<'static>> {
    program
        .iter()
        .enumerate()
        .skip(PROGRAM_START)
        .map(|(addr, &byte)| {
            let text = match Opcode::from_byte(byte) {
                Some(op) => format!("{} ", op),
                None => format!("?{:02x} ", byte),
            };
            if addr == cursor {
                Span::styled(text, Style::default().add_modifier(Modifier::REVERSED))
            } else {
                Span::raw(text)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_buttons() {
        assert_eq!(format_buttons(0), ".......");
        assert_eq!(
            format_buttons(STRUM | (0b10010 << FRETS_OFFSET) | WHAMMY),
            "S.2..5W"
        );
    }

    #[test]
    fn test_format_program() {
        let spans = format_program(&[0, 0, 0x10, 0x05, 0x17, 0x1f], 3);
        let text: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, ["t ", "5 ", "* ", "?1f "]);
        assert!(spans[1].style.add_modifier.contains(Modifier::REVERSED));
        assert!(!spans[0].style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn test_detail() {
        let mut s = Snapshot {
            mode: ModeTag::Programming,
            submode: 0,
            cursor: 5,
            high_water_mark: 7,
            open: 60,
            modulation: 48,
            digits_spoken: 3,
            test_slot: 9,
            buttons: 0,
            fills: 0,
        };
        assert_eq!(detail(&s), "cursor 3  length 5");
        s.mode = ModeTag::Play;
        s.submode = 2;
        assert_eq!(detail(&s), "harmony / pitch");
        s.mode = ModeTag::Test;
        assert_eq!(detail(&s), "clip 09");
    }
}
