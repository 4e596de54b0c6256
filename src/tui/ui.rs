//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem, Wrap},
    style::{Color, Style, Modifier},
};
use crate::cpu::registers::{Flags, FL, IM, IS, SP};
use super::app::{DebuggerApp, MEM_ROW_BYTES};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(5),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly view around PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:02X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else if *addr >= app.program.len() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw registers and the flag bits of FL.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = app.cpu.regs.all();
    let value = Style::default().fg(Color::White);

    let general = |range: std::ops::Range<usize>| {
        let mut spans = Vec::new();
        for i in range {
            spans.push(Span::raw(format!("R{}: ", i)));
            spans.push(Span::styled(format!("{:02X} ({:>3})   ", regs[i], regs[i]), value));
        }
        Line::from(spans)
    };

    let flags = app.cpu.regs.flags();
    let flag = |name: &'static str, mask: u8| {
        if flags & mask != 0 {
            Span::styled(name, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(name, Style::default().fg(Color::DarkGray))
        }
    };

    let content = vec![
        general(0..2),
        general(2..4),
        Line::from(vec![
            Span::raw("FL: "),
            Span::styled(format!("{:08b} ", regs[FL as usize]), value),
            flag("E", Flags::EQUAL),
            Span::raw(" "),
            flag("G", Flags::GREATER),
            Span::raw(" "),
            flag("L", Flags::LESS),
            Span::raw(" "),
            flag("I", Flags::INTERRUPT),
            Span::raw(format!("   IM: {:02X}   IS: {:02X}", regs[IM as usize], regs[IS as usize])),
        ]),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:02X}", app.cpu.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   SP: "),
            Span::styled(format!("{:02X}", regs[SP as usize]), Style::default().fg(Color::Magenta)),
            Span::raw(format!("   floor: {:02X}", app.cpu.stack_floor())),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory as a hex dump.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let pc = app.cpu.pc;
    let sp = app.cpu.regs.sp() as usize;

    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll * MEM_ROW_BYTES;

    let items: Vec<ListItem> = (0..visible_rows)
        .map(|row| start + row * MEM_ROW_BYTES)
        .map(|base| app.cpu.mem.dump(base, MEM_ROW_BYTES))
        .take_while(|cells| !cells.is_empty())
        .map(|cells| {
            let mut spans = vec![Span::raw(format!("{:02X}: ", cells[0].0))];

            for (addr, byte) in cells {
                let style = if addr == pc {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else if addr == sp {
                    Style::default().fg(Color::Black).bg(Color::Magenta)
                } else if addr > sp {
                    Style::default().fg(Color::Magenta)
                } else if byte != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02X}", byte), style));
                spans.push(Span::raw(" "));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(format!(" Memory @{:02X} ", start))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw values printed by the program.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let text: Vec<String> = app.output.iter().map(|v| v.to_string()).collect();

    let output = Paragraph::new(text.join(" "))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true })
        .block(Block::default()
            .title(" Output ")
            .borders(Borders::ALL));

    frame.render_widget(output, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓ PgUp PgDn: Scroll  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
