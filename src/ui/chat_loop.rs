use std::{error::Error, io, time::Duration};

use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{
            self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent,
            KeyEventKind, KeyModifiers, MouseEventKind,
        },
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    Terminal,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::core::chat_service::{ChatService, DispatchResult};
use crate::core::session::{ChatSession, PendingDispatch};
use crate::ui::renderer::{draw, ScrollState, ViewContext};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const PAGE_ROWS: u16 = 10;
const WHEEL_ROWS: u16 = 3;

#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Dispatch(PendingDispatch),
    Continue,
}

/// Applies one key press to the session and scroll state.
pub fn handle_key(session: &mut ChatSession, scroll: &mut ScrollState, key: KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Continue;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Esc => KeyAction::Quit,
        KeyCode::Enter => match session.submit_input() {
            Some(pending) => {
                scroll.auto_scroll = true;
                KeyAction::Dispatch(pending)
            }
            None => KeyAction::Continue,
        },
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            session.push_char(c);
            KeyAction::Continue
        }
        KeyCode::Backspace => {
            session.backspace();
            KeyAction::Continue
        }
        KeyCode::Up => {
            scroll.scroll_up(1);
            KeyAction::Continue
        }
        KeyCode::Down => {
            scroll.scroll_down(1);
            KeyAction::Continue
        }
        KeyCode::PageUp => {
            scroll.scroll_up(PAGE_ROWS);
            KeyAction::Continue
        }
        KeyCode::PageDown => {
            scroll.scroll_down(PAGE_ROWS);
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

/// Runs the full-screen chat until the user quits. The terminal is restored
/// even when the loop fails.
pub async fn run_chat(
    mut session: ChatSession,
    service: ChatService,
    rx: mpsc::UnboundedReceiver<DispatchResult>,
) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    restore_on_err(
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture),
        abandon_setup,
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = restore_on_err(Terminal::new(backend), abandon_setup)?;

    let result = event_loop(&mut terminal, &mut session, &service, rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Passes `result` through, running `restore` first when it is an error.
fn restore_on_err<T, E>(result: Result<T, E>, restore: impl FnOnce()) -> Result<T, E> {
    result.inspect_err(|_| restore())
}

fn abandon_setup() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut ChatSession,
    service: &ChatService,
    mut rx: mpsc::UnboundedReceiver<DispatchResult>,
) -> Result<(), Box<dyn Error>> {
    let mut scroll = ScrollState::default();
    let mut tick: usize = 0;
    let model = service.client().model().to_string();

    loop {
        let view = ViewContext {
            model: &model,
            tick,
        };
        terminal.draw(|f| draw(f, session, &mut scroll, &view))?;
        tick = tick.wrapping_add(1);

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => match handle_key(session, &mut scroll, key) {
                    KeyAction::Quit => {
                        info!("chat session closed by user");
                        return Ok(());
                    }
                    KeyAction::Dispatch(pending) => service.spawn_dispatch(pending),
                    KeyAction::Continue => {}
                },
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => scroll.scroll_up(WHEEL_ROWS),
                    MouseEventKind::ScrollDown => scroll.scroll_down(WHEEL_ROWS),
                    _ => {}
                },
                _ => {}
            }
        }

        while let Ok(result) = rx.try_recv() {
            session.settle(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Phase;
    use ratatui::crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(session: &mut ChatSession, scroll: &mut ScrollState, text: &str) {
        for c in text.chars() {
            assert_eq!(
                handle_key(session, scroll, press(KeyCode::Char(c))),
                KeyAction::Continue
            );
        }
    }

    #[test]
    fn enter_dispatches_typed_text() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        type_text(&mut session, &mut scroll, "Hello");

        let action = handle_key(&mut session, &mut scroll, press(KeyCode::Enter));
        assert_eq!(
            action,
            KeyAction::Dispatch(PendingDispatch {
                text: "Hello".into()
            })
        );
        assert_eq!(session.phase(), Phase::AwaitingResponse);
        assert_eq!(session.input(), "");
    }

    #[test]
    fn enter_while_composing_does_nothing() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        session.submit("first").expect("accepted");
        type_text(&mut session, &mut scroll, "second");

        let action = handle_key(&mut session, &mut scroll, press(KeyCode::Enter));
        assert_eq!(action, KeyAction::Continue);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn blank_enter_is_ignored() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        type_text(&mut session, &mut scroll, "   ");
        assert_eq!(
            handle_key(&mut session, &mut scroll, press(KeyCode::Enter)),
            KeyAction::Continue
        );
        assert!(session.messages().is_empty());
    }

    #[test]
    fn ctrl_c_and_escape_quit() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut session, &mut scroll, ctrl_c), KeyAction::Quit);
        assert_eq!(
            handle_key(&mut session, &mut scroll, press(KeyCode::Esc)),
            KeyAction::Quit
        );
        assert_eq!(session.input(), "");
    }

    #[test]
    fn control_and_alt_chords_do_not_type() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        let chords = [
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL),
            KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT),
            KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL | KeyModifiers::SHIFT),
        ];
        for chord in chords {
            assert_eq!(handle_key(&mut session, &mut scroll, chord), KeyAction::Continue);
        }
        assert_eq!(session.input(), "");

        let shifted = KeyEvent::new(KeyCode::Char('H'), KeyModifiers::SHIFT);
        handle_key(&mut session, &mut scroll, shifted);
        assert_eq!(session.input(), "H");
    }

    #[test]
    fn failed_setup_step_restores_terminal() {
        let mut restored = 0;
        let failed: Result<(), &str> = restore_on_err(Err("no tty"), || restored += 1);
        assert_eq!(failed, Err("no tty"));
        assert_eq!(restored, 1);

        let ok: Result<u8, &str> = restore_on_err(Ok(7), || restored += 1);
        assert_eq!(ok, Ok(7));
        assert_eq!(restored, 1);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        let release = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('x'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
            KeyEventState::NONE,
        );
        handle_key(&mut session, &mut scroll, release);
        assert_eq!(session.input(), "");
    }

    #[test]
    fn arrows_scroll_transcript() {
        let mut session = ChatSession::default();
        let mut scroll = ScrollState::default();
        scroll.fit(50, 10);

        handle_key(&mut session, &mut scroll, press(KeyCode::PageUp));
        assert_eq!(scroll.offset, 30);
        assert!(!scroll.auto_scroll);

        handle_key(&mut session, &mut scroll, press(KeyCode::Down));
        assert_eq!(scroll.offset, 31);
    }
}
