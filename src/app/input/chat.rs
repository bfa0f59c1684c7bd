use crate::app::background;
use crate::app::messages::BackgroundMessage;
use crate::app::RuntimeContext;
use crate::demo;
use crate::gemini::chat::{ChatRole, ChatTurn};
use crate::pipeline::{failure_kind, failure_text};
use crate::ui::{App, InputMode};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

/// Keys while the chat input line has focus
pub(super) fn handle_chat_input(app: &mut App, key: KeyEvent, ctx: &RuntimeContext) -> Result<()> {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => submit_question(app, ctx),
        KeyCode::Backspace => {
            app.chat_input.pop();
        }
        KeyCode::Char(c) => app.chat_input.push(c),
        _ => {}
    }
    Ok(())
}

fn submit_question(app: &mut App, ctx: &RuntimeContext) {
    let question = app.chat_input.trim().to_string();
    if question.is_empty() {
        return;
    }

    // The demo workshop answers every question the same way, locally.
    if app.demo_mode {
        if let Some(chat) = app.chat.as_mut() {
            chat.history.push(ChatTurn {
                role: ChatRole::User,
                text: question,
            });
            chat.history.push(ChatTurn {
                role: ChatRole::Model,
                text: demo::DEMO_CHAT_NOTICE.to_string(),
            });
            app.chat_input.clear();
            app.chat_scroll = 0;
        }
        return;
    }

    let Some(client) = &ctx.client else {
        app.show_toast("No API key saved. Press s to add one.");
        return;
    };

    let Some(mut chat) = app.begin_chat_wait(&question) else {
        app.show_toast("Still thinking about the last question");
        return;
    };
    app.chat_input.clear();
    app.chat_scroll = 0;

    let client = client.clone();
    let model = app.settings.text_model.clone();
    let tx = ctx.tx.clone();
    background::spawn_background(ctx.tx.clone(), "workshop_chat", async move {
        match chat.ask(&client, &model, &question).await {
            Ok((_answer, usage)) => {
                let _ = tx.send(BackgroundMessage::ChatAnswer { chat, usage });
            }
            Err(e) => {
                let _ = tx.send(BackgroundMessage::ChatFailed {
                    chat,
                    message: failure_text(&e),
                    kind: failure_kind(&e),
                });
            }
        }
    });
}
