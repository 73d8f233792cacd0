use anyhow::{Result, bail};

mod app;
mod config;
mod conversation;
mod gemini;
mod handler;
mod tui;
mod ui;

use app::App;
use config::Config;
use gemini::GeminiClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());

    let api_key = match config.resolve_api_key() {
        Some(key) => key,
        None => {
            // Leave a template behind so there is a file to edit
            let _ = config.save();
            bail!(
                "no Gemini API key found: set GEMINI_API_KEY or add \"api_key\" to {}",
                Config::path()?.display()
            );
        }
    };
    let model = config.resolve_model();

    let mut app = App::new(GeminiClient::new(&api_key), model);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        // Deliver any finished generation request on this task, so the
        // conversation state keeps a single writer
        app.poll_pending().await;
    }
    Ok(())
}
