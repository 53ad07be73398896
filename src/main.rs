#[cfg(feature = "gui")]
mod app;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use calorie_panel::{
    CalorieClient, CardConfig, CardKind, Profile, WsConnection,
    cards::{load_card_data, render_card},
    config::AppConfig,
    dates::parse_date,
};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[cfg(feature = "gui")]
use calorie_panel::{PhotoApiClient, SystemClock, SystemNotifier};

#[cfg(feature = "gui")]
use crate::app::{CaloriePanelApp, Message};

#[derive(Parser, Debug)]
#[command(name = "calorie-panel")]
#[command(about = "Home Assistant calorie tracker panel - GUI or headless card renderer")]
struct Args {
    /// Render a card to SVG instead of starting the GUI
    #[arg(long, value_name = "KIND", value_parser = parse_kind)]
    render: Option<CardKind>,

    /// Date to render (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<chrono::NaiveDate>,

    /// Take title, profile and thresholds from this `[[cards]]` entry
    #[arg(long)]
    card_index: Option<usize>,

    /// Write the SVG here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_kind(s: &str) -> Result<CardKind, String> {
    s.parse()
}

fn parse_date_arg(s: &str) -> Result<chrono::NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    #[cfg(feature = "gui")]
    let filter = if args.render.is_some() {
        EnvFilter::builder()
            .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
            .parse_lossy("calorie_panel=debug")
    } else {
        EnvFilter::builder()
            .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
            .parse_lossy("calorie_panel=debug,fontdb=error,wgpu=warn,naga=warn")
    };

    #[cfg(not(feature = "gui"))]
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("calorie_panel=debug");

    // Logs go to stderr so rendered SVG on stdout stays clean
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let connection = rt
        .block_on(WsConnection::connect(
            &config.hass.base_url,
            &config.hass.access_token,
            Duration::from_secs(config.network.request_timeout_secs),
        ))
        .context("Failed to connect to Home Assistant")?;
    let client = CalorieClient::new(Arc::new(connection));

    if let Some(kind) = args.render {
        render(&rt, &config, &client, kind, &args)
    } else {
        #[cfg(feature = "gui")]
        {
            run_gui(rt, config, client)
        }
        #[cfg(not(feature = "gui"))]
        {
            anyhow::bail!("GUI mode not available. Build with --features gui or run with --render")
        }
    }
}

/// Profile weight unit falls back to the configured display unit.
fn apply_display_defaults(config: &AppConfig, profiles: &mut [Profile]) {
    for profile in profiles {
        if profile.weight_unit.is_none() {
            profile.weight_unit = Some(config.display.weight_unit);
        }
    }
}

/// Render one card headlessly.
fn render(
    rt: &tokio::runtime::Runtime,
    config: &AppConfig,
    client: &CalorieClient,
    kind: CardKind,
    args: &Args,
) -> Result<()> {
    let mut card = match args.card_index {
        Some(index) => config
            .cards
            .get(index)
            .cloned()
            .with_context(|| format!("No [[cards]] entry at index {}", index))?,
        None => CardConfig::new(kind),
    };
    card.kind = kind;

    let now = Local::now().naive_local();
    let date = args.date.unwrap_or(now.date());

    let svg = rt.block_on(async {
        let user_id = match &config.hass.user_id {
            Some(id) => id.clone(),
            None => client.current_user().await?.id,
        };
        let mut profiles = client.get_user_profile(&user_id).await?.all_profiles;
        apply_display_defaults(config, &mut profiles);
        if card.profile_entity_id.is_none() {
            card.profile_entity_id = config.hass.profile_entity_id.clone();
        }
        let data = load_card_data(client, &card, &profiles, date, now).await?;
        Ok::<_, anyhow::Error>(render_card(&card, &data))
    })?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &svg)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} card to {}", kind, path.display());
        }
        None => println!("{}", svg),
    }
    Ok(())
}

/// Run the desktop panel. `_rt` stays alive for the whole run; its workers
/// drive the WebSocket tasks.
#[cfg(feature = "gui")]
fn run_gui(_rt: tokio::runtime::Runtime, config: Arc<AppConfig>, client: CalorieClient) -> Result<()> {
    let photo_api = PhotoApiClient::new(
        config.hass.base_url.clone(),
        config.hass.access_token.clone(),
        &config.network,
    )?;

    let window_width = config.window.width;
    let window_height = config.window.height;
    let title = config.window.title.clone();

    let app = iced::application(
        move || {
            CaloriePanelApp::new(
                config.clone(),
                client.clone(),
                photo_api.clone(),
                Arc::new(SystemClock),
                Arc::new(SystemNotifier),
            )
        },
        update,
        view,
    )
    .title(move |_: &CaloriePanelApp| title.clone())
    .subscription(subscription)
    .theme(theme)
    .window(iced::window::Settings {
        size: iced::Size::new(window_width, window_height),
        ..Default::default()
    })
    .antialiasing(true);

    app.run().context("Failed to run application")?;

    Ok(())
}

#[cfg(feature = "gui")]
fn update(app: &mut CaloriePanelApp, message: Message) -> iced::Task<Message> {
    app.update(message)
}

#[cfg(feature = "gui")]
fn view(app: &CaloriePanelApp) -> iced::Element<'_, Message> {
    app.view()
}

#[cfg(feature = "gui")]
fn subscription(app: &CaloriePanelApp) -> iced::Subscription<Message> {
    app.subscription()
}

#[cfg(feature = "gui")]
fn theme(app: &CaloriePanelApp) -> iced::Theme {
    app.theme()
}
