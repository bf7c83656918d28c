use std::io::Write;
use std::sync::Arc;

use cafe_client::config::Config;
use cafe_client::editor::{EventForm, EventsEditor};
use cafe_client::error::{AppError, AppResult};
use cafe_client::i18n;
use cafe_client::models::{Event, EventFilter, MenuData};
use cafe_client::services::ai::RewardOption;
use cafe_client::services::events::ImageUpload;
use cafe_client::services::init::{host_from_init_data, AppContext};
use cafe_client::services::telegram::MiniAppHost;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{AiCommand, Cli, Commands, EventFields, EventsCommand};

const THEME_COLOR: &str = "#1c1c1c";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cafe_client=info,cafe_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse_args();

    let mut config = Config::from_env()?;
    if let Some(lang) = cli.lang.as_deref() {
        let lang = i18n::normalize_language(lang);
        if i18n::is_supported_language(&lang) {
            config.lang = lang;
        } else {
            tracing::warn!("Unsupported language {}, keeping {}", lang, config.lang);
        }
    }
    let lang = config.lang.clone();

    let host: Option<Arc<dyn MiniAppHost>> = match cli.init_data.as_deref() {
        Some(raw) => match host_from_init_data(&config, raw) {
            Ok(host) => Some(host as Arc<dyn MiniAppHost>),
            Err(e) => fail(&e, &lang),
        },
        None => None,
    };

    let ctx = match AppContext::build(config, host) {
        Ok(ctx) => ctx,
        Err(e) => fail(&e, &lang),
    };
    ctx.telegram.set_theme_colors(THEME_COLOR, THEME_COLOR);

    if let Err(e) = run(&ctx, cli.command).await {
        fail(&e, &lang);
    }
    Ok(())
}

fn fail(err: &AppError, lang: &str) -> ! {
    tracing::debug!("Command failed: {:?}", err);
    eprintln!("{}", err.user_message(lang));
    std::process::exit(1);
}

async fn run(ctx: &AppContext, command: Commands) -> AppResult<()> {
    let lang = ctx.config.lang.as_str();

    match command {
        Commands::Menu { branch } => {
            let menu = ctx.menu.get_menu(&branch).await;
            print_menu(&menu, lang);
        }
        Commands::Events { command } => run_events(ctx, command).await?,
        Commands::Promotions => {
            let today = chrono::Local::now().date_naive();
            let digest = ctx.content.promotions(today).await?;
            if digest.is_empty() {
                println!("{}", i18n::tr(Some(lang), "promotions.empty", None));
                return Ok(());
            }
            if !digest.highlighted.is_empty() {
                println!("{}", i18n::tr(Some(lang), "promotions.highlighted", None));
                for event in &digest.highlighted {
                    println!("  {}", event_line(event, lang));
                }
            }
            if !digest.upcoming.is_empty() {
                println!("{}", i18n::tr(Some(lang), "promotions.upcoming", None));
                for event in &digest.upcoming {
                    println!("  {}", event_line(event, lang));
                }
            }
        }
        Commands::Purchases { token } => {
            let token = token.or_else(|| ctx.config.api.auth_token.clone());
            let purchases = match ctx.purchases.fetch(token.as_deref()).await {
                Err(AppError::Unauthorized) => {
                    println!("{}", i18n::tr(Some(lang), "purchases.login_required", None));
                    return Ok(());
                }
                other => other?,
            };
            if purchases.is_empty() {
                println!("{}", i18n::tr(Some(lang), "purchases.empty", None));
            }
            for purchase in &purchases {
                println!(
                    "{:<17} {:>10.2}  +{:<5} {} ({})",
                    purchase.display_date(),
                    purchase.total,
                    purchase.points_earned,
                    purchase.branch_name.as_deref().unwrap_or("-"),
                    purchase.item_count()
                );
                for item in &purchase.items {
                    println!("    {} x{}  {:.2}", item.name, item.quantity, item.price);
                }
            }
        }
        Commands::Ai { command } => run_ai(ctx, command).await?,
        Commands::Whoami => match ctx.telegram.user() {
            Some(user) => {
                println!("{} {}", user.id, user.display_name());
                if let Some(username) = &user.username {
                    println!("@{}", username);
                }
                if let Some(phone) = ctx.telegram.phone_number() {
                    println!("{}", phone);
                }
            }
            None => println!("{}", i18n::tr(Some(lang), "telegram.unavailable", None)),
        },
    }

    Ok(())
}

async fn run_events(ctx: &AppContext, command: EventsCommand) -> AppResult<()> {
    let mut editor = ctx.events_editor()?;
    let lang = ctx.config.lang.clone();

    match command {
        EventsCommand::List { event_type, month } => {
            let fetched = editor.set_filter(EventFilter { event_type, month }).await?;
            if !fetched {
                editor.refresh().await?;
            }
            if editor.events().is_empty() {
                println!("{}", i18n::tr(Some(&lang), "events.empty", None));
            }
            for event in editor.events() {
                println!("{:>6}  {}", event.id, event_line(event, &lang));
            }
        }
        EventsCommand::Create { fields } => {
            editor.open_create();
            let form = apply_fields(EventForm::default(), fields).await?;
            if let Some(slot) = editor.form_mut() {
                *slot = form;
            }
            submit(&mut editor).await;
        }
        EventsCommand::Edit { id, fields } => {
            editor.refresh().await?;
            editor.open_edit(&id)?;
            if let Some(slot) = editor.form_mut() {
                let current = std::mem::take(slot);
                *slot = apply_fields(current, fields).await?;
            }
            submit(&mut editor).await;
        }
        EventsCommand::Delete { id, yes } => {
            editor.refresh().await?;
            editor.request_delete(&id)?;
            if !yes && !confirm(&editor.confirmation_prompt().unwrap_or_default()).await? {
                editor.cancel();
                return Ok(());
            }
            if let Err(e) = editor.confirm_delete().await {
                editor_failure(&editor, &e);
            }
            println!("{}", editor.notice().unwrap_or_default());
        }
    }

    Ok(())
}

async fn submit(editor: &mut EventsEditor) {
    if let Err(e) = editor.submit().await {
        editor_failure(editor, &e);
    }
    println!("{}", editor.notice().unwrap_or_default());
}

/// Prints the message the editor chose for a failed write and exits.
fn editor_failure(editor: &EventsEditor, err: &AppError) -> ! {
    tracing::debug!("Editor operation failed: {:?}", err);
    eprintln!("{}", editor.error().unwrap_or_default());
    std::process::exit(1);
}

async fn apply_fields(mut form: EventForm, fields: EventFields) -> AppResult<EventForm> {
    if let Some(date) = fields.date {
        form.date = date;
    }
    if let Some(month) = fields.month {
        form.month = month;
    }
    if let Some(performer) = fields.performer {
        form.performer = performer;
    }
    if let Some(time) = fields.time {
        form.time = time;
    }
    if let Some(event_type) = fields.event_type {
        form.event_type = event_type;
    }
    if let Some(custom_type) = fields.custom_type {
        form.custom_type = custom_type;
    }
    if let Some(highlighted) = fields.highlighted {
        form.is_highlighted = highlighted;
    }
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(location) = fields.location {
        form.location = location;
    }
    if let Some(active) = fields.active {
        form.is_active = active;
    }
    if let Some(order) = fields.order {
        form.display_order = order;
    }
    if let Some(path) = fields.image {
        form.image = Some(ImageUpload::from_path(&path).await?);
    }
    Ok(form)
}

async fn confirm(prompt: &str) -> AppResult<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout()
        .flush()
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да"))
}

async fn run_ai(ctx: &AppContext, command: AiCommand) -> AppResult<()> {
    match command {
        AiCommand::Ask { prompt } => {
            println!("{}", ctx.ai.generate_text(&prompt.join(" ")).await?);
        }
        AiCommand::Suggest {
            branch,
            preferences,
        } => {
            let menu = ctx.menu.get_menu(&branch).await;
            let reply = ctx
                .ai
                .suggest_menu_items(&preferences.join(" "), &menu)
                .await?;
            println!("{}", reply);
        }
        AiCommand::Describe { event_id, promo } => {
            let events = ctx.content.events().await?;
            let event = events.iter().find(|e| e.id == event_id).ok_or_else(|| {
                AppError::NotFound(i18n::tr(
                    Some(&ctx.config.lang),
                    "events.not_found",
                    Some(&[("id", event_id.as_str())]),
                ))
            })?;
            let text = if promo {
                ctx.ai.promotion_text(event).await?
            } else {
                ctx.ai.describe_event(event).await?
            };
            println!("{}", text);
        }
        AiCommand::Reward { points, options } => {
            let rewards: Vec<RewardOption> = options
                .into_iter()
                .map(|(name, points_cost)| RewardOption { name, points_cost })
                .collect();
            println!("{}", ctx.ai.recommend_reward(points, &rewards).await?);
        }
        AiCommand::Chat { session } => {
            let session_id = match session {
                Some(id) => id,
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    ctx.ai.start_chat(&id).await?;
                    id
                }
            };
            tracing::info!("Chat session {}", session_id);

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                print!("> ");
                std::io::stdout()
                    .flush()
                    .map_err(|e| AppError::Internal(e.into()))?;

                let Some(line) = lines
                    .next_line()
                    .await
                    .map_err(|e| AppError::Internal(e.into()))?
                else {
                    break;
                };
                if line.trim().is_empty() {
                    break;
                }

                match ctx.ai.send_chat_message(&session_id, line.trim()).await {
                    Ok(reply) => println!("{}", reply),
                    Err(e) => eprintln!("{}", e.user_message(&ctx.config.lang)),
                }
            }
            ctx.ai.end_chat(&session_id).await;
        }
    }
    Ok(())
}

fn print_menu(menu: &MenuData, lang: &str) {
    if menu.is_empty() {
        println!("{}", i18n::tr(Some(lang), "menu.empty", None));
        return;
    }

    for category in &menu.categories {
        println!("{}", category.name);
        for item in menu.items_in(&category.id) {
            print_menu_item(item);
        }
    }

    let mut uncategorized = menu.uncategorized().peekable();
    if uncategorized.peek().is_some() {
        println!();
        for item in uncategorized {
            print_menu_item(item);
        }
    }
}

fn print_menu_item(item: &cafe_client::models::MenuItem) {
    let marker = if item.is_available { "" } else { " (n/a)" };
    println!("  {:<32} {:>8.2}{}", item.name, item.price, marker);
}

fn event_line(event: &Event, lang: &str) -> String {
    let day = event.day_month();
    let mut line = format!(
        "{} {} {}  {} [{}]",
        day.day_month,
        day.month,
        event.time_label(),
        event.performer,
        event.type_label(lang)
    );
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!(" @ {}", location));
    }
    line
}
