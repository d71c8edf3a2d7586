use question_shaper_admin::client::HttpApiClient;
use question_shaper_admin::config::AppConfig;
use question_shaper_admin::selector::{AcademicHierarchy, CascadingSelector, Level};
use question_shaper_admin::services::AuthService;
use question_shaper_admin::session::SessionContext;
use question_shaper_admin::UserContext;
use std::str::FromStr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::from_str(&config.logging.level).unwrap_or(LevelFilter::Info))
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .init();

    println!("QuestionShaper admin: {}", config.api.base_url());

    let (email, password) = config.credentials()?;
    let session = Arc::new(SessionContext::new());
    let client = Arc::new(HttpApiClient::new(&config.api, session.clone())?);

    let auth = AuthService::new(client.clone(), session);
    auth.login(&email, &password, UserContext::new(email.clone(), config.auth.role))
        .await?;
    println!("Logged in as {}", email);

    let selector = CascadingSelector::new(Arc::new(AcademicHierarchy::new(client)));
    selector.load_root().await?;
    print_level(&selector, Level::Class, 0).await?;

    Ok(())
}

/// Walk the hierarchy depth first by selecting each option in turn.
async fn print_level(
    selector: &CascadingSelector,
    level: Level,
    depth: usize,
) -> anyhow::Result<()> {
    for node in selector.options(level) {
        match node.sort_key {
            Some(key) => println!("{}{} [{}]", "  ".repeat(depth), node.name, key),
            None => println!("{}{}", "  ".repeat(depth), node.name),
        }

        if let Some(child) = level.child() {
            selector.select_at(level, &node.id).await?;
            Box::pin(print_level(selector, child, depth + 1)).await?;
        }
    }
    Ok(())
}
