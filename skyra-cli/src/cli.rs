use anyhow::{Context, anyhow};
use chrono::Timelike;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, Password, Select, Text};

use skyra_core::backend::{SignedIn, UserUpdate};
use skyra_core::display::{display_name, greeting};
use skyra_core::forecast::{DAILY_WINDOW, HOURLY_SLOTS, bucket_daily, hourly};
use skyra_core::onboarding::PAGES;
use skyra_core::search::SearchDebouncer;
use skyra_core::{
    Config, LocationQuery, ProviderId, TemperatureUnit, ThemeName, WeatherProvider,
};

use crate::context::AppContext;
use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyra", version, about = "Weather in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where to look up the weather. Defaults to the first favorite.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// City name, e.g. "Paris" or "Paris,FR".
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub city: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the weather API key and the account backend.
    Configure,

    /// Current conditions and the next few hours.
    Now {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// One line per day for the coming days.
    Forecast {
        #[command(flatten)]
        location: LocationArgs,

        #[arg(long, default_value_t = DAILY_WINDOW)]
        days: usize,
    },

    /// Look up cities by name.
    Search {
        query: String,

        /// Choose a suggestion and show its weather.
        #[arg(long)]
        pick: bool,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },

    /// Sign up, sign in and manage the account.
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },

    /// Units and theme.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// First-run introduction.
    Onboarding {
        #[command(subcommand)]
        action: OnboardingCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    List,
    Add { city: String },
    Remove { city: String },
    /// Current conditions for every favorite.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Signup {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    Logout,
    ResetPassword {
        #[arg(long)]
        email: Option<String>,
    },
    Whoami,
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// C or F.
    TempUnit { value: String },
    /// mph or kph.
    WindUnit { value: String },
    /// light, dark or system.
    Theme { value: String },
}

#[derive(Debug, Subcommand)]
pub enum OnboardingCommand {
    /// Show the introduction again.
    Reset,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Now { location } => now(&ready()?, location).await,
            Command::Forecast { location, days } => forecast(&ready()?, location, days).await,
            Command::Search { query, pick } => search(&ready()?, &query, pick).await,
            Command::Favorites { action } => favorites(&ready()?, action).await,
            Command::Auth { action } => auth(&ready()?, action).await,
            Command::Settings { action } => settings(&ready()?, action).await,
            Command::Onboarding { action: OnboardingCommand::Reset } => {
                let ctx = AppContext::load()?;
                ctx.onboarding().reset()?;
                show_onboarding_once(&ctx)
            }
        }
    }
}

/// Context for the weather and account commands, after the first-run intro.
fn ready() -> anyhow::Result<AppContext> {
    let ctx = AppContext::load()?;
    show_onboarding_once(&ctx)?;
    Ok(ctx)
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load_from(&Config::config_file_path()?)?;
    let id = ProviderId::OpenWeather;

    let current_key = cfg.provider_api_key(id).unwrap_or_default().to_string();
    let api_key = Text::new("OpenWeather API key:")
        .with_default(&current_key)
        .prompt()?;
    if !api_key.trim().is_empty() {
        cfg.upsert_provider_api_key(id, api_key.trim().to_string());
        cfg.set_default_provider(id);
    }

    if Confirm::new("Configure an account backend (Supabase)?")
        .with_default(cfg.backend.is_some())
        .prompt()?
    {
        let (url, key) = cfg
            .backend
            .as_ref()
            .map(|b| (b.url.clone(), b.anon_key.clone()))
            .unwrap_or_default();
        let url = Text::new("Project URL:").with_default(&url).prompt()?;
        let anon_key = Text::new("Anon key:").with_default(&key).prompt()?;
        cfg.set_backend(url.trim().to_string(), anon_key.trim().to_string());
    }

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn show_onboarding_once(ctx: &AppContext) -> anyhow::Result<()> {
    let onboarding = ctx.onboarding();
    if onboarding.is_complete()? {
        return Ok(());
    }

    for (title, body) in PAGES {
        println!("{title}\n  {body}\n");
    }
    onboarding.complete()
}

async fn resolve_location(
    ctx: &AppContext,
    user: Option<&SignedIn>,
    args: LocationArgs,
) -> anyhow::Result<LocationQuery> {
    if let Some(city) = args.city {
        return Ok(LocationQuery::City(city));
    }
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        return Ok(LocationQuery::coords(lat, lon));
    }

    let favorites = ctx.favorites().load(user).await?;
    favorites.first().map(LocationQuery::city).ok_or_else(|| {
        anyhow!(
            "No location given and no favorite cities saved.\n\
             Hint: pass --city <NAME> or --lat <LAT> --lon <LON>."
        )
    })
}

async fn print_hourly(provider: &dyn WeatherProvider, query: &LocationQuery, prefs: &skyra_core::Preferences) {
    match provider.forecast(query).await {
        Ok(f) => println!(
            "\nNext hours\n{}",
            render::hourly(hourly(&f.entries, HOURLY_SLOTS), prefs, f.timezone_offset)
        ),
        Err(err) => tracing::warn!("hourly forecast unavailable: {err:#}"),
    }
}

async fn now(ctx: &AppContext, location: LocationArgs) -> anyhow::Result<()> {
    let provider = ctx.provider()?;
    let user = ctx.signed_in().await;
    let prefs = ctx.preferences().load(user.as_ref()).await?;
    let query = resolve_location(ctx, user.as_ref(), location).await?;

    let hello = greeting(chrono::Local::now().hour());
    match &user {
        Some(u) => println!("{hello}, {}!\n", display_name(&u.user)),
        None => println!("{hello}!\n"),
    }

    let snap = provider
        .current(&query)
        .await
        .with_context(|| format!("Failed to fetch weather for {query}"))?;
    println!("{}", render::current(&snap, &prefs));

    print_hourly(provider.as_ref(), &query, &prefs).await;
    Ok(())
}

async fn forecast(ctx: &AppContext, location: LocationArgs, days: usize) -> anyhow::Result<()> {
    let provider = ctx.provider()?;
    let user = ctx.signed_in().await;
    let prefs = ctx.preferences().load(user.as_ref()).await?;
    let query = resolve_location(ctx, user.as_ref(), location).await?;

    let feed = provider
        .forecast(&query)
        .await
        .with_context(|| format!("Failed to fetch forecast for {query}"))?;

    let heading = match (&feed.city_name, &feed.country) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        _ => query.to_string(),
    };
    println!("{heading}\n{}", render::daily(&bucket_daily(&feed.entries, days), &prefs));
    Ok(())
}

async fn search(ctx: &AppContext, query: &str, pick: bool) -> anyhow::Result<()> {
    let provider = ctx.provider()?;
    let suggestions = SearchDebouncer::default()
        .suggest(provider.as_ref(), query)
        .await;

    let target = if suggestions.is_empty() {
        // Nothing from geocoding: try the text as a city name directly.
        LocationQuery::city(query.trim())
    } else if pick {
        Select::new("Choose a city:", suggestions).prompt()?.query()
    } else {
        for (i, s) in suggestions.iter().enumerate() {
            println!("{}. {}  ({:.2}, {:.2})", i + 1, s.label(), s.lat, s.lon);
        }
        return Ok(());
    };

    let user = ctx.signed_in().await;
    let prefs = ctx.preferences().load(user.as_ref()).await?;
    let snap = provider.current(&target).await?;
    println!("{}", render::current(&snap, &prefs));
    print_hourly(provider.as_ref(), &target, &prefs).await;

    let Some(city) = snap.city_name.clone() else {
        return Ok(());
    };
    if !pick {
        return Ok(());
    }

    let repo = ctx.favorites();
    let is_favorite = repo.load(user.as_ref()).await?.contains(&city);
    let question = if is_favorite {
        format!("Remove {city} from favorites?")
    } else {
        format!("Add {city} to favorites?")
    };
    if Confirm::new(&question).with_default(!is_favorite).prompt()? {
        if is_favorite {
            repo.remove_city(user.as_ref(), &city).await?;
        } else {
            repo.add_city(user.as_ref(), &city).await?;
        }
    }
    Ok(())
}

async fn favorites(ctx: &AppContext, action: FavoritesCommand) -> anyhow::Result<()> {
    let user = ctx.signed_in().await;
    let repo = ctx.favorites();

    match action {
        FavoritesCommand::List => {
            let favorites = repo.load(user.as_ref()).await?;
            if favorites.is_empty() {
                println!("No favorites yet. Add one with `skyra favorites add <CITY>`.");
            }
            for city in favorites.iter() {
                println!("{city}");
            }
        }
        FavoritesCommand::Add { city } => {
            let (_, changed) = repo.add_city(user.as_ref(), &city).await?;
            if changed {
                println!("Added {} to favorites.", city.trim());
            } else {
                println!("{} is already a favorite.", city.trim());
            }
        }
        FavoritesCommand::Remove { city } => {
            let (_, changed) = repo.remove_city(user.as_ref(), &city).await?;
            if changed {
                println!("Removed {} from favorites.", city.trim());
            } else {
                println!("{} was not a favorite.", city.trim());
            }
        }
        FavoritesCommand::Show => {
            let provider = ctx.provider()?;
            let favorites = repo.load(user.as_ref()).await?;
            if favorites.is_empty() {
                println!("No favorites yet.");
            }
            for city in favorites.iter() {
                match provider.current(&LocationQuery::city(city)).await {
                    Ok(snap) => println!("{}", render::favorite_line(city, &snap)),
                    Err(err) => {
                        tracing::debug!(%city, "favorite lookup failed: {err:#}");
                        println!("{city}: Failed to fetch weather.");
                    }
                }
            }
        }
    }
    Ok(())
}

fn prompt_or(value: Option<String>, label: &str) -> anyhow::Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Text::new(label).prompt()?),
    }
}

async fn auth(ctx: &AppContext, action: AuthCommand) -> anyhow::Result<()> {
    let sessions = ctx.sessions()?;

    match action {
        AuthCommand::Signup { email, name } => {
            let name = prompt_or(name, "Name:")?;
            let email = prompt_or(email, "Email:")?;
            let password = Password::new("Password:").prompt()?;
            let name = Some(name.trim()).filter(|n| !n.is_empty());

            let outcome = sessions.sign_up(email.trim(), &password, name).await?;
            match outcome.session {
                Some(session) => println!("Welcome, {}!", display_name(&session.user)),
                None => println!(
                    "Check your email! We've sent a confirmation link to {}.",
                    email.trim()
                ),
            }
        }
        AuthCommand::Login { email } => {
            let email = prompt_or(email, "Email:")?;
            let password = Password::new("Password:").without_confirmation().prompt()?;
            let session = sessions.sign_in(email.trim(), &password).await?;
            println!("Welcome back, {}!", display_name(&session.user));
        }
        AuthCommand::Logout => {
            sessions.sign_out().await?;
            println!("Signed out.");
        }
        AuthCommand::ResetPassword { email } => {
            let known = ctx.signed_in().await.and_then(|u| u.user.email);
            let email = prompt_or(email.or(known), "Email:")?;
            let confirmed = Confirm::new(&format!("Send a password reset email to {email}?"))
                .with_default(true)
                .prompt()?;
            if confirmed {
                sessions.reset_password(email.trim()).await?;
                println!("Password reset email sent!");
            }
        }
        AuthCommand::Whoami => {
            let user = sessions.fetch_user().await?;
            println!("{}", display_name(&user));
            println!("email: {}", user.email.as_deref().unwrap_or("--"));
            println!("id:    {}", user.id);
        }
        AuthCommand::UpdateProfile { name, email } => {
            let update = UserUpdate { email, name };
            if update.is_empty() {
                println!("Nothing to update. Pass --name and/or --email.");
                return Ok(());
            }
            sessions.update_profile(&update).await?;
            if update.email.is_some() {
                println!("Check your new email to confirm the change.");
            } else {
                println!("Profile updated!");
            }
        }
    }
    Ok(())
}

async fn settings(ctx: &AppContext, action: SettingsCommand) -> anyhow::Result<()> {
    let user = ctx.signed_in().await;
    let repo = ctx.preferences();

    let (prefs, outcome) = match action {
        SettingsCommand::Show => {
            let prefs = repo.load(user.as_ref()).await?;
            let system_dark =
                render::terminal_prefers_dark(std::env::var("COLORFGBG").ok().as_deref());
            println!("temperature: {}", prefs.temp_unit);
            println!("wind:        {}", prefs.wind_unit);
            println!(
                "theme:       {} ({})",
                prefs.theme,
                render::theme_mode(prefs.theme.resolve(system_dark))
            );
            match &user {
                Some(u) => println!("account:     {}", u.user.email.as_deref().unwrap_or(&u.user.id)),
                None => println!("account:     not signed in, settings stay on this device"),
            }
            return Ok(());
        }
        SettingsCommand::TempUnit { value } => {
            let unit = TemperatureUnit::try_from(value.as_str())?;
            repo.update(user.as_ref(), |p| p.temp_unit = unit).await?
        }
        SettingsCommand::WindUnit { value } => {
            let unit = skyra_core::WindUnit::try_from(value.as_str())?;
            repo.update(user.as_ref(), |p| p.wind_unit = unit).await?
        }
        SettingsCommand::Theme { value } => {
            let theme = ThemeName::try_from(value.as_str())?;
            repo.update(user.as_ref(), |p| p.theme = theme).await?
        }
    };

    tracing::debug!(?prefs, ?outcome, "preferences updated");
    println!("{}", render::save_outcome(&outcome));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn configure_and_onboarding_reset_parse() {
        let cli = Cli::try_parse_from(["skyra", "configure"]).unwrap();
        assert!(matches!(cli.command, Command::Configure));

        let cli = Cli::try_parse_from(["skyra", "onboarding", "reset"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Onboarding { action: OnboardingCommand::Reset }
        ));
    }

    #[test]
    fn parses_coordinates_with_negative_values() {
        let cli = Cli::try_parse_from(["skyra", "now", "--lat", "-33.87", "--lon", "151.21"]).unwrap();
        match cli.command {
            Command::Now { location } => {
                assert_eq!(location.lat, Some(-33.87));
                assert_eq!(location.lon, Some(151.21));
                assert!(location.city.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn city_conflicts_with_coordinates() {
        let err = Cli::try_parse_from(["skyra", "now", "--city", "Oslo", "--lat", "1", "--lon", "2"]);
        assert!(err.is_err());
    }

    #[test]
    fn latitude_requires_longitude() {
        assert!(Cli::try_parse_from(["skyra", "forecast", "--lat", "10"]).is_err());
    }

    #[test]
    fn forecast_days_default_to_window() {
        let cli = Cli::try_parse_from(["skyra", "forecast", "--city", "Rome"]).unwrap();
        match cli.command {
            Command::Forecast { days, .. } => assert_eq!(days, DAILY_WINDOW),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn settings_subcommands_parse() {
        let cli = Cli::try_parse_from(["skyra", "settings", "wind-unit", "kph"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Settings { action: SettingsCommand::WindUnit { .. } }
        ));
    }
}
