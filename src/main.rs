use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use composer_api::{Backend, EntityId, HttpBackend};
use lsa_composer::binding::{BindingStore, ClassificationField};
use lsa_composer::cli::{self, HELP, SessionCommand};
use lsa_composer::{
    AppSettings, Composer, ComposerConfig, ComposerError, FetchWorker, LsaBindings, Overview,
    SgBindings,
};

#[derive(Parser)]
#[command(name = "composer", version, about = "Bind LSAs or SGs to routes")]
struct Cli {
    /// Backend base URL, overrides the settings file
    #[arg(long, env = "COMPOSER_BACKEND_URL")]
    backend_url: Option<String>,
    /// Request timeout in seconds, overrides the settings file
    #[arg(long)]
    timeout: Option<u64>,
    /// Log level (error, warn, info, debug, trace), overrides the settings file
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Lsa,
    Sg,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive composer session for one route
    Compose {
        #[arg(long, value_enum, default_value_t = Kind::Lsa)]
        kind: Kind,
        /// Composer query string, e.g. `?route_id=12&lsa_id=7`
        #[arg(long, conflicts_with = "route_id")]
        query: Option<String>,
        #[arg(long, required_unless_present = "query")]
        route_id: Option<String>,
        #[arg(long)]
        lsa_id: Option<String>,
        /// `false` hides bindings already present on other routes
        #[arg(long)]
        show_duplicates: Option<String>,
        #[arg(long)]
        map_data: Option<String>,
    },
    /// Print the binding overview and consistency report
    Overview {
        #[arg(long)]
        map_data: Option<String>,
        /// List the bindings below every constellation and route error
        #[arg(long)]
        expand: bool,
    },
    /// Write the current settings to the settings file
    InitSettings,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = AppSettings::load_or_default();
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    if let Some(timeout) = cli.timeout {
        settings.request_timeout_secs = timeout;
    }

    env_logger::Builder::new()
        .filter_level(
            cli.log_level
                .and_then(|level| level.parse::<log::LevelFilter>().ok())
                .unwrap_or_else(|| settings.log_level.to_level_filter()),
        )
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Compose {
            kind,
            query,
            route_id,
            lsa_id,
            show_duplicates,
            map_data,
        } => {
            let config = match (query, route_id) {
                (Some(query), _) => ComposerConfig::from_query(&query)?,
                (None, Some(route_id)) => ComposerConfig::new(route_id)
                    .with_lsa_id(lsa_id.as_deref())
                    .with_show_duplicates(show_duplicates.as_deref())
                    .with_map_data(map_data.as_deref()),
                (None, None) => return Err(lsa_composer::ConfigError::MissingRouteId.into()),
            };
            let worker = FetchWorker::spawn(connect(&settings)?)?;
            let timeout = settle_timeout(&settings);
            match kind {
                Kind::Lsa => {
                    let composer = Composer::<LsaBindings, _>::new(worker);
                    run_session(composer, config, timeout, Some(classify_lsa))?;
                }
                Kind::Sg => {
                    let composer = Composer::<SgBindings, _>::new(worker);
                    run_session(composer, config, timeout, None)?;
                }
            }
        }
        Commands::Overview { map_data, expand } => {
            let worker = FetchWorker::spawn(connect(&settings)?)?;
            let mut overview = Overview::new(worker, map_data);
            overview.refresh();
            if !overview.settle(settle_timeout(&settings)) {
                log::warn!("Overview still loading after timeout");
            }
            if expand {
                let view = overview.view();
                for row in view.constellations.iter().chain(&view.route_errors) {
                    overview.toggle_expanded(row.kind, row.pk);
                }
            }
            print!("{}", cli::render_overview(&overview.view()));
        }
        Commands::InitSettings => {
            settings.save_to_default_path()?;
            if let Some(path) = AppSettings::default_path() {
                println!("Settings written to {}", path.display());
            }
        }
    }

    Ok(())
}

fn connect(settings: &AppSettings) -> Result<Arc<dyn Backend>, composer_api::ApiError> {
    let backend = HttpBackend::new(&settings.backend_url, settings.request_timeout())?;
    log::info!("Using backend {}", settings.backend_url);
    Ok(Arc::new(backend))
}

/// Longest wait for the next result before a session step gives up.
fn settle_timeout(settings: &AppSettings) -> Duration {
    settings.request_timeout() + Duration::from_secs(1)
}

type Classify<S> = fn(
    &mut Composer<S, FetchWorker>,
    &EntityId,
    ClassificationField,
    Option<i64>,
) -> Result<bool, ComposerError>;

fn classify_lsa(
    composer: &mut Composer<LsaBindings, FetchWorker>,
    id: &EntityId,
    field: ClassificationField,
    value: Option<i64>,
) -> Result<bool, ComposerError> {
    composer.set_classification(id, field, value)
}

fn run_session<S: BindingStore + Default>(
    mut composer: Composer<S, FetchWorker>,
    config: ComposerConfig,
    timeout: Duration,
    classify: Option<Classify<S>>,
) -> io::Result<()> {
    let kind = S::KIND;
    composer.mount(config);
    settle(&mut composer, timeout);
    print!("{}", cli::render_composer(&composer.view()));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = match SessionCommand::parse(&line) {
            Ok(command) => command,
            Err(lsa_composer::cli::CommandError::Empty) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let outcome: Result<(), ComposerError> = match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => {
                println!("{}", HELP);
                continue;
            }
            SessionCommand::Show => Ok(()),
            SessionCommand::Click(id) => composer.click_entity(&id).map(|state| {
                println!("{} {}: {}", kind.name(), id, state.color().name());
            }),
            SessionCommand::Check(id) => composer.toggle_checkbox(&id).map(|_| ()),
            SessionCommand::Remove(id) => composer.remove(&id).map(|removed| {
                if !removed {
                    println!("{} {} is not bound", kind.name(), id);
                }
            }),
            SessionCommand::Focus(id) => composer.focus_entity(&id),
            SessionCommand::Crossing(id) => composer.select_crossing(&id).map(|_| ()),
            SessionCommand::Hover(id) => {
                composer.hover(&id);
                settle(&mut composer, timeout);
                println!("{}", cli::render_tooltip(kind, &composer.hover(&id)));
                continue;
            }
            SessionCommand::Classify { id, field, value } => match classify {
                Some(classify) => classify(&mut composer, &id, field, value).map(|changed| {
                    if !changed {
                        println!("{} {} is not bound", kind.name(), id);
                    }
                }),
                None => {
                    println!("Classifications only apply to LSA bindings");
                    continue;
                }
            },
            SessionCommand::Catalog => {
                for field in ClassificationField::ALL {
                    println!("{}:", field);
                    for entry in composer.catalog().entries(field) {
                        println!("  {} {}", entry.pk, entry.fields.name);
                    }
                }
                continue;
            }
            SessionCommand::Resize(width, height) => {
                composer.resize(width, height);
                Ok(())
            }
            SessionCommand::Submit => composer.submit(),
            SessionCommand::Next => composer.advance(),
            SessionCommand::Retry => {
                let resent = composer.retry_failed();
                println!("Retrying {} requests", resent);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("{}", e);
        }
        settle(&mut composer, timeout);

        if let Some(navigation) = composer.take_navigation() {
            println!("Opening {}", navigation.href());
            composer.mount(navigation.config());
            settle(&mut composer, timeout);
        }
        print!("{}", cli::render_composer(&composer.view()));
        composer.dismiss_notices();
    }

    composer.unmount();
    Ok(())
}

fn settle<S: BindingStore>(composer: &mut Composer<S, FetchWorker>, timeout: Duration) {
    composer.pump();
    if !composer.settle(timeout) {
        log::warn!("Backend did not answer within {:?}", timeout);
    }
}
