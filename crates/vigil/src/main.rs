use anyhow::Error;
use dom::DocUpdate;
use log::{error, info};
use page::{PageConfig, PageSession, attach_lifecycle_loggers};
use std::env;
use tokio::runtime::Builder;
use url::Url;
use watch::{Resolution, check_tables_ready, watch_for_disappearance};

const DEFAULT_TARGET: &str = "assets/sample.html";
const DEFAULT_CLASS_STRING: &str = "swal2-buttonswrapper swal2-loading";
const DEFAULT_TABLE_COUNT: usize = 3;

pub fn main() {
    env_logger::init();

    // Everything dispatches serially on one thread: update batches, timers,
    // and lifecycle events interleave cooperatively.
    let outcome = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::from)
        .and_then(|runtime| runtime.block_on(run()));
    if let Err(err) = outcome {
        error!("vigil failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let config = PageConfig::from_env();
    let mut args = env::args().skip(1);
    let target = args.next().unwrap_or_else(|| DEFAULT_TARGET.into());
    let class_string = args.next().unwrap_or_else(|| DEFAULT_CLASS_STRING.into());
    let table_count = args
        .next()
        .map(|raw| raw.parse::<usize>())
        .transpose()?
        .unwrap_or(DEFAULT_TABLE_COUNT);

    let url = parse_target(&target)?;
    info!("loading {url}");
    let mut session = PageSession::load(url, &config).await?;
    let _loggers = attach_lifecycle_loggers(&session);

    // Register the watch before driving the load so mutations during the
    // load already count as notifications.
    let updates = session.subscribe_updates();
    let index = session.shared_index();
    let announce = class_string.clone();
    let timeout = config.watch_timeout();
    let watcher = tokio::spawn(async move {
        watch_for_disappearance(updates, index, &announce, timeout, || {
            info!("Element with class {announce:?} has disappeared!");
        })
        .await
    });

    session.run_until_loaded().await?;
    if config.telemetry_enabled {
        info!(
            "telemetry: {} elements loaded from {}",
            session.element_count(),
            session.url()
        );
    }

    let fired = check_tables_ready(&session.shared_index(), "table", table_count, |tables| {
        info!("All tables have appeared: {tables:?}");
    })?;
    if !fired {
        info!("tables: count differs from {table_count}, not ready");
    }

    // Demonstrate the disappearance path: drop the overlay the way the host
    // application would once its work finishes.
    remove_first_match(&mut session, &class_string).await?;

    match watcher.await?? {
        Resolution::Disappeared => info!("watch resolved: element gone"),
        Resolution::TimedOut => info!("watch resolved: timed out after {timeout:?}"),
    }
    Ok(())
}

/// Remove the first element matching the class string, if present, and tick
/// the session so the removal is applied and broadcast.
async fn remove_first_match(session: &mut PageSession, class_string: &str) -> Result<(), Error> {
    let selector = dom::ClassSelector::from_class_string(class_string)?;
    let target = {
        let shared = session.shared_index();
        let found = shared
            .lock()
            .map_err(|_| anyhow::anyhow!("query index state poisoned"))?
            .first_match(&selector);
        found
    };
    let Some(target) = target else {
        info!("no element matches {selector}, nothing to remove");
        return Ok(());
    };
    session
        .updater()
        .send(vec![DocUpdate::RemoveNode { node: target }])
        .await?;
    session.update().await?;
    Ok(())
}

/// Interpret the CLI target as a URL, or as a path relative to the current
/// directory.
fn parse_target(target: &str) -> Result<Url, Error> {
    if let Ok(url) = Url::parse(target) {
        return Ok(url);
    }
    Ok(Url::parse(&format!(
        "file://{}/{target}",
        env::current_dir()?.display()
    ))?)
}
