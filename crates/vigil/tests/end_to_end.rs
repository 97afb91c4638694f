//! End-to-end: a page session, a disappearance watch, and a table check
//! wired together the way the binary wires them.

use core::time::Duration;
use dom::{ClassSelector, DocUpdate};
use page::{PageConfig, PageSession};
use std::io::Write as _;
use tokio::time::{self, Instant};
use url::Url;
use watch::{DisappearanceWatch, Resolution, check_tables_ready};

const SAMPLE: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <div class="swal2-buttonswrapper swal2-loading"></div>
    <table><tr><td>A</td></tr></table>
    <table><tr><td>B</td></tr></table>
    <table><tr><td>C</td></tr></table>
  </body>
</html>"#;

fn sample_file_url() -> (tempfile::NamedTempFile, Url) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    let url = Url::from_file_path(file.path()).unwrap();
    (file, url)
}

#[tokio::test(start_paused = true)]
async fn overlay_removal_resolves_a_session_watch() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (_file, url) = sample_file_url();
    let mut session = PageSession::load(url, &PageConfig::default()).await.unwrap();

    let selector = ClassSelector::from_class_string("swal2-buttonswrapper swal2-loading").unwrap();
    let watch = DisappearanceWatch::new(
        session.subscribe_updates(),
        session.shared_index(),
        selector.clone(),
        Duration::from_millis(10_000),
    );

    session.run_until_loaded().await.unwrap();
    assert!(check_tables_ready(&session.shared_index(), "table", 3, |_| {}).unwrap());

    // The host application's work finishes: the overlay goes away.
    let overlay = {
        let shared = session.shared_index();
        let found = shared.lock().unwrap().first_match(&selector).unwrap();
        found
    };
    let waiter = tokio::spawn(watch.wait());
    time::sleep(Duration::from_millis(200)).await;
    session
        .updater()
        .send(vec![DocUpdate::RemoveNode { node: overlay }])
        .await
        .unwrap();
    session.update().await.unwrap();

    let resolution = waiter.await.unwrap().unwrap();
    assert_eq!(resolution, Resolution::Disappeared);
}

#[tokio::test(start_paused = true)]
async fn untouched_overlay_times_out() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (_file, url) = sample_file_url();
    let mut session = PageSession::load(url, &PageConfig::default()).await.unwrap();

    let watch = DisappearanceWatch::new(
        session.subscribe_updates(),
        session.shared_index(),
        ClassSelector::from_class_string("swal2-buttonswrapper swal2-loading").unwrap(),
        Duration::from_millis(1_000),
    );
    session.run_until_loaded().await.unwrap();

    let start = Instant::now();
    let resolution = watch.wait().await.unwrap();
    assert_eq!(resolution, Resolution::TimedOut);
    assert!(start.elapsed() >= Duration::from_millis(1_000));
}
