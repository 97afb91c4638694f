use core::time::Duration;
use dom::{ClassSelector, DocUpdate, Document, NodeKey};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};
use watch::{DisappearanceWatch, Resolution, watch_for_disappearance};

const SPINNER: NodeKey = NodeKey(2);

fn spinner_page() -> Vec<DocUpdate> {
    let body = NodeKey(1);
    vec![
        DocUpdate::InsertElement {
            parent: NodeKey::ROOT,
            node: body,
            tag: "body".into(),
            pos: 0,
        },
        DocUpdate::InsertElement {
            parent: body,
            node: SPINNER,
            tag: "div".into(),
            pos: 0,
        },
        DocUpdate::SetAttr {
            node: SPINNER,
            name: "class".into(),
            value: "spinner".into(),
        },
        DocUpdate::EndOfDocument,
    ]
}

fn unrelated_mutation(key: u64) -> Vec<DocUpdate> {
    vec![DocUpdate::InsertElement {
        parent: NodeKey(1),
        node: NodeKey(key),
        tag: "p".into(),
        pos: 0,
    }]
}

/// Document driven in a background task, fed through `sender`.
fn open_document() -> (Document, mpsc::Sender<Vec<DocUpdate>>) {
    let (out_sender, _) = broadcast::channel(16);
    let (in_sender, in_receiver) = mpsc::channel(16);
    (Document::new(out_sender, in_receiver), in_sender)
}

#[tokio::test(start_paused = true)]
async fn removal_resolves_near_removal_time() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let shared = document.shared_index();
    let watch = DisappearanceWatch::new(
        document.subscribe(),
        shared,
        ClassSelector::parse(".spinner").unwrap(),
        Duration::from_millis(1000),
    );
    tokio::spawn(document.run());
    sender.send(spinner_page()).await.unwrap();

    tokio::spawn(async move {
        time::sleep(Duration::from_millis(200)).await;
        sender
            .send(vec![DocUpdate::RemoveNode { node: SPINNER }])
            .await
            .unwrap();
    });

    let start = Instant::now();
    let resolution = watch.wait().await.unwrap();
    let elapsed = start.elapsed();
    assert_eq!(resolution, Resolution::Disappeared);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1000), "resolved at {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn no_removal_resolves_at_the_timeout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let watch = DisappearanceWatch::new(
        document.subscribe(),
        document.shared_index(),
        ClassSelector::parse(".spinner").unwrap(),
        Duration::from_millis(1000),
    );
    tokio::spawn(document.run());
    sender.send(spinner_page()).await.unwrap();

    let start = Instant::now();
    let resolution = watch.wait().await.unwrap();
    assert_eq!(resolution, Resolution::TimedOut);
    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn callback_fires_exactly_once_despite_later_mutations() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let updates = document.subscribe();
    let shared = document.shared_index();
    tokio::spawn(document.run());
    sender.send(spinner_page()).await.unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let mutator = sender.clone();
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(200)).await;
        mutator
            .send(vec![DocUpdate::RemoveNode { node: SPINNER }])
            .await
            .unwrap();
    });

    let resolution = watch_for_disappearance(
        updates,
        shared,
        "spinner",
        Duration::from_millis(1000),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    )
    .await
    .unwrap();
    assert_eq!(resolution, Resolution::Disappeared);

    // Additional unrelated mutations after resolution reach nobody: the
    // subscription was dropped with the watch.
    for key in 50..55 {
        sender.send(unrelated_mutation(key)).await.unwrap();
    }
    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn identical_watches_resolve_independently() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let selector = ClassSelector::parse(".spinner").unwrap();
    let first = DisappearanceWatch::new(
        document.subscribe(),
        document.shared_index(),
        selector.clone(),
        Duration::from_millis(1000),
    );
    let second = DisappearanceWatch::new(
        document.subscribe(),
        document.shared_index(),
        selector,
        Duration::from_millis(1000),
    );
    tokio::spawn(document.run());
    sender.send(spinner_page()).await.unwrap();

    tokio::spawn(async move {
        time::sleep(Duration::from_millis(200)).await;
        sender
            .send(vec![DocUpdate::RemoveNode { node: SPINNER }])
            .await
            .unwrap();
    });

    let (first, second) = tokio::join!(first.wait(), second.wait());
    assert_eq!(first.unwrap(), Resolution::Disappeared);
    assert_eq!(second.unwrap(), Resolution::Disappeared);
}

#[tokio::test(start_paused = true)]
async fn already_absent_element_resolves_on_the_next_batch() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let watch = DisappearanceWatch::new(
        document.subscribe(),
        document.shared_index(),
        ClassSelector::parse(".spinner").unwrap(),
        Duration::from_millis(1000),
    );
    tokio::spawn(document.run());

    // No element ever matches; there is no initial query, so the watch
    // resolves on the first mutation batch after registration.
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(50)).await;
        sender
            .send(vec![DocUpdate::InsertElement {
                parent: NodeKey::ROOT,
                node: NodeKey(1),
                tag: "body".into(),
                pos: 0,
            }])
            .await
            .unwrap();
    });

    let start = Instant::now();
    let resolution = watch.wait().await.unwrap();
    assert_eq!(resolution, Resolution::Disappeared);
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn compound_class_string_requires_both_classes() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let updates = document.subscribe();
    let shared = document.shared_index();
    tokio::spawn(document.run());

    // The element carries only one of the two classes, so the compound
    // selector built from the space-separated string never matches it and
    // the watch resolves on the first batch.
    sender
        .send(vec![
            DocUpdate::InsertElement {
                parent: NodeKey::ROOT,
                node: NodeKey(1),
                tag: "div".into(),
                pos: 0,
            },
            DocUpdate::SetAttr {
                node: NodeKey(1),
                name: "class".into(),
                value: "swal2-buttonswrapper".into(),
            },
        ])
        .await
        .unwrap();

    let resolution = watch_for_disappearance(
        updates,
        shared,
        "swal2-buttonswrapper swal2-loading",
        Duration::from_millis(1000),
        || {},
    )
    .await
    .unwrap();
    assert_eq!(resolution, Resolution::Disappeared);
}

#[tokio::test(start_paused = true)]
async fn closed_stream_waits_out_the_timer() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, sender) = open_document();
    let watch = DisappearanceWatch::new(
        document.subscribe(),
        document.shared_index(),
        ClassSelector::parse(".spinner").unwrap(),
        Duration::from_millis(500),
    );
    let driver = tokio::spawn(document.run());
    sender.send(spinner_page()).await.unwrap();
    // Closing the intake ends the document task, which drops the broadcast
    // sender; the watch keeps its timer.
    drop(sender);
    driver.await.unwrap().unwrap();

    let start = Instant::now();
    let resolution = watch.wait().await.unwrap();
    assert_eq!(resolution, Resolution::TimedOut);
    assert!(start.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
async fn empty_class_string_fails_fast() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (document, _sender) = open_document();
    let result = watch_for_disappearance(
        document.subscribe(),
        document.shared_index(),
        "   ",
        Duration::from_millis(1000),
        || {},
    )
    .await;
    assert!(result.is_err());
}
