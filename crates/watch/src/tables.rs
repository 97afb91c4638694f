use anyhow::{Error, anyhow, bail};
use dom::{NodeKey, SharedQueryIndex};
use log::{debug, trace};

/// One-shot check that exactly `expected_count` elements of `tag_name` are
/// currently present.
///
/// On an exact match, `on_ready` is invoked synchronously with the
/// document-order snapshot and `Ok(true)` is returned. On any other count
/// (higher or lower) nothing happens: no callback, no retry, no error,
/// just `Ok(false)`. This is a point-in-time check, not a wait;
/// re-invoking it (e.g. from a render-complete event) is the caller's
/// responsibility.
pub fn check_tables_ready<F: FnOnce(Vec<NodeKey>)>(
    index: &SharedQueryIndex,
    tag_name: &str,
    expected_count: usize,
    on_ready: F,
) -> Result<bool, Error> {
    if tag_name.trim().is_empty() {
        bail!("tag name must not be empty");
    }
    let snapshot = {
        let guard = index
            .lock()
            .map_err(|_| anyhow!("query index state poisoned"))?;
        guard.elements_by_tag_name(tag_name)
    };
    if snapshot.len() == expected_count {
        debug!("tables: all {expected_count} <{tag_name}> elements present");
        on_ready(snapshot);
        Ok(true)
    } else {
        trace!(
            "tables: {} of {expected_count} <{tag_name}> elements present",
            snapshot.len()
        );
        Ok(false)
    }
}
