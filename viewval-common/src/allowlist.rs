//! Channel allow-list file
//!
//! Plain text, one channel login per line. Blank lines and lines starting
//! with `#` (after trimming) are ignored. Logins are lower-cased and
//! de-duplicated, keeping first-seen order.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::{ChannelId, Result};

/// Parse allow-list content
pub fn parse_channel_list(content: &str) -> Vec<ChannelId> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| ChannelId::new(line).ok())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Load the allow-list from disk
///
/// A missing file is an empty list, not an error.
pub fn load_channel_list(path: &Path) -> Result<Vec<ChannelId>> {
    if !path.exists() {
        debug!(path = %path.display(), "Channel list not found, using empty list");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let channels = parse_channel_list(&content);
    debug!(path = %path.display(), count = channels.len(), "Loaded channel list");
    Ok(channels)
}
