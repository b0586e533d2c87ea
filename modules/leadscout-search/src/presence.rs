use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use leadscout_common::normalize_phone;

use crate::traits::PresenceChecker;

/// Check WhatsApp presence for each phone, at most `concurrency` in flight.
///
/// Output is aligned with input. `None` means unknown: no phone, a phone that
/// does not normalize, or a failed check. A failure never aborts the batch.
pub async fn check_presence(
    checker: &dyn PresenceChecker,
    phones: &[Option<String>],
    concurrency: usize,
) -> Vec<Option<bool>> {
    let checks = phones.iter().cloned().map(|phone| async move {
        let normalized = phone.as_deref().and_then(normalize_phone)?;
        match checker.has_whatsapp(&normalized).await {
            Ok(exists) => Some(exists),
            Err(e) => {
                warn!(error = %e, "WhatsApp presence check failed, leaving unknown");
                None
            }
        }
    });

    let flags: Vec<Option<bool>> = stream::iter(checks)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    debug!(
        checked = flags.iter().filter(|f| f.is_some()).count(),
        on_whatsapp = flags.iter().filter(|f| **f == Some(true)).count(),
        "Presence checks finished"
    );
    flags
}
