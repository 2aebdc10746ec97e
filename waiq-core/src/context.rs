//! Periodic ambient context merge
//!
//! Every [`SAMPLE_INTERVAL`] the sampler reads the current Wi-Fi SSID and the
//! freshest last-known location, then folds them into the shared context
//! object under [`keys::CONTEXT`]. Other producers own the remaining keys of
//! that object; the merge only ever touches `wifi`, `lat` and `lon`.
//!
//! Raw sensor values are also mirrored to [`keys::SENSE_WIFI`] and
//! [`keys::SENSE_LOCATION`]. The three writes are independent: a failure of
//! one does not prevent the others.

use crate::error::Error;
use crate::platform::{LocationSource, WifiSource};
use crate::store::{keys, KvStore};
use crate::types::{ContextBlob, Location, LocationProvider};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Interval between context samples
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Placeholder SSID the platform reports when the network name is hidden
pub const UNKNOWN_SSID: &str = "<unknown ssid>";

/// Location mirror value when no fix is available
const NO_LOCATION: &str = "null,null";

/// Normalize a raw SSID: surrounding quotes removed, and the unknown
/// placeholder or a blank name mapped to the empty string.
pub fn normalize_ssid(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let ssid = raw.trim().trim_matches('"');
    if ssid.trim().is_empty() || ssid == UNKNOWN_SSID {
        return String::new();
    }
    ssid.to_string()
}

/// What one sample observed and which writes succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    /// Normalized SSID, empty when unknown or disconnected
    pub ssid: String,
    pub location: Option<Location>,
    pub context_written: bool,
    pub wifi_mirrored: bool,
    pub location_mirrored: bool,
}

/// Merges Wi-Fi and location samples into the persisted context object
pub struct ContextMerger {
    store: Arc<dyn KvStore>,
    wifi: Arc<dyn WifiSource>,
    location: Arc<dyn LocationSource>,
}

impl ContextMerger {
    pub fn new(
        store: Arc<dyn KvStore>,
        wifi: Arc<dyn WifiSource>,
        location: Arc<dyn LocationSource>,
    ) -> Self {
        Self {
            store,
            wifi,
            location,
        }
    }

    /// Take one sample and merge it.
    ///
    /// An empty SSID leaves any previous `wifi` value in place; a missing
    /// location leaves `lat` and `lon` in place.
    pub fn sample(&self) -> SampleReport {
        let ssid = self.read_ssid();
        let location = self.best_location();

        let context_written = match self.load_context() {
            Some(mut context) => {
                if !ssid.is_empty() {
                    context.insert("wifi".to_string(), Value::String(ssid.clone()));
                }
                if let Some(fix) = &location {
                    context.insert("lat".to_string(), Value::from(fix.latitude));
                    context.insert("lon".to_string(), Value::from(fix.longitude));
                }
                match serde_json::to_string(&context) {
                    Ok(encoded) => self.write(keys::CONTEXT, &encoded),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to encode context");
                        false
                    }
                }
            }
            None => false,
        };

        let wifi_mirrored = self.write(keys::SENSE_WIFI, &ssid);
        let location_value = match &location {
            Some(fix) => format!("{:?},{:?}", fix.latitude, fix.longitude),
            None => NO_LOCATION.to_string(),
        };
        let location_mirrored = self.write(keys::SENSE_LOCATION, &location_value);

        tracing::info!(
            wifi = %ssid,
            has_location = location.is_some(),
            context_written,
            "Context sampled"
        );

        SampleReport {
            ssid,
            location,
            context_written,
            wifi_mirrored,
            location_mirrored,
        }
    }

    fn read_ssid(&self) -> String {
        match self.wifi.ssid() {
            Ok(raw) => normalize_ssid(raw.as_deref()),
            Err(e) => {
                log_source_error("wifi", &e);
                String::new()
            }
        }
    }

    /// Freshest fix across providers. On equal acquisition times the provider
    /// consulted first wins.
    fn best_location(&self) -> Option<Location> {
        let mut best: Option<Location> = None;
        for provider in LocationProvider::ALL {
            let fix = match self.location.last_known(provider) {
                Ok(Some(fix)) => fix,
                Ok(None) => continue,
                Err(e) => {
                    log_source_error(provider.as_str(), &e);
                    continue;
                }
            };
            if best.map_or(true, |b| fix.acquired_at_millis > b.acquired_at_millis) {
                best = Some(fix);
            }
        }
        best
    }

    /// Current context object. Missing, malformed or non-object values start
    /// over from an empty object. `None` when the store could not be read, in
    /// which case the context must not be rewritten.
    fn load_context(&self) -> Option<ContextBlob> {
        let raw = match self.store.get(keys::CONTEXT) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read context, skipping merge");
                return None;
            }
        };
        let Some(raw) = raw else {
            return Some(ContextBlob::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                tracing::warn!("Context is not a JSON object, resetting");
                Some(ContextBlob::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed context");
                Some(ContextBlob::new())
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to persist sample");
                false
            }
        }
    }
}

fn log_source_error(source: &str, error: &Error) {
    match error {
        Error::PermissionDenied(permission) => {
            tracing::debug!(source, %permission, "Sensor not permitted")
        }
        e => tracing::warn!(source, error = %e, "Sensor read failed"),
    }
}
