use std::sync::{Arc, Mutex};

use slog::{debug, Logger};
use time::Month;

use crate::availability::{
    AvailabilityApi, AvailabilityCache, AvailabilityKey, HttpAvailabilityApi,
};
use crate::urls::Urls;

/// Seam to the date-picker widget. The widget evaluates its per-date
/// disable predicate synchronously while rendering, so the controller
/// only ever asks it for the displayed month and for a redraw.
pub trait DatePicker: Send + Sync {
    /// The `(year, month)` the widget currently displays.
    fn displayed_month(&self) -> (i32, Month);

    /// Requests a re-render, re-evaluating the disable predicate.
    fn redraw(&self);
}

/// Raw values of the booking form's party-size fields.
#[derive(Clone, Debug, Default)]
pub struct PartyFields {
    pub adults: Option<String>,
    pub children: Option<String>,
    pub infants: Option<String>,
}

impl PartyFields {
    /// Adults plus children plus infants, clamped to at least one
    /// traveler. A missing or blank adults field counts as one; any
    /// unparsable field makes the whole sum fall back to one.
    pub fn party_size(&self) -> u32 {
        fn parse(value: &Option<String>, default: &str) -> Option<i64> {
            let raw = match value.as_deref().map(str::trim) {
                Some(s) if !s.is_empty() => s,
                _ => default,
            };

            raw.parse().ok()
        }

        let total = parse(&self.adults, "1")
            .and_then(|total| Some(total + parse(&self.children, "0")?))
            .and_then(|total| Some(total + parse(&self.infants, "0")?));

        match total {
            Some(total) if total > 0 => total.min(i64::from(u32::MAX)) as u32,
            _ => 1,
        }
    }
}

/// Keeps the date-picker's disabled-set in step with the displayed month
/// and the party-size fields.
pub struct BookingCalendarController {
    picker: Arc<dyn DatePicker>,
    cache: Arc<AvailabilityCache>,
    party: Mutex<PartyFields>,
}

impl BookingCalendarController {
    /// Wires a widget to the disabled-dates endpoint. Mirrors the markup
    /// contract: a missing widget, a missing endpoint, or an endpoint
    /// that does not parse as a URL leaves the page without calendar
    /// behavior instead of failing it.
    pub fn attach(
        logger: &Logger,
        picker: Option<Arc<dyn DatePicker>>,
        endpoint: Option<&str>,
        party: PartyFields,
    ) -> Option<Self> {
        let picker = match picker {
            Some(picker) => picker,
            None => {
                debug!(logger, "calendar widget unavailable; skipping init");
                return None;
            }
        };

        let endpoint = match endpoint {
            Some(endpoint) => endpoint,
            None => {
                debug!(logger, "disabled-dates endpoint not configured; skipping init");
                return None;
            }
        };

        let urls = match Urls::new(endpoint) {
            Ok(urls) => urls,
            Err(e) => {
                debug!(logger, "invalid disabled-dates endpoint; skipping init"; "error" => format!("{:?}", e));
                return None;
            }
        };

        let api = HttpAvailabilityApi::new(reqwest::Client::new(), urls, logger.clone());

        Some(Self::with_api(picker, Arc::new(api), party, logger.clone()))
    }

    /// Wires a widget to an explicit availability source.
    pub fn with_api(
        picker: Arc<dyn DatePicker>,
        api: Arc<dyn AvailabilityApi>,
        party: PartyFields,
        logger: Logger,
    ) -> Self {
        BookingCalendarController {
            picker,
            cache: Arc::new(AvailabilityCache::new(api, logger)),
            party: Mutex::new(party),
        }
    }

    /// The shared cache, for wiring into the widget's disable predicate.
    pub fn cache(&self) -> Arc<AvailabilityCache> {
        self.cache.clone()
    }

    /// The widget finished initializing.
    pub async fn ready(&self) {
        self.refresh().await;
    }

    /// The visitor navigated to another month.
    pub async fn month_changed(&self) {
        self.refresh().await;
    }

    /// One of the party-size fields changed.
    pub async fn party_changed(&self, fields: PartyFields) {
        *self.party.lock().unwrap() = fields;
        self.refresh().await;
    }

    async fn refresh(&self) {
        let (year, month) = self.picker.displayed_month();
        let key = AvailabilityKey {
            year,
            month,
            party_size: self.party.lock().unwrap().party_size(),
        };

        // The fetch must land in the cache before the redraw; the widget
        // will not await it.
        self.cache.refresh(key).await;
        self.picker.redraw();
    }
}
