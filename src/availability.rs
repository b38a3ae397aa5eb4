use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use slog::{debug, warn, Logger};
use time::{Date, Month};

use crate::errors::AvailabilityError;
use crate::urls::{Urls, DATE_FORMAT};

/// Identifies one availability fetch: the displayed month and the party
/// size it was requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvailabilityKey {
    pub year: i32,
    pub month: Month,
    pub party_size: u32,
}

impl AvailabilityKey {
    /// The first and last calendar day of the key's month, both inclusive.
    pub fn month_bounds(&self) -> (Date, Date) {
        let first =
            Date::from_calendar_date(self.year, self.month, 1).expect("first day of month");
        let last = Date::from_calendar_date(
            self.year,
            self.month,
            time::util::days_in_year_month(self.year, self.month),
        )
        .expect("last day of month");

        (first, last)
    }
}

pub trait AvailabilityApi: Send + Sync {
    /// Issues the read-only query for dates that cannot be booked within
    /// the inclusive range by a party of the given size.
    fn disabled_dates(
        &self,
        start: Date,
        end: Date,
        people: u32,
    ) -> BoxFuture<'_, Result<Vec<Date>, AvailabilityError>>;
}

/// An availability source backed by the site's disabled-dates endpoint.
pub struct HttpAvailabilityApi {
    client: Client,
    urls: Urls,
    logger: Logger,
}

#[derive(Deserialize)]
struct DisabledDatesResponse {
    /// Dates that cannot be booked. An absent field reads as empty.
    #[serde(default)]
    disabled: Vec<String>,
}

impl HttpAvailabilityApi {
    /// Creates a new instance.
    pub fn new(client: Client, urls: Urls, logger: Logger) -> Self {
        Self {
            client,
            urls,
            logger,
        }
    }
}

impl AvailabilityApi for HttpAvailabilityApi {
    fn disabled_dates(
        &self,
        start: Date,
        end: Date,
        people: u32,
    ) -> BoxFuture<'_, Result<Vec<Date>, AvailabilityError>> {
        fetch(self, start, end, people).boxed()
    }
}

async fn fetch(
    api: &HttpAvailabilityApi,
    start: Date,
    end: Date,
    people: u32,
) -> Result<Vec<Date>, AvailabilityError> {
    let url = api.urls.disabled_dates(start, end, people);
    debug!(api.logger, "querying disabled dates"; "url" => url.as_str());

    let response = api
        .client
        .get(url)
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| AvailabilityError::Request { source })?;

    let raw = response
        .bytes()
        .await
        .map_err(|source| AvailabilityError::Request { source })?;
    let parsed: DisabledDatesResponse = serde_json::from_slice(&raw)
        .map_err(|source| AvailabilityError::MalformedResponse { source })?;

    let mut dates = Vec::with_capacity(parsed.disabled.len());

    for value in parsed.disabled {
        match Date::parse(&value, DATE_FORMAT) {
            Ok(date) => dates.push(date),
            Err(e) => {
                warn!(api.logger, "skipping unparsable disabled date"; "value" => value.as_str(), "error" => format!("{:?}", e));
            }
        }
    }

    Ok(dates)
}

/// Holds the disabled-set for the most recently fetched key and answers
/// the widget's synchronous per-date queries.
pub struct AvailabilityCache {
    api: Arc<dyn AvailabilityApi>,
    issued: AtomicU64,
    disabled: RwLock<HashSet<Date>>,
    logger: Logger,
}

impl AvailabilityCache {
    pub fn new(api: Arc<dyn AvailabilityApi>, logger: Logger) -> Self {
        AvailabilityCache {
            api,
            issued: AtomicU64::new(0),
            disabled: RwLock::new(HashSet::new()),
            logger,
        }
    }

    /// Fetches the disabled-set for the given key and replaces the cached
    /// one. A failed query fails open to the empty set so a transient
    /// fault never blocks date selection. A response that resolves after
    /// a newer refresh has been issued is discarded, so the cache always
    /// reflects the latest request even when responses arrive out of
    /// order.
    pub async fn refresh(&self, key: AvailabilityKey) {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let (start, end) = key.month_bounds();

        let dates = match self.api.disabled_dates(start, end, key.party_size).await {
            Ok(dates) => dates.into_iter().collect(),
            Err(e) => {
                warn!(self.logger, "disabled-dates query failed; treating month as open"; "error" => format!("{:?}", e));
                HashSet::new()
            }
        };

        let mut disabled = self.disabled.write().unwrap();

        // Re-check under the lock so a newer refresh cannot land between
        // the ticket comparison and the write.
        if self.issued.load(Ordering::SeqCst) != ticket {
            debug!(self.logger, "discarding superseded disabled-dates response"; "ticket" => ticket);
            return;
        }

        *disabled = dates;
    }

    /// Whether the given date is unavailable according to the most
    /// recently applied fetch.
    pub fn is_disabled(&self, date: Date) -> bool {
        self.disabled.read().unwrap().contains(&date)
    }
}
