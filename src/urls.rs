use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;
use url::{ParseError, Url};

/// Calendar dates on the wire, `YYYY-MM-DD`.
pub(crate) const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Convenience wrapper for the availability endpoint URL.
#[derive(Clone)]
pub struct Urls {
    /// Base URL of the disabled-dates endpoint, without query parameters.
    base: Url,
}

impl Urls {
    /// Creates a new instance. An unparsable base is an error so callers
    /// can treat it the same as a missing endpoint.
    pub fn new(base: impl AsRef<str>) -> Result<Self, ParseError> {
        let base = Url::parse(base.as_ref())?;

        Ok(Urls { base })
    }

    /// The disabled-dates query URL for an inclusive date range and a
    /// party size.
    pub fn disabled_dates(&self, start: Date, end: Date, people: u32) -> Url {
        let mut url = self.base.clone();

        url.query_pairs_mut()
            .append_pair("start", &format_date(start))
            .append_pair("end", &format_date(end))
            .append_pair("people", &people.to_string());

        url
    }
}

pub(crate) fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).expect("format calendar date")
}
