use slog::{debug, Logger};

/// Full-page loading overlay shown during navigation. Explicitly
/// constructed and disposed by the host shell; there is no ambient
/// global instance.
pub struct PageLoader {
    open: bool,
    label: Option<String>,
    disposed: bool,
    logger: Logger,
}

impl PageLoader {
    /// Creates a hidden loader.
    pub fn new(logger: Logger) -> Self {
        PageLoader {
            open: false,
            label: None,
            disposed: false,
            logger,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The text for the overlay's label region, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Shows the overlay with an optional label.
    pub fn show(&mut self, label: Option<&str>) {
        if self.disposed {
            return;
        }

        self.open = true;
        self.label = label.map(str::to_owned);
        debug!(self.logger, "showing page loader"; "label" => self.label.as_deref().unwrap_or(""));
    }

    pub fn hide(&mut self) {
        if self.disposed {
            return;
        }

        self.open = false;
        self.label = None;
    }

    /// Detaches the loader. Later show and hide calls are no-ops.
    pub fn dispose(&mut self) {
        self.open = false;
        self.label = None;
        self.disposed = true;
    }
}
