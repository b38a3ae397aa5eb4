use std::sync::Mutex;

use slog::Drain;
use slog::{o, Fuse, Logger};
use slog_async::Async;
use slog_json::Json;

pub fn initialize_logger() -> slog::Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("version" => env!("CARGO_PKG_VERSION"), "revision" => option_env!("FRONTEND_REVISION").unwrap_or_else(|| "")),
    )
}
