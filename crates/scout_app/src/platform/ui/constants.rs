pub const BAR_TEMPLATE: &str = "{prefix:>10.bold.cyan} [{bar:30}] {pos}/{len} {msg}";
pub const BAR_CHARS: &str = "=> ";
pub const PREFIX_RUNNING: &str = "Scraping";
pub const PREFIX_DONE: &str = "Done";
pub const PREFIX_STOPPED: &str = "Stopped";

/// Width the results table is fitted to.
pub const TABLE_WIDTH: usize = 110;
