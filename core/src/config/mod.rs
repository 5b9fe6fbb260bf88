mod load;
mod types;

pub use load::{get_outfeed_data_dir, load_default, load_from};
pub use types::{ActivityLogConfig, AppConfig, LoggingConfig, RedirectConfig};
