use simplelog::{ConfigBuilder, LevelFilter, SimpleLogger};

/// `-v` shows progress, `-vv` also dumps prompts and raw completions.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();
    let _ = SimpleLogger::init(level, config);
}
