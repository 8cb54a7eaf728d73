use log::{LevelFilter, Metadata, Record};
use std::sync::Once;

pub struct HomelinkLogger;

impl log::Log for HomelinkLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!(
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static INIT: Once = Once::new();

pub fn init_logger(level: LevelFilter) {
    INIT.call_once(|| {
        let logger = HomelinkLogger;
        log::set_boxed_logger(Box::new(logger)).unwrap();
        log::set_max_level(level);
    });
}
