/// Data model — inventory records and display helpers.
pub mod record;
pub mod timefmt;

pub use record::WorkbookRecord;
