/// UI widgets for SheetDock.

pub mod status_bar;
pub mod toolbar;
