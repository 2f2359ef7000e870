/// Display panels for SheetDock.

pub mod console_panel;
pub mod health_panel;
pub mod inventory_panel;
