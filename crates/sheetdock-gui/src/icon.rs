//! SheetDock application icon generator.
//!
//! Produces a procedural icon: a spreadsheet grid with an accented header
//! row and a docked tray along the bottom edge (the "dock" motif). Rendered
//! at an arbitrary resolution as RGBA pixel data suitable for a window icon.

/// Generate a SheetDock icon as egui `IconData`.
pub fn generate_icon(size: u32) -> egui::IconData {
    let rgba = render_icon(size);
    egui::IconData {
        rgba,
        width: size,
        height: size,
    }
}

/// Render the icon into an RGBA pixel buffer (top-to-bottom row order).
pub fn render_icon(size: u32) -> Vec<u8> {
    let s = size as f32;
    let mut pixels = vec![0u8; (size * size * 4) as usize];

    // Sheet occupies the upper portion; the dock bar sits along the bottom.
    let sheet_left = s * 0.10;
    let sheet_top = s * 0.08;
    let sheet_right = s * 0.90;
    let sheet_bottom = s * 0.72;
    let header_bottom = sheet_top + (sheet_bottom - sheet_top) * 0.22;

    let dock_top = s * 0.80;
    let dock_bottom = s * 0.94;

    let grid_cols = 3u32;
    let grid_rows = 3u32;

    let sheet_bg = [0xe4u8, 0xe4, 0xe8];
    let header = [0x2e, 0x7d, 0x4f]; // spreadsheet green
    let grid_line = [0x6c, 0x70, 0x86];
    let dock = [0x89, 0xb4, 0xfa];

    for y in 0..size {
        for x in 0..size {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let idx = ((y * size + x) * 4) as usize;

            let mut color: Option<[u8; 3]> = None;

            if px >= sheet_left && px <= sheet_right && py >= sheet_top && py <= sheet_bottom {
                color = Some(if py <= header_bottom { header } else { sheet_bg });

                // Grid lines over the body cells.
                if py > header_bottom {
                    let cell_w = (sheet_right - sheet_left) / grid_cols as f32;
                    let cell_h = (sheet_bottom - header_bottom) / grid_rows as f32;
                    let fx = (px - sheet_left) % cell_w;
                    let fy = (py - header_bottom) % cell_h;
                    let line = s * 0.02;
                    if fx < line || fy < line {
                        color = Some(grid_line);
                    }
                }
            } else if px >= sheet_left && px <= sheet_right && py >= dock_top && py <= dock_bottom
            {
                color = Some(dock);
            }

            if let Some([r, g, b]) = color {
                pixels[idx] = r;
                pixels[idx + 1] = g;
                pixels[idx + 2] = b;
                pixels[idx + 3] = 0xff;
            }
        }
    }

    pixels
}
