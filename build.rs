//! Build script -- generates the application icon and embeds Windows
//! application manifest and icon resource.

fn main() {
    // Generate icon if it does not already exist.
    let icon_path = "assets/icon.ico";
    if !std::path::Path::new(icon_path).exists() {
        std::fs::create_dir_all("assets").ok();
        match generate_ico(&[48, 32, 16]) {
            Ok(data) => {
                if let Err(e) = std::fs::write(icon_path, &data) {
                    eprintln!("cargo:warning=Failed to write icon: {e}");
                }
            }
            Err(e) => eprintln!("cargo:warning=Failed to generate icon: {e}"),
        }
    }

    // Only embed resources on Windows.
    if std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() == "windows" {
        let mut res = winresource::WindowsResource::new();
        res.set_manifest(
            r#"
<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
  <trustInfo xmlns="urn:schemas-microsoft-com:asm.v3">
    <security>
      <requestedPrivileges>
        <requestedExecutionLevel level="asInvoker" uiAccess="false"/>
      </requestedPrivileges>
    </security>
  </trustInfo>
  <compatibility xmlns="urn:schemas-microsoft-com:compatibility.v1">
    <application>
      <supportedOS Id="{8e0f7a12-bfb3-4fe8-b9a5-48fd50a15a9a}"/>
    </application>
  </compatibility>
  <application xmlns="urn:schemas-microsoft-com:asm.v3">
    <windowsSettings>
      <dpiAware xmlns="http://schemas.microsoft.com/SMI/2005/WindowsSettings">true/pm</dpiAware>
      <dpiAwareness xmlns="http://schemas.microsoft.com/SMI/2016/WindowsSettings">PerMonitorV2</dpiAwareness>
    </windowsSettings>
  </application>
</assembly>
"#,
        );

        if std::path::Path::new(icon_path).exists() {
            res.set_icon(icon_path);
        }

        if let Err(e) = res.compile() {
            eprintln!("cargo:warning=Failed to compile Windows resources: {e}");
        }
    }
}

// ════════════════════════════════════════════════════════════════
// Icon rendering (self-contained — no workspace crate deps)
// ════════════════════════════════════════════════════════════════

/// Produce a multi-resolution ICO file as bytes.
fn generate_ico(sizes: &[u32]) -> Result<Vec<u8>, String> {
    let mut ico: Vec<u8> = Vec::new();

    // ICO header.
    ico.extend_from_slice(&0u16.to_le_bytes()); // reserved
    ico.extend_from_slice(&1u16.to_le_bytes()); // type = ICO
    ico.extend_from_slice(&(sizes.len() as u16).to_le_bytes());

    // Pre-render all images.
    let images: Vec<(u32, Vec<u8>)> = sizes
        .iter()
        .map(|&sz| {
            let rgba = render_icon_rgba(sz);
            let bmp = rgba_to_ico_bmp(&rgba, sz);
            (sz, bmp)
        })
        .collect();

    // Directory entries.
    let header_len = 6 + 16 * sizes.len();
    let mut offset = header_len;
    for (sz, bmp) in &images {
        let w = if *sz >= 256 { 0u8 } else { *sz as u8 };
        let h = w;
        ico.push(w);
        ico.push(h);
        ico.push(0); // colour count
        ico.push(0); // reserved
        ico.extend_from_slice(&1u16.to_le_bytes()); // planes
        ico.extend_from_slice(&32u16.to_le_bytes()); // bpp
        ico.extend_from_slice(&(bmp.len() as u32).to_le_bytes());
        ico.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += bmp.len();
    }

    // Image data.
    for (_, bmp) in &images {
        ico.extend_from_slice(bmp);
    }

    Ok(ico)
}

/// Convert top-to-bottom RGBA pixels into a BMP blob for an ICO entry.
fn rgba_to_ico_bmp(rgba: &[u8], size: u32) -> Vec<u8> {
    let mut bmp: Vec<u8> = Vec::new();

    // BITMAPINFOHEADER (40 bytes).
    bmp.extend_from_slice(&40u32.to_le_bytes());
    bmp.extend_from_slice(&(size as i32).to_le_bytes());
    bmp.extend_from_slice(&((size as i32) * 2).to_le_bytes()); // doubled for ICO
    bmp.extend_from_slice(&1u16.to_le_bytes()); // planes
    bmp.extend_from_slice(&32u16.to_le_bytes()); // bpp
    bmp.extend_from_slice(&0u32.to_le_bytes()); // compression
    bmp.extend_from_slice(&0u32.to_le_bytes()); // image size
    bmp.extend_from_slice(&0i32.to_le_bytes()); // x ppm
    bmp.extend_from_slice(&0i32.to_le_bytes()); // y ppm
    bmp.extend_from_slice(&0u32.to_le_bytes()); // colours used
    bmp.extend_from_slice(&0u32.to_le_bytes()); // important colours

    // Pixel data — bottom-to-top, BGRA.
    for y in (0..size).rev() {
        for x in 0..size {
            let idx = ((y * size + x) * 4) as usize;
            let r = rgba[idx];
            let g = rgba[idx + 1];
            let b = rgba[idx + 2];
            let a = rgba[idx + 3];
            bmp.push(b);
            bmp.push(g);
            bmp.push(r);
            bmp.push(a);
        }
    }

    // AND mask (1 bpp, bottom-to-top, rows padded to 4-byte boundary).
    let row_bytes = size.div_ceil(32) * 4;
    for y in (0..size).rev() {
        let mut row = vec![0u8; row_bytes as usize];
        for x in 0..size {
            let alpha = rgba[((y * size + x) * 4 + 3) as usize];
            if alpha < 128 {
                let byte_idx = (x / 8) as usize;
                let bit_idx = 7 - (x % 8);
                row[byte_idx] |= 1 << bit_idx;
            }
        }
        bmp.extend_from_slice(&row);
    }

    bmp
}

/// Render the SheetDock icon as top-to-bottom RGBA pixels.
///
/// This is a self-contained copy of the algorithm in
/// `crates/sheetdock-gui/src/icon.rs` (spreadsheet grid with an accented
/// header row and a dock bar) so the build script has no dependency on
/// workspace crates.
fn render_icon_rgba(size: u32) -> Vec<u8> {
    let s = size as f32;
    let mut pixels = vec![0u8; (size * size * 4) as usize];

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
    let header = [0x2e, 0x7d, 0x4f];
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
