//! Terminal output: RGB24 frames as ASCII art, and PNG screenshots.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

/// Brightness ramp, darkest first.
const RAMP: &[u8] = b" .:-=+*#%@";

/// Downsample an RGB24 frame into text. Each character covers `scale`
/// pixels across and `2 * scale` down, which keeps the aspect ratio close
/// on a typical terminal font.
pub fn ascii_frame(buffer: &[u8], width: u32, height: u32, scale: u32) -> String {
    let (width, height) = (width as usize, height as usize);
    let cell_w = scale.max(1) as usize;
    let cell_h = cell_w * 2;
    let mut out = String::with_capacity((width / cell_w + 1) * (height / cell_h));
    for cy in (0..height).step_by(cell_h) {
        let mut line = String::with_capacity(width / cell_w);
        for cx in (0..width).step_by(cell_w) {
            let mut sum = 0u32;
            let mut count = 0u32;
            for y in cy..(cy + cell_h).min(height) {
                for x in cx..(cx + cell_w).min(width) {
                    let p = (y * width + x) * 3;
                    sum += luma(buffer[p], buffer[p + 1], buffer[p + 2]);
                    count += 1;
                }
            }
            let level = (sum / count.max(1)) as usize * (RAMP.len() - 1) / 255;
            line.push(RAMP[level] as char);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Integer Rec. 601 luma, 0..=255.
fn luma(r: u8, g: u8, b: u8) -> u32 {
    (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000
}

/// Save an RGB24 frame as a PNG file.
pub fn save_screenshot(buffer: &[u8], width: u32, height: u32, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let w = BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&buffer[..(width * height * 3) as usize])?;
    log::debug!("screenshot: {}x{} to {}", width, height, path.display());
    Ok(())
}
