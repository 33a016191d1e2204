pub mod panels;
pub mod plot;
pub mod table;

use eframe::egui::Color32;
use msanalyzer::color::Rgb8;

pub fn color32(rgb: Rgb8) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}
