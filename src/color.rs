use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

/// An 8-bit sRGB triple.
pub type Rgb8 = [u8; 3];

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb8> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: channel → colour
// ---------------------------------------------------------------------------

/// Maps channel ids to distinct colours, stable for a given channel list.
#[derive(Debug, Clone)]
pub struct ChannelColors {
    mapping: BTreeMap<i64, Rgb8>,
    default_color: Rgb8,
}

impl ChannelColors {
    pub fn new(channels: &[i64]) -> Self {
        let palette = generate_palette(channels.len());
        ChannelColors {
            mapping: channels.iter().copied().zip(palette).collect(),
            default_color: [128, 128, 128],
        }
    }

    pub fn color_for(&self, channel: i64) -> Rgb8 {
        self.mapping
            .get(&channel)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Legend entries (channel label → colour), ascending by channel.
    pub fn legend_entries(&self) -> Vec<(String, Rgb8)> {
        self.mapping
            .iter()
            .map(|(c, rgb)| (c.to_string(), *rgb))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_entries() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        for i in 0..p.len() {
            for j in i + 1..p.len() {
                assert_ne!(p[i], p[j]);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_channel_falls_back_to_grey() {
        let colors = ChannelColors::new(&[73, 74]);
        assert_ne!(colors.color_for(73), colors.color_for(74));
        assert_eq!(colors.color_for(1), [128, 128, 128]);
        assert_eq!(colors.legend_entries().len(), 2);
    }
}
