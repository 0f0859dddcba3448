use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

pub const BACKGROUND: RGBColor = RGBColor(255, 255, 255);
pub const AXIS: RGBColor = RGBColor(60, 60, 60);
pub const POINT: RGBColor = RGBColor(70, 130, 180);
pub const UNDEFINED: RGBColor = RGBColor(190, 190, 190);

fn hsl_to_rgb(hsl: Hsl) -> RGBColor {
    let rgb: Srgb = hsl.into_color();
    RGBColor(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_rgb(Hsl::new(hue, 0.75, 0.55))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diverging scale for correlation cells
// ---------------------------------------------------------------------------

/// Blue for negative, red for positive, fading to near-white at zero.
pub fn diverging(r: f64) -> RGBColor {
    if r.is_nan() {
        return UNDEFINED;
    }
    let magnitude = r.abs().min(1.0) as f32;
    let hue = if r < 0.0 { 220.0 } else { 5.0 };
    hsl_to_rgb(Hsl::new(hue, 0.7, 0.95 - 0.45 * magnitude))
}

/// Dark text on light cells, white text on dark ones.
pub fn label_on(background: RGBColor) -> RGBColor {
    let RGBColor(r, g, b) = background;
    let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    if luma < 140.0 {
        BACKGROUND
    } else {
        AXIS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let palette = generate_palette(5);
        assert_eq!(palette.len(), 5);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn diverging_scale_darkens_with_magnitude() {
        let brightness = |c: RGBColor| c.0 as u32 + c.1 as u32 + c.2 as u32;
        assert!(brightness(diverging(0.9)) < brightness(diverging(0.1)));
        assert_eq!(diverging(f64::NAN), UNDEFINED);
        // Positive leans red, negative leans blue.
        assert!(diverging(0.9).0 > diverging(0.9).2);
        assert!(diverging(-0.9).2 > diverging(-0.9).0);
    }

    #[test]
    fn cell_labels_contrast_with_their_cell() {
        assert_eq!(label_on(diverging(0.05)), AXIS);
        assert_eq!(label_on(RGBColor(20, 20, 80)), BACKGROUND);
    }
}
