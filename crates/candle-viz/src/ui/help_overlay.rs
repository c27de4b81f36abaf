//! Help overlay showing keyboard shortcuts.

use nannou::prelude::*;

const SHORTCUTS: [(&str, &str); 9] = [
    ("h", "Toggle this help"),
    ("q", "Quit"),
    ("", ""),
    ("--- Microphone ---", ""),
    ("Space", "Start / stop listening"),
    ("p", "Ask for microphone access"),
    ("Tab", "Next input device"),
    ("--- Cake ---", ""),
    ("r", "Relight the candles"),
];

#[derive(Default)]
pub struct HelpOverlay {
    pub visible: bool,
}

impl HelpOverlay {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn draw(&self, draw: &Draw) {
        if !self.visible {
            return;
        }

        let padding = 25.0;
        let line_height = 24.0;
        let font_size = 18;
        let width = 460.0;
        let key_col = 110.0;
        let height = line_height * SHORTCUTS.len() as f32 + padding * 2.0;

        draw.rect()
            .x_y(0.0, 0.0)
            .w_h(width, height)
            .color(rgba(0.0, 0.0, 0.0, 0.9));
        draw.rect()
            .x_y(0.0, 0.0)
            .w_h(width, height)
            .stroke(rgba(1.0, 1.0, 1.0, 0.3))
            .stroke_weight(1.0)
            .no_fill();

        let top = height / 2.0 - padding - line_height / 2.0;
        let left = -width / 2.0 + padding;
        let desc_w = width - key_col - padding * 2.0 - 15.0;

        for (i, (key, desc)) in SHORTCUTS.iter().enumerate() {
            let y = top - i as f32 * line_height;

            if key.is_empty() {
                continue;
            }

            if key.starts_with("---") {
                draw.text(key)
                    .xy(pt2(0.0, y))
                    .wh(pt2(width - padding * 2.0, line_height))
                    .center_justify()
                    .color(rgba(1.0, 0.8, 0.5, 0.8))
                    .font_size(font_size);
                continue;
            }

            draw.text(key)
                .xy(pt2(left + key_col / 2.0, y))
                .wh(pt2(key_col, line_height))
                .right_justify()
                .color(rgb(1.0, 0.75, 0.3))
                .font_size(font_size);
            draw.text(desc)
                .xy(pt2(left + key_col + 15.0 + desc_w / 2.0, y))
                .wh(pt2(desc_w, line_height))
                .left_justify()
                .color(rgb(1.0, 1.0, 1.0))
                .font_size(font_size);
        }
    }
}
