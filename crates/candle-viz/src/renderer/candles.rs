//! Birthday cake with flickering candles.
//!
//! Each confirmed blow puts out every lit candle; extinguished candles give
//! off a short puff of smoke.

use nannou::prelude::*;

const CAKE_WIDTH: f32 = 420.0;
const CAKE_HEIGHT: f32 = 160.0;
const CANDLE_WIDTH: f32 = 14.0;
const CANDLE_HEIGHT: f32 = 70.0;
const FLAME_WIDTH: f32 = 14.0;
const FLAME_HEIGHT: f32 = 26.0;
/// Seconds for a smoke puff to fade
const SMOKE_SECS: f32 = 1.5;

struct Candle {
    lit: bool,
    /// Random phase so candles don't flicker in lockstep
    phase: f32,
    /// Current flicker amount, 0-1
    flicker: f32,
    /// Remaining smoke, 1 right after blowing out
    smoke: f32,
}

pub struct Candles {
    candles: Vec<Candle>,
    time: f32,
}

impl Candles {
    pub fn new(count: usize) -> Self {
        let candles = (0..count)
            .map(|_| Candle {
                lit: true,
                phase: rand::random::<f32>() * 100.0,
                flicker: 0.5,
                smoke: 0.0,
            })
            .collect();

        Self { candles, time: 0.0 }
    }

    pub fn lit_count(&self) -> usize {
        self.candles.iter().filter(|c| c.lit).count()
    }

    pub fn all_out(&self) -> bool {
        self.lit_count() == 0
    }

    /// Put out every lit candle. Returns how many went out.
    pub fn blow_out(&mut self) -> usize {
        let mut count = 0;
        for candle in self.candles.iter_mut().filter(|c| c.lit) {
            candle.lit = false;
            candle.smoke = 1.0;
            count += 1;
        }
        count
    }

    pub fn relight(&mut self) {
        for candle in &mut self.candles {
            candle.lit = true;
            candle.smoke = 0.0;
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        for candle in &mut self.candles {
            // Jittered sine, 0-1
            let jitter = rand::random::<f32>() * 0.6;
            candle.flicker = ((self.time * 7.0 + candle.phase + jitter).sin() + 1.0) * 0.5;
            candle.smoke = (candle.smoke - dt / SMOKE_SECS).max(0.0);
        }
    }

    /// `level` is the current microphone level; flames lean with it
    pub fn draw(&self, draw: &Draw, bounds: Rect, level: f32) {
        let cake_y = bounds.y() - 60.0;
        let top = cake_y + CAKE_HEIGHT / 2.0;

        // Plate
        draw.ellipse()
            .x_y(0.0, cake_y - CAKE_HEIGHT / 2.0)
            .w_h(CAKE_WIDTH + 120.0, 36.0)
            .color(rgb(0.85, 0.85, 0.9));

        // Sponge and icing
        draw.rect()
            .x_y(0.0, cake_y)
            .w_h(CAKE_WIDTH, CAKE_HEIGHT)
            .color(rgb(0.96, 0.72, 0.78));
        draw.rect()
            .x_y(0.0, top - 12.0)
            .w_h(CAKE_WIDTH, 24.0)
            .color(rgb(1.0, 0.95, 0.97));
        for i in 0..12 {
            let x = -CAKE_WIDTH / 2.0 + (i as f32 + 0.5) * CAKE_WIDTH / 12.0;
            draw.ellipse()
                .x_y(x, top - 26.0)
                .w_h(CAKE_WIDTH / 12.0, 18.0)
                .color(rgb(1.0, 0.95, 0.97));
        }

        let spacing = CAKE_WIDTH / (self.candles.len() as f32 + 1.0);
        let lean = level.clamp(0.0, 1.0) * 12.0;

        for (i, candle) in self.candles.iter().enumerate() {
            let x = -CAKE_WIDTH / 2.0 + spacing * (i as f32 + 1.0);
            let body_y = top + CANDLE_HEIGHT / 2.0;
            let wick_y = top + CANDLE_HEIGHT + 4.0;

            let hue = i as f32 / self.candles.len() as f32;
            draw.rect()
                .x_y(x, body_y)
                .w_h(CANDLE_WIDTH, CANDLE_HEIGHT)
                .color(hsl(hue, 0.6, 0.75));
            draw.rect()
                .x_y(x, wick_y)
                .w_h(2.0, 8.0)
                .color(rgb(0.13, 0.13, 0.13));

            if candle.lit {
                let flame_y = wick_y + FLAME_HEIGHT / 2.0;
                let w = FLAME_WIDTH * (0.9 + 0.25 * candle.flicker);
                let h = FLAME_HEIGHT * (0.9 + 0.35 * candle.flicker);

                // Glow, then outer and inner flame
                draw.ellipse()
                    .x_y(x + lean, flame_y)
                    .w_h(w * 4.0, h * 2.5)
                    .color(rgba(1.0, 0.77, 0.56, 0.12 + 0.08 * candle.flicker));
                draw.ellipse()
                    .x_y(x + lean, flame_y)
                    .w_h(w, h)
                    .color(rgba(1.0, 0.55, 0.0, 0.9));
                draw.ellipse()
                    .x_y(x + lean * 0.5, flame_y - h * 0.15)
                    .w_h(w * 0.5, h * 0.55)
                    .color(rgba(1.0, 0.95, 0.72, 1.0));
            } else if candle.smoke > 0.0 {
                let rise = (1.0 - candle.smoke) * 60.0;
                draw.ellipse()
                    .x_y(x + rise * 0.2, wick_y + 12.0 + rise)
                    .w_h(10.0 + rise * 0.3, 10.0 + rise * 0.3)
                    .color(rgba(0.7, 0.7, 0.7, candle.smoke * 0.5));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blow_out_extinguishes_all_lit() {
        let mut candles = Candles::new(8);
        assert_eq!(candles.lit_count(), 8);

        assert_eq!(candles.blow_out(), 8);
        assert!(candles.all_out());
        assert_eq!(candles.blow_out(), 0);
    }

    #[test]
    fn test_relight_and_smoke_fades() {
        let mut candles = Candles::new(3);
        candles.blow_out();
        assert!(candles.candles.iter().all(|c| c.smoke == 1.0));

        for _ in 0..120 {
            candles.update(1.0 / 60.0);
        }
        assert!(candles.candles.iter().all(|c| c.smoke == 0.0));

        candles.relight();
        assert_eq!(candles.lit_count(), 3);
    }

    #[test]
    fn test_flicker_stays_in_range() {
        let mut candles = Candles::new(4);
        for _ in 0..100 {
            candles.update(1.0 / 60.0);
            assert!(candles
                .candles
                .iter()
                .all(|c| (0.0..=1.0).contains(&c.flicker)));
        }
    }
}
