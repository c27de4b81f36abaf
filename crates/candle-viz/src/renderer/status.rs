//! Status line and microphone level meter.

use candle_viz_detect::{DetectError, DetectorState};
use nannou::prelude::*;

/// Everything the status line needs for one frame
pub struct StatusInfo<'a> {
    pub state: DetectorState,
    pub calibration: Option<(usize, usize)>,
    pub error: Option<&'a DetectError>,
    pub device: Option<&'a str>,
    pub all_out: bool,
}

pub fn status_text(info: &StatusInfo) -> String {
    let state = &info.state;

    if state.is_listening {
        if state.is_calibrating {
            let (collected, target) = info.calibration.unwrap_or((0, 0));
            return format!("Calibrating... stay quiet ({}/{})", collected, target);
        }
        if state.is_blowing {
            return "Blowing!".to_string();
        }
        if info.all_out {
            return "All out! Press r to relight".to_string();
        }
        return "Make a wish and blow out the candles".to_string();
    }

    match info.error {
        Some(e) if e.is_denial() => {
            format!("Microphone access denied ({}). Press p to retry", e)
        }
        Some(e) => format!("{}. Press Space to retry", e),
        None if !state.permission_granted => "Press Space to use the microphone".to_string(),
        None => "Not listening. Press Space to start".to_string(),
    }
}

/// Draw the status line, the greeting once every candle is out, and a level
/// meter with the trigger line
pub fn draw_status(
    draw: &Draw,
    bounds: Rect,
    info: &StatusInfo,
    level: f32,
    threshold: Option<f32>,
) {
    let color = if info.state.is_blowing {
        rgb(1.0, 0.85, 0.3)
    } else if info.state.is_listening {
        rgb(1.0, 1.0, 1.0)
    } else {
        rgb(0.7, 0.7, 0.7)
    };

    draw.text(&status_text(info))
        .x_y(0.0, bounds.top() - 40.0)
        .w(bounds.w() - 40.0)
        .color(color)
        .font_size(24);

    if info.all_out {
        draw.text("Happy Birthday!")
            .x_y(0.0, bounds.top() - bounds.h() * 0.2)
            .w(bounds.w())
            .color(rgb(1.0, 0.8, 0.5))
            .font_size(56);
    }

    if let Some(device) = info.device {
        draw.text(device)
            .x_y(0.0, bounds.bottom() + 20.0)
            .w(bounds.w() - 40.0)
            .color(rgba(1.0, 1.0, 1.0, 0.4))
            .font_size(14);
    }

    if !info.state.is_listening {
        return;
    }

    // Vertical meter on the right edge
    let meter_h = bounds.h() * 0.5;
    let meter_x = bounds.right() - 30.0;
    let meter_bottom = bounds.y() - meter_h / 2.0;

    draw.rect()
        .x_y(meter_x, bounds.y())
        .w_h(12.0, meter_h)
        .color(rgba(1.0, 1.0, 1.0, 0.1));

    let fill = level.clamp(0.0, 1.0) * meter_h;
    draw.rect()
        .x_y(meter_x, meter_bottom + fill / 2.0)
        .w_h(12.0, fill)
        .color(color);

    if let Some(threshold) = threshold {
        let y = meter_bottom + threshold.clamp(0.0, 1.0) * meter_h;
        draw.line()
            .start(pt2(meter_x - 10.0, y))
            .end(pt2(meter_x + 10.0, y))
            .weight(2.0)
            .color(rgb(1.0, 0.3, 0.3));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(state: DetectorState) -> StatusInfo<'static> {
        StatusInfo {
            state,
            calibration: None,
            error: None,
            device: None,
            all_out: false,
        }
    }

    #[test]
    fn test_calibrating_shows_progress() {
        let mut status = info(DetectorState {
            is_listening: true,
            is_calibrating: true,
            permission_granted: true,
            ..Default::default()
        });
        status.calibration = Some((12, 50));
        assert_eq!(status_text(&status), "Calibrating... stay quiet (12/50)");
    }

    #[test]
    fn test_blowing_wins_over_ready() {
        let status = info(DetectorState {
            is_listening: true,
            is_blowing: true,
            permission_granted: true,
            ..Default::default()
        });
        assert_eq!(status_text(&status), "Blowing!");
    }

    #[test]
    fn test_denial_mentions_retry() {
        let error = DetectError::PermissionDenied("device busy".into());
        let mut status = info(DetectorState::default());
        status.error = Some(&error);
        let text = status_text(&status);
        assert!(text.starts_with("Microphone access denied"));
        assert!(text.ends_with("Press p to retry"));
    }
}
