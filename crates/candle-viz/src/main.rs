mod audio;
mod renderer;
mod ui;
mod utils;

use audio::MicrophoneInput;
use candle_viz_detect::{DetectorConfig, DetectorController};
use nannou::prelude::*;
use renderer::{draw_status, Candles, StatusInfo};
use std::env;
use tracing::{error, info, warn};
use ui::bindings::{parse_key, Action};
use ui::help_overlay::HelpOverlay;
use utils::Config;

const WINDOWED_SIZE: (u32, u32) = (1024, 768);

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.contains(&"--audio-info".to_string()) {
        utils::log_audio_info();
        return;
    }

    nannou::app(model).update(update).run();
}

struct Model {
    detector: DetectorController<MicrophoneInput>,
    candles: Candles,
    help_overlay: HelpOverlay,
    config: Config,
    /// Level from the latest live frame, drives the meter and flame lean
    last_level: f32,
}

fn model(app: &App) -> Model {
    // Loaded once; logging needs its level before anything else reports
    let config = Config::load();
    utils::logging::init(config.log_level());

    // List all devices at startup
    MicrophoneInput::list_devices();

    let args: Vec<String> = env::args().collect();
    let windowed = args.contains(&"--windowed".to_string()) || args.contains(&"-w".to_string());
    app.set_exit_on_escape(false);

    let mut win = app
        .new_window()
        .title("candle-viz")
        .view(view)
        .key_pressed(key_pressed)
        .size(WINDOWED_SIZE.0, WINDOWED_SIZE.1)
        .min_size(400, 400);

    if !windowed {
        win = win.fullscreen();
    }

    if let Err(e) = win.build() {
        error!("Failed to create window: {:?}", e);
        std::process::exit(1);
    }

    let detection = config.detection();
    let timeout = config.device_timeout();

    let detector = match DetectorController::new(
        MicrophoneInput::new(config.last_device.as_deref(), timeout, &detection),
        detection,
    ) {
        Ok(detector) => detector,
        Err(e) => {
            warn!("{}, using default detection settings", e);
            let defaults = DetectorConfig::default();
            let input = MicrophoneInput::new(config.last_device.as_deref(), timeout, &defaults);
            match DetectorController::new(input, defaults) {
                Ok(detector) => detector,
                Err(e) => {
                    error!("Default detection settings rejected: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut model = Model {
        detector,
        candles: Candles::new(config.candle_count()),
        help_overlay: HelpOverlay::default(),
        config,
        last_level: 0.0,
    };

    if model.config.auto_start() {
        model.detector.start();
    }

    model
}

fn update(_app: &App, model: &mut Model, update: Update) {
    if let Some(report) = model.detector.on_frame(update.since_start) {
        model.last_level = report.level;
        if report.blow.is_some() {
            let blown = model.candles.blow_out();
            if blown > 0 {
                info!("Blew out {} candles", blown);
            }
        }
    } else {
        model.last_level = 0.0;
    }

    model.candles.update(update.since_last.as_secs_f32());
}

fn view(app: &App, model: &Model, frame: Frame) {
    let bounds = app.window_rect();
    let draw = app.draw();
    draw.background().color(rgb(0.08, 0.05, 0.12));

    model.candles.draw(&draw, bounds, model.last_level);

    let info = StatusInfo {
        state: model.detector.state(),
        calibration: model.detector.calibration_progress(),
        error: model
            .detector
            .permission_error()
            .or(model.detector.last_error()),
        device: model.detector.provider().device_name(),
        all_out: model.candles.all_out(),
    };
    let threshold = model
        .detector
        .baseline()
        .map(|baseline| baseline + model.detector.config().threshold);
    draw_status(&draw, bounds, &info, model.last_level, threshold);

    model.help_overlay.draw(&draw);

    if let Err(e) = draw.to_frame(app, &frame) {
        error!("Failed to render frame: {:?}", e);
    }
}

fn key_pressed(app: &App, model: &mut Model, key: Key) {
    let Some(action) = parse_key(key) else {
        return;
    };

    match action {
        Action::Quit => app.quit(),
        Action::ShowHelp => model.help_overlay.toggle(),
        Action::ToggleListening => {
            if model.detector.is_listening() {
                model.detector.stop();
            } else {
                model.detector.start();
            }
        }
        Action::Relight => model.candles.relight(),
        Action::RequestPermission => {
            model.detector.request_permission();
        }
        Action::NextDevice => {
            let was_listening = model.detector.is_listening();
            model.detector.stop();

            let name = model
                .detector
                .provider_mut()
                .select_next_device()
                .map(str::to_string);
            if let Some(name) = name {
                model.config.set_device(&name);
            }

            if was_listening {
                model.detector.start();
            }
        }
    }
}
