//! Desktop entry point: window setup and the real-time frame loop.

use std::path::Path;

use macroquad::prelude::{clear_background, get_frame_time, next_frame, Conf, BLACK};

use rungun::backend::{poll_key_status, MacroquadAssets, MacroquadBatch};
use rungun::consts::{WINDOW_HEIGHT, WINDOW_WIDTH};
use rungun::level::LevelConfig;
use rungun::{FrameOutcome, Game, Level};

fn window_conf() -> Conf {
    Conf {
        window_title: format!("rungun {}", rungun::VERSION),
        window_width: WINDOW_WIDTH as i32,
        window_height: WINDOW_HEIGHT as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let mut assets = MacroquadAssets::new();
    let level = Level::create(Path::new("data/level1"), &mut assets, LevelConfig::default());
    let mut game = Game::with_level(level);

    loop {
        clear_background(BLACK);
        let input = poll_key_status();
        let mut batch = MacroquadBatch::new(&assets);
        if game.frame(&input, &mut batch, get_frame_time()) == FrameOutcome::Quit {
            break;
        }
        next_frame().await;
    }
}
