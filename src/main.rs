use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use tilerun::components::Canvas;
use tilerun::game_runtime::GameRuntimePlugin;

struct RunArgs {
    frames: Option<u64>,
    seed: u64,
    players: usize,
    canvas: Canvas,
}

fn parse_args(args: &[String]) -> Result<RunArgs, String> {
    let mut run = RunArgs {
        frames: None,
        seed: 1,
        players: 1,
        canvas: Canvas::default(),
    };
    let mut iter = args.iter().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{name} expects a value"))
        };
        match flag.as_str() {
            "--frames" => run.frames = Some(parse_number(&value("--frames")?, "--frames")?),
            "--seed" => run.seed = parse_number(&value("--seed")?, "--seed")?,
            "--players" => run.players = parse_number(&value("--players")?, "--players")?,
            "--width" => run.canvas.width = parse_number(&value("--width")?, "--width")?,
            "--height" => run.canvas.height = parse_number(&value("--height")?, "--height")?,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(run)
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{flag}: invalid value '{raw}'"))
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let run = match parse_args(&args) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("[Tilerun] {e}");
            eprintln!("usage: tilerun [--frames N] [--seed N] [--players N] [--width PX] [--height PX]");
            std::process::exit(2);
        }
    };

    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(GameRuntimePlugin {
            canvas: run.canvas,
            seed: run.seed,
            player_count: run.players,
            max_frames: run.frames,
            constants: None,
        })
        .run();
}
