use bevy::prelude::*;

use crate::components::Canvas;
use crate::config::{load_constants, Constants};
use crate::input::{HeldKeys, InputPlugin, InputState};
use crate::world::{FrameReport, WorldState};

/// The running round. One system owns all mutation of it.
#[derive(Resource)]
pub struct ActiveWorld(pub WorldState);

/// Frame input derived from `HeldKeys`, kept between frames for edge detection.
#[derive(Resource, Default)]
pub struct FrameInput(pub InputState);

#[derive(Resource, Default, Clone, Debug)]
pub struct LastFrameReport(pub FrameReport);

#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct FrameCounter {
    pub frames: u64,
    pub max_frames: Option<u64>,
}

pub struct GameRuntimePlugin {
    pub canvas: Canvas,
    pub seed: u64,
    pub player_count: usize,
    pub max_frames: Option<u64>,
    /// Loaded from disk when `None`.
    pub constants: Option<Constants>,
}

impl Default for GameRuntimePlugin {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            seed: 1,
            player_count: 1,
            max_frames: None,
            constants: None,
        }
    }
}

impl Plugin for GameRuntimePlugin {
    fn build(&self, app: &mut App) {
        let constants = self.constants.clone().unwrap_or_else(load_constants);
        info!(
            "[Tilerun] Starting round: {}x{} canvas, seed {}, {} player(s)",
            self.canvas.width, self.canvas.height, self.seed, self.player_count
        );
        let world = WorldState::new(self.canvas, constants.clone(), self.player_count, self.seed);
        app.add_plugins(InputPlugin)
            .insert_resource(constants)
            .insert_resource(ActiveWorld(world))
            .insert_resource(FrameInput::default())
            .insert_resource(LastFrameReport::default())
            .insert_resource(FrameCounter {
                frames: 0,
                max_frames: self.max_frames,
            })
            .add_systems(Update, (step_world, stop_after_max_frames).chain());
    }
}

fn step_world(
    time: Res<Time>,
    held: Res<HeldKeys>,
    mut input: ResMut<FrameInput>,
    mut world: ResMut<ActiveWorld>,
    mut last: ResMut<LastFrameReport>,
    mut counter: ResMut<FrameCounter>,
) {
    input.0.advance(&held.0);
    let report = world
        .0
        .step(&input.0, time.delta_secs(), time.elapsed_secs_f64() * 1000.0);
    if report.leveled_up {
        info!("[Tilerun] Level {} (score {})", report.level, world.0.score);
    }
    counter.frames += 1;
    last.0 = report;
}

fn stop_after_max_frames(
    counter: Res<FrameCounter>,
    world: Res<ActiveWorld>,
    last: Res<LastFrameReport>,
    mut exit: EventWriter<AppExit>,
) {
    let out_of_frames = counter.max_frames.is_some_and(|max| counter.frames >= max);
    if out_of_frames || last.0.game_over {
        info!(
            "[Tilerun] Stopping after {} frames: level {}, score {}, {} enemies alive",
            counter.frames, last.0.level, world.0.score, last.0.alive_enemies
        );
        exit.send(AppExit::Success);
    }
}
