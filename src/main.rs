/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info};

use config::GameConfig;
use domain::entity::{Dir, FrameInput};
use sim::event::GameEvent;
use sim::level::{load_catalog, start_new_game};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{Action, InputState};
use ui::renderer::Renderer;
use ui::sound::{cue_for, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    init_tracing();

    let config = GameConfig::load();
    let levels = load_catalog(&config).context("loading level catalog")?;
    info!(levels = levels.len(), seed = ?config.seed, "starting");

    let mut world = WorldState::new(&config, levels);
    let mut renderer = Renderer::new();
    let enhanced_keys = renderer.init().context("terminal init failed")?;

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config, enhanced_keys);

    if let Err(e) = renderer.cleanup() {
        error!(error = %e, "terminal cleanup failed");
    }
    result?;

    println!();
    println!("Thanks for playing Blast Maze!");
    println!("Enemies defeated: {}", world.kills);
    Ok(())
}

/// Log filter comes from `RUST_LOG`, warnings only by default.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    enhanced_keys: bool,
) -> Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced_keys;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad connected");
    }

    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let dt = tick_rate.as_secs_f32();
    let mut last_tick = Instant::now();

    // Bomb presses between ticks are latched so a quick tap is never lost
    let mut pending_bomb = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp) {
            break;
        }

        if world.phase == Phase::Playing && !world.paused
            && (kb.pressed(Action::Bomb) || gp.bomb_pressed())
        {
            pending_bomb = true;
        }

        if last_tick.elapsed() >= tick_rate {
            if world.phase == Phase::Playing {
                let input = read_frame_input(&kb, &gp, std::mem::take(&mut pending_bomb));
                let events = step::step(world, &input, dt);
                process_sound_events(sound, &events);
            }
            last_tick = Instant::now();
        }

        renderer.render(world).context("render failed")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn read_frame_input(kb: &InputState, gp: &GamepadState, place_bomb: bool) -> FrameInput {
    FrameInput {
        left: kb.held(Action::Left) || gp.held(Dir::Left),
        right: kb.held(Action::Right) || gp.held(Dir::Right),
        up: kb.held(Action::Up) || gp.held(Dir::Up),
        down: kb.held(Action::Down) || gp.held(Dir::Down),
        place_bomb,
    }
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for cue in events.iter().filter_map(cue_for) {
        sfx.play(cue);
    }
}

/// Menu and session keys. Returns true when the player asked to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.pressed(Action::Confirm) || gp.confirm_pressed();
    let cancel = kb.pressed(Action::Cancel) || gp.cancel_pressed();

    match world.phase {
        Phase::MainMenu => {
            if confirm {
                start_new_game(world);
            } else if cancel || kb.pressed(Action::Quit) {
                return true;
            }
        }
        Phase::Playing => {
            if cancel {
                world.return_to_menu();
            } else if kb.pressed(Action::Pause) || gp.pause_pressed() {
                world.toggle_pause();
            }
        }
        Phase::GameOver | Phase::Win => {
            if confirm {
                start_new_game(world);
            } else if cancel {
                world.return_to_menu();
            }
        }
    }
    false
}
