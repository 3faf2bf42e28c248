/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::error::Error;
use std::fs::File;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::motion::FrameInput;
use domain::riddle::RiddleBank;
use sim::level::LevelPack;
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{self, InputState, KeyBindings};
use ui::renderer::{Renderer, TerminalPrompt};
use ui::sound::{self, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Everything a new game is built from.
struct Session {
    config: GameConfig,
    pack: LevelPack,
    riddles: RiddleBank,
    bindings: KeyBindings,
}

impl Session {
    fn new_world(&self) -> WorldState {
        WorldState::new(&self.pack, self.riddles.clone(), self.config.rules.clone())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = GameConfig::load();
    init_logging(&config);
    for w in &config.warnings {
        log::warn!("{w}");
    }

    let riddles = RiddleBank::load_or_builtin(config.riddles_file.as_deref());
    let pack = LevelPack::load_or_builtin(config.pack.as_deref())?;
    log::info!("pack \"{}\": {} rooms, {} riddles", pack.name, pack.rooms.len(), riddles.len());

    let session = Session {
        bindings: KeyBindings::from_config(&config.controls),
        config,
        pack,
        riddles,
    };
    let mut world = session.new_world();

    let mut renderer = Renderer::new(input::help_line(&session.config.controls));
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return Err(e.into());
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &session);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = &result {
        log::error!("game loop failed: {e}");
    }
    result?;

    println!();
    println!("Thanks for playing Tandem!");
    Ok(())
}

/// `RUST_LOG` picks the level (default info). A terminal game cannot share
/// stderr with the screen, so records go to the configured log file; without
/// one only errors are kept.
fn init_logging(config: &GameConfig) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp_millis();

    match config.log_file.as_ref().map(|p| (p, File::create(p))) {
        Some((_, Ok(file))) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            builder.write_style(env_logger::WriteStyle::Never);
        }
        Some((path, Err(e))) => {
            eprintln!("cannot open log file {}: {e}", path.display());
            builder.filter_level(log::LevelFilter::Error);
        }
        None => {
            builder.filter_level(log::LevelFilter::Error);
        }
    }
    // A logger may already be installed (tests); keep it.
    let _ = builder.try_init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    session: &Session,
) -> Result<(), Box<dyn Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&session.config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(session.config.timing.tick_rate_ms.max(1));

    // Commands collected between ticks, applied at the next one.
    let mut pending = [FrameInput::default(); 2];

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp, session) {
            break;
        }

        if world.phase == Phase::Playing {
            let keys = kb.frame_inputs(&session.bindings);
            for (slot, input) in pending.iter_mut().zip(keys) {
                slot.merge(input);
            }
            pending[gp.avatar].merge(gp.frame_input());
        } else {
            pending = [FrameInput::default(); 2];
        }

        if last_tick.elapsed() >= tick_rate {
            if world.phase == Phase::Playing {
                let input = std::mem::take(&mut pending);
                let events = {
                    let mut prompt = TerminalPrompt::new(renderer);
                    step::step(world, input, &mut prompt)
                };
                for e in &events {
                    log::debug!("tick {}: {:?}", world.tick, e);
                }
                sound::play_events(sound, &events);
            } else if world.message_timer > 0 {
                world.message_timer -= 1;
                if world.message_timer == 0 {
                    world.message.clear();
                }
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_START: &[KeyCode] = &[KeyCode::Char('1')];
const KEYS_INSTRUCTIONS: &[KeyCode] = &[KeyCode::Char('8')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('9')];
const KEYS_TITLE: &[KeyCode] = &[KeyCode::Char('h')];

/// Start a new game: fresh rooms and avatars.
fn start_new_game(world: &mut WorldState, session: &Session) {
    *world = session.new_world();
    step::begin(world);
}

fn return_to_title(world: &mut WorldState) {
    world.phase = Phase::Title;
    world.message.clear();
    world.message_timer = 0;
}

/// Phase changes driven by menu keys. Returns true to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState, session: &Session) -> bool {
    let esc = kb.esc_pressed();
    let pad_pause = gp.pause_pressed();

    match world.phase {
        // ── Title Screen ──
        Phase::Title => {
            if kb.any_pressed(KEYS_START) || pad_pause {
                start_new_game(world, session);
            } else if kb.any_pressed(KEYS_INSTRUCTIONS) {
                world.phase = Phase::Instructions;
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return true;
            }
        }

        // ── Instructions ──
        Phase::Instructions => {
            if !kb.presses().is_empty() || pad_pause {
                world.phase = Phase::Title;
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if esc || pad_pause {
                world.phase = Phase::Paused;
                log::info!("paused at tick {}", world.tick);
            }
        }

        // ── Paused ──
        Phase::Paused => {
            if esc || pad_pause {
                world.phase = Phase::Playing;
            } else if kb.any_pressed(KEYS_TITLE) {
                return_to_title(world);
            }
        }

        // ── Game Over / Victory ──
        Phase::GameOver | Phase::Victory => {
            if kb.any_pressed(KEYS_START) || pad_pause {
                start_new_game(world, session);
            } else if esc {
                return_to_title(world);
            }
        }
    }

    false
}
