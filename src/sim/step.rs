/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Steering (commands become velocities; lateral drift mid-launch)
///   2. Drops
///   3. Avatar movement (avatar 1 → avatar 2), including springs
///   4. Riddle casualties
///   5. Bomb fuses and detonations
///   6. Visibility
///   7. Room transition
///   8. Victory check
///
/// Riddle prompts block inside step 3. Escaping one pauses the game once
/// the tick has finished.

use crate::domain::explosion::BlastOutcome;
use crate::domain::motion::{Direction, FrameInput, Velocity};
use crate::domain::puzzle;
use crate::domain::riddle::RiddlePrompt;
use super::avatar::{Avatar, StepContext};
use super::event::GameEvent;
use super::room::Room;
use super::world::{Phase, WorldState};

const MESSAGE_TICKS: u32 = 30;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: [FrameInput; 2], prompt: &mut dyn RiddlePrompt) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    resolve_steering(world, &input);
    resolve_drops(world, &input, &mut events);
    let mut pause = false;
    for i in 0..2 {
        pause |= resolve_avatar(world, i, prompt, &mut events);
    }
    if resolve_casualties(world, &mut events) { return events; }
    if resolve_bombs(world, &mut events) { return events; }
    resolve_visibility(world);
    resolve_transition(world, &mut events);
    resolve_victory(world, &mut events);

    if pause && world.phase == Phase::Playing {
        world.phase = Phase::Paused;
    }
    events
}

/// Start play in the world's current room.
pub fn begin(world: &mut WorldState) {
    world.phase = Phase::Playing;
    let name = world.room().name.clone();
    world.set_message(&name, MESSAGE_TICKS);
    resolve_visibility(world);
    log::info!("game started in room {} ({})", world.room().id, name);
}

// ══════════════════════════════════════════════════════════════
// Input
// ══════════════════════════════════════════════════════════════

fn resolve_steering(world: &mut WorldState, input: &[FrameInput; 2]) {
    let room = &world.rooms[world.current];
    for (i, frame) in input.iter().enumerate() {
        let Some(dir) = frame.steer else { continue };
        let avatar = &mut world.avatars[i];
        match room.launching(i) {
            // Mid-flight only perpendicular steering counts.
            Some(s) => {
                let proj = room.springs()[s].projection();
                if dir == Direction::Stay {
                    avatar.lateral = Direction::Stay;
                } else if !dir.same_axis(proj) {
                    avatar.lateral = dir;
                }
            }
            None => {
                avatar.steer(dir);
                avatar.lateral = Direction::Stay;
            }
        }
    }
}

fn resolve_drops(world: &mut WorldState, input: &[FrameInput; 2], events: &mut Vec<GameEvent>) {
    let fuse = world.rules.bomb_fuse_ticks;
    let room = &mut world.rooms[world.current];
    for (i, frame) in input.iter().enumerate() {
        if !frame.drop { continue; }
        if let Some((item, at)) = world.avatars[i].drop_item(room, fuse) {
            events.push(GameEvent::ItemDropped { avatar: i, item, x: at.x, y: at.y });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Movement and springs
// ══════════════════════════════════════════════════════════════

/// Move one avatar for this tick. Returns true if a riddle was escaped.
fn resolve_avatar(
    world: &mut WorldState,
    i: usize,
    prompt: &mut dyn RiddlePrompt,
    events: &mut Vec<GameEvent>,
) -> bool {
    let WorldState { rooms, avatars, riddles, current, .. } = world;
    let room = &mut rooms[*current];
    let avatar = &mut avatars[i];
    if !avatar.alive { return false; }

    let mut ctx = StepContext { book: &*riddles, prompt: &mut *prompt, events, pause_requested: false };

    if let Some(s) = room.launching(i) {
        fly(room, avatar, s, &mut ctx);
        return ctx.pause_requested;
    }

    let intent = avatar.heading();

    // Letting go of a compressed spring fires it straight away.
    if let Some(s) = room.compressed_by(i) {
        if !room.springs()[s].is_wall_ward(intent) {
            if release(room, avatar, s, intent, &mut ctx) {
                fly(room, avatar, s, &mut ctx);
            }
            return ctx.pause_requested;
        }
    }

    if intent != Direction::Stay && !avatar.try_step(room, intent, &mut ctx) {
        avatar.velocity = Velocity::ZERO;
    }

    if let Some(s) = room.spring_at(avatar.pos) {
        if room.springs()[s].is_wall_ward(intent) {
            let full = match room.spring_mut(s) {
                Some(spring) => {
                    if spring.compress(i) {
                        log::debug!("avatar {} compresses spring {} to {}", i + 1, s, spring.total_compression());
                    }
                    spring.is_full()
                }
                None => false,
            };
            if full {
                release(room, avatar, s, Direction::Stay, &mut ctx);
            }
        }
    }
    ctx.pause_requested
}

/// Convert the avatar's compression into a launch. `intent` seeds the
/// lateral drift when it is perpendicular to the projection.
fn release(room: &mut Room, avatar: &mut Avatar, s: usize, intent: Direction, ctx: &mut StepContext) -> bool {
    let Some(spring) = room.spring_mut(s) else { return false };
    let Some(launch) = spring.release(avatar.index) else { return false };
    let proj = spring.projection();

    avatar.lateral = if intent != Direction::Stay && !intent.same_axis(proj) { intent } else { Direction::Stay };
    let (dx, dy) = proj.delta();
    let speed = launch.speed as i32;
    avatar.velocity = Velocity { dx: dx * speed, dy: dy * speed };

    log::debug!(
        "avatar {} launched by spring {}: speed {}, {} ticks",
        avatar.index + 1, s, launch.speed, launch.frames_left
    );
    ctx.events.push(GameEvent::SpringLaunched {
        avatar: avatar.index,
        speed: launch.speed,
        frames: launch.frames_left,
    });
    true
}

/// One ballistic tick: `speed` cells along the projection, each resolved
/// through normal collision, then one cell of lateral drift.
fn fly(room: &mut Room, avatar: &mut Avatar, s: usize, ctx: &mut StepContext) {
    let i = avatar.index;
    let Some(launch) = room.springs()[s].launch_of(i) else { return };
    let proj = room.springs()[s].projection();

    for _ in 0..launch.speed {
        if !avatar.try_step(room, proj, ctx) {
            if let Some(spring) = room.spring_mut(s) {
                spring.cancel_launch(i);
            }
            land(avatar);
            return;
        }
    }

    if avatar.lateral != Direction::Stay && !avatar.try_step(room, avatar.lateral, ctx) {
        avatar.lateral = Direction::Stay;
    }

    let more = room.spring_mut(s).map(|spring| spring.advance_launch(i)).unwrap_or(false);
    if more {
        let (dx, dy) = proj.delta();
        let (lx, ly) = avatar.lateral.delta();
        let speed = launch.speed as i32;
        avatar.velocity = Velocity { dx: dx * speed + lx, dy: dy * speed + ly };
    } else {
        land(avatar);
    }
}

/// Launch over: keep walking in the lateral direction, if any.
fn land(avatar: &mut Avatar) {
    avatar.velocity = Velocity::from_dir(avatar.lateral);
    avatar.lateral = Direction::Stay;
}

// ══════════════════════════════════════════════════════════════
// Hazards
// ══════════════════════════════════════════════════════════════

fn resolve_casualties(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let Some(lost) = world.avatars.iter().position(|a| !a.alive) else { return false };
    game_over(world, &format!("Player {} ran out of lives", lost + 1), events);
    true
}

fn resolve_bombs(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let positions = world.avatar_positions();
    let radius = world.rules.bomb_radius;
    let detonations = world.room_mut().update_bombs(positions, radius);

    // Every bomb of the tick counts toward one outcome.
    let mut blast = BlastOutcome::default();
    for d in &detonations {
        events.push(GameEvent::BombExploded { x: d.pos.x, y: d.pos.y, destroyed: d.outcome.destroyed });
        blast.merge(d.outcome);
    }
    if !blast.is_fatal() { return false; }

    for (avatar, hit) in world.avatars.iter_mut().zip(blast.avatar_hit) {
        if hit {
            avatar.alive = false;
            events.push(GameEvent::AvatarHit { avatar: avatar.index });
        }
    }
    if blast.key_destroyed {
        events.push(GameEvent::KeyDestroyed);
    }
    let reason = match blast.avatar_hit {
        [true, true] => "Both players were caught in the blast".to_string(),
        [true, false] => "Player 1 was caught in the blast".to_string(),
        [false, true] => "Player 2 was caught in the blast".to_string(),
        [false, false] => "A key was destroyed".to_string(),
    };
    game_over(world, &reason, events);
    true
}

fn resolve_visibility(world: &mut WorldState) {
    let bearers = world.torch_bearers();
    let radius = world.rules.torch_radius;
    world.room_mut().update_visibility(&bearers, radius);
}

// ══════════════════════════════════════════════════════════════
// Room transitions
// ══════════════════════════════════════════════════════════════

fn resolve_transition(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let [a, b] = &world.avatars;
    if !(a.at_door && b.at_door) { return; }
    let (Some(id), Some(other)) = (a.door_id, b.door_id) else { return };
    if id != other { return; }

    let held = [a.key_count, b.key_count];
    let room = world.room();
    if room.is_forward_door(id) {
        if !room.can_open_door(id, world.keys_held()) {
            if world.message_timer == 0 {
                let need = room.doors().required_keys(id);
                world.set_message(&format!("Door {} is locked ({} keys needed)", id, need), MESSAGE_TICKS);
            }
            return;
        }
        if !room.doors().is_unlocked(id) {
            let spent = puzzle::consume_keys(room.doors().required_keys(id), held);
            for (avatar, n) in world.avatars.iter_mut().zip(spent) {
                avatar.spend_keys(n);
            }
            world.room_mut().unlock_door(id);
            events.push(GameEvent::DoorUnlocked { id });
        }
        let next = world.room().next;
        change_room(world, next, true, events);
    } else if room.is_backward_door(id) {
        let prev = room.prev;
        change_room(world, prev, false, events);
    }
}

fn change_room(world: &mut WorldState, target: Option<u32>, forward: bool, events: &mut Vec<GameEvent>) {
    let Some(id) = target else { return };
    let Some(idx) = world.room_index(id) else {
        log::warn!("room {} links to missing room {}", world.room().id, id);
        return;
    };
    let from = world.room().id;
    world.room_mut().reset_springs();
    world.current = idx;

    let room = &mut world.rooms[idx];
    room.reset_springs();
    let spawn = if forward { room.spawn } else { room.spawn_back };
    let name = room.name.clone();
    world.avatars[0].place_at(spawn);
    world.avatars[1].place_at(spawn.offset(0, 1));

    log::info!("room {} -> room {} ({})", from, id, name);
    events.push(GameEvent::RoomChanged { from, to: id });
    world.set_message(&name, MESSAGE_TICKS);
    resolve_visibility(world);
}

// ══════════════════════════════════════════════════════════════
// Outcome
// ══════════════════════════════════════════════════════════════

fn resolve_victory(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.room().id != world.final_room { return; }
    world.phase = Phase::Victory;
    log::info!("victory at tick {}", world.tick);
    events.push(GameEvent::Victory);
    world.set_message("You made it out together!", 0);
}

fn game_over(world: &mut WorldState, reason: &str, events: &mut Vec<GameEvent>) {
    world.phase = Phase::GameOver;
    log::info!("game over at tick {}: {}", world.tick, reason);
    events.push(GameEvent::GameOver);
    world.set_message(reason, 0);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
