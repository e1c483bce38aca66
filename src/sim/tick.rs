//! Fixed timestep simulation tick
//!
//! Advances a run deterministically. Parameters are read from the state on
//! every tick, so a hot-patched gravity takes effect on the next step.

use super::state::{FailCause, RunEvent, RunnerState};
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Jump pressed since the last tick
    pub jump: bool,
}

/// Advance the run by one timestep of `dt_ms`
pub fn tick(state: &mut RunnerState, input: &TickInput, dt_ms: f64) {
    if state.is_over() {
        return;
    }

    let dt = (dt_ms / 1000.0) as f32;
    let params = state.params;
    state.time_ms += dt_ms;
    state.ticks += 1;

    // Jump only from the ground
    if input.jump && state.player.grounded {
        state.player.vel.y = -(params.player_jump as f32);
        state.player.grounded = false;
        state.events.push(RunEvent::Jumped);
    }

    // Gravity (semi-implicit Euler)
    let ground = super::state::ground_top();
    let half = state.player.size / 2.0;
    if !state.player.grounded {
        state.player.vel.y += params.gravity_y as f32 * dt;
    }
    state.player.pos += state.player.vel * dt;
    if state.player.pos.y + half >= ground {
        state.player.pos.y = ground - half;
        state.player.vel.y = 0.0;
        state.player.grounded = true;
    }

    // Spawning on a fixed interval
    let interval = params.spawn_interval_ms.max(1.0);
    state.spawn_timer_ms += dt_ms;
    while state.spawn_timer_ms >= interval {
        state.spawn_timer_ms -= interval;
        state.spawn_obstacle();
    }

    // Scroll obstacles and cull the ones that left the screen
    let dx = params.obstacle_speed as f32 * dt;
    for obstacle in &mut state.obstacles {
        obstacle.pos.x -= dx;
    }
    state.obstacles.retain(|o| o.pos.x >= OBSTACLE_CULL_X);
    state.distance += params.obstacle_speed * dt_ms / 1000.0;

    if state.obstacles.iter().any(|o| o.overlaps(&state.player)) {
        state.fail(FailCause::Collision);
        return;
    }

    let y = state.player.pos.y as f64;
    if y > (VIEW_HEIGHT + 100.0) as f64 || y < params.lose_below_y {
        state.fail(FailCause::OutOfBounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RuntimeParameters;
    use crate::sim::state::{RunPhase, ground_top};

    fn quiet_params() -> RuntimeParameters {
        RuntimeParameters {
            gravity_y: 1200.0,
            player_jump: 500.0,
            obstacle_speed: 200.0,
            spawn_interval_ms: 1_000_000.0,
            lose_below_y: LOSE_BELOW_Y,
        }
    }

    #[test]
    fn test_jump_and_land() {
        let mut state = RunnerState::new(1, quiet_params());
        tick(&mut state, &TickInput { jump: true }, SIM_DT_MS);
        assert!(!state.player.grounded);
        assert!(state.player.vel.y < 0.0);
        assert_eq!(state.drain_events(), vec![RunEvent::Jumped]);

        // Airborne jump is ignored
        tick(&mut state, &TickInput { jump: true }, SIM_DT_MS);
        assert!(state.drain_events().is_empty());

        for _ in 0..240 {
            tick(&mut state, &TickInput::default(), SIM_DT_MS);
        }
        assert!(state.player.grounded);
        assert_eq!(state.player.pos.y + state.player.size / 2.0, ground_top());
        assert_eq!(state.phase, RunPhase::Running);
    }

    #[test]
    fn test_spawn_interval() {
        let mut params = quiet_params();
        params.spawn_interval_ms = 100.0;
        let mut state = RunnerState::new(5, params);
        // 0.55 seconds of ticks
        for _ in 0..66 {
            tick(&mut state, &TickInput::default(), SIM_DT_MS);
        }
        assert_eq!(state.spawned, 5);
    }

    #[test]
    fn test_standing_still_collides() {
        let mut params = quiet_params();
        params.spawn_interval_ms = 500.0;
        let mut state = RunnerState::new(3, params);
        for _ in 0..(120 * 10) {
            tick(&mut state, &TickInput::default(), SIM_DT_MS);
            if state.is_over() {
                break;
            }
        }
        assert!(state.is_over());
        assert_eq!(state.fail_cause, Some(FailCause::Collision));
        let fail = state.fail_time_ms.unwrap();

        // No further progress after game over
        let ticks = state.ticks;
        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.ticks, ticks);
        assert_eq!(state.fail_time_ms, Some(fail));
    }

    #[test]
    fn test_huge_jump_leaves_play_area() {
        let mut params = quiet_params();
        params.player_jump = 100_000.0;
        let mut state = RunnerState::new(1, params);
        tick(&mut state, &TickInput { jump: true }, SIM_DT_MS);
        assert_eq!(state.fail_cause, Some(FailCause::OutOfBounds));
    }

    #[test]
    fn test_determinism() {
        let mut params = quiet_params();
        params.spawn_interval_ms = 700.0;
        let mut a = RunnerState::new(99999, params);
        let mut b = RunnerState::new(99999, params);

        for i in 0..2000u32 {
            let input = TickInput { jump: i % 90 == 0 };
            tick(&mut a, &input, SIM_DT_MS);
            tick(&mut b, &input, SIM_DT_MS);
        }

        assert_eq!(a.ticks, b.ticks);
        assert_eq!(a.spawned, b.spawned);
        assert_eq!(a.fail_time_ms, b.fail_time_ms);
        assert_eq!(a.distance, b.distance);
        assert_eq!(a.player.pos, b.player.pos);
    }
}
