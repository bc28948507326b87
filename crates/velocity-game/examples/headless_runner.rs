//! Headless runner: plays the built-in content with a simple greedy policy,
//! prints progress, and checks that a save reloads to the same state.
//!
//! Run with: `cargo run --package velocity-game --example headless_runner`

use velocity_core::event::{EventKind, GameEvent};
use velocity_core::id::PartId;
use velocity_game::GameSession;

const TICKS: u64 = 3_000;
const DT: f64 = 1.0;

/// Buy the affordable part with the highest base velocity and put it on the first free cell.
fn play_turn(session: &mut GameSession) {
    let choice: Option<PartId> = session
        .shop()
        .into_iter()
        .filter(|entry| entry.affordable)
        .max_by(|a, b| a.part.base_velocity.total_cmp(&b.part.base_velocity))
        .map(|entry| entry.part.id.clone());

    if let Some(part) = choice {
        if session.buy_part(part.as_str()).is_ok() {
            println!("  bought {part}");
        }
    }

    let owned: Vec<_> = session.inventory().iter().map(|(id, _)| id).collect();
    for instance in owned {
        let free = (0..10)
            .flat_map(|y| (0..10).map(move |x| (x, y)))
            .find(|&(x, y)| session.grid().cell(x, y).is_none());
        match free {
            Some((x, y)) => {
                let _ = session.place_from_inventory(instance, x, y);
            }
            None => break,
        }
    }
}

fn main() {
    let mut session = GameSession::with_builtin_content().expect("built-in content loads");
    for kind in [EventKind::PartPlaced, EventKind::PartRemoved] {
        session.suppress_event(kind);
    }
    for kind in [EventKind::PartUnlocked, EventKind::AreaUnlocked, EventKind::GameCleared] {
        session.on_event(
            kind,
            Box::new(|event: &GameEvent| match event {
                GameEvent::PartUnlocked { part, tick } => println!("[{tick}] unlocked {part}"),
                GameEvent::AreaUnlocked { area, tick } => println!("[{tick}] reached {area}"),
                GameEvent::GameCleared { max_velocity, tick } => {
                    println!("[{tick}] cleared at {max_velocity:.1}")
                }
                _ => {}
            }),
        );
    }

    for tick in 1..=TICKS {
        session.tick(DT);
        if tick % 10 == 0 {
            play_turn(&mut session);
        }
        session.deliver_events();
    }
    if session.dropped_events() > 0 {
        println!("{} events dropped", session.dropped_events());
    }

    let state = session.state();
    println!(
        "After {TICKS} ticks: velocity {:.1}, best {:.1}, distance {:.0}, {} parts placed",
        state.velocity,
        state.max_velocity,
        state.distance,
        session.grid().part_count()
    );

    let json = session.to_json().expect("save encodes");
    let reloaded = GameSession::load_json(session.catalog().clone(), session.config().clone(), &json)
        .expect("save reloads");
    assert_eq!(reloaded.state(), session.state(), "reload changed the state");
    println!("Save round trip OK ({} bytes)", json.len());
}
