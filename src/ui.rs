//! Terminal presentation for the solo game.

use std::io::{self, BufRead, Write};

use rand::Rng;

use crate::{
    ai::{calc_pdf, GRID_SIZE},
    board::TargetView,
    common::ShotOutcome,
    config::{BOARD_SIZE, FLEET},
    coord::{Coord, Orientation},
    game::SessionSnapshot,
    placement::{random_fleet, validate_fleet},
    ship::ShipPlacement,
};

/// Print a normalized probability distribution matrix.
pub fn print_probability_board(pdf: &[[f64; GRID_SIZE]; GRID_SIZE]) {
    println!("\nProbability distribution:");
    print!("   ");
    for c in 1..=BOARD_SIZE {
        print!(" {:>4}", c);
    }
    println!();
    for (r, row) in pdf.iter().enumerate() {
        print!("{:>2} ", (b'A' + r as u8) as char);
        for p in row {
            print!(" {:4.2}", p);
        }
        println!();
    }
}

/// Print the scripted suggestion heat map for a target view.
pub fn print_hint(view: &TargetView) {
    print_probability_board(&calc_pdf(view));
}

/// Display the target board (top) and the player's own board (bottom).
pub fn print_player_view(snapshot: &SessionSnapshot) {
    println!("Opponent board:");
    println!("{}", snapshot.target_board);
    println!("Your board:");
    println!("{}", snapshot.own_board);
}

pub fn describe(at: Coord, outcome: ShotOutcome) -> String {
    match outcome {
        ShotOutcome::Hit { ship, sunk: true } => format!("{at}: hit, {ship} sunk"),
        ShotOutcome::Hit { .. } => format!("{at}: hit"),
        ShotOutcome::Miss => format!("{at}: miss"),
        ShotOutcome::AlreadyFired => format!("{at}: already fired there"),
    }
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn parse_placement(line: &str, index: usize) -> Option<ShipPlacement> {
    let mut parts = line.split_whitespace();
    let anchor: Coord = parts.next()?.parse().ok()?;
    let orientation: Orientation = parts.next().unwrap_or("H").parse().ok()?;
    Some(ShipPlacement::new(FLEET[index], anchor, orientation))
}

/// Ask for a fleet one ship at a time (`A5 H`, `C2 D`, ...).
///
/// An empty line places the whole fleet at random. The finished fleet is
/// validated and the prompt starts over if it breaks a rule. Returns `None`
/// on end of input.
pub fn prompt_fleet<R: Rng + ?Sized>(
    input: &mut impl BufRead,
    rng: &mut R,
) -> io::Result<Option<Vec<ShipPlacement>>> {
    println!("Place your ships as <cell> <H|V|D>, e.g. A5 H. Press enter for a random fleet.");
    loop {
        let mut fleet = Vec::with_capacity(FLEET.len());
        while fleet.len() < FLEET.len() {
            let ship = FLEET[fleet.len()];
            print!("Place {} (length {}): ", ship, ship.length());
            let Some(line) = read_line(input)? else {
                return Ok(None);
            };
            if line.is_empty() {
                return Ok(Some(random_fleet(rng)));
            }
            match parse_placement(&line, fleet.len()) {
                Some(p) => fleet.push(p),
                None => println!("Could not read '{line}'."),
            }
        }
        match validate_fleet(&fleet) {
            Ok(_) => return Ok(Some(fleet)),
            Err(e) => println!("Invalid fleet: {e}. Start again."),
        }
    }
}

/// What the player typed at the targeting prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Fire(Coord),
    Hint,
    Quit,
}

/// Ask for the next command. `None` on end of input.
pub fn prompt_command(input: &mut impl BufRead) -> io::Result<Option<Command>> {
    loop {
        print!("Target (e.g. B7, 'hint' or 'quit'): ");
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match line.to_ascii_lowercase().as_str() {
            "quit" | "q" => return Ok(Some(Command::Quit)),
            "hint" | "h" => return Ok(Some(Command::Hint)),
            _ => match line.parse() {
                Ok(at) => return Ok(Some(Command::Fire(at))),
                Err(e) => println!("{e}"),
            },
        }
    }
}
