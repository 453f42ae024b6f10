use std::path::PathBuf;

use clap::Parser;
use pk3save::pk3;
use pk3save::save::{GameSave, BOX_CAPACITY, BOX_COUNT, PARTY_CAPACITY};

#[derive(Parser)]
struct Cli {
    #[arg(short, long)]
    sav: PathBuf,
    /// "party", or "boxN" for a single box; omit to list every box
    #[arg(short, long)]
    location: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let save_data = std::fs::read(&args.sav)?;
    let save = GameSave::new(&save_data)?;

    println!("Selected slot: {}", save.selected_slot());
    for slot in 0..2 {
        if let Some(count) = save.valid_sector_count(slot) {
            println!(
                "Slot {slot}: {count}/14 sectors valid ({})",
                if save.is_slot_valid(slot) {
                    "ok"
                } else {
                    "suspect"
                }
            );
        }
    }
    println!("Save counter: {}", save.save_counter());

    match args.location.as_deref() {
        Some("party") => print_party(&save)?,
        Some(location) if location.starts_with("box") => {
            let box_number = location[3..].parse::<usize>()?;
            print_box(&save, box_number)?;
        }
        Some(location) => anyhow::bail!("Unknown location: {location}"),
        None => {
            print_party(&save)?;
            for box_number in 0..BOX_COUNT {
                print_box(&save, box_number)?;
            }
        }
    }

    Ok(())
}

fn print_party(save: &GameSave) -> anyhow::Result<()> {
    for slot in 0..PARTY_CAPACITY {
        if let Some(record) = save.get_party(slot)? {
            println!("Party slot {slot}: PID 0x{:08x}", pk3::pid(&record));
        }
    }
    Ok(())
}

fn print_box(save: &GameSave, box_number: usize) -> anyhow::Result<()> {
    for slot in 0..BOX_CAPACITY {
        if let Some(record) = save.get_box(box_number, slot)? {
            println!(
                "Box {box_number} slot {slot}: PID 0x{:08x}",
                pk3::pid(&record)
            );
        }
    }
    Ok(())
}
