use std::path::PathBuf;

use clap::Parser;
use pk3save::pk3::PK3_SIZE_BOX;
use pk3save::save::{GameSave, RecordAddress, Region};

#[derive(Parser)]
struct Cli {
    #[arg(short, long)]
    sav: PathBuf,
    /// Decrypted 80-byte record to insert
    #[arg(long)]
    pk3: PathBuf,
    #[arg(long)]
    box_number: Option<usize>,
    #[arg(long)]
    slot: Option<usize>,
    /// Where to write the exported slot image; defaults to the input path
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let save_data = std::fs::read(&args.sav)?;
    let mut save = GameSave::new(&save_data)?;

    let pk3_data = std::fs::read(&args.pk3)?;
    let record: [u8; PK3_SIZE_BOX] = pk3_data[..]
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected an 80-byte record, found {}", pk3_data.len()))?;

    match (args.box_number, args.slot) {
        (Some(box_number), Some(slot)) => {
            if save.get_box(box_number, slot)?.is_some() {
                anyhow::bail!("Box {box_number} slot {slot} is occupied");
            }
            save.put_box(box_number, slot, &record)?;
            println!("Wrote record into box {box_number} slot {slot}");
        }
        (None, None) => {
            let address = save.deposit(&record, Region::Box)?;
            if let RecordAddress::Box { box_number, slot } = address {
                println!("Wrote record into box {box_number} slot {slot}");
            }
        }
        _ => anyhow::bail!("--box-number and --slot must be given together"),
    }

    let out = args.out.unwrap_or(args.sav);
    std::fs::write(&out, save.export())?;
    println!("Saved to {}", out.display());

    Ok(())
}
