//! Prints the header summary of a map, optionally reorienting it.
//!
//! ```text
//! cargo run --example map_info -- emd_1234.map [ZYX]
//! ```

use mrcmap::{FileMode, MapFile, Orientation};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: map_info <map file> [orientation]");
        std::process::exit(2);
    };

    match args.next() {
        None => {
            let map = MapFile::open(&path, FileMode::Read)?;
            print!("{map}");
        }
        Some(target) => {
            let target: Orientation = target.parse()?;
            let mut map = MapFile::open(&path, FileMode::ReadWrite)?;
            let from = map.orientation();
            map.set_orientation(target)?;
            map.add_label(&format!("reoriented from {from} to {target}"));
            print!("{map}");
            map.close()?;
        }
    }
    Ok(())
}
