// Generates the charla(1) man page into the directory given as the first
// argument (default: man/).

use clap::CommandFactory;
use charla::cli::Cli;
use std::path::Path;

fn main() -> std::io::Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "man".to_string());
    std::fs::create_dir_all(&out_dir)?;

    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer)?;

    let out_path = Path::new(&out_dir).join("charla.1");
    std::fs::write(&out_path, buffer)?;
    eprintln!("Wrote {}", out_path.display());
    Ok(())
}
