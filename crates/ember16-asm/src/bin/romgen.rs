use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ember16_rs::decode::{build_rom_images, decode, write_rom_if_changed};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate the EMBER-16 microcode decode ROMs")]
struct Opts {
    /// Output path for the mode ROM (rd/rs/flags/pc bits)
    #[arg(long, default_value = "rom0.bin")]
    rom0: PathBuf,
    /// Output path for the functional-unit ROM (fu/fuop bits)
    #[arg(long, default_value = "rom1.bin")]
    rom1: PathBuf,
    /// Decode a single instruction word (hex or decimal) and print the
    /// control signals as JSON instead of writing ROMs
    #[arg(long, value_name = "WORD")]
    inspect: Option<String>,
}

fn parse_word(s: &str) -> Result<u16> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u16::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u16>()?)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    if let Some(word) = &opts.inspect {
        let word = parse_word(word)?;
        println!("{}", serde_json::to_string_pretty(&decode(word))?);
        return Ok(());
    }

    let (rom0, rom1) = build_rom_images();
    for (path, data) in [(&opts.rom0, &rom0), (&opts.rom1, &rom1)] {
        if write_rom_if_changed(path, data)? {
            tracing::info!(path = %path.display(), "writing ROM");
        } else {
            tracing::info!(path = %path.display(), "skipping unchanged ROM");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_word_hex_and_dec() {
        assert_eq!(parse_word("0x10").unwrap(), 0x10);
        assert_eq!(parse_word("16").unwrap(), 16);
        assert!(parse_word("zz").is_err());
    }
}
