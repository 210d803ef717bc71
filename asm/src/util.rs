use arch::format::bin_string;
use color_print::cformat;
use indexmap::IndexMap;

use std::fs::File;
use std::io::{Read, Write};

use crate::assembler::Word;
use crate::error::Error;

/// Source lines of one file.
pub fn read_source(path: &str) -> Result<Vec<String>, Error> {
    let mut file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(Error::FileRead)?;
    Ok(text.lines().map(str::to_string).collect())
}

pub fn write_output(path: &str, bytes: &[u8]) -> Result<(), Error> {
    let mut file = File::create(path).map_err(|e| Error::FileCreate(path.to_string(), e))?;
    file.write_all(bytes)
        .map_err(|e| Error::FileWrite(path.to_string(), e))
}

/// One 32-character binary string per line.
pub fn to_bin_text(words: &[Word]) -> String {
    let mut text = String::with_capacity(words.len() * 33);
    for word in words {
        text.push_str(&bin_string(word.bin()));
        text.push('\n');
    }
    text
}

/// Big-endian bytes, one word per instruction.
pub fn to_bytes(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.bin().to_be_bytes()).collect()
}

/// Colored listing of every source line next to the words it produced.
pub fn print_dump(files: &IndexMap<String, Vec<String>>, words: &IndexMap<String, Vec<Word>>) {
    for (path, lines) in files {
        println!(
            "{}+------[{}]{}",
            "-".repeat(19),
            path,
            "-".repeat(45usize.saturating_sub(path.len()))
        );
        let produced = words.get(path).map(Vec::as_slice).unwrap_or(&[]);
        let mut cursor = 0;

        for (idx, raw) in lines.iter().enumerate() {
            let line_num = idx + 1;
            let mut first = true;
            while let Some(word) = produced.get(cursor).filter(|w| w.line == line_num) {
                let bin = word.bin();
                let source = if first { raw.trim() } else { "" };
                println!(
                    "{}",
                    cformat!(
                        "[<c>{:08X}</>] {:02X} {:02X} {:02X} {:02X} | {:>4}: {:<32} {}",
                        word.addr,
                        (bin >> 24) & 0xFF,
                        (bin >> 16) & 0xFF,
                        (bin >> 8) & 0xFF,
                        bin & 0xFF,
                        line_num,
                        source,
                        word.inst.cformat()
                    )
                );
                first = false;
                cursor += 1;
            }
            if first {
                let text = raw.trim();
                let text = if text.ends_with(':') {
                    cformat!("<g>{}</>", text)
                } else {
                    text.to_string()
                };
                println!("{:22}| {:>4}: {}", "", line_num, text);
            }
        }
    }
    println!("----------------------+-----------------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::inst::Inst;

    #[test]
    fn renderings() {
        let words = vec![
            Word {
                addr: 0,
                line: 1,
                inst: Inst::SYSCALL(),
            },
            Word {
                addr: 4,
                line: 2,
                inst: Inst::HALT(),
            },
        ];
        assert_eq!(
            to_bin_text(&words),
            "00000000000000000000000000001100\n00000000000000000000000000001101\n"
        );
        assert_eq!(to_bytes(&words), vec![0, 0, 0, 0x0C, 0, 0, 0, 0x0D]);
    }

    #[test]
    fn file_errors() {
        let missing = "no-such-dir/main.s";
        assert!(matches!(
            read_source(missing),
            Err(Error::FileOpen(path, _)) if path == missing
        ));
        // a directory opens but cannot be read as text
        assert!(matches!(
            read_source("src"),
            Err(Error::FileRead(_)) | Err(Error::FileOpen(..))
        ));
        assert!(matches!(
            write_output("no-such-dir/main.bin", &[0]),
            Err(Error::FileCreate(..))
        ));
    }
}
