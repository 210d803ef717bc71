use arch::MemoryMap;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

use crate::codegen;
use crate::context::Context;
use crate::error::Error;
use crate::grammer::ast::Program;
use crate::grammer::{lexer::Lexer, parsercore::Parser};

/// Compiler settings. Shares its file with the emulator, which reads more keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub map: MemoryMap,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Config, Error> {
        let file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
        let config: Config = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(path.to_string(), e))?;
        config.map.validate().map_err(Error::MemoryMap)?;
        Ok(config)
    }
}

pub fn parse(file: &str, source: &str) -> Result<Program, Error> {
    let tokens = Lexer::new(file, source).parse();
    let (program, errors) = Parser::new(tokens.into_iter()).parse();
    match errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(program),
    }
}

/// Source text in, assembly text out.
pub fn compile(file: &str, source: &str, map: MemoryMap) -> Result<String, Error> {
    let program = parse(file, source)?;
    let mut ctx = Context::new(map);
    ctx.collect(&program)?;
    let lines = codegen::generate(&ctx, &program)?;
    info!("{}: {} lines of assembly", file, lines.len());
    Ok(codegen::render(&lines))
}

/// Compile and assemble in one go.
pub fn build(file: &str, source: &str, map: MemoryMap) -> Result<(String, Vec<u32>), Error> {
    let asm = compile(file, source, map)?;
    let words = m32asm::assemble(&asm)?;
    Ok((asm, words.iter().map(|w| w.bin()).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reads_shared_file() {
        let config: Config = serde_yaml::from_str(
            "step_budget: 500\nmap:\n  stack_limit: 15728640\n",
        )
        .unwrap();
        assert_eq!(config.map.stack_limit, 0x00F0_0000);
        assert_eq!(config.map.global_base, MemoryMap::default().global_base);
    }

    #[test]
    fn parse_error_has_position() {
        let err = parse("bad.c", "int main() {\n  x = = 1\n}").unwrap_err();
        let token = err.token().unwrap();
        assert_eq!((token.line, token.col), (1, 6));
    }

    #[test]
    fn build_produces_words() {
        let (asm, words) = build("ok.c", "int main() { return 1 }", MemoryMap::default()).unwrap();
        assert!(asm.starts_with("    macro: gpr(bp)"));
        // 3 x gpr, j, then gpr + add + syscall
        assert_eq!(words.len(), 11);
    }
}
