//! This module is responsible for SRT parsing and writing.
//! Timings are kept as the exact strings found in the source file.

use regex::Regex;
use std::sync::LazyLock;

static TIME_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d:,]+) --> ([\d:,]+)$").expect("valid regex"));

/// Represents a single SRT block (index, time range, text).
#[derive(Debug, Clone, PartialEq)]
pub struct SrtBlock {
    pub index: u64,
    pub start: String,
    pub end: String,
    pub text: String,
}

impl SrtBlock {
    /// Text with every line break replaced by a space, ready to be sent to a model.
    pub fn flat_text(&self) -> String {
        self.text.replace(['\r', '\n'], " ").trim().to_string()
    }
}

/// Parse SRT text into a list of blocks.
/// A block is an index line, a `start --> end` line and at least one text
/// line, ended by a blank line or the end of input. Anything that does not
/// fit that shape is skipped, so stray or truncated content is dropped.
pub fn parse(input: &str) -> Vec<SrtBlock> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let lines: Vec<&str> = input.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some((block, consumed)) = parse_block(&lines[i..]) else {
            i += 1;
            continue;
        };
        blocks.push(block);
        i += consumed;
    }
    blocks
}

/// Try to read one block at the start of `lines`, returning it with the
/// number of lines it spans.
fn parse_block(lines: &[&str]) -> Option<(SrtBlock, usize)> {
    let index_line = lines.first()?.trim_end_matches('\r');
    if index_line.is_empty() || !index_line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Renumbered on write, so an out-of-range index must not drop the block.
    let index = index_line.parse().unwrap_or(u64::MAX);
    let time_line = lines.get(1)?.trim_end_matches('\r');
    let caps = TIME_RANGE_RE.captures(time_line)?;
    let text: Vec<&str> = lines[2..]
        .iter()
        .map(|l| l.trim_end_matches('\r'))
        .take_while(|l| !l.is_empty())
        .collect();
    if text.is_empty() {
        return None;
    }
    let consumed = 2 + text.len();
    Some((
        SrtBlock {
            index,
            start: caps[1].to_string(),
            end: caps[2].to_string(),
            text: text.join("\n"),
        },
        consumed,
    ))
}

/// Format SRT blocks back to text.
/// Blocks are renumbered from 1 in order; the original indices are ignored.
pub fn format(blocks: &[SrtBlock]) -> String {
    let mut out = String::new();
    for (n, block) in blocks.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            n + 1,
            block.start,
            block.end,
            block.text.trim()
        ));
    }
    out
}
