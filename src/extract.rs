use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Substrings that mark a message as carrying a hyperlink.
const LINK_MARKERS: [&str; 3] = ["http://", "https://", "<a href="];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

// 💰 ± 0.00000002 BNB
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"±\s*([\d.]+)\s*([A-Za-z0-9]+)").unwrap());

// 🧧 Claimed: 646 / 711
static PROGRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Claimed:\s*(\d+)\s*/\s*(\d+)").unwrap());

// 🎁 IJAU5UL6
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"🎁\s*([A-Z0-9]+)").unwrap());

/// Why a raw message was not turned into a red packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("message contains a hyperlink")]
    ContainsLink,
    #[error("fewer than 3 non-empty lines")]
    TooFewLines,
    #[error("line 1 has no amount")]
    MissingAmount,
    #[error("line 2 has no claimed progress")]
    MissingProgress,
    #[error("line 3 has no code")]
    MissingCode,
}

/// Fields extracted from a red packet announcement.
///
/// Every field holds the matched text verbatim; no numeric validation is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedPacket {
    pub code: String,
    pub amount: String,
    pub token: String,
    pub claimed: String,
    pub total: String,
}

impl fmt::Display for RedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🎁 Code: {}\n💰 Amount: {} {}\n🧧 Progress: {} / {}\n\n#Binance #RedPacketHub",
            self.code, self.amount, self.token, self.claimed, self.total
        )
    }
}

/// Case-sensitive check for any link marker anywhere in the text.
pub fn contains_link(raw: &str) -> bool {
    LINK_MARKERS.iter().any(|marker| raw.contains(marker))
}

/// Extract a red packet from raw message text.
///
/// Only the first three non-empty lines (after markup removal) are consulted.
pub fn parse(raw: &str) -> Result<RedPacket, Rejection> {
    if contains_link(raw) {
        return Err(Rejection::ContainsLink);
    }

    let text = TAG_RE.replace_all(raw, "");
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() < 3 {
        return Err(Rejection::TooFewLines);
    }

    let amount = AMOUNT_RE
        .captures(lines[0])
        .ok_or(Rejection::MissingAmount)?;
    let progress = PROGRESS_RE
        .captures(lines[1])
        .ok_or(Rejection::MissingProgress)?;
    let code = CODE_RE.captures(lines[2]).ok_or(Rejection::MissingCode)?;

    Ok(RedPacket {
        code: code[1].to_string(),
        amount: amount[1].to_string(),
        token: amount[2].to_string(),
        claimed: progress[1].to_string(),
        total: progress[2].to_string(),
    })
}

/// Parse and render in one step; the rendered text is what gets relayed.
pub fn format_message(raw: &str) -> Result<String, Rejection> {
    parse(raw).map(|packet| packet.to_string())
}
