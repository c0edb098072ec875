//! The usage-annotation extractor.
//!
//! Shader-stage lines carry a trailing annotation describing exactly which
//! binding slots the shader consumes, per category:
//!
//! ```text
//! pixel: clouds.ps(main), c:(0,1) s:(0) t:(2,1005) b:(3) z:(4)
//! ```
//!
//! Letters map to categories (`c` constant buffer, `s` sampler, `t` texture
//! read, `u` texture write, `b` structured-buffer read, `z` structured-buffer
//! write). A `t` or `b` value of 1000 or more is the read-write spelling of
//! the same resource: it is normalized into the corresponding write set at
//! `value - 1000` and never stored literally.

use crate::error::Diagnostics;
use crate::slots::{SlotCategory, SlotSet};

// ── UsageSets ─────────────────────────────────────────────────────────────

/// One [`SlotSet`] per category — the parsed form of a usage annotation.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct UsageSets {
    sets: [SlotSet; SlotCategory::COUNT],
}

impl UsageSets {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, cat: SlotCategory) -> SlotSet {
        self.sets[cat.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, cat: SlotCategory) -> &mut SlotSet {
        &mut self.sets[cat.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(|s| s.is_empty())
    }

    /// Unions every category of `other` into `self`.
    pub fn union_with(&mut self, other: &UsageSets) {
        for i in 0..SlotCategory::COUNT {
            self.sets[i].union_with(other.sets[i]);
        }
    }

    /// Parses an annotation string into per-category slot sets.
    ///
    /// Unknown letters and malformed groups are soft: noted in `diags` and
    /// skipped. `line` is the 1-based source line for diagnostics.
    pub fn parse(text: &str, line: usize, diags: &mut Diagnostics) -> UsageSets {
        let mut usage = UsageSets::new();
        for raw in text.split_whitespace() {
            let token = raw.trim_matches(',');
            if token.is_empty() {
                continue;
            }
            usage.parse_group(token, line, diags);
        }
        usage
    }

    /// Parses one `letter:(n,n,...)` group.
    fn parse_group(&mut self, token: &str, line: usize, diags: &mut Diagnostics) {
        let Some((letter, list)) = token.split_once(':') else {
            diags.warn(
                format!("usage:form:{token}"),
                line,
                format!("malformed usage token {token:?} (expected letter:(n,..))"),
            );
            return;
        };
        let list = list.trim_start_matches('(').trim_end_matches(')');

        // Category selection plus the >=1000 read-write redirection target.
        let (base, rw_redirect) = match letter {
            "c" => (SlotCategory::ConstantBuffer, None),
            "s" => (SlotCategory::Sampler, None),
            "t" => (SlotCategory::TextureRead, Some(SlotCategory::TextureWrite)),
            "u" => (SlotCategory::TextureWrite, None),
            "b" => (SlotCategory::BufferRead, Some(SlotCategory::BufferWrite)),
            "z" => (SlotCategory::BufferWrite, None),
            other => {
                diags.warn(
                    format!("usage:letter:{other}"),
                    line,
                    format!("unknown resource-annotation letter {other:?}, ignoring"),
                );
                return;
            }
        };

        for num in list.split(',') {
            let num = num.trim();
            if num.is_empty() {
                continue;
            }
            let value: u32 = match num.parse() {
                Ok(v) => v,
                Err(_) => {
                    diags.warn(
                        format!("usage:number:{num}"),
                        line,
                        format!("invalid slot number {num:?} in {letter}:(..), ignoring"),
                    );
                    continue;
                }
            };
            let (cat, slot) = match (rw_redirect, value) {
                (Some(rw), v) if v >= 1000 => (rw, v - 1000),
                (_, v) => (base, v),
            };
            if !self.get_mut(cat).insert(slot) {
                diags.warn(
                    format!("usage:range:{letter}:{value}"),
                    line,
                    format!("slot {value} exceeds binding capacity, ignoring"),
                );
            }
        }
    }
}
