/*
 * numbering.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Scopes and per-scope sequence numbering.
 */

//! Scopes and per-scope sequence numbering.
//!
//! Under [`NumberingPolicy::RestartPerChapter`] every level-1 heading opens a
//! new scope and each kind counts from 1 again, giving `1-1, 1-2, 2-1`. Main
//! chapters are numbered 1, 2, …; appendix chapters A, B, …. Under
//! [`NumberingPolicy::Continuous`] there is a single document scope.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::NumberingPolicy;
use crate::document::{EntityKind, Section};

/// The scope an entity is numbered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScopeId {
    Document,
    /// Chapter 0 holds entities that appear before the first heading.
    Chapter { section: Section, chapter: u32 },
}

impl ScopeId {
    /// The chapter part of a rendered number (`3`, `B`), if any.
    pub fn chapter_label(&self) -> Option<String> {
        match self {
            ScopeId::Document => None,
            ScopeId::Chapter {
                section: Section::Main,
                chapter,
            } => Some(chapter.to_string()),
            ScopeId::Chapter {
                section: Section::Appendix,
                chapter,
            } => Some(appendix_letter(*chapter)),
        }
    }

    pub fn section(&self) -> Section {
        match self {
            ScopeId::Document => Section::Main,
            ScopeId::Chapter { section, .. } => *section,
        }
    }
}

/// Letters for appendix chapters: 1 → A, 26 → Z, 27 → AA.
pub fn appendix_letter(n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut n = n;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// The number an entity is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntityNumber {
    pub scope: ScopeId,
    /// 1-based position among entities of the same kind in the scope.
    pub sequence_index: u32,
    /// First entity of its kind in the scope (the sequence field restarts).
    pub restarts: bool,
}

impl EntityNumber {
    /// `3-2`, `B-1`, or `7` for continuous numbering.
    pub fn display(&self) -> String {
        match self.scope.chapter_label() {
            Some(chapter) => format!("{}-{}", chapter, self.sequence_index),
            None => self.sequence_index.to_string(),
        }
    }
}

impl std::fmt::Display for EntityNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Walks scope boundaries in document order and hands out numbers.
#[derive(Debug)]
pub struct Numbering {
    policy: NumberingPolicy,
    section: Section,
    main_chapters: u32,
    appendix_chapters: u32,
    counters: FxHashMap<(ScopeId, EntityKind), u32>,
}

impl Numbering {
    pub fn new(policy: NumberingPolicy) -> Self {
        Self {
            policy,
            section: Section::Main,
            main_chapters: 0,
            appendix_chapters: 0,
            counters: FxHashMap::default(),
        }
    }

    pub fn policy(&self) -> NumberingPolicy {
        self.policy
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// Switch to the appendix. Idempotent.
    pub fn enter_appendix(&mut self) {
        self.section = Section::Appendix;
    }

    /// A level-1 heading: open the next chapter of the current section.
    pub fn start_chapter(&mut self) -> ScopeId {
        let chapter = match self.section {
            Section::Main => {
                self.main_chapters += 1;
                self.main_chapters
            }
            Section::Appendix => {
                self.appendix_chapters += 1;
                self.appendix_chapters
            }
        };
        ScopeId::Chapter {
            section: self.section,
            chapter,
        }
    }

    /// The scope entities are currently numbered in.
    pub fn current_scope(&self) -> ScopeId {
        match self.policy {
            NumberingPolicy::Continuous => ScopeId::Document,
            NumberingPolicy::RestartPerChapter => {
                let chapter = match self.section {
                    Section::Main => self.main_chapters,
                    Section::Appendix => self.appendix_chapters,
                };
                ScopeId::Chapter {
                    section: self.section,
                    chapter,
                }
            }
        }
    }

    /// True while no chapter of the current section has started and numbers
    /// would land in chapter 0.
    pub fn before_first_chapter(&self) -> bool {
        matches!(
            self.current_scope(),
            ScopeId::Chapter { chapter: 0, .. }
        )
    }

    /// Number the next entity of `kind`.
    pub fn next(&mut self, kind: EntityKind) -> EntityNumber {
        let scope = self.current_scope();
        let counter = self.counters.entry((scope, kind)).or_insert(0);
        *counter += 1;
        EntityNumber {
            scope,
            sequence_index: *counter,
            restarts: *counter == 1,
        }
    }
}
